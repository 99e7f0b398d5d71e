//! Expression tree definitions for the host compiler surface
//!
//! Nodes live in a per-unit arena ([`Tree`]) and refer to each other through
//! [`ExprId`] handles. A handle names a *slot*, not a value: passes that hold
//! an `ExprId` into a statement list or an operand position can rewrite the
//! node behind it with [`Tree::replace`] without touching the parent, which is
//! exactly what an in-place tree rewrite needs.

use std::fmt;

use crate::scope::{DeclId, DeclTable, Ty};

/// Source location span (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Handle to an expression slot in a [`Tree`]
pub type ExprId = usize;

/// An expression node with its source location
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Binary operators (the handful the host surface needs)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Eq,
    Ne,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
        };
        write!(f, "{s}")
    }
}

/// Expression node kinds
///
/// Declaration statements carry only a [`DeclId`]; the initializer hangs off
/// the declaration table entry and is deliberately *not* a structural operand.
/// Traversals that want full coverage must follow that link themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer constant (word-sized)
    IntLit(i64),
    /// String constant; the stored bytes include the trailing NUL,
    /// the way the host keeps C string literals
    StringLit(Vec<u8>),
    /// Reference to a declaration
    DeclRef(DeclId),
    /// `&operand`
    AddrOf(ExprId),
    /// Implicit conversion wrapper around an operand
    Convert(ExprId),
    /// Function call: callee plus ordered arguments
    Call { callee: ExprId, args: Vec<ExprId> },
    /// Binary operation
    Binary { op: BinOp, lhs: ExprId, rhs: ExprId },
    /// C-style assignment expression (`target = value`, yields the value)
    Assign { target: ExprId, value: ExprId },
    /// Declaration statement (initializer lives on the table entry)
    Decl(DeclId),
    /// Scope-introducing block wrapping a nested body
    Bind { body: ExprId },
    /// Ordered statement sequence
    StmtList(Vec<ExprId>),
}

/// Per-unit expression arena
///
/// Handles are minted only by the owning tree and stay valid for the life of
/// the unit; [`Tree::replace`] swaps the contents of a slot while every handle
/// to it keeps working.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Expr>,
}

impl Tree {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    fn alloc(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = self.nodes.len();
        self.nodes.push(Expr { kind, span });
        id
    }

    pub fn int_lit(&mut self, value: i64, span: Span) -> ExprId {
        self.alloc(ExprKind::IntLit(value), span)
    }

    /// Build a string literal. A trailing NUL is appended to the stored
    /// bytes, matching how the host represents C string constants.
    pub fn string_lit(&mut self, text: &str, span: Span) -> ExprId {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.alloc(ExprKind::StringLit(bytes), span)
    }

    pub fn decl_ref(&mut self, decl: DeclId, span: Span) -> ExprId {
        self.alloc(ExprKind::DeclRef(decl), span)
    }

    pub fn addr_of(&mut self, operand: ExprId, span: Span) -> ExprId {
        self.alloc(ExprKind::AddrOf(operand), span)
    }

    pub fn convert(&mut self, operand: ExprId, span: Span) -> ExprId {
        self.alloc(ExprKind::Convert(operand), span)
    }

    pub fn call(&mut self, callee: ExprId, args: Vec<ExprId>, span: Span) -> ExprId {
        self.alloc(ExprKind::Call { callee, args }, span)
    }

    pub fn binary(&mut self, op: BinOp, lhs: ExprId, rhs: ExprId, span: Span) -> ExprId {
        self.alloc(ExprKind::Binary { op, lhs, rhs }, span)
    }

    pub fn assign(&mut self, target: ExprId, value: ExprId, span: Span) -> ExprId {
        self.alloc(ExprKind::Assign { target, value }, span)
    }

    pub fn decl_stmt(&mut self, decl: DeclId, span: Span) -> ExprId {
        self.alloc(ExprKind::Decl(decl), span)
    }

    pub fn bind(&mut self, body: ExprId, span: Span) -> ExprId {
        self.alloc(ExprKind::Bind { body }, span)
    }

    pub fn stmt_list(&mut self, stmts: Vec<ExprId>, span: Span) -> ExprId {
        self.alloc(ExprKind::StmtList(stmts), span)
    }

    /// Get the node behind a handle. Handles are only minted by this tree,
    /// so an out-of-range id is a host bug and panics.
    pub fn node(&self, id: ExprId) -> &Expr {
        &self.nodes[id]
    }

    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self.nodes[id].kind
    }

    pub fn span(&self, id: ExprId) -> Span {
        self.nodes[id].span
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Overwrite the slot behind `id` with a new node. Every handle that
    /// referred to the slot now sees the replacement; parents are untouched.
    pub fn replace(&mut self, id: ExprId, with: Expr) {
        self.nodes[id] = with;
    }

    /// Structural operands of a node, in source order.
    ///
    /// Declaration statements report none; their initializer is reachable
    /// only through the declaration table.
    pub fn operands(&self, id: ExprId) -> Vec<ExprId> {
        match self.kind(id) {
            ExprKind::IntLit(_) | ExprKind::StringLit(_) | ExprKind::DeclRef(_) | ExprKind::Decl(_) => {
                Vec::new()
            }
            ExprKind::AddrOf(operand) | ExprKind::Convert(operand) => vec![*operand],
            ExprKind::Call { callee, args } => {
                let mut ops = Vec::with_capacity(args.len() + 1);
                ops.push(*callee);
                ops.extend_from_slice(args);
                ops
            }
            ExprKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            ExprKind::Assign { target, value } => vec![*target, *value],
            ExprKind::Bind { body } => vec![*body],
            ExprKind::StmtList(stmts) => stmts.clone(),
        }
    }

    /// Shallow type of a value expression, as the host's frontend would see
    /// it after the usual promotions. Statement nodes report `Word`; callers
    /// only ask about value positions.
    pub fn type_of(&self, id: ExprId, decls: &DeclTable) -> Ty {
        match self.kind(id) {
            ExprKind::IntLit(_) => Ty::Word,
            ExprKind::StringLit(_) => Ty::CharPtr,
            ExprKind::DeclRef(decl) => match decls.get(*decl) {
                Some(d) => d.ty(),
                None => Ty::Word,
            },
            ExprKind::AddrOf(operand) => match self.kind(*operand) {
                ExprKind::StringLit(_) => Ty::CharPtr,
                _ => Ty::Word,
            },
            // Implicit conversions on the host surface only ever widen to
            // the word type; that promotion is what makes the disabled
            // compatibility validation misfire (see the rewriter).
            ExprKind::Convert(_) => Ty::Word,
            ExprKind::Call { callee, .. } => match self.type_of(*callee, decls) {
                Ty::Function { ret, .. } => *ret,
                _ => Ty::Word,
            },
            ExprKind::Binary { .. } => Ty::Word,
            ExprKind::Assign { target, .. } => self.type_of(*target, decls),
            ExprKind::Decl(_) | ExprKind::Bind { .. } | ExprKind::StmtList(_) => Ty::Word,
        }
    }

    /// Render the subtree under `root` as an indented listing.
    ///
    /// The output is deterministic and contains no node ids, so it is stable
    /// across runs and suitable for snapshots.
    pub fn dump(&self, root: ExprId, decls: &DeclTable) -> String {
        let mut out = String::new();
        self.dump_into(root, decls, 0, &mut out);
        out
    }

    fn dump_into(&self, id: ExprId, decls: &DeclTable, depth: usize, out: &mut String) {
        use std::fmt::Write;

        let indent = "  ".repeat(depth);
        let decl_name = |decl: DeclId| -> &str {
            match decls.get(decl) {
                Some(d) => d.name.as_str(),
                None => "<unknown>",
            }
        };
        match self.kind(id) {
            ExprKind::IntLit(value) => {
                let _ = writeln!(out, "{indent}int_lit {value}");
            }
            ExprKind::StringLit(bytes) => {
                let text = String::from_utf8_lossy(bytes.strip_suffix(&[0]).unwrap_or(bytes));
                let _ = writeln!(out, "{indent}string_lit \"{text}\"");
            }
            ExprKind::DeclRef(decl) => {
                let _ = writeln!(out, "{indent}decl_ref {}", decl_name(*decl));
            }
            ExprKind::AddrOf(operand) => {
                let _ = writeln!(out, "{indent}addr_of");
                self.dump_into(*operand, decls, depth + 1, out);
            }
            ExprKind::Convert(operand) => {
                let _ = writeln!(out, "{indent}convert");
                self.dump_into(*operand, decls, depth + 1, out);
            }
            ExprKind::Call { callee, args } => {
                let _ = writeln!(out, "{indent}call");
                self.dump_into(*callee, decls, depth + 1, out);
                for arg in args {
                    self.dump_into(*arg, decls, depth + 1, out);
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let _ = writeln!(out, "{indent}binary {op}");
                self.dump_into(*lhs, decls, depth + 1, out);
                self.dump_into(*rhs, decls, depth + 1, out);
            }
            ExprKind::Assign { target, value } => {
                let _ = writeln!(out, "{indent}assign");
                self.dump_into(*target, decls, depth + 1, out);
                self.dump_into(*value, decls, depth + 1, out);
            }
            ExprKind::Decl(decl) => {
                let _ = writeln!(out, "{indent}decl {}", decl_name(*decl));
                if let Some(init) = decls.get(*decl).and_then(|d| d.init) {
                    self.dump_into(init, decls, depth + 1, out);
                }
            }
            ExprKind::Bind { body } => {
                let _ = writeln!(out, "{indent}bind");
                self.dump_into(*body, decls, depth + 1, out);
            }
            ExprKind::StmtList(stmts) => {
                let _ = writeln!(out, "{indent}stmt_list");
                for stmt in stmts {
                    self.dump_into(*stmt, decls, depth + 1, out);
                }
            }
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{Decl, DeclKind, ScopeKind};

    #[test]
    fn string_literals_carry_a_trailing_nul() {
        let mut tree = Tree::new();
        let s = tree.string_lit("AAA", Span::default());
        match tree.kind(s) {
            ExprKind::StringLit(bytes) => assert_eq!(bytes.as_slice(), b"AAA\0"),
            other => panic!("expected a string literal, got {other:?}"),
        }
    }

    #[test]
    fn replace_swaps_the_slot_without_touching_the_parent() {
        let mut tree = Tree::new();
        let lhs = tree.int_lit(1, Span::default());
        let rhs = tree.int_lit(2, Span::default());
        let sum = tree.binary(BinOp::Add, lhs, rhs, Span::default());

        tree.replace(
            rhs,
            Expr {
                kind: ExprKind::IntLit(40),
                span: Span::default(),
            },
        );

        assert_eq!(tree.operands(sum), vec![lhs, rhs]);
        assert_eq!(tree.kind(rhs), &ExprKind::IntLit(40));
    }

    #[test]
    fn decl_statements_hide_their_initializer_from_operands() {
        let mut tree = Tree::new();
        let mut decls = DeclTable::new();
        let init = tree.int_lit(7, Span::default());
        let var = decls.declare(Decl {
            name: "seven".to_string(),
            kind: DeclKind::Var { ty: Ty::Word },
            span: Span::default(),
            scope: 0,
            init: Some(init),
            body: None,
        });
        let stmt = tree.decl_stmt(var, Span::default());

        assert!(tree.operands(stmt).is_empty());
        assert_eq!(decls.get(var).and_then(|d| d.init), Some(init));
    }

    #[test]
    fn dump_renders_declaration_initializers_inline() {
        let mut tree = Tree::new();
        let mut decls = DeclTable::new();
        decls.enter_scope(ScopeKind::Function);
        let init = tree.int_lit(4, Span::default());
        let var = decls.declare(Decl {
            name: "ddd".to_string(),
            kind: DeclKind::Var { ty: Ty::Word },
            span: Span::default(),
            scope: 0,
            init: Some(init),
            body: None,
        });
        let stmt = tree.decl_stmt(var, Span::default());
        let body = tree.stmt_list(vec![stmt], Span::default());

        assert_eq!(tree.dump(body, &decls), "stmt_list\n  decl ddd\n    int_lit 4\n");
    }

    #[test]
    fn conversions_promote_to_the_word_type() {
        let mut tree = Tree::new();
        let decls = DeclTable::new();
        let lit = tree.int_lit(-1, Span::default());
        let cast = tree.convert(lit, Span::default());

        assert_eq!(tree.type_of(cast, &decls), Ty::Word);
    }
}
