//! Declaration table and scope management for the host surface
//!
//! Tracks every named entity a unit declares (functions, variables, enum
//! constants) and the lexical scope each one lives in. Declarations are
//! addressed by [`DeclId`], a token minted once per declaration; two
//! references denote the same entity exactly when their ids are equal, so
//! passes never compare names or node addresses.

use std::collections::HashMap;
use std::fmt;

use crate::tree::{ExprId, Span};

/// Identity token for a declaration
pub type DeclId = usize;

/// Types on the host surface (just enough to describe declarations)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    /// Word-sized unsigned integer, the currency of the lookup builtin
    Word,
    /// Pointer to constant char
    CharPtr,
    /// Enumerated type, by tag
    Enum(String),
    Function {
        params: Vec<Ty>,
        ret: Box<Ty>,
    },
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Word => write!(f, "word"),
            Ty::CharPtr => write!(f, "const char *"),
            Ty::Enum(tag) => write!(f, "enum {tag}"),
            Ty::Function { params, ret } => {
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {ret}")
            }
        }
    }
}

/// A declaration known to the unit
#[derive(Debug, Clone)]
pub struct Decl {
    pub name: String,
    pub kind: DeclKind,
    pub span: Span,
    /// Index of the scope this was declared in (set by [`DeclTable::declare`])
    pub scope: usize,
    /// Variable initializer, if any. Lives here rather than in the tree's
    /// operand structure.
    pub init: Option<ExprId>,
    /// Saved body of a function definition
    pub body: Option<ExprId>,
}

impl Decl {
    /// The declared type, derived from the declaration kind.
    pub fn ty(&self) -> Ty {
        match &self.kind {
            DeclKind::Function { params, ret } => Ty::Function {
                params: params.clone(),
                ret: Box::new(ret.clone()),
            },
            DeclKind::Var { ty } => ty.clone(),
            DeclKind::EnumConst { enum_name, .. } => Ty::Enum(enum_name.clone()),
        }
    }
}

/// Kind of declaration
#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    /// Function
    Function { params: Vec<Ty>, ret: Ty },
    /// Variable/binding
    Var { ty: Ty },
    /// Enumeration constant with its fixed value
    EnumConst { enum_name: String, value: i64 },
}

/// Kind of scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    File,
    Function,
    Block,
}

/// A scope containing declarations by name
#[derive(Debug)]
pub struct Scope {
    pub parent: Option<usize>,
    pub kind: ScopeKind,
    pub names: HashMap<String, DeclId>,
}

impl Scope {
    pub fn new(parent: Option<usize>, kind: ScopeKind) -> Self {
        Self {
            parent,
            kind,
            names: HashMap::new(),
        }
    }
}

/// Declaration table managing all named entities of one unit
#[derive(Debug)]
pub struct DeclTable {
    decls: Vec<Decl>,
    scopes: Vec<Scope>,
    current_scope: usize,
}

impl DeclTable {
    /// An empty table holding only the file scope. Nothing is predeclared;
    /// even compiler-provided builtins arrive through [`DeclTable::declare`].
    pub fn new() -> Self {
        Self {
            decls: Vec::new(),
            scopes: vec![Scope::new(None, ScopeKind::File)],
            current_scope: 0,
        }
    }

    /// Enter a new scope
    pub fn enter_scope(&mut self, kind: ScopeKind) {
        let new_scope = Scope::new(Some(self.current_scope), kind);
        self.scopes.push(new_scope);
        self.current_scope = self.scopes.len() - 1;
    }

    /// Exit the current scope
    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current_scope].parent {
            self.current_scope = parent;
        }
    }

    /// Declare a new entity in the current scope. A same-name declaration in
    /// the same scope shadows the earlier one in the name map; the earlier
    /// entry keeps its id and stays addressable.
    pub fn declare(&mut self, mut decl: Decl) -> DeclId {
        decl.scope = self.current_scope;
        let id = self.decls.len();
        self.scopes[self.current_scope].names.insert(decl.name.clone(), id);
        self.decls.push(decl);
        id
    }

    /// Look up a name through the current scope chain
    pub fn lookup(&self, name: &str) -> Option<DeclId> {
        let mut scope_idx = self.current_scope;
        loop {
            if let Some(&id) = self.scopes[scope_idx].names.get(name) {
                return Some(id);
            }
            if let Some(parent) = self.scopes[scope_idx].parent {
                scope_idx = parent;
            } else {
                break;
            }
        }
        None
    }

    /// Look up a name only in the current scope (no parent lookup)
    pub fn lookup_local(&self, name: &str) -> Option<DeclId> {
        self.scopes[self.current_scope].names.get(name).copied()
    }

    /// Get a declaration by id
    pub fn get(&self, id: DeclId) -> Option<&Decl> {
        self.decls.get(id)
    }

    /// Get a mutable declaration by id
    pub fn get_mut(&mut self, id: DeclId) -> Option<&mut Decl> {
        self.decls.get_mut(id)
    }

    /// Get the current scope kind
    pub fn current_scope_kind(&self) -> ScopeKind {
        self.scopes[self.current_scope].kind
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

impl Default for DeclTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_var(name: &str) -> Decl {
        Decl {
            name: name.to_string(),
            kind: DeclKind::Var { ty: Ty::Word },
            span: Span::default(),
            scope: 0,
            init: None,
            body: None,
        }
    }

    #[test]
    fn lookup_walks_the_scope_chain() {
        let mut decls = DeclTable::new();
        let outer = decls.declare(word_var("x"));

        decls.enter_scope(ScopeKind::Function);
        assert_eq!(decls.lookup("x"), Some(outer));
        assert_eq!(decls.lookup_local("x"), None);

        let inner = decls.declare(word_var("x"));
        assert_eq!(decls.lookup("x"), Some(inner));

        decls.exit_scope();
        assert_eq!(decls.lookup("x"), Some(outer));
    }

    #[test]
    fn names_declared_in_an_exited_scope_are_invisible() {
        let mut decls = DeclTable::new();
        decls.enter_scope(ScopeKind::Function);
        decls.declare(word_var("local"));
        decls.exit_scope();

        assert_eq!(decls.lookup("local"), None);
        assert_eq!(decls.current_scope_kind(), ScopeKind::File);
    }

    #[test]
    fn ids_are_stable_identity_tokens() {
        let mut decls = DeclTable::new();
        let first = decls.declare(word_var("n"));
        let second = decls.declare(word_var("n"));

        assert_ne!(first, second);
        // The shadowed declaration keeps its id and its data.
        assert_eq!(decls.get(first).map(|d| d.name.as_str()), Some("n"));
        assert_eq!(decls.lookup("n"), Some(second));
    }

    #[test]
    fn enum_constants_report_their_enum_type() {
        let mut decls = DeclTable::new();
        let aaa = decls.declare(Decl {
            name: "AAA".to_string(),
            kind: DeclKind::EnumConst {
                enum_name: "x".to_string(),
                value: 1,
            },
            span: Span::default(),
            scope: 0,
            init: None,
            body: None,
        });

        let Some(decl) = decls.get(aaa) else {
            panic!("declaration should exist");
        };
        assert_eq!(decl.ty(), Ty::Enum("x".to_string()));
        assert_eq!(decl.ty().to_string(), "enum x");
    }
}
