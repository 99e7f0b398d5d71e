//! Constant evaluation over rewritten trees
//!
//! A deliberately small stand-in for the stages behind the parser: it can
//! execute straight-line statement bodies whose expressions reduce to
//! word-sized constants. Anything it cannot reduce is an error, which makes
//! it a sharp check that rewriting really removed what it claimed to: a
//! call node that survives to this point is reported, never executed.

use std::collections::HashMap;

use thiserror::Error;

use crate::diagnostics;
use crate::scope::{DeclId, DeclKind, DeclTable};
use crate::tree::{BinOp, ExprId, ExprKind, Span, Tree};

/// Errors from evaluating a tree
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("call expression reached evaluation unresolved")]
    UnresolvedCall { span: Span },

    #[error("read of unbound variable '{name}'")]
    UnboundVar { name: String },

    #[error("expression has no word-sized value")]
    NotConstant { span: Span },

    #[error("assignment target is not a variable")]
    BadAssignTarget { span: Span },
}

/// Evaluates statement bodies against a unit's tree and declarations
pub struct Evaluator<'a> {
    tree: &'a Tree,
    decls: &'a DeclTable,
    env: HashMap<DeclId, i64>,
}

impl<'a> Evaluator<'a> {
    pub fn new(tree: &'a Tree, decls: &'a DeclTable) -> Self {
        Self {
            tree,
            decls,
            env: HashMap::new(),
        }
    }

    /// Execute a statement body top to bottom
    pub fn run_body(&mut self, body: ExprId) -> Result<(), EvalError> {
        self.exec_stmt(body)
    }

    /// The current binding of a variable, if one was made
    pub fn value_of(&self, decl: DeclId) -> Option<i64> {
        self.env.get(&decl).copied()
    }

    fn exec_stmt(&mut self, id: ExprId) -> Result<(), EvalError> {
        match self.tree.kind(id) {
            ExprKind::StmtList(stmts) => {
                for stmt in stmts {
                    self.exec_stmt(*stmt)?;
                }
                Ok(())
            }
            ExprKind::Bind { body } => self.exec_stmt(*body),
            ExprKind::Decl(decl) => {
                let Some(d) = self.decls.get(*decl) else {
                    diagnostics::internal_error("evaluator: unknown declaration id");
                };
                if let Some(init) = d.init {
                    let value = self.eval(init)?;
                    self.env.insert(*decl, value);
                }
                Ok(())
            }
            // Expression statement: evaluate for effect, drop the value.
            _ => self.eval(id).map(|_| ()),
        }
    }

    fn eval(&mut self, id: ExprId) -> Result<i64, EvalError> {
        let span = self.tree.span(id);
        match self.tree.kind(id) {
            ExprKind::IntLit(value) => Ok(*value),
            ExprKind::StringLit(_) | ExprKind::AddrOf(_) => Err(EvalError::NotConstant { span }),
            ExprKind::DeclRef(decl) => {
                let Some(d) = self.decls.get(*decl) else {
                    diagnostics::internal_error("evaluator: unknown declaration id");
                };
                match &d.kind {
                    DeclKind::EnumConst { value, .. } => Ok(*value),
                    DeclKind::Var { .. } => self
                        .env
                        .get(decl)
                        .copied()
                        .ok_or_else(|| EvalError::UnboundVar { name: d.name.clone() }),
                    DeclKind::Function { .. } => Err(EvalError::NotConstant { span }),
                }
            }
            ExprKind::Convert(operand) => self.eval(*operand),
            ExprKind::Call { .. } => Err(EvalError::UnresolvedCall { span }),
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.eval(*lhs)?;
                let r = self.eval(*rhs)?;
                Ok(match op {
                    BinOp::Add => l.wrapping_add(r),
                    BinOp::Sub => l.wrapping_sub(r),
                    BinOp::Eq => i64::from(l == r),
                    BinOp::Ne => i64::from(l != r),
                })
            }
            ExprKind::Assign { target, value } => {
                let v = self.eval(*value)?;
                let ExprKind::DeclRef(decl) = self.tree.kind(*target) else {
                    return Err(EvalError::BadAssignTarget { span });
                };
                match self.decls.get(*decl).map(|d| &d.kind) {
                    Some(DeclKind::Var { .. }) => {
                        self.env.insert(*decl, v);
                        Ok(v)
                    }
                    _ => Err(EvalError::BadAssignTarget { span }),
                }
            }
            ExprKind::Decl(_) | ExprKind::Bind { .. } | ExprKind::StmtList(_) => {
                Err(EvalError::NotConstant { span })
            }
        }
    }
}
