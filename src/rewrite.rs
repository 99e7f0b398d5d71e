//! Call-site rewriting for `__builtin_lookup_name`
//!
//! Runs when the parser saves a function body. The walk is post-order:
//! every operand of a node is visited before the node itself is checked, so
//! a probe nested inside another probe's argument list is resolved first and
//! a freshly substituted node is never re-examined. Declaration statements
//! get their initializer walked explicitly, because the host keeps
//! initializers on the declaration table rather than in operand position.
//!
//! Rewrites happen in place: the call's slot in the arena is overwritten
//! with the resolved reference (or a copy of the default argument), and
//! every parent that held the slot's id sees the new node.

use nameprobe_host::diagnostics;
use nameprobe_host::pipeline::TranslationUnit;
use nameprobe_host::scope::DeclId;
use nameprobe_host::tree::{Expr, ExprId, ExprKind, Tree};

use crate::plugin::{PLUGIN_NAME, RewriteOptions};

/// Rewrite every recognized lookup call in a finished function definition.
#[tracing::instrument(skip_all, fields(function = function))]
pub(crate) fn rewrite_function(
    unit: &mut TranslationUnit,
    function: DeclId,
    builtin: DeclId,
    options: RewriteOptions,
) {
    let Some(body) = unit.decls.get(function).and_then(|d| d.body) else {
        diagnostics::internal_error("finished function has no saved body");
    };

    let mut rewriter = Rewriter {
        unit,
        builtin,
        options,
        rewrites: 0,
    };
    rewriter.walk_body(body);
    tracing::debug!(rewrites = rewriter.rewrites, "lookup rewrite pass done");
}

struct Rewriter<'a> {
    unit: &'a mut TranslationUnit,
    builtin: DeclId,
    options: RewriteOptions,
    rewrites: usize,
}

impl Rewriter<'_> {
    /// Walk a statement body: statement lists member by member, scope
    /// binders through their nested body, anything else as an expression.
    fn walk_body(&mut self, id: ExprId) {
        match self.unit.tree.kind(id).clone() {
            ExprKind::Bind { body } => self.walk_body(body),
            ExprKind::StmtList(stmts) => {
                for stmt in stmts {
                    self.walk_body(stmt);
                }
            }
            _ => self.walk_expr(id),
        }
    }

    /// Post-order over structural operands, then the initializer link if the
    /// node is a declaration statement, then the node itself.
    fn walk_expr(&mut self, id: ExprId) {
        for operand in self.unit.tree.operands(id) {
            self.walk_expr(operand);
        }

        let init = match self.unit.tree.kind(id) {
            ExprKind::Decl(decl) => self.unit.decls.get(*decl).and_then(|d| d.init),
            _ => None,
        };
        if let Some(init) = init {
            self.walk_expr(init);
        }

        self.maybe_rewrite(id);
    }

    /// If `id` is a call to the registered builtin, resolve its name
    /// argument and overwrite the call slot with the outcome.
    fn maybe_rewrite(&mut self, id: ExprId) {
        let ExprKind::Call { callee, args } = self.unit.tree.kind(id) else {
            return;
        };
        let (callee, args) = (*callee, args.clone());

        // Calls take the function's address; unwrap it to the callee decl.
        let ExprKind::AddrOf(inner) = self.unit.tree.kind(callee) else {
            return;
        };
        let ExprKind::DeclRef(decl) = self.unit.tree.kind(*inner) else {
            return;
        };
        if *decl != self.builtin {
            return;
        }

        let span = self.unit.tree.span(id);
        if args.len() != 2 {
            self.unit
                .diags
                .error_at(span, format!("{PLUGIN_NAME}: expected exactly two arguments"));
            return;
        }

        let Some(name) = string_arg(&self.unit.tree, args[0]) else {
            self.unit.diags.error_at(
                span,
                format!("{PLUGIN_NAME}: expected name string as first argument"),
            );
            return;
        };

        match self.unit.decls.lookup(&name) {
            Some(target) => {
                if self.options.strict_default_types && !self.default_matches(target, args[1]) {
                    self.unit
                        .diags
                        .error_at(span, format!("{PLUGIN_NAME}: incompatible default type"));
                    return;
                }
                tracing::debug!(name = %name, decl = target, "resolved, substituting reference");
                self.unit.tree.replace(
                    id,
                    Expr {
                        kind: ExprKind::DeclRef(target),
                        span,
                    },
                );
            }
            None => {
                tracing::debug!(name = %name, "not declared, substituting default");
                let replacement = self.unit.tree.node(args[1]).clone();
                self.unit.tree.replace(id, replacement);
            }
        }
        self.rewrites += 1;
    }

    fn default_matches(&self, target: DeclId, default: ExprId) -> bool {
        let Some(target_decl) = self.unit.decls.get(target) else {
            diagnostics::internal_error("lookup returned an unknown declaration id");
        };
        target_decl.ty() == self.unit.tree.type_of(default, &self.unit.decls)
    }
}

/// Extract the literal text of the call's name argument.
///
/// Accepts the shape the frontend builds for a string argument, an optional
/// implicit conversion over the address of a string constant, and nothing
/// else. Returns `None` for any other shape so the caller can report misuse.
/// A string constant without its trailing NUL, or with non-UTF-8 contents,
/// cannot have come from this host's frontend and aborts.
fn string_arg(tree: &Tree, arg: ExprId) -> Option<String> {
    let arg = match tree.kind(arg) {
        ExprKind::Convert(inner) => *inner,
        _ => arg,
    };
    let ExprKind::AddrOf(inner) = tree.kind(arg) else {
        return None;
    };
    let ExprKind::StringLit(bytes) = tree.kind(*inner) else {
        return None;
    };
    let Some((&0, text)) = bytes.split_last() else {
        diagnostics::internal_error("string constant without trailing NUL");
    };
    match std::str::from_utf8(text) {
        Ok(text) => Some(text.to_string()),
        Err(_) => diagnostics::internal_error("string constant is not valid UTF-8"),
    }
}
