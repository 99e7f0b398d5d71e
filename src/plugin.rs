//! The `__builtin_lookup_name` extension
//!
//! Two cooperating halves, hung off the host's parse events:
//!
//! - **Registrar**: at the first function definition of each unit, declare
//!   `__builtin_lookup_name : (const char *, word) -> word` in file scope and
//!   hand the declaration to the back end, so every later call site in the
//!   unit resolves against a real declaration.
//! - **Rewriter**: when a function body is saved, walk it and replace each
//!   recognized call with the entity its name argument resolves to, or with
//!   the call's own default argument when the name is not declared.
//!
//! The plugin caches the builtin's [`DeclId`] between the two events and
//! drops it on `start_unit`, so every unit gets a fresh declaration and no
//! identity leaks across units.

use nameprobe_host::diagnostics;
use nameprobe_host::pipeline::{HostInfo, Plugin, PluginInitError, TranslationUnit};
use nameprobe_host::scope::{Decl, DeclId, DeclKind, ScopeKind, Ty};
use nameprobe_host::tree::Span;

use crate::rewrite;

/// Name the plugin reports to the host and prefixes its diagnostics with
pub const PLUGIN_NAME: &str = "builtin_lookup_name";

/// Name of the builtin function the plugin declares and recognizes
pub const BUILTIN_NAME: &str = "__builtin_lookup_name";

/// Host ABI this plugin is compiled against
pub const BUILT_AGAINST_ABI: u32 = nameprobe_host::pipeline::HOST_ABI_VERSION;

/// Knobs for the call-site rewriter
#[derive(Debug, Clone, Copy, Default)]
pub struct RewriteOptions {
    /// Validate that the default argument's type matches the resolved
    /// entity's type before substituting, and report a mismatch instead of
    /// rewriting.
    ///
    /// Off by default: the frontend promotes the default argument to the
    /// builtin's word-typed parameter, so the comparison sees `word` against
    /// the entity's own type and flags well-formed probes. The check is kept
    /// for callers who build unpromoted arguments.
    pub strict_default_types: bool,
}

/// The lookup-name extension
pub struct LookupNamePlugin {
    abi: u32,
    options: RewriteOptions,
    /// Builtin declaration for the unit being parsed, once registered
    builtin: Option<DeclId>,
}

impl LookupNamePlugin {
    pub fn new(options: RewriteOptions) -> Self {
        Self {
            abi: BUILT_AGAINST_ABI,
            options,
            builtin: None,
        }
    }

    /// Override the ABI this plugin claims to be built against.
    ///
    /// Real deployments never call this; the host's compatibility tests use
    /// it to exercise the load-time version gate.
    pub fn built_against(mut self, abi: u32) -> Self {
        self.abi = abi;
        self
    }

    /// Declare the builtin in file scope, once per unit.
    ///
    /// Fires on the first `start_parse_function` of the unit. The parser has
    /// not entered the function body yet, so the current scope must still be
    /// the file scope; both that and a pre-existing declaration of the name
    /// are host-state corruption, not user mistakes.
    ///
    /// The signature is word-sized on purpose: callers cast the result to
    /// pointer-width types, and a narrower return would buy them a
    /// truncation warning at every probe.
    fn register_builtin(&mut self, unit: &mut TranslationUnit) {
        if self.builtin.is_some() {
            return;
        }
        if unit.decls.current_scope_kind() != ScopeKind::File {
            diagnostics::internal_error("lookup builtin registration outside file scope");
        }
        if unit.decls.lookup_local(BUILTIN_NAME).is_some() {
            diagnostics::internal_error("lookup builtin already declared in this unit");
        }

        let decl = unit.decls.declare(Decl {
            name: BUILTIN_NAME.to_string(),
            kind: DeclKind::Function {
                params: vec![Ty::CharPtr, Ty::Word],
                ret: Ty::Word,
            },
            span: Span::default(),
            scope: 0,
            init: None,
            body: None,
        });
        unit.emit_for_compilation(decl);
        tracing::debug!(decl, file = %unit.file_name, "declared {BUILTIN_NAME}");
        self.builtin = Some(decl);
    }
}

impl Plugin for LookupNamePlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn init(&mut self, host: &HostInfo) -> Result<(), PluginInitError> {
        tracing::info!(host = host.version, "{PLUGIN_NAME} plugin loaded");
        if self.abi != host.abi {
            return Err(PluginInitError::AbiMismatch {
                name: PLUGIN_NAME.to_string(),
                built_against: self.abi,
                host: host.abi,
            });
        }
        Ok(())
    }

    fn start_unit(&mut self, _unit: &mut TranslationUnit) {
        // New unit, new declaration table. A cached id would silently point
        // at whatever the new table mints at the same index.
        self.builtin = None;
    }

    fn start_parse_function(&mut self, unit: &mut TranslationUnit, _function: DeclId) {
        self.register_builtin(unit);
    }

    fn finish_parse_function(&mut self, unit: &mut TranslationUnit, function: DeclId) {
        let Some(builtin) = self.builtin else {
            diagnostics::internal_error("finish-parse event before builtin registration");
        };
        rewrite::rewrite_function(unit, function, builtin, self.options);
    }
}
