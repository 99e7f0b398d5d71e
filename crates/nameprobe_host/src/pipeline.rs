//! Host pipeline: translation units, plugin hooks, and the driver
//!
//! The host compiles one [`TranslationUnit`] at a time and exposes a small
//! set of parse-lifecycle events to loaded extensions. An extension
//! implements [`Plugin`] and registers interest by overriding the hooks it
//! needs; the [`Driver`] fans each event out to every loaded plugin in load
//! order.
//!
//! ## Notes
//!
//! - Hooks receive the unit by `&mut`: mutating the tree and the declaration
//!   table in place is the point, not a side effect.
//! - `start_unit` must fire once per unit before any function events, so
//!   plugins can drop state cached for the previous unit.

use thiserror::Error;

use crate::diagnostics::{self, Diagnostics};
use crate::scope::{DeclId, DeclTable};
use crate::tree::Tree;

/// The host version string (from Cargo metadata at compile time)
pub const HOST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the hook interface plugins compile against.
///
/// Bumped whenever [`Plugin`] or the types it sees change shape. A plugin
/// built against a different value must refuse to load.
pub const HOST_ABI_VERSION: u32 = 1;

/// What the host tells a plugin about itself at load time
#[derive(Debug, Clone)]
pub struct HostInfo {
    pub version: &'static str,
    pub abi: u32,
}

impl HostInfo {
    pub fn current() -> Self {
        Self {
            version: HOST_VERSION,
            abi: HOST_ABI_VERSION,
        }
    }
}

/// Errors a plugin can raise while loading
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PluginInitError {
    #[error("plugin '{name}' was built against host ABI {built_against}, this host provides {host}")]
    AbiMismatch {
        name: String,
        built_against: u32,
        host: u32,
    },
}

/// One source file plus everything it pulls in: the expression arena, the
/// declaration table, the diagnostic sink, and the list of declarations
/// already handed to the back end.
#[derive(Debug)]
pub struct TranslationUnit {
    pub file_name: String,
    pub source: String,
    pub tree: Tree,
    pub decls: DeclTable,
    pub diags: Diagnostics,
    emitted: Vec<DeclId>,
}

impl TranslationUnit {
    pub fn new(file_name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            source: source.into(),
            tree: Tree::new(),
            decls: DeclTable::new(),
            diags: Diagnostics::new(),
            emitted: Vec::new(),
        }
    }

    /// Hand a finished declaration to the back end.
    ///
    /// The host model stops at recording the order; there is no object code
    /// behind it. Passes call this so the rest of the pipeline sees the
    /// declaration exactly once.
    pub fn emit_for_compilation(&mut self, decl: DeclId) {
        match self.decls.get(decl) {
            Some(d) => tracing::debug!(name = %d.name, "emitting declaration"),
            None => diagnostics::internal_error("emit_for_compilation: unknown declaration id"),
        }
        self.emitted.push(decl);
    }

    /// Declarations emitted so far, in emission order
    pub fn emitted(&self) -> &[DeclId] {
        &self.emitted
    }

    /// Render every collected diagnostic against this unit's source
    pub fn render_diagnostics(&self) -> String {
        self.diags
            .all()
            .iter()
            .map(|d| diagnostics::render(&self.file_name, &self.source, d))
            .collect()
    }
}

/// A host extension
///
/// Default hook bodies are empty, so a plugin overrides only the events it
/// cares about. `function` is the declaration the parser is working on when
/// the event fires.
pub trait Plugin {
    fn name(&self) -> &'static str;

    /// Called once at load time. Return an error to refuse the host,
    /// typically after checking [`HostInfo::abi`].
    fn init(&mut self, host: &HostInfo) -> Result<(), PluginInitError>;

    /// A new translation unit is about to be parsed
    fn start_unit(&mut self, _unit: &mut TranslationUnit) {}

    /// The parser is about to descend into a function definition
    fn start_parse_function(&mut self, _unit: &mut TranslationUnit, _function: DeclId) {}

    /// The parser finished a function definition and its body is saved
    fn finish_parse_function(&mut self, _unit: &mut TranslationUnit, _function: DeclId) {}
}

/// Loads plugins and fans parse events out to them in load order
#[derive(Default)]
pub struct Driver {
    plugins: Vec<Box<dyn Plugin>>,
}

impl Driver {
    pub fn new() -> Self {
        Self { plugins: Vec::new() }
    }

    /// Initialize a plugin against the current host and keep it on success
    pub fn load(&mut self, mut plugin: Box<dyn Plugin>) -> Result<(), PluginInitError> {
        let host = HostInfo::current();
        plugin.init(&host)?;
        tracing::debug!(plugin = plugin.name(), host = HOST_VERSION, "plugin loaded");
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn start_unit(&mut self, unit: &mut TranslationUnit) {
        tracing::debug!(file = %unit.file_name, "start unit");
        for plugin in &mut self.plugins {
            plugin.start_unit(unit);
        }
    }

    pub fn start_parse_function(&mut self, unit: &mut TranslationUnit, function: DeclId) {
        for plugin in &mut self.plugins {
            plugin.start_parse_function(unit, function);
        }
    }

    pub fn finish_parse_function(&mut self, unit: &mut TranslationUnit, function: DeclId) {
        for plugin in &mut self.plugins {
            plugin.finish_parse_function(unit, function);
        }
    }
}
