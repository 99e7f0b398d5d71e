#![forbid(unsafe_code)]
//! Compile-time name lookup with a fallback
//!
//! This crate is a host compiler extension. It declares one builtin per
//! translation unit,
//!
//! ```c
//! uintptr_t __builtin_lookup_name(const char *name, uintptr_t default_value);
//! ```
//!
//! and, when each function body is saved, rewrites every call to it in
//! place: if `name` is declared in the lexical scope at that point, the call
//! becomes a reference to that declaration; otherwise it becomes the call's
//! own default argument. Probing code can ask "does this name exist?" and
//! compile either way.
//!
//! The host surface (trees, declarations, diagnostics, the plugin pipeline)
//! lives in the `nameprobe_host` crate; this crate holds the extension
//! itself, a bundled probe program, and the CLI that drives them.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli`
//!   module enforces `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **True invariants**: A violated host precondition is a compiler bug, not a user error;
//!   those paths go through `nameprobe_host::diagnostics::internal_error`, which aborts.

pub mod cli;
pub mod demo;
pub mod plugin;
mod rewrite;

pub use plugin::{BUILTIN_NAME, LookupNamePlugin, PLUGIN_NAME, RewriteOptions};
