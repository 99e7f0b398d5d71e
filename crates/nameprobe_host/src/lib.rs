//! Host compiler surface for the nameprobe extension: trees, declarations, plugin pipeline.
//!
//! This crate is the stable ground an extension stands on. It owns the per-unit
//! expression arena, the scoped declaration table, the diagnostic channels, and
//! the parse-event pipeline that drives loaded plugins.
//!
//! ## Notes
//! - This crate is intentionally "host-only": it knows nothing about any particular
//!   extension, including the name-lookup builtin. Extensions live above it.
//! - Everything is per-[`pipeline::TranslationUnit`]; the crate keeps no global state.
//!
//! ## Examples
//! ```rust,no_run
//! use nameprobe_host::pipeline::TranslationUnit;
//! use nameprobe_host::tree::Span;
//!
//! let mut unit = TranslationUnit::new("probe.c", "int answer = 42;");
//! let lit = unit.tree.int_lit(42, Span::new(13, 15));
//! assert_eq!(unit.tree.operands(lit).len(), 0);
//! ```
//!
//! ## See also
//! - The `nameprobe` crate for the extension that registers and rewrites the
//!   `__builtin_lookup_name` builtin.

pub mod diagnostics;
pub mod eval;
pub mod pipeline;
pub mod scope;
pub mod tree;
