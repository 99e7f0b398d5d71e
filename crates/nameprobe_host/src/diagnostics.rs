//! Diagnostics and error reporting for the host surface
//!
//! Two channels, kept deliberately distinct: [`Diagnostics::error_at`]
//! records a user-facing error against a source location and lets the
//! run continue, while [`internal_error`] aborts the process because the
//! host itself is in a state it promised could not happen.

use crate::tree::Span;

/// A user-facing error with location information
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
}

/// Per-unit diagnostic sink
///
/// Errors accumulate in emission order; recording one never unwinds, so a
/// pass can report misuse and keep walking the rest of the unit.
#[derive(Debug, Default)]
pub struct Diagnostics {
    diags: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { diags: Vec::new() }
    }

    /// Record an error against a source span
    pub fn error_at(&mut self, span: Span, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(start = span.start, end = span.end, "error_at: {message}");
        self.diags.push(Diagnostic { message, span });
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.diags
    }

    pub fn len(&self) -> usize {
        self.diags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }
}

/// Abort on a broken host invariant.
///
/// This is the analogue of an internal compiler error: not a user mistake,
/// and never reported through [`Diagnostics`]. Callers reach for it when a
/// precondition the host guarantees has been violated.
pub fn internal_error(message: &str) -> ! {
    panic!("internal error: {message}");
}

/// Render an error with source context (no colors, stable for tests)
pub fn render(file_name: &str, source: &str, diag: &Diagnostic) -> String {
    use std::fmt::Write;

    let (line_num, col_num, line_text) = get_line_info(source, diag.span.start);
    let width = line_num.to_string().len();

    let span_len = diag.span.end.saturating_sub(diag.span.start).max(1);
    let avail = line_text.len().saturating_sub(col_num - 1).max(1);
    let underline = "^".repeat(span_len.min(avail));

    let mut out = String::new();
    let _ = writeln!(out, "error: {}", diag.message);
    let _ = writeln!(out, "  --> {file_name}:{line_num}:{col_num}");
    let _ = writeln!(out, "  {:>width$} |", "");
    let _ = writeln!(out, "  {line_num:>width$} | {line_text}");
    let _ = writeln!(out, "  {:>width$} | {}{underline}", "", " ".repeat(col_num - 1));
    out
}

/// Get line number, column number, and line text for a byte offset
fn get_line_info(source: &str, offset: usize) -> (usize, usize, &str) {
    let offset = offset.min(source.len());
    let mut line_num = 1;
    let mut line_start = 0;

    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line_num += 1;
            line_start = i + 1;
        }
    }

    let line_end = source[line_start..]
        .find('\n')
        .map(|i| line_start + i)
        .unwrap_or(source.len());

    let line_text = &source[line_start..line_end];
    let col_num = offset - line_start + 1;

    (line_num, col_num, line_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_info_basic() {
        let source = "line one\nline two\nline three";
        let (line, col, text) = get_line_info(source, 0);
        assert_eq!((line, col, text), (1, 1, "line one"));

        let (line, col, text) = get_line_info(source, 9);
        assert_eq!((line, col, text), (2, 1, "line two"));

        let (line, col, text) = get_line_info(source, 14);
        assert_eq!((line, col, text), (2, 6, "line two"));
    }

    #[test]
    fn line_info_clamps_past_the_end() {
        let source = "short";
        let (line, col, text) = get_line_info(source, 100);
        assert_eq!((line, col, text), (1, 6, "short"));
    }

    #[test]
    fn errors_accumulate_in_order() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());

        diags.error_at(Span::new(0, 3), "first");
        diags.error_at(Span::new(5, 9), "second");

        assert_eq!(diags.len(), 2);
        assert_eq!(diags.all()[0].message, "first");
        assert_eq!(diags.all()[1].message, "second");
    }

    #[test]
    fn render_points_at_the_span() {
        let source = "int x = probe(name);\n";
        let mut diags = Diagnostics::new();
        diags.error_at(Span::new(8, 19), "expected name string as first argument");

        let rendered = render("t.c", source, &diags.all()[0]);
        let expected = "\
error: expected name string as first argument
  --> t.c:1:9
    |
  1 | int x = probe(name);
    |         ^^^^^^^^^^^
";
        assert_eq!(rendered, expected);
    }

    #[test]
    #[should_panic(expected = "internal error: broken invariant")]
    fn internal_error_aborts() {
        internal_error("broken invariant");
    }
}
