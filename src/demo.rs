//! Bundled probe program exercising the lookup builtin end to end
//!
//! Builds the translation unit a parser would build for the listing below,
//! drives the plugin through the host pipeline, and runs the evaluator over
//! the rewritten body. Three probes arrive through declaration initializers
//! (`aaa`, `bbb`, `ccc`) and one through an assignment inside a comparison
//! (`ddd`), so both traversal paths of the rewriter see real traffic.
//!
//! Extra enum constants can be declared before parsing via `defines`; that
//! is what lets `ccc` flip from "does not exist" to a real value without
//! editing the listing.

use thiserror::Error;

use nameprobe_host::diagnostics;
use nameprobe_host::eval::{EvalError, Evaluator};
use nameprobe_host::pipeline::{Driver, PluginInitError, TranslationUnit};
use nameprobe_host::scope::{Decl, DeclId, DeclKind, ScopeKind, Ty};
use nameprobe_host::tree::{BinOp, ExprId, Span};

use crate::plugin::{BUILTIN_NAME, LookupNamePlugin, RewriteOptions};

/// File name the demo unit reports in diagnostics
pub const DEMO_FILE_NAME: &str = "probe.c";

/// The probe value meaning "name not declared" (`(enum x) -1` in the listing)
const DEFAULT_SENTINEL: i64 = -1;

/// The program the demo unit models. Spans in the built tree point into
/// this text.
const DEMO_SOURCE: &str = "\
enum x { AAA = 1, BBB = 2, DDD = 4 };

#define DEFAULT ((enum x) -1)

int main(void) {
    enum x aaa = (enum x) __builtin_lookup_name(\"AAA\", DEFAULT);
    enum x bbb = (enum x) __builtin_lookup_name(\"BBB\", DEFAULT);
    enum x ccc = (enum x) __builtin_lookup_name(\"CCC\", DEFAULT);
    enum x ddd;
    (ddd = (enum x) __builtin_lookup_name(\"DDD\", DEFAULT)) != DEFAULT;
    return 0;
}
";

/// Errors from running the demo
#[derive(Debug, Error)]
pub enum DemoError {
    #[error("failed to load the lookup plugin: {0}")]
    PluginInit(#[from] PluginInitError),

    #[error("probe evaluation failed: {0}")]
    Eval(#[from] EvalError),
}

/// What one demo run produced
#[derive(Debug)]
pub struct DemoReport {
    /// One line per probe, in listing order
    pub lines: Vec<String>,
    /// Rendered diagnostics, empty when the unit is clean
    pub diagnostics: String,
    /// Tree listing of `main`'s body before the rewrite pass
    pub dump_before: String,
    /// Tree listing of `main`'s body after the rewrite pass
    pub dump_after: String,
}

/// Build the demo unit, run the plugin over it, and evaluate the result.
///
/// `defines` are extra enum constants declared in file scope before `main`
/// is parsed, in the given order.
pub fn run_demo(defines: &[(String, i64)], options: RewriteOptions) -> Result<DemoReport, DemoError> {
    let mut driver = Driver::new();
    driver.load(Box::new(LookupNamePlugin::new(options)))?;

    let mut unit = TranslationUnit::new(DEMO_FILE_NAME, DEMO_SOURCE);
    driver.start_unit(&mut unit);

    // File-scope declarations, the way the parser would make them.
    for (name, value) in [("AAA", 1), ("BBB", 2), ("DDD", 4)] {
        declare_enum_const(&mut unit, name, value);
    }
    for (name, value) in defines {
        declare_enum_const(&mut unit, name, *value);
    }
    let main_fn = unit.decls.declare(Decl {
        name: "main".to_string(),
        kind: DeclKind::Function {
            params: vec![],
            ret: Ty::Word,
        },
        span: span_of("int main(void)"),
        scope: 0,
        init: None,
        body: None,
    });

    driver.start_parse_function(&mut unit, main_fn);

    // The registrar has run; from here the parser resolves the builtin's
    // name like any other identifier.
    let Some(builtin) = unit.decls.lookup(BUILTIN_NAME) else {
        diagnostics::internal_error("lookup builtin not declared before body parse");
    };

    unit.decls.enter_scope(ScopeKind::Function);
    let mut stmts = Vec::new();
    let mut probes: Vec<(String, DeclId)> = Vec::new();

    // enum x aaa = (enum x) __builtin_lookup_name("AAA", DEFAULT);
    for name in ["AAA", "BBB", "CCC"] {
        let var_name = name.to_lowercase();
        let call = build_probe_call(&mut unit, builtin, name);
        let span = unit.tree.span(call);
        let init = unit.tree.convert(call, span);
        let var = unit.decls.declare(Decl {
            name: var_name.clone(),
            kind: DeclKind::Var {
                ty: Ty::Enum("x".to_string()),
            },
            span,
            scope: 0,
            init: Some(init),
            body: None,
        });
        stmts.push(unit.tree.decl_stmt(var, span));
        probes.push((var_name, var));
    }

    // enum x ddd;
    // (ddd = (enum x) __builtin_lookup_name("DDD", DEFAULT)) != DEFAULT;
    let ddd = unit.decls.declare(Decl {
        name: "ddd".to_string(),
        kind: DeclKind::Var {
            ty: Ty::Enum("x".to_string()),
        },
        span: span_of("enum x ddd;"),
        scope: 0,
        init: None,
        body: None,
    });
    stmts.push(unit.tree.decl_stmt(ddd, span_of("enum x ddd;")));
    let call = build_probe_call(&mut unit, builtin, "DDD");
    let span = unit.tree.span(call);
    let target = unit.tree.decl_ref(ddd, span);
    let value = unit.tree.convert(call, span);
    let assign = unit.tree.assign(target, value, span);
    let sentinel = unit.tree.int_lit(DEFAULT_SENTINEL, span);
    let compare_to = unit.tree.convert(sentinel, span);
    stmts.push(unit.tree.binary(BinOp::Ne, assign, compare_to, span));
    probes.push(("ddd".to_string(), ddd));

    let body_span = span_of("{\n    enum x aaa");
    let list = unit.tree.stmt_list(stmts, body_span);
    let body = unit.tree.bind(list, body_span);
    unit.decls.exit_scope();

    let Some(main_decl) = unit.decls.get_mut(main_fn) else {
        diagnostics::internal_error("demo lost its own function declaration");
    };
    main_decl.body = Some(body);

    let dump_before = unit.tree.dump(body, &unit.decls);
    driver.finish_parse_function(&mut unit, main_fn);
    let dump_after = unit.tree.dump(body, &unit.decls);

    let diagnostics = unit.render_diagnostics();
    if !unit.diags.is_empty() {
        // Errors stop the unit before any later stage runs.
        return Ok(DemoReport {
            lines: Vec::new(),
            diagnostics,
            dump_before,
            dump_after,
        });
    }

    // The stages behind the parser: execute the rewritten body.
    let mut eval = Evaluator::new(&unit.tree, &unit.decls);
    eval.run_body(body)?;

    let lines = probes
        .iter()
        .map(|(name, var)| match eval.value_of(*var) {
            Some(value) if value != DEFAULT_SENTINEL => format!("{name} exists: {value}"),
            _ => format!("{name} does not exist"),
        })
        .collect();

    Ok(DemoReport {
        lines,
        diagnostics,
        dump_before,
        dump_after,
    })
}

fn declare_enum_const(unit: &mut TranslationUnit, name: &str, value: i64) {
    let span = span_of(&format!("{name} = "));
    unit.decls.declare(Decl {
        name: name.to_string(),
        kind: DeclKind::EnumConst {
            enum_name: "x".to_string(),
            value,
        },
        span,
        scope: 0,
        init: None,
        body: None,
    });
}

/// Build `__builtin_lookup_name("<name>", DEFAULT)` the way the frontend
/// would: the string argument decays and converts to the `const char *`
/// parameter, the default promotes to the word parameter, and the callee is
/// the address of the builtin's declaration.
fn build_probe_call(unit: &mut TranslationUnit, builtin: DeclId, name: &str) -> ExprId {
    let call_span = span_of(&format!("__builtin_lookup_name(\"{name}\", DEFAULT)"));
    let lit_span = span_of(&format!("\"{name}\""));

    let lit = unit.tree.string_lit(name, lit_span);
    let addr = unit.tree.addr_of(lit, lit_span);
    let name_arg = unit.tree.convert(addr, lit_span);

    let sentinel = unit.tree.int_lit(DEFAULT_SENTINEL, call_span);
    let default_arg = unit.tree.convert(sentinel, call_span);

    let callee_ref = unit.tree.decl_ref(builtin, call_span);
    let callee = unit.tree.addr_of(callee_ref, call_span);
    unit.tree.call(callee, vec![name_arg, default_arg], call_span)
}

/// Span of the first occurrence of `needle` in the demo listing.
fn span_of(needle: &str) -> Span {
    match DEMO_SOURCE.find(needle) {
        Some(start) => Span::new(start, start + needle.len()),
        None => Span::default(),
    }
}
