//! Top-level analyzer entry points: wires the cost IR, the iterative
//! and recursive engines, and the execution-trace simulator into the
//! `AnalysisResult` shape the external collaborators consume.

pub mod iterative;
pub mod recursive;
pub mod trace;

use crate::ast::{Proc, Program, Stmt};
use crate::ir::{Exponent, Ir};
use crate::parser::{self, ParseError};
use crate::printer;
use crate::rational::Rational;
use crate::semantic;
use iterative::{CostCtx, LineCost, StrongBounds, Summations};
use serde::Serialize;
use trace::ExecutionTrace;

/// Explicit configuration passed to [`analyze`] ("no global state ...
/// passed as an explicit options record").
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// `For.step` used when the parser/semantic pass leaves it absent.
    pub default_for_step: i64,
    /// AST nesting bound: deeper trees are flagged, not rejected.
    pub max_ast_depth: usize,
    /// IR simplification step budget, mirrored here for callers that
    /// want to report it; the simplifier itself carries the same default.
    pub max_simplification_steps: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            default_for_step: 1,
            max_ast_depth: 64,
            max_simplification_steps: 10_000,
        }
    }
}

/// The engine's single output shape ("AnalysisResult JSON shape").
#[derive(Debug, Serialize)]
pub struct AnalysisResult {
    pub normalized_code: String,
    pub algorithm_kind: String,
    pub big_o: String,
    pub big_omega: String,
    pub theta: Option<String>,
    pub method_used: String,
    pub ir_worst: Ir,
    pub ir_best: Ir,
    pub ir_avg: Ir,
    pub lines: Vec<LineCost>,
    pub summations: Summations,
    pub strong_bounds: Option<StrongBounds>,
    pub recurrence_equation: Option<String>,
    pub execution_trace: Option<ExecutionTrace>,
    pub notes: Vec<String>,
}

/// Run the engine over an already-parsed (and ideally semantically-checked)
/// program. Picks the recursive path for the first self-calling procedure
/// it finds, otherwise walks the implicit main program (or, lacking one,
/// the first declared procedure) iteratively.
pub fn analyze(ast: &Program, options: &AnalysisOptions) -> AnalysisResult {
    let mut notes = Vec::new();
    let depth = ast.max_depth();
    if depth > options.max_ast_depth {
        notes.push(format!(
            "AST depth {} exceeds the configured bound of {}; analysis may be partial",
            depth, options.max_ast_depth
        ));
    }
    let normalized_code = printer::render(ast);

    if let Some(proc) = ast.procs().find(|p| p.is_recursive()) {
        return analyze_recursive_target(proc, ast, normalized_code, notes);
    }

    let stmts: Vec<&Stmt> = if !ast.main_stmts().is_empty() {
        ast.main_stmts()
    } else if let Some(proc) = ast.procs().next() {
        proc.body.stmts.iter().collect()
    } else {
        Vec::new()
    };
    analyze_iterative_target(&stmts, normalized_code, notes)
}

/// Convenience chain: `parse → semantic → analyze`. Parse failures
/// never panic or propagate an `Err` across this boundary; they come
/// back as a best-effort result whose `notes` carry the parse errors.
pub fn analyze_full(text: &str, options: &AnalysisOptions) -> AnalysisResult {
    let parsed = parser::parse(text);
    let ast = match parsed.ast {
        Some(ast) => ast,
        None => return parse_failure_result(text, &parsed.errors),
    };
    let checked = semantic::check(ast);
    let mut result = analyze(&checked.program, options);
    for issue in &checked.issues {
        result.notes.push(format!("line {}: {}", issue.line, issue.message));
    }
    result
}

fn parse_failure_result(text: &str, errors: &[ParseError]) -> AnalysisResult {
    AnalysisResult {
        normalized_code: text.to_string(),
        algorithm_kind: "iterative".to_string(),
        big_o: "unknown".to_string(),
        big_omega: "unknown".to_string(),
        theta: None,
        method_used: "parse_error".to_string(),
        ir_worst: Ir::sym("unknown"),
        ir_best: Ir::sym("unknown"),
        ir_avg: Ir::sym("unknown"),
        lines: Vec::new(),
        summations: empty_summations(),
        strong_bounds: None,
        recurrence_equation: None,
        execution_trace: None,
        notes: errors.iter().map(|e| e.to_string()).collect(),
    }
}

fn empty_summations() -> Summations {
    use iterative::SummationText;
    let zero = SummationText {
        latex: "0".to_string(),
        text: "0".to_string(),
    };
    Summations {
        worst: zero.clone(),
        best: zero.clone(),
        avg: zero,
    }
}

fn analyze_iterative_target(stmts: &[&Stmt], normalized_code: String, mut notes: Vec<String>) -> AnalysisResult {
    let cost = iterative::analyze_stmts(stmts, &CostCtx::default());
    notes.extend(cost.notes.clone());

    let big_o = iterative::big_o_of(&cost.ir_worst);
    let big_omega = iterative::big_o_of(&cost.ir_best);
    let theta = if big_o == big_omega { Some(big_o.clone()) } else { None };

    AnalysisResult {
        normalized_code,
        algorithm_kind: "iterative".to_string(),
        big_o,
        big_omega,
        theta,
        method_used: "summation".to_string(),
        ir_worst: cost.ir_worst,
        ir_best: cost.ir_best,
        ir_avg: cost.ir_avg,
        lines: cost.lines,
        summations: cost.summations,
        strong_bounds: cost.strong_bounds,
        recurrence_equation: None,
        execution_trace: Some(trace::simulate(stmts)),
        notes,
    }
}

fn analyze_recursive_target(
    proc: &Proc,
    program: &Program,
    normalized_code: String,
    mut notes: Vec<String>,
) -> AnalysisResult {
    // `proc.is_recursive()` guaranteed at least one self-call above, so
    // `analyze_recursive` cannot return `None` here.
    let result = recursive::analyze_recursive(proc, program)
        .expect("proc was selected for having a self-call");
    notes.extend(result.notes.clone());

    let mut ctx = CostCtx::default();
    ctx.zero_calls.insert(proc.name.clone());
    let stmts: Vec<&Stmt> = proc.body.stmts.iter().collect();
    let cost = iterative::analyze_stmts(&stmts, &ctx);
    notes.extend(cost.notes.clone());

    AnalysisResult {
        normalized_code,
        algorithm_kind: "recursive".to_string(),
        ir_worst: closed_form_ir(&result.big_o),
        ir_best: closed_form_ir(&result.big_omega),
        ir_avg: closed_form_ir(result.theta.as_deref().unwrap_or(&result.big_o)),
        big_o: result.big_o,
        big_omega: result.big_omega,
        theta: result.theta,
        method_used: result.method_used.to_string(),
        lines: cost.lines,
        summations: cost.summations,
        // A recursion's closed form is rarely a plain polynomial in one
        // symbol (scenario 6: "strong_bounds is omitted"); the iterative
        // notion of a strong bound doesn't apply to a solved recurrence.
        strong_bounds: None,
        recurrence_equation: Some(result.recurrence_equation),
        execution_trace: None,
        notes,
    }
}

/// Render one of the fixed `big_o`/`big_omega`/`theta` display strings the
/// recursive analyzer produces (invariant 7's closed set) back into an
/// `Ir` node, so `ir_worst`/`ir_best`/`ir_avg` stay populated even though
/// the recursive path solves a recurrence rather than walking the AST.
fn closed_form_ir(display: &str) -> Ir {
    match display {
        "1" => Ir::one(),
        "n" => Ir::sym("n"),
        "log(n)" => Ir::log(2, Ir::sym("n")),
        "n*log(n)" => Ir::prod(vec![Ir::sym("n"), Ir::log(2, Ir::sym("n"))]),
        "2^n" => Ir::pow(Ir::int(2), Exponent::sym("n")),
        "phi^n" => Ir::pow(Ir::sym("phi"), Exponent::sym("n")),
        "unknown" => Ir::sym("unknown"),
        other if other.starts_with("n^") => match other[2..].parse::<i64>() {
            Ok(k) => Ir::pow(Ir::sym("n"), Exponent::r(Rational::from_int(k))),
            Err(_) => Ir::sym(other.to_string()),
        },
        other => Ir::sym(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> AnalysisResult {
        analyze_full(source, &AnalysisOptions::default())
    }

    #[test]
    fn linear_scan_resolves_to_n_via_summation() {
        let result = run("begin s<-0  for i<-1 to n do begin s<-s+i end end");
        assert_eq!(result.algorithm_kind, "iterative");
        assert_eq!(result.big_o, "n");
        assert_eq!(result.method_used, "summation");
        assert_eq!(result.lines.len(), 3);
        let trace = result.execution_trace.unwrap();
        assert_eq!(trace.total_iterations, 5);
        let bounds = result.strong_bounds.unwrap();
        assert_eq!(bounds.dominant_term, "n");
    }

    #[test]
    fn nested_scan_resolves_to_n_squared() {
        let result = run("begin for i<-1 to n do begin for j<-1 to n do begin x<-1 end end end");
        assert_eq!(result.big_o, "n^2");
        let bounds = result.strong_bounds.unwrap();
        assert_eq!(bounds.dominant_term, "n^2");
    }

    #[test]
    fn halving_while_resolves_to_log_n() {
        let result = run("begin i<-n  while (i>1) do begin i<-i div 2 end end");
        assert_eq!(result.big_o, "log(n)");
    }

    #[test]
    fn factorial_dispatches_to_recursive_path() {
        let result = run(
            "Fact(n) begin if (n<=1) then begin return 1 end else begin return n*Fact(n-1) end end",
        );
        assert_eq!(result.algorithm_kind, "recursive");
        assert_eq!(result.big_o, "n");
        assert_eq!(result.method_used, "iteration_method");
        assert!(result.strong_bounds.is_none());
    }

    #[test]
    fn fibonacci_dispatches_to_characteristic_equation() {
        let result = run(
            "Fib(n) begin if (n<=1) then begin return n end else begin return Fib(n-1)+Fib(n-2) end end",
        );
        assert_eq!(result.big_o, "2^n");
        assert_eq!(result.method_used, "characteristic_equation");
    }

    #[test]
    fn merge_sort_dispatches_to_master_theorem() {
        let result = run(
            "Merge(A, lo, mid, hi) begin for k<-lo to hi do begin x<-1 end end \
             MergeSort(A, lo, hi) begin if (lo<hi) then begin m<-(lo+hi) div 2  CALL MergeSort(A, lo, m)  CALL MergeSort(A, m+1, hi)  CALL Merge(A, lo, m, hi) end end",
        );
        assert_eq!(result.big_o, "n*log(n)");
        assert_eq!(result.method_used, "master_theorem");
        assert!(result.strong_bounds.is_none());
        let equation = result.recurrence_equation.unwrap();
        assert!(equation.contains("2T(n/2)"));
        assert!(equation.contains("+ Θ(n)"));
    }

    #[test]
    fn parse_failure_reports_notes_instead_of_panicking() {
        let result = run("begin s<-0");
        assert_eq!(result.method_used, "parse_error");
        assert!(!result.notes.is_empty());
    }
}
