//! Execution-trace simulator: a symbolic run over a small fixed `n`,
//! not a general interpreter. Recognizes three shapes structurally — a
//! single `for`, a `for` nesting another `for`, and a halving `while`/
//! `repeat` — and produces a step-by-step trace for each. Anything else
//! falls back to a single-note trace (`UnrecognizedPattern`).

use crate::analyzer::iterative::{find_halving_divisor, governing_var};
use crate::ast::Stmt;
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_N_LINEAR: i64 = 5;
pub const DEFAULT_N_HALVING: i64 = 16;

#[derive(Debug, Clone, Serialize)]
pub struct TraceStep {
    pub step: usize,
    pub line: usize,
    pub kind: String,
    pub condition: String,
    pub variables: BTreeMap<String, String>,
    pub operation: String,
    pub cost: String,
    pub cumulative_cost: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionTrace {
    pub steps: Vec<TraceStep>,
    pub total_iterations: usize,
    pub max_depth: usize,
    pub variables_tracked: Vec<String>,
    pub complexity_formula: String,
    pub description: String,
}

/// Find the first top-level `For`/`While`/`Repeat` statement, the anchor the
/// simulator classifies a shape against.
fn find_anchor<'a>(stmts: &[&'a Stmt]) -> Option<&'a Stmt> {
    stmts
        .iter()
        .copied()
        .find(|s| matches!(s, Stmt::For { .. } | Stmt::While { .. } | Stmt::Repeat { .. }))
}

pub fn simulate(stmts: &[&Stmt]) -> ExecutionTrace {
    match find_anchor(stmts) {
        Some(Stmt::For { var, body, span, .. }) => {
            if let Some(inner) = body.stmts.iter().find(|s| matches!(s, Stmt::For { .. })) {
                if let Stmt::For {
                    var: inner_var,
                    span: inner_span,
                    ..
                } = inner
                {
                    return nested_for_trace(
                        var,
                        span.map(|s| s.line).unwrap_or(0),
                        inner_var,
                        inner_span.map(|s| s.line).unwrap_or(0),
                    );
                }
            }
            simple_for_trace(var, span.map(|s| s.line).unwrap_or(0))
        }
        Some(Stmt::While { cond, body, span }) => {
            halving_trace(cond, body, span.map(|s| s.line).unwrap_or(0))
        }
        Some(Stmt::Repeat { until, body, span }) => {
            let fake = crate::ast::Block::new(body.clone());
            halving_trace(until, &fake, span.map(|s| s.line).unwrap_or(0))
        }
        _ => fallback_trace(),
    }
}

fn simple_for_trace(var: &str, line: usize) -> ExecutionTrace {
    let n = DEFAULT_N_LINEAR;
    let mut steps = Vec::new();
    let mut cumulative = 0i64;

    steps.push(TraceStep {
        step: 0,
        line,
        kind: "init".to_string(),
        condition: String::new(),
        variables: vars([("n", n.to_string()), (var, "-".to_string())]),
        operation: "execute initialization".to_string(),
        cost: "1".to_string(),
        cumulative_cost: "1".to_string(),
    });
    cumulative += 1;

    for i in 1..=n {
        cumulative += 1;
        steps.push(TraceStep {
            step: steps.len(),
            line,
            kind: "iteration".to_string(),
            condition: format!("{} \u{2264} {}", var, n),
            variables: vars([("n", n.to_string()), (var, i.to_string())]),
            operation: "execute body".to_string(),
            cost: "1".to_string(),
            cumulative_cost: cumulative.to_string(),
        });
    }

    ExecutionTrace {
        steps,
        total_iterations: n as usize,
        max_depth: 1,
        variables_tracked: vec!["n".to_string(), var.to_string()],
        complexity_formula: "O(n)".to_string(),
        description: format!("Linear scan over `{}` from 1 to n.", var),
    }
}

fn nested_for_trace(outer_var: &str, outer_line: usize, inner_var: &str, inner_line: usize) -> ExecutionTrace {
    let n = DEFAULT_N_LINEAR;
    let mut steps = Vec::new();
    let mut cumulative = 0i64;

    for i in 1..=n {
        steps.push(TraceStep {
            step: steps.len(),
            line: outer_line,
            kind: "iteration".to_string(),
            condition: format!("{} \u{2264} {}", outer_var, n),
            variables: vars([("n", n.to_string()), (outer_var, i.to_string())]),
            operation: "enter outer iteration".to_string(),
            cost: "0".to_string(),
            cumulative_cost: cumulative.to_string(),
        });
        for j in 1..=n {
            cumulative += 1;
            steps.push(TraceStep {
                step: steps.len(),
                line: inner_line,
                kind: "iteration".to_string(),
                condition: format!("{} \u{2264} {}", inner_var, n),
                variables: vars([("n", n.to_string()), (outer_var, i.to_string()), (inner_var, j.to_string())]),
                operation: "execute body".to_string(),
                cost: "1".to_string(),
                cumulative_cost: cumulative.to_string(),
            });
        }
    }

    ExecutionTrace {
        steps,
        total_iterations: (n * n) as usize,
        max_depth: 2,
        variables_tracked: vec!["n".to_string(), outer_var.to_string(), inner_var.to_string()],
        complexity_formula: "O(n^2)".to_string(),
        description: format!(
            "Nested scan: `{}` iterations of `{}`, each running `{}` iterations of `{}`.",
            n, outer_var, n, inner_var
        ),
    }
}

fn halving_trace(cond: &crate::ast::Expr, body: &crate::ast::Block, line: usize) -> ExecutionTrace {
    let Some(governing) = governing_var(cond) else {
        return fallback_trace();
    };
    let Some(k) = find_halving_divisor(body, &governing) else {
        return fallback_trace();
    };

    let n = DEFAULT_N_HALVING;
    let mut steps = Vec::new();
    let mut current = n;
    let mut iterations = 0usize;
    let mut cumulative = 0i64;

    while current > 1 {
        cumulative += 1;
        iterations += 1;
        let next = current / k;
        steps.push(TraceStep {
            step: steps.len(),
            line,
            kind: "iteration".to_string(),
            condition: format!("{} > 1", governing),
            variables: vars([("n", n.to_string()), (governing.as_str(), current.to_string())]),
            operation: format!("{} <- {} div {}", governing, governing, k),
            cost: "1".to_string(),
            cumulative_cost: cumulative.to_string(),
        });
        current = next;
    }

    ExecutionTrace {
        steps,
        total_iterations: iterations,
        max_depth: 1,
        variables_tracked: vec!["n".to_string(), governing],
        complexity_formula: "O(log n)".to_string(),
        description: format!("Repeated halving by {} until the range collapses to 1.", k),
    }
}

fn fallback_trace() -> ExecutionTrace {
    ExecutionTrace {
        steps: vec![TraceStep {
            step: 0,
            line: 0,
            kind: "note".to_string(),
            condition: String::new(),
            variables: BTreeMap::new(),
            operation: "pattern not recognized by the simulator".to_string(),
            cost: "unknown".to_string(),
            cumulative_cost: "unknown".to_string(),
        }],
        total_iterations: 0,
        max_depth: 0,
        variables_tracked: Vec::new(),
        complexity_formula: "unknown".to_string(),
        description: "Execution could not be simulated for this program shape.".to_string(),
    }
}

fn vars<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::semantic::check;

    fn trace_for(source: &str) -> ExecutionTrace {
        let program = check(parse(source).ast.unwrap()).program;
        let stmts = program.main_stmts();
        simulate(&stmts)
    }

    #[test]
    fn simple_loop_runs_default_n_iterations() {
        let trace = trace_for("begin s<-0  for i<-1 to n do begin s<-s+i end end");
        assert_eq!(trace.total_iterations, 5);
        assert_eq!(trace.max_depth, 1);
    }

    #[test]
    fn nested_loop_runs_n_squared_iterations() {
        let trace = trace_for("begin for i<-1 to n do begin for j<-1 to n do begin x<-1 end end end");
        assert_eq!(trace.total_iterations, 25);
        assert_eq!(trace.max_depth, 2);
    }

    #[test]
    fn halving_loop_runs_log_iterations() {
        let trace = trace_for("begin i<-n  while (i>1) do begin i<-i div 2 end end");
        assert_eq!(trace.total_iterations, 4);
        assert_eq!(trace.max_depth, 1);
    }

    #[test]
    fn unrecognized_pattern_falls_back_gracefully() {
        let trace = trace_for("begin x<-1 end");
        assert_eq!(trace.complexity_formula, "unknown");
        assert_eq!(trace.steps.len(), 1);
    }
}
