//! Iterative cost accumulator: walks the AST producing per-line
//! worst/best/average costs, a closed-form summation per case, and a
//! strong polynomial bound when one can be extracted.

use crate::ast::*;
use crate::ir::{self, Exponent, Ir, Simplifier};
use crate::rational::Rational;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// External calls this walk should treat specially: zeroed out (the
/// recursive analyzer subtracts a procedure's own self-calls while
/// computing `f(n)`) or resolved to a known helper's asymptotic cost.
#[derive(Default)]
pub struct CostCtx {
    pub zero_calls: BTreeSet<String>,
    pub helper_costs: HashMap<String, Ir>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineCost {
    pub line: usize,
    pub kind: String,
    pub multiplier: Ir,
    pub cost_worst: Ir,
    pub cost_best: Ir,
    pub cost_avg: Ir,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrongBoundsTerm {
    pub expr: String,
    pub degree: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrongBounds {
    pub formula: String,
    pub terms: Vec<StrongBoundsTerm>,
    pub dominant_term: String,
    pub constant: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummationText {
    pub latex: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summations {
    pub worst: SummationText,
    pub best: SummationText,
    pub avg: SummationText,
}

pub struct ProgramCost {
    pub ir_worst: Ir,
    pub ir_best: Ir,
    pub ir_avg: Ir,
    pub lines: Vec<LineCost>,
    pub summations: Summations,
    pub strong_bounds: Option<StrongBounds>,
    pub notes: Vec<String>,
}

/// Walk a sequence of statements (the implicit main program, or a
/// procedure body) and accumulate its total cost.
pub fn analyze_stmts(stmts: &[&Stmt], ctx: &CostCtx) -> ProgramCost {
    let mut lines = Vec::new();
    let mut notes = Vec::new();
    let mut env: HashMap<String, Ir> = HashMap::new();
    let mut worst_terms = Vec::new();
    let mut best_terms = Vec::new();
    let mut avg_terms = Vec::new();
    let one = Ir::one();
    for stmt in stmts {
        let (w, b, a) = cost_stmt(stmt, &one, &mut env, &mut lines, &mut notes, ctx);
        worst_terms.push(w);
        best_terms.push(b);
        avg_terms.push(a);
    }
    let mut simplifier = Simplifier::default();
    let ir_worst = simplifier.simplify(&Ir::sum(worst_terms));
    let ir_best = simplifier.simplify(&Ir::sum(best_terms));
    let ir_avg = simplifier.simplify(&Ir::sum(avg_terms));
    if simplifier.exceeded() {
        notes.push("simplification step budget exceeded; result may be partial".to_string());
    }

    let strong_bounds = strong_bounds_of(&ir_worst);
    let summations = build_summations(stmts);

    ProgramCost {
        ir_worst,
        ir_best,
        ir_avg,
        lines,
        summations,
        strong_bounds,
        notes,
    }
}

fn cost_block(
    block: &Block,
    multiplier: &Ir,
    env: &mut HashMap<String, Ir>,
    lines: &mut Vec<LineCost>,
    notes: &mut Vec<String>,
    ctx: &CostCtx,
) -> (Ir, Ir, Ir) {
    let mut worst = Vec::new();
    let mut best = Vec::new();
    let mut avg = Vec::new();
    for stmt in &block.stmts {
        let (w, b, a) = cost_stmt(stmt, multiplier, env, lines, notes, ctx);
        worst.push(w);
        best.push(b);
        avg.push(a);
    }
    (Ir::sum(worst), Ir::sum(best), Ir::sum(avg))
}

fn cost_stmt(
    stmt: &Stmt,
    multiplier: &Ir,
    env: &mut HashMap<String, Ir>,
    lines: &mut Vec<LineCost>,
    notes: &mut Vec<String>,
    ctx: &CostCtx,
) -> (Ir, Ir, Ir) {
    let mut simplifier = Simplifier::default();
    let (worst, best, avg) = match stmt {
        Stmt::Assign { target, expr, .. } => {
            if let LValue::Var { name } = target {
                env.insert(name.clone(), expr_to_size_ir(expr, env));
            }
            (Ir::one(), Ir::one(), Ir::one())
        }
        Stmt::Call { name, .. } => {
            if ctx.zero_calls.contains(name) {
                (Ir::zero(), Ir::zero(), Ir::zero())
            } else if let Some(helper) = ctx.helper_costs.get(name) {
                (helper.clone(), helper.clone(), helper.clone())
            } else {
                (Ir::one(), Ir::one(), Ir::one())
            }
        }
        Stmt::Return { .. } => (Ir::one(), Ir::one(), Ir::one()),
        Stmt::ExprStmt { .. } | Stmt::ObjectDecl { .. } => (Ir::zero(), Ir::zero(), Ir::zero()),
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            let (tw, tb, ta) = cost_block(then_branch, multiplier, env, lines, notes, ctx);
            let (worst, best, avg) = if let Some(else_b) = else_branch {
                let (ew, eb, ea) = cost_block(else_b, multiplier, env, lines, notes, ctx);
                (
                    Ir::max(vec![tw, ew]),
                    Ir::min(vec![tb, eb]),
                    Ir::prod(vec![Ir::sum(vec![ta, ea]), Ir::k(Rational::new(1, 2))]),
                )
            } else {
                (tw, Ir::zero(), Ir::prod(vec![ta, Ir::k(Rational::new(1, 2))]))
            };
            (
                Ir::sum(vec![Ir::one(), worst]),
                Ir::sum(vec![Ir::one(), best]),
                Ir::sum(vec![Ir::one(), avg]),
            )
        }
        Stmt::For {
            var,
            start,
            end,
            step,
            inclusive,
            body,
            span,
        } => {
            let n = for_trip_count(start, end, step.as_ref(), *inclusive, env);
            let n = simplifier.simplify(&n);
            env.insert(var.clone(), expr_to_size_ir(end, env));
            let child_mult = simplifier.simplify(&Ir::prod(vec![multiplier.clone(), n.clone()]));
            lines.push(LineCost {
                line: span.map(|s| s.line).unwrap_or(0),
                kind: stmt.kind_tag().to_string(),
                multiplier: multiplier.clone(),
                cost_worst: Ir::one(),
                cost_best: Ir::one(),
                cost_avg: Ir::one(),
            });
            let (bw, bb, ba) = cost_block(body, &child_mult, env, lines, notes, ctx);
            (
                Ir::prod(vec![n.clone(), bw]),
                Ir::prod(vec![n.clone(), bb]),
                Ir::prod(vec![n, ba]),
            )
        }
        Stmt::While { cond, body, span } => {
            let (n_worst, n_best, note) = while_trip_count(cond, body, env);
            if let Some(n) = note {
                notes.push(n);
            }
            let n_worst = simplifier.simplify(&n_worst);
            let n_best = simplifier.simplify(&n_best);
            let child_mult = simplifier.simplify(&Ir::prod(vec![multiplier.clone(), n_worst.clone()]));
            lines.push(LineCost {
                line: span.map(|s| s.line).unwrap_or(0),
                kind: stmt.kind_tag().to_string(),
                multiplier: multiplier.clone(),
                cost_worst: Ir::one(),
                cost_best: Ir::one(),
                cost_avg: Ir::one(),
            });
            let (bw, bb, ba) = cost_block(body, &child_mult, env, lines, notes, ctx);
            (
                Ir::prod(vec![n_worst.clone(), bw]),
                Ir::prod(vec![n_best, bb]),
                Ir::prod(vec![n_worst, ba]),
            )
        }
        Stmt::Repeat { body, until, span } => {
            let fake_block = Block::new(body.clone());
            let (n_worst, n_best, note) = while_trip_count(until, &fake_block, env);
            if let Some(n) = note {
                notes.push(n);
            }
            let n_worst = simplifier.simplify(&Ir::max(vec![n_worst, Ir::one()]));
            let n_best = simplifier.simplify(&Ir::max(vec![n_best, Ir::one()]));
            let child_mult = simplifier.simplify(&Ir::prod(vec![multiplier.clone(), n_worst.clone()]));
            lines.push(LineCost {
                line: span.map(|s| s.line).unwrap_or(0),
                kind: stmt.kind_tag().to_string(),
                multiplier: multiplier.clone(),
                cost_worst: Ir::one(),
                cost_best: Ir::one(),
                cost_avg: Ir::one(),
            });
            let mut worst = Vec::new();
            let mut best = Vec::new();
            let mut avg = Vec::new();
            for s in body {
                let (w, b, a) = cost_stmt(s, &child_mult, env, lines, notes, ctx);
                worst.push(w);
                best.push(b);
                avg.push(a);
            }
            (
                Ir::prod(vec![n_worst.clone(), Ir::sum(worst)]),
                Ir::prod(vec![n_best, Ir::sum(best)]),
                Ir::prod(vec![n_worst, Ir::sum(avg)]),
            )
        }
    };

    if !matches!(stmt, Stmt::For { .. } | Stmt::While { .. } | Stmt::Repeat { .. }) {
        lines.push(LineCost {
            line: stmt.line(),
            kind: stmt.kind_tag().to_string(),
            multiplier: multiplier.clone(),
            cost_worst: simplifier.simplify(&worst),
            cost_best: simplifier.simplify(&best),
            cost_avg: simplifier.simplify(&avg),
        });
    }

    (worst, best, avg)
}

/// Convert an expression to a size-domain IR value (not a cost — a value,
/// used for trip-count arithmetic such as `end - start`).
fn expr_to_size_ir(expr: &Expr, env: &HashMap<String, Ir>) -> Ir {
    match expr {
        Expr::Num { value } => Ir::int(*value),
        Expr::Var { name } => env.get(name).cloned().unwrap_or_else(|| Ir::sym(name.clone())),
        Expr::Unary { op: UnaryOp::Neg, expr } => {
            Ir::prod(vec![Ir::int(-1), expr_to_size_ir(expr, env)])
        }
        Expr::Bin { op, lhs, rhs } => {
            let l = expr_to_size_ir(lhs, env);
            let r = expr_to_size_ir(rhs, env);
            match op {
                BinOp::Add => Ir::sum(vec![l, r]),
                BinOp::Sub => Ir::sum(vec![l, Ir::prod(vec![Ir::int(-1), r])]),
                BinOp::Mul => Ir::prod(vec![l, r]),
                BinOp::Div | BinOp::DivInt => {
                    if let Some(k) = r.as_const().and_then(|k| k.as_i64()) {
                        if k != 0 {
                            return Ir::prod(vec![l, Ir::k(Rational::new(1, k))]);
                        }
                    }
                    l
                }
                _ => l,
            }
        }
        Expr::Ceil { expr } | Expr::Floor { expr } => expr_to_size_ir(expr, env),
        _ => Ir::sym("?"),
    }
}

fn eval_const_int(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::Num { value } => Some(*value),
        Expr::Unary { op: UnaryOp::Neg, expr } => eval_const_int(expr).map(|v| -v),
        Expr::Bin { op, lhs, rhs } => {
            let l = eval_const_int(lhs)?;
            let r = eval_const_int(rhs)?;
            match op {
                BinOp::Add => Some(l + r),
                BinOp::Sub => Some(l - r),
                BinOp::Mul => Some(l * r),
                BinOp::Div | BinOp::DivInt if r != 0 => Some(l / r),
                _ => None,
            }
        }
        _ => None,
    }
}

fn for_trip_count(
    start: &Expr,
    end: &Expr,
    step: Option<&Expr>,
    inclusive: bool,
    env: &HashMap<String, Ir>,
) -> Ir {
    let start_ir = expr_to_size_ir(start, env);
    let end_ir = expr_to_size_ir(end, env);
    let step_val = step.and_then(eval_const_int).unwrap_or(1).max(1);
    let diff = Ir::sum(vec![end_ir, Ir::prod(vec![Ir::int(-1), start_ir])]);
    let mut n = if step_val == 1 {
        diff
    } else {
        Ir::prod(vec![diff, Ir::k(Rational::new(1, step_val))])
    };
    if inclusive {
        n = Ir::sum(vec![n, Ir::one()]);
    }
    n
}

/// Find the bare variable name on one side of a relational condition,
/// treated as the loop's governing variable.
pub(crate) fn governing_var(cond: &Expr) -> Option<String> {
    match cond {
        Expr::Bin { op, lhs, rhs } if op.is_relational() => {
            if let Expr::Var { name } = lhs.as_ref() {
                return Some(name.clone());
            }
            if let Expr::Var { name } = rhs.as_ref() {
                return Some(name.clone());
            }
            None
        }
        _ => None,
    }
}

/// Does `body` contain `governing <- governing / k` (or `div`, or
/// `Floor(governing / k)`) for a constant `k >= 2`?
pub(crate) fn find_halving_divisor(body: &Block, governing: &str) -> Option<i64> {
    for stmt in &body.stmts {
        if let Stmt::Assign { target: LValue::Var { name }, expr, .. } = stmt {
            if name != governing {
                continue;
            }
            let inner = match expr {
                Expr::Floor { expr } => expr.as_ref(),
                other => other,
            };
            if let Expr::Bin { op: BinOp::Div | BinOp::DivInt, lhs, rhs } = inner {
                if matches!(lhs.as_ref(), Expr::Var { name } if name == governing) {
                    if let Some(k) = eval_const_int(rhs) {
                        if k >= 2 {
                            return Some(k);
                        }
                    }
                }
            }
        }
    }
    None
}

/// Does `body` contain `governing <- governing - c` for a constant `c >= 1`?
fn find_linear_decrement(body: &Block, governing: &str) -> Option<i64> {
    for stmt in &body.stmts {
        if let Stmt::Assign { target: LValue::Var { name }, expr, .. } = stmt {
            if name != governing {
                continue;
            }
            if let Expr::Bin { op: BinOp::Sub, lhs, rhs } = expr {
                if matches!(lhs.as_ref(), Expr::Var { name } if name == governing) {
                    if let Some(c) = eval_const_int(rhs) {
                        if c >= 1 {
                            return Some(c);
                        }
                    }
                }
            }
        }
    }
    None
}

/// Trip count for a `While`/`Repeat` loop: `(worst, best, note)`.
fn while_trip_count(cond: &Expr, body: &Block, env: &HashMap<String, Ir>) -> (Ir, Ir, Option<String>) {
    let Some(governing) = governing_var(cond) else {
        return (Ir::sym("n"), Ir::one(), Some("loop condition has no recognizable governing variable".to_string()));
    };
    let initial = env.get(&governing).cloned().unwrap_or_else(|| Ir::sym(governing.clone()));

    if let Some(k) = find_halving_divisor(body, &governing) {
        let n = Ir::log(k as u64, initial);
        return (n.clone(), n, None);
    }
    if let Some(c) = find_linear_decrement(body, &governing) {
        let n = Ir::prod(vec![initial, Ir::k(Rational::new(1, c))]);
        return (n.clone(), n, None);
    }
    (
        initial,
        Ir::one(),
        Some(format!(
            "loop on `{}` has no recognizable halving or decrement pattern; using a conservative bound",
            governing
        )),
    )
}

/// Collect every symbol name referenced in an IR value.
fn collect_symbols(ir: &Ir, out: &mut BTreeSet<String>) {
    match ir {
        Ir::K { .. } => {}
        Ir::Sym { name } => {
            out.insert(name.clone());
        }
        Ir::Sum { terms } => terms.iter().for_each(|t| collect_symbols(t, out)),
        Ir::Prod { factors } => factors.iter().for_each(|f| collect_symbols(f, out)),
        Ir::Pow { base, exponent } => {
            collect_symbols(base, out);
            if let Exponent::Sym { name } = exponent {
                out.insert(name.clone());
            }
        }
        Ir::Log { arg, .. } => collect_symbols(arg, out),
        Ir::Max { alts } | Ir::Min { alts } => alts.iter().for_each(|a| collect_symbols(a, out)),
        Ir::Piecewise { cases } => cases.iter().for_each(|(_, v)| collect_symbols(v, out)),
    }
}

fn strong_bounds_of(ir_worst: &Ir) -> Option<StrongBounds> {
    let mut symbols = BTreeSet::new();
    collect_symbols(ir_worst, &mut symbols);
    if symbols.len() != 1 {
        return None;
    }
    let symbol = symbols.into_iter().next().unwrap();
    let poly = ir::polynomial_form(ir_worst, &symbol)?;
    let terms = poly
        .coefficients
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_zero())
        .map(|(degree, coeff)| StrongBoundsTerm {
            expr: if degree == 0 {
                format!("{}", coeff)
            } else if degree == 1 {
                format!("{}*{}", coeff, symbol)
            } else {
                format!("{}*{}^{}", coeff, symbol, degree)
            },
            degree,
        })
        .collect();
    Some(StrongBounds {
        formula: poly.formula(&symbol),
        terms,
        dominant_term: ir::pretty_ascii(&poly.dominant_term_ir(&symbol)),
        constant: format!("{}", poly.constant_term()),
    })
}

/// A deliberately simplified summation renderer: one term per
/// top-level statement, loops rendered as `∑` over their index variable.
fn build_summations(stmts: &[&Stmt]) -> Summations {
    let mut latex_parts = Vec::new();
    let mut text_parts = Vec::new();
    for stmt in stmts {
        summation_piece(stmt, &mut latex_parts, &mut text_parts);
    }
    let join = |parts: &[String]| {
        if parts.is_empty() {
            "0".to_string()
        } else {
            parts.join(" + ")
        }
    };
    let text = SummationText {
        latex: join(&latex_parts),
        text: join(&text_parts),
    };
    Summations {
        worst: text.clone(),
        best: text.clone(),
        avg: text,
    }
}

fn summation_piece(stmt: &Stmt, latex: &mut Vec<String>, text: &mut Vec<String>) {
    match stmt {
        Stmt::For { var, start, end, body, .. } => {
            let inner_latex = body
                .stmts
                .iter()
                .map(|s| {
                    let mut l = Vec::new();
                    let mut t = Vec::new();
                    summation_piece(s, &mut l, &mut t);
                    (l.join(" + "), t.join(" + "))
                })
                .fold((String::new(), String::new()), |(al, at), (l, t)| {
                    if al.is_empty() {
                        (l, t)
                    } else {
                        (format!("{} + {}", al, l), format!("{} + {}", at, t))
                    }
                });
            latex.push(format!(
                "\\sum_{{{}={}}}^{{{}}} {}",
                var,
                start,
                end,
                if inner_latex.0.is_empty() { "1".to_string() } else { inner_latex.0 }
            ));
            text.push(format!(
                "sum_{{{}={}..{}}} {}",
                var,
                start,
                end,
                if inner_latex.1.is_empty() { "1".to_string() } else { inner_latex.1 }
            ));
        }
        Stmt::While { .. } | Stmt::Repeat { .. } => {
            latex.push("\\sum_{k=1}^{T} 1".to_string());
            text.push("sum_{k=1..T} 1".to_string());
        }
        Stmt::If { .. } => {
            latex.push("\\max(\\ldots)".to_string());
            text.push("max(then, else)".to_string());
        }
        Stmt::ExprStmt { .. } | Stmt::ObjectDecl { .. } => {}
        _ => {
            latex.push("1".to_string());
            text.push("1".to_string());
        }
    }
}

/// Worst-case dominant asymptotic complexity of `ir`, as a big-O display
/// string ("Final big-O ... converted to display form").
pub fn big_o_of(ir: &Ir) -> String {
    ir::big_o_string(&ir::dominant_term(ir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Cmp;
    use crate::parser::parse;
    use crate::semantic::check;

    fn run(source: &str) -> ProgramCost {
        let parsed = parse(source).ast.unwrap();
        let checked = check(parsed).program;
        let stmts = checked.main_stmts();
        analyze_stmts(&stmts, &CostCtx::default())
    }

    #[test]
    fn simple_loop_is_linear() {
        let cost = run("begin s<-0  for i<-1 to n do begin s<-s+i end end");
        assert_eq!(big_o_of(&cost.ir_worst), "n");
        assert_eq!(cost.lines.len(), 3);
    }

    #[test]
    fn nested_loop_is_quadratic() {
        let cost = run("begin for i<-1 to n do begin for j<-1 to n do begin x<-1 end end end");
        assert_eq!(big_o_of(&cost.ir_worst), "n^2");
    }

    #[test]
    fn halving_while_is_logarithmic() {
        let cost = run("begin i<-n  while (i>1) do begin i<-i div 2 end end");
        assert_eq!(big_o_of(&cost.ir_worst), "log(n)");
    }

    #[test]
    fn strong_bounds_reports_dominant_term_for_linear_loop() {
        let cost = run("begin s<-0  for i<-1 to n do begin s<-s+i end end");
        let bounds = cost.strong_bounds.expect("expected a polynomial bound");
        assert_eq!(bounds.dominant_term, "n");
    }

    #[test]
    fn if_best_cost_never_exceeds_worst() {
        let cost = run(
            "begin if (n>1) then begin for i<-1 to n do begin x<-1 end end else begin x<-1 end end",
        );
        assert_eq!(ir::cmp(&cost.ir_best, &cost.ir_worst), Cmp::Less);
    }
}
