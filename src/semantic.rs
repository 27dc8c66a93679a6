//! Semantic pass: fills in defaults the parser leaves open and
//! collects non-fatal issues. Never rejects a program outright — a parsed
//! AST always comes out the other side, possibly with warnings attached.

use crate::ast::{Expr, Program, Stmt};
use serde::Serialize;

/// A non-fatal observation surfaced alongside an otherwise-valid program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub line: usize,
    pub message: String,
}

/// The result of [`analyze`](crate::semantic::check): the (possibly amended)
/// program plus whatever issues were raised while walking it.
pub struct CheckResult {
    pub program: Program,
    pub issues: Vec<Issue>,
}

/// Run the semantic pass over a freshly parsed program.
///
/// - `For` loops with no explicit `step` get the default step of 1.
/// - `While`/`If`/`Repeat` conditions that don't look boolean-typed at the
///   surface raise an issue but are otherwise left alone ("engine
///   does not reject; it raises an issue and proceeds").
/// - Empty loop bodies raise an issue since they usually indicate a
///   transcription mistake, not an intentional no-op.
pub fn check(mut program: Program) -> CheckResult {
    let mut issues = Vec::new();
    for item in &mut program.body {
        if let crate::ast::Item::Proc(proc) = item {
            walk_block(&mut proc.body, &mut issues);
        } else if let crate::ast::Item::Stmt(stmt) = item {
            walk_stmt(stmt, &mut issues);
        }
    }
    CheckResult { program, issues }
}

fn walk_block(block: &mut crate::ast::Block, issues: &mut Vec<Issue>) {
    if block.stmts.is_empty() {
        issues.push(Issue {
            line: 0,
            message: "empty block".to_string(),
        });
    }
    for stmt in &mut block.stmts {
        walk_stmt(stmt, issues);
    }
}

fn walk_stmt(stmt: &mut Stmt, issues: &mut Vec<Issue>) {
    match stmt {
        Stmt::For { step, body, .. } => {
            if step.is_none() {
                *step = Some(Expr::num(1));
            }
            walk_block(body, issues);
        }
        Stmt::While { cond, body, span } => {
            check_boolean(cond, span.map(|s| s.line).unwrap_or(0), issues);
            walk_block(body, issues);
        }
        Stmt::Repeat { body, until, span } => {
            check_boolean(until, span.map(|s| s.line).unwrap_or(0), issues);
            for s in body {
                walk_stmt(s, issues);
            }
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            span,
        } => {
            check_boolean(cond, span.map(|s| s.line).unwrap_or(0), issues);
            walk_block(then_branch, issues);
            if let Some(else_b) = else_branch {
                walk_block(else_b, issues);
            }
        }
        Stmt::Assign { .. }
        | Stmt::Call { .. }
        | Stmt::Return { .. }
        | Stmt::ExprStmt { .. }
        | Stmt::ObjectDecl { .. } => {}
    }
}

fn check_boolean(cond: &Expr, line: usize, issues: &mut Vec<Issue>) {
    if !cond.is_surface_boolean() {
        issues.push(Issue {
            line,
            message: format!("condition `{}` does not look boolean-typed", cond),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn defaults_missing_for_step_to_one() {
        let result = parse("begin for i<-1 to n do begin x<-1 end end");
        let checked = check(result.ast.unwrap());
        let stmt = checked.program.main_stmts()[0];
        if let Stmt::For { step, .. } = stmt {
            assert_eq!(*step, Some(Expr::num(1)));
        } else {
            panic!("expected a for statement");
        }
    }

    #[test]
    fn flags_non_boolean_while_condition_without_rejecting() {
        let result = parse("begin while (n) do begin n<-n-1 end end");
        let checked = check(result.ast.unwrap());
        assert!(checked.issues.iter().any(|i| i.message.contains("boolean")));
    }

    #[test]
    fn flags_empty_block() {
        let result = parse("begin while (n>0) do begin end end");
        let checked = check(result.ast.unwrap());
        assert!(checked.issues.iter().any(|i| i.message == "empty block"));
    }

    #[test]
    fn relational_condition_is_not_flagged() {
        let result = parse("begin while (n>0) do begin n<-n-1 end end");
        let checked = check(result.ast.unwrap());
        assert!(!checked.issues.iter().any(|i| i.message.contains("boolean")));
    }
}
