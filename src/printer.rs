//! Renders an AST back to pseudocode text (invariant 5: round-trip modulo
//! whitespace and comments). Used for `AnalysisResult.normalized_code`.

use crate::ast::*;
use std::fmt::Write as _;

pub fn render(program: &Program) -> String {
    let mut out = String::new();
    for item in &program.body {
        render_item(item, 0, &mut out);
    }
    out
}

fn indent(level: usize, out: &mut String) {
    for _ in 0..level {
        out.push_str("    ");
    }
}

fn render_item(item: &Item, level: usize, out: &mut String) {
    match item {
        Item::Class(c) => {
            indent(level, out);
            let _ = writeln!(out, "class {} begin", c.name);
            for attr in &c.attributes {
                indent(level + 1, out);
                let _ = writeln!(out, "{}", attr);
            }
            indent(level, out);
            let _ = writeln!(out, "end");
        }
        Item::Proc(p) => {
            indent(level, out);
            let params = p
                .params
                .iter()
                .map(|param| match &param.slice {
                    Some((lo, hi)) => format!("{}[{}..{}]", param.name, lo, hi),
                    None => param.name.clone(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "{}({})", p.name, params);
            render_block(&p.body, level, out);
        }
        Item::Stmt(s) => render_stmt(s, level, out),
    }
}

fn render_block(block: &Block, level: usize, out: &mut String) {
    indent(level, out);
    let _ = writeln!(out, "begin");
    for stmt in &block.stmts {
        render_stmt(stmt, level + 1, out);
    }
    indent(level, out);
    let _ = writeln!(out, "end");
}

fn render_stmt(stmt: &Stmt, level: usize, out: &mut String) {
    match stmt {
        Stmt::Assign { target, expr, .. } => {
            indent(level, out);
            let _ = writeln!(out, "{} <- {}", target, expr);
        }
        Stmt::For {
            var,
            start,
            end,
            step,
            body,
            ..
        } => {
            indent(level, out);
            match step {
                Some(s) => {
                    let _ = writeln!(out, "for {} <- {} to {} step {} do", var, start, end, s);
                }
                None => {
                    let _ = writeln!(out, "for {} <- {} to {} do", var, start, end);
                }
            }
            render_block(body, level, out);
        }
        Stmt::While { cond, body, .. } => {
            indent(level, out);
            let _ = writeln!(out, "while ({}) do", cond);
            render_block(body, level, out);
        }
        Stmt::Repeat { body, until, .. } => {
            indent(level, out);
            let _ = writeln!(out, "repeat");
            for s in body {
                render_stmt(s, level + 1, out);
            }
            indent(level, out);
            let _ = writeln!(out, "until ({})", until);
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            indent(level, out);
            let _ = writeln!(out, "if ({}) then", cond);
            render_block(then_branch, level, out);
            if let Some(else_b) = else_branch {
                indent(level, out);
                let _ = writeln!(out, "else");
                render_block(else_b, level, out);
            }
        }
        Stmt::Call { name, args, .. } => {
            indent(level, out);
            let a = args.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ");
            let _ = writeln!(out, "CALL {}({})", name, a);
        }
        Stmt::Return { expr, .. } => {
            indent(level, out);
            match expr {
                Some(e) => {
                    let _ = writeln!(out, "return {}", e);
                }
                None => {
                    let _ = writeln!(out, "return");
                }
            }
        }
        Stmt::ExprStmt { expr, .. } => {
            indent(level, out);
            let _ = writeln!(out, "{}", expr);
        }
        Stmt::ObjectDecl {
            class_name,
            var_name,
            ..
        } => {
            indent(level, out);
            let _ = writeln!(out, "{} {}", class_name, var_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn renders_for_loop_with_begin_end() {
        let result = parse("begin for i<-1 to n do begin x<-1 end end");
        let program = result.ast.unwrap();
        let rendered = render(&program);
        assert!(rendered.contains("for i <- 1 to n do"));
        assert!(rendered.contains("begin"));
        assert!(rendered.contains("end"));
    }

    #[test]
    fn round_trip_preserves_statement_count() {
        let source = "begin s<-0  for i<-1 to n do begin s<-s+i end end";
        let program = parse(source).ast.unwrap();
        let rendered = render(&program);
        let reparsed = parse(&rendered).ast.unwrap();
        assert_eq!(program.main_stmts().len(), reparsed.main_stmts().len());
    }
}
