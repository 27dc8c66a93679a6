//! Abstract Syntax Tree for the pseudocode dialect.
//!
//! Every statement carries an optional source [`Span`]. The tree is a
//! strict tree — no parent pointers, no sharing — built once by the parser
//! and only ever touched afterwards by the semantic pass (filling in
//! defaults such as `For.step`).

use serde::Serialize;

/// A `(line, column)` source location, 1-indexed to match the parser's
/// error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Span { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    DivInt,
    Mod,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::DivInt => "div",
            BinOp::Mod => "mod",
            BinOp::Eq => "=",
            BinOp::Neq => "<>",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// An expression. Boolean literals are the uppercase `T`/`F` tokens;
/// lowercase `t`/`f` lex as ordinary identifiers (`Var`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Expr {
    Num { value: i64 },
    Bool { value: bool },
    Var { name: String },
    Index { base: Box<Expr>, indices: Vec<Expr> },
    Slice { base: Box<Expr>, lo: Box<Expr>, hi: Box<Expr> },
    Member { base: Box<Expr>, field: String },
    Unary { op: UnaryOp, expr: Box<Expr> },
    Bin { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Call { name: String, args: Vec<Expr> },
    Ceil { expr: Box<Expr> },
    Floor { expr: Box<Expr> },
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Expr {
        Expr::Var { name: name.into() }
    }

    pub fn num(value: i64) -> Expr {
        Expr::Num { value }
    }

    pub fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Bin {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Does this expression look boolean-typed at the surface?
    pub fn is_surface_boolean(&self) -> bool {
        match self {
            Expr::Bool { .. } => true,
            Expr::Bin { op, .. } => op.is_relational() || op.is_logical(),
            Expr::Unary { op: UnaryOp::Not, .. } => true,
            _ => false,
        }
    }

    /// Free variable names referenced anywhere in this expression.
    pub fn free_vars(&self, out: &mut Vec<String>) {
        match self {
            Expr::Num { .. } | Expr::Bool { .. } => {}
            Expr::Var { name } => out.push(name.clone()),
            Expr::Index { base, indices } => {
                base.free_vars(out);
                for i in indices {
                    i.free_vars(out);
                }
            }
            Expr::Slice { base, lo, hi } => {
                base.free_vars(out);
                lo.free_vars(out);
                hi.free_vars(out);
            }
            Expr::Member { base, .. } => base.free_vars(out),
            Expr::Unary { expr, .. } | Expr::Ceil { expr } | Expr::Floor { expr } => {
                expr.free_vars(out)
            }
            Expr::Bin { lhs, rhs, .. } => {
                lhs.free_vars(out);
                rhs.free_vars(out);
            }
            Expr::Call { args, .. } => {
                for a in args {
                    a.free_vars(out);
                }
            }
        }
    }

    /// Does this expression (transitively) call a procedure/function named
    /// `name`? Covers both `CALL` statements and bare call expressions such
    /// as `return n * Fact(n - 1)`.
    pub fn calls(&self, name: &str) -> bool {
        match self {
            Expr::Num { .. } | Expr::Bool { .. } | Expr::Var { .. } => false,
            Expr::Index { base, indices } => {
                base.calls(name) || indices.iter().any(|i| i.calls(name))
            }
            Expr::Slice { base, lo, hi } => {
                base.calls(name) || lo.calls(name) || hi.calls(name)
            }
            Expr::Member { base, .. } => base.calls(name),
            Expr::Unary { expr, .. } | Expr::Ceil { expr } | Expr::Floor { expr } => {
                expr.calls(name)
            }
            Expr::Bin { lhs, rhs, .. } => lhs.calls(name) || rhs.calls(name),
            Expr::Call { name: callee, args } => {
                callee == name || args.iter().any(|a| a.calls(name))
            }
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Num { value } => write!(f, "{}", value),
            Expr::Bool { value } => write!(f, "{}", if *value { "T" } else { "F" }),
            Expr::Var { name } => write!(f, "{}", name),
            Expr::Index { base, indices } => {
                let idx = indices.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ");
                write!(f, "{}[{}]", base, idx)
            }
            Expr::Slice { base, lo, hi } => write!(f, "{}[{}..{}]", base, lo, hi),
            Expr::Member { base, field } => write!(f, "{}.{}", base, field),
            Expr::Unary { op: UnaryOp::Neg, expr } => write!(f, "-{}", expr),
            Expr::Unary { op: UnaryOp::Not, expr } => write!(f, "not {}", expr),
            Expr::Bin { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op.as_str(), rhs),
            Expr::Call { name, args } => {
                let a = args.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ");
                write!(f, "{}({})", name, a)
            }
            Expr::Ceil { expr } => write!(f, "ceil({})", expr),
            Expr::Floor { expr } => write!(f, "floor({})", expr),
        }
    }
}

/// The target of an assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum LValue {
    Var { name: String },
    Index { base: Box<Expr>, indices: Vec<Expr> },
    Member { base: Box<Expr>, field: String },
}

impl std::fmt::Display for LValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LValue::Var { name } => write!(f, "{}", name),
            LValue::Index { base, indices } => {
                let idx = indices.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ");
                write!(f, "{}[{}]", base, idx)
            }
            LValue::Member { base, field } => write!(f, "{}.{}", base, field),
        }
    }
}

/// A `begin ... end` block; every such block lowers to one `Block`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Block { stmts }
    }
}

/// A statement. Every kind that the walk needs to attribute a cost to
/// carries its own `span`, used for per-line cost records and error
/// reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Stmt {
    Assign {
        target: LValue,
        expr: Expr,
        span: Option<Span>,
    },
    For {
        var: String,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        inclusive: bool,
        body: Block,
        span: Option<Span>,
    },
    While {
        cond: Expr,
        body: Block,
        span: Option<Span>,
    },
    Repeat {
        body: Vec<Stmt>,
        until: Expr,
        span: Option<Span>,
    },
    If {
        cond: Expr,
        then_branch: Block,
        else_branch: Option<Block>,
        span: Option<Span>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
        span: Option<Span>,
    },
    Return {
        expr: Option<Expr>,
        span: Option<Span>,
    },
    ExprStmt {
        expr: Expr,
        span: Option<Span>,
    },
    ObjectDecl {
        class_name: String,
        var_name: String,
        span: Option<Span>,
    },
}

impl Stmt {
    pub fn span(&self) -> Option<Span> {
        match self {
            Stmt::Assign { span, .. }
            | Stmt::For { span, .. }
            | Stmt::While { span, .. }
            | Stmt::Repeat { span, .. }
            | Stmt::If { span, .. }
            | Stmt::Call { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::ExprStmt { span, .. }
            | Stmt::ObjectDecl { span, .. } => *span,
        }
    }

    pub fn line(&self) -> usize {
        self.span().map(|s| s.line).unwrap_or(0)
    }

    /// The statement-kind tag used in per-line cost records ("kind
    /// tag"). Matches the AnalysisResult.lines[*].kind strings exactly.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            Stmt::Assign { .. } => "assign",
            Stmt::If { .. } => "if",
            Stmt::For { .. } => "for",
            Stmt::While { .. } | Stmt::Repeat { .. } => "while",
            Stmt::Call { .. } => "call",
            Stmt::Return { .. } => "return",
            Stmt::ExprStmt { .. } | Stmt::ObjectDecl { .. } => "declaration",
        }
    }

    /// Does this statement (transitively) call a procedure named `name`,
    /// whether through a `CALL` statement or a call expression embedded in
    /// an assignment, return, or condition?
    pub fn calls(&self, name: &str) -> bool {
        match self {
            Stmt::Call { name: callee, args, .. } => {
                callee == name || args.iter().any(|a| a.calls(name))
            }
            Stmt::Assign { expr, .. } | Stmt::ExprStmt { expr, .. } => expr.calls(name),
            Stmt::Return { expr, .. } => expr.as_ref().map(|e| e.calls(name)).unwrap_or(false),
            Stmt::ObjectDecl { .. } => false,
            Stmt::For {
                start, end, step, body, ..
            } => {
                start.calls(name)
                    || end.calls(name)
                    || step.as_ref().map(|s| s.calls(name)).unwrap_or(false)
                    || body.stmts.iter().any(|s| s.calls(name))
            }
            Stmt::While { cond, body, .. } => {
                cond.calls(name) || body.stmts.iter().any(|s| s.calls(name))
            }
            Stmt::Repeat { body, until, .. } => {
                until.calls(name) || body.iter().any(|s| s.calls(name))
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                cond.calls(name)
                    || then_branch.stmts.iter().any(|s| s.calls(name))
                    || else_branch
                        .as_ref()
                        .map(|b| b.stmts.iter().any(|s| s.calls(name)))
                        .unwrap_or(false)
            }
        }
    }
}

/// A slice-bounded or plain procedure parameter ("Param spec").
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub slice: Option<(Expr, Expr)>,
}

/// A procedure definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proc {
    pub name: String,
    pub params: Vec<ParamSpec>,
    pub body: Block,
    pub span: Option<Span>,
}

impl Proc {
    /// Does the body contain a `CALL` on this procedure's own name?
    pub fn is_recursive(&self) -> bool {
        self.body.stmts.iter().any(|s| s.calls(&self.name))
    }
}

/// A declarative class (attributes only).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Class {
    pub name: String,
    pub attributes: Vec<String>,
}

/// A top-level item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Item {
    Class(Class),
    Proc(Proc),
    Stmt(Stmt),
}

/// A complete parsed program.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Program {
    pub body: Vec<Item>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    pub fn procs(&self) -> impl Iterator<Item = &Proc> {
        self.body.iter().filter_map(|item| match item {
            Item::Proc(p) => Some(p),
            _ => None,
        })
    }

    pub fn find_proc(&self, name: &str) -> Option<&Proc> {
        self.procs().find(|p| p.name == name)
    }

    /// The implicit main program: top-level statements outside any
    /// procedure ("Top-level statements ... form an implicit main
    /// program").
    pub fn main_stmts(&self) -> Vec<&Stmt> {
        self.body
            .iter()
            .filter_map(|item| match item {
                Item::Stmt(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn max_depth(&self) -> usize {
        fn block_depth(block: &Block) -> usize {
            block.stmts.iter().map(stmt_depth).max().unwrap_or(0) + 1
        }
        fn stmt_depth(stmt: &Stmt) -> usize {
            match stmt {
                Stmt::For { body, .. } | Stmt::While { body, .. } => block_depth(body),
                Stmt::Repeat { body, .. } => body.iter().map(stmt_depth).max().unwrap_or(0) + 1,
                Stmt::If {
                    then_branch,
                    else_branch,
                    ..
                } => {
                    let then_d = block_depth(then_branch);
                    let else_d = else_branch.as_ref().map(block_depth).unwrap_or(0);
                    then_d.max(else_d)
                }
                _ => 1,
            }
        }
        self.body
            .iter()
            .map(|item| match item {
                Item::Proc(p) => block_depth(&p.body),
                Item::Stmt(s) => stmt_depth(s),
                Item::Class(_) => 1,
            })
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proc_detects_self_recursion() {
        let proc = Proc {
            name: "Fact".to_string(),
            params: vec![ParamSpec {
                name: "n".to_string(),
                slice: None,
            }],
            body: Block::new(vec![Stmt::Call {
                name: "Fact".to_string(),
                args: vec![],
                span: None,
            }]),
            span: None,
        };
        assert!(proc.is_recursive());
    }

    #[test]
    fn surface_boolean_detection() {
        let rel = Expr::bin(BinOp::Lt, Expr::var("i"), Expr::var("n"));
        assert!(rel.is_surface_boolean());
        assert!(!Expr::var("i").is_surface_boolean());
    }

    #[test]
    fn main_stmts_excludes_procs() {
        let program = Program {
            body: vec![
                Item::Proc(Proc {
                    name: "P".to_string(),
                    params: vec![],
                    body: Block::new(vec![]),
                    span: None,
                }),
                Item::Stmt(Stmt::Return { expr: None, span: None }),
            ],
        };
        assert_eq!(program.main_stmts().len(), 1);
    }
}
