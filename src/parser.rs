//! Recursive-descent parser for the pseudocode dialect.
//!
//! A token cursor plus `Result`-returning production methods, returning a
//! best-effort error list instead of a single `String`, since the grammar
//! surface promises `(ast, [])` or `(null, [{line, column, message}])` and
//! never a partial parse.

use crate::ast::*;
use crate::lexer::{tokenize, Token, TokenKind};
use serde::Serialize;

/// One parse failure (`{line, column, expected_tokens, got}`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for ParseError {}

/// The result of [`parse`]: either a complete AST with no errors, or no AST
/// and a best-effort error list — the engine never partially parses.
pub struct ParseResult {
    pub ok: bool,
    pub ast: Option<Program>,
    pub errors: Vec<ParseError>,
}

/// Parse pseudocode source into an AST (`parse(text) → {ok, ast, errors}`).
pub fn parse(source: &str) -> ParseResult {
    let tokens = tokenize(source);
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    if parser.errors.is_empty() {
        ParseResult {
            ok: true,
            ast: Some(program),
            errors: Vec::new(),
        }
    } else {
        ParseResult {
            ok: false,
            ast: None,
            errors: parser.errors,
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_n(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn error(&mut self, message: impl Into<String>) {
        let span = self.peek().span;
        self.errors.push(ParseError {
            line: span.line,
            column: span.column,
            message: message.into(),
        });
    }

    fn expect_ident(&mut self, text: &str) -> bool {
        if let TokenKind::Ident(word) = &self.peek().kind {
            if word.eq_ignore_ascii_case(text) {
                self.advance();
                return true;
            }
        }
        self.error(format!("expected `{}`, found {:?}", text, self.peek().kind));
        false
    }

    fn at_ident(&self, text: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Ident(word) if word.eq_ignore_ascii_case(text))
    }

    fn expect(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.advance();
            true
        } else {
            self.error(format!("expected {:?}, found {:?}", kind, self.peek().kind));
            false
        }
    }

    fn take_ident(&mut self) -> Option<String> {
        if let TokenKind::Ident(word) = &self.peek().kind {
            let w = word.clone();
            self.advance();
            Some(w)
        } else {
            self.error(format!("expected identifier, found {:?}", self.peek().kind));
            None
        }
    }

    // ---- program structure ----------------------------------------------

    fn parse_program(&mut self) -> Program {
        let mut body = Vec::new();
        while !self.at_eof() {
            if self.at_ident("class") {
                if let Some(c) = self.parse_class_decl() {
                    body.push(Item::Class(c));
                }
            } else if self.looks_like_proc_decl() {
                if let Some(p) = self.parse_proc_decl() {
                    body.push(Item::Proc(p));
                }
            } else if self.at_ident("begin") {
                // The implicit main program is conventionally written as one
                // top-level `begin ... end` block; its statements belong
                // directly in the program body, not nested under it (// "top-level statements ... form an implicit main program").
                let block = self.parse_block();
                for s in block.stmts {
                    body.push(Item::Stmt(s));
                }
            } else {
                if let Some(s) = self.parse_stmt() {
                    body.push(Item::Stmt(s));
                }
            }
            if self.pos >= self.tokens.len() - 1 {
                break;
            }
        }
        Program { body }
    }

    /// `IDENT '(' ... ')' 'begin'` starts a procedure declaration; anything
    /// else starting with an identifier is a statement (assignment, object
    /// declaration, or a bare expression statement).
    fn looks_like_proc_decl(&self) -> bool {
        if !matches!(self.peek().kind, TokenKind::Ident(_)) {
            return false;
        }
        if !matches!(self.peek_n(1).kind, TokenKind::LParen) {
            return false;
        }
        let mut depth = 0i32;
        let mut i = 1;
        loop {
            match &self.peek_n(i).kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return self.at_ident_n(i + 1, "begin");
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            i += 1;
            if i > 10_000 {
                return false;
            }
        }
    }

    fn at_ident_n(&self, n: usize, text: &str) -> bool {
        matches!(&self.peek_n(n).kind, TokenKind::Ident(w) if w.eq_ignore_ascii_case(text))
    }

    fn parse_class_decl(&mut self) -> Option<Class> {
        self.expect_ident("class");
        let name = self.take_ident()?;
        self.expect_ident("begin");
        let mut attributes = Vec::new();
        while !self.at_ident("end") && !self.at_eof() {
            if let Some(attr) = self.take_ident() {
                attributes.push(attr);
            }
            if self.peek().kind == TokenKind::Comma {
                self.advance();
            }
        }
        self.expect_ident("end");
        Some(Class { name, attributes })
    }

    fn parse_proc_decl(&mut self) -> Option<Proc> {
        let span = self.peek().span;
        let name = self.take_ident()?;
        self.expect(TokenKind::LParen);
        let mut params = Vec::new();
        if self.peek().kind != TokenKind::RParen {
            loop {
                let pname = self.take_ident()?;
                let slice = if self.peek().kind == TokenKind::LBracket {
                    self.advance();
                    let lo = self.parse_expr();
                    self.expect(TokenKind::DotDot);
                    let hi = self.parse_expr();
                    self.expect(TokenKind::RBracket);
                    Some((lo, hi))
                } else {
                    None
                };
                params.push(ParamSpec { name: pname, slice });
                if self.peek().kind == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen);
        let body = self.parse_block();
        Some(Proc {
            name,
            params,
            body,
            span: Some(Span::new(span.line, span.column)),
        })
    }

    // ---- statements -------------------------------------------------------

    fn parse_block(&mut self) -> Block {
        self.expect_ident("begin");
        let mut stmts = Vec::new();
        while !self.at_ident("end") && !self.at_eof() {
            if let Some(s) = self.parse_stmt() {
                stmts.push(s);
            } else {
                // avoid infinite loop on unrecoverable token
                if !self.at_ident("end") && !self.at_eof() {
                    self.advance();
                }
            }
        }
        self.expect_ident("end");
        Block::new(stmts)
    }

    fn parse_stmt(&mut self) -> Option<Stmt> {
        let span = self.peek().span;
        if self.at_ident("for") {
            return self.parse_for(span);
        }
        if self.at_ident("while") {
            return self.parse_while(span);
        }
        if self.at_ident("repeat") {
            return self.parse_repeat(span);
        }
        if self.at_ident("if") {
            return self.parse_if(span);
        }
        if self.at_ident("CALL") {
            return self.parse_call(span);
        }
        if self.at_ident("return") {
            return self.parse_return(span);
        }
        // object declaration: `ClassName var_name` — two bare identifiers in
        // a row is not otherwise a valid statement start, so this is
        // unambiguous against assignment (`var <- ...`) and call/expr
        // statements (which always follow an identifier with `(` or an
        // operator).
        if let (TokenKind::Ident(class_name), TokenKind::Ident(var_name)) =
            (self.peek().kind.clone(), self.peek_n(1).kind.clone())
        {
            if !matches!(self.peek_n(2).kind, TokenKind::LParen | TokenKind::Assign) {
                self.advance();
                self.advance();
                return Some(Stmt::ObjectDecl {
                    class_name,
                    var_name,
                    span: Some(Span::new(span.line, span.column)),
                });
            }
        }

        // assignment vs. bare expression statement
        let lvalue_start = self.pos;
        if let Some(lvalue) = self.try_parse_lvalue() {
            if self.peek().kind == TokenKind::Assign {
                self.advance();
                let expr = self.parse_expr();
                return Some(Stmt::Assign {
                    target: lvalue,
                    expr,
                    span: Some(Span::new(span.line, span.column)),
                });
            }
        }
        self.pos = lvalue_start;
        let expr = self.parse_expr();
        Some(Stmt::ExprStmt {
            expr,
            span: Some(Span::new(span.line, span.column)),
        })
    }

    fn try_parse_lvalue(&mut self) -> Option<LValue> {
        let name = match &self.peek().kind {
            TokenKind::Ident(w) => w.clone(),
            _ => return None,
        };
        self.advance();
        let mut lvalue = LValue::Var { name };
        loop {
            match &self.peek().kind {
                TokenKind::LBracket => {
                    self.advance();
                    let mut indices = vec![self.parse_expr()];
                    while self.peek().kind == TokenKind::Comma {
                        self.advance();
                        indices.push(self.parse_expr());
                    }
                    self.expect(TokenKind::RBracket);
                    let base = lvalue_to_expr(lvalue);
                    lvalue = LValue::Index {
                        base: Box::new(base),
                        indices,
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let field = self.take_ident()?;
                    let base = lvalue_to_expr(lvalue);
                    lvalue = LValue::Member {
                        base: Box::new(base),
                        field,
                    };
                }
                _ => break,
            }
        }
        Some(lvalue)
    }

    fn parse_for(&mut self, span: Span) -> Option<Stmt> {
        self.expect_ident("for");
        let var = self.take_ident()?;
        self.expect(TokenKind::Assign);
        let start = self.parse_expr();
        self.expect_ident("to");
        let end = self.parse_expr();
        let step = if self.at_ident("step") {
            self.advance();
            Some(self.parse_expr())
        } else {
            None
        };
        self.expect_ident("do");
        let body = self.parse_block();
        Some(Stmt::For {
            var,
            start,
            end,
            step,
            inclusive: true,
            body,
            span: Some(span),
        })
    }

    fn parse_while(&mut self, span: Span) -> Option<Stmt> {
        self.expect_ident("while");
        self.expect(TokenKind::LParen);
        let cond = self.parse_expr();
        self.expect(TokenKind::RParen);
        self.expect_ident("do");
        let body = self.parse_block();
        Some(Stmt::While {
            cond,
            body,
            span: Some(span),
        })
    }

    fn parse_repeat(&mut self, span: Span) -> Option<Stmt> {
        self.expect_ident("repeat");
        let mut body = Vec::new();
        while !self.at_ident("until") && !self.at_eof() {
            if let Some(s) = self.parse_stmt() {
                body.push(s);
            } else {
                break;
            }
        }
        self.expect_ident("until");
        self.expect(TokenKind::LParen);
        let until = self.parse_expr();
        self.expect(TokenKind::RParen);
        Some(Stmt::Repeat {
            body,
            until,
            span: Some(span),
        })
    }

    fn parse_if(&mut self, span: Span) -> Option<Stmt> {
        self.expect_ident("if");
        self.expect(TokenKind::LParen);
        let cond = self.parse_expr();
        self.expect(TokenKind::RParen);
        self.expect_ident("then");
        let then_branch = self.parse_block();
        let else_branch = if self.at_ident("else") {
            self.advance();
            Some(self.parse_block())
        } else {
            None
        };
        Some(Stmt::If {
            cond,
            then_branch,
            else_branch,
            span: Some(span),
        })
    }

    fn parse_call(&mut self, span: Span) -> Option<Stmt> {
        self.expect_ident("CALL");
        let name = self.take_ident()?;
        self.expect(TokenKind::LParen);
        let mut args = Vec::new();
        if self.peek().kind != TokenKind::RParen {
            args.push(self.parse_expr());
            while self.peek().kind == TokenKind::Comma {
                self.advance();
                args.push(self.parse_expr());
            }
        }
        self.expect(TokenKind::RParen);
        Some(Stmt::Call {
            name,
            args,
            span: Some(span),
        })
    }

    fn parse_return(&mut self, span: Span) -> Option<Stmt> {
        self.expect_ident("return");
        let expr = if self.stmt_follows() {
            None
        } else {
            Some(self.parse_expr())
        };
        Some(Stmt::Return {
            expr,
            span: Some(span),
        })
    }

    fn stmt_follows(&self) -> bool {
        self.at_ident("end") || self.at_eof()
    }

    // ---- expressions (precedence climbing) --------------------------------

    fn parse_expr(&mut self) -> Expr {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Expr {
        let mut lhs = self.parse_and();
        while self.at_ident("or") {
            self.advance();
            let rhs = self.parse_and();
            lhs = Expr::bin(BinOp::Or, lhs, rhs);
        }
        lhs
    }

    fn parse_and(&mut self) -> Expr {
        let mut lhs = self.parse_not();
        while self.at_ident("and") {
            self.advance();
            let rhs = self.parse_not();
            lhs = Expr::bin(BinOp::And, lhs, rhs);
        }
        lhs
    }

    fn parse_not(&mut self) -> Expr {
        if self.at_ident("not") {
            self.advance();
            let e = self.parse_not();
            Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(e),
            }
        } else {
            self.parse_rel()
        }
    }

    fn parse_rel(&mut self) -> Expr {
        let lhs = self.parse_add();
        let op = match self.peek().kind {
            TokenKind::Eq => Some(BinOp::Eq),
            TokenKind::Neq => Some(BinOp::Neq),
            TokenKind::Lt => Some(BinOp::Lt),
            TokenKind::Le => Some(BinOp::Le),
            TokenKind::Gt => Some(BinOp::Gt),
            TokenKind::Ge => Some(BinOp::Ge),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let rhs = self.parse_add();
            Expr::bin(op, lhs, rhs)
        } else {
            lhs
        }
    }

    fn parse_add(&mut self) -> Expr {
        let mut lhs = self.parse_mul();
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => Some(BinOp::Add),
                TokenKind::Minus => Some(BinOp::Sub),
                _ => None,
            };
            match op {
                Some(op) => {
                    self.advance();
                    let rhs = self.parse_mul();
                    lhs = Expr::bin(op, lhs, rhs);
                }
                None => break,
            }
        }
        lhs
    }

    fn parse_mul(&mut self) -> Expr {
        let mut lhs = self.parse_unary();
        loop {
            let op = if self.peek().kind == TokenKind::Star {
                Some(BinOp::Mul)
            } else if self.peek().kind == TokenKind::Slash {
                Some(BinOp::Div)
            } else if self.at_ident("div") {
                Some(BinOp::DivInt)
            } else if self.at_ident("mod") {
                Some(BinOp::Mod)
            } else {
                None
            };
            match op {
                Some(op) => {
                    self.advance();
                    let rhs = self.parse_unary();
                    lhs = Expr::bin(op, lhs, rhs);
                }
                None => break,
            }
        }
        lhs
    }

    fn parse_unary(&mut self) -> Expr {
        if self.peek().kind == TokenKind::Minus {
            self.advance();
            let e = self.parse_unary();
            Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(e),
            }
        } else {
            self.parse_postfix()
        }
    }

    fn parse_postfix(&mut self) -> Expr {
        let mut expr = self.parse_primary();
        loop {
            match &self.peek().kind {
                TokenKind::LBracket => {
                    self.advance();
                    let first = self.parse_expr();
                    if self.peek().kind == TokenKind::DotDot {
                        self.advance();
                        let hi = self.parse_expr();
                        self.expect(TokenKind::RBracket);
                        expr = Expr::Slice {
                            base: Box::new(expr),
                            lo: Box::new(first),
                            hi: Box::new(hi),
                        };
                    } else {
                        let mut indices = vec![first];
                        while self.peek().kind == TokenKind::Comma {
                            self.advance();
                            indices.push(self.parse_expr());
                        }
                        self.expect(TokenKind::RBracket);
                        expr = Expr::Index {
                            base: Box::new(expr),
                            indices,
                        };
                    }
                }
                TokenKind::Dot => {
                    self.advance();
                    if let Some(field) = self.take_ident() {
                        expr = Expr::Member {
                            base: Box::new(expr),
                            field,
                        };
                    }
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_primary(&mut self) -> Expr {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Number(v) => {
                self.advance();
                Expr::Num { value: v }
            }
            TokenKind::LParen => {
                self.advance();
                let e = self.parse_expr();
                self.expect(TokenKind::RParen);
                e
            }
            TokenKind::FloorOpen => {
                self.advance();
                let e = self.parse_expr();
                self.expect(TokenKind::FloorClose);
                Expr::Floor { expr: Box::new(e) }
            }
            TokenKind::CeilOpen => {
                self.advance();
                let e = self.parse_expr();
                self.expect(TokenKind::CeilClose);
                Expr::Ceil { expr: Box::new(e) }
            }
            TokenKind::Ident(ref word) if word == "T" => {
                self.advance();
                Expr::Bool { value: true }
            }
            TokenKind::Ident(ref word) if word == "F" => {
                self.advance();
                Expr::Bool { value: false }
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.peek().kind == TokenKind::LParen {
                    self.advance();
                    let mut args = Vec::new();
                    if self.peek().kind != TokenKind::RParen {
                        args.push(self.parse_expr());
                        while self.peek().kind == TokenKind::Comma {
                            self.advance();
                            args.push(self.parse_expr());
                        }
                    }
                    self.expect(TokenKind::RParen);
                    Expr::Call { name, args }
                } else {
                    Expr::Var { name }
                }
            }
            other => {
                self.error(format!("unexpected token {:?}", other));
                self.advance();
                Expr::Num { value: 0 }
            }
        }
    }
}

fn lvalue_to_expr(lvalue: LValue) -> Expr {
    match lvalue {
        LValue::Var { name } => Expr::Var { name },
        LValue::Index { base, indices } => Expr::Index { base, indices },
        LValue::Member { base, field } => Expr::Member { base, field },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        let result = parse(src);
        assert!(result.ok, "expected parse to succeed, got errors: {:?}", result.errors);
        result.ast.unwrap()
    }

    #[test]
    fn parses_simple_for_loop() {
        let program = parse_ok("begin s<-0  for i<-1 to n do begin s<-s+i end end");
        assert_eq!(program.main_stmts().len(), 2);
    }

    #[test]
    fn parses_nested_for_loops() {
        let program = parse_ok(
            "begin for i<-1 to n do begin for j<-1 to n do begin x<-1 end end end",
        );
        assert_eq!(program.main_stmts().len(), 1);
    }

    #[test]
    fn parses_while_with_div() {
        let program = parse_ok("begin i<-n  while (i>1) do begin i<-i div 2 end end");
        assert_eq!(program.main_stmts().len(), 2);
    }

    #[test]
    fn parses_recursive_proc_with_if_else() {
        let program = parse_ok(
            "Fact(n) begin if (n<=1) then begin return 1 end else begin return n*Fact(n-1) end end",
        );
        let proc = program.find_proc("Fact").unwrap();
        assert!(proc.is_recursive());
    }

    #[test]
    fn parses_merge_sort_style_calls() {
        let program = parse_ok(
            "MergeSort(A, lo, hi) begin if (lo<hi) then begin m<-(lo+hi) div 2  CALL MergeSort(A, lo, m)  CALL MergeSort(A, m+1, hi)  CALL Merge(A, lo, m, hi) end end",
        );
        let proc = program.find_proc("MergeSort").unwrap();
        assert!(proc.is_recursive());
    }

    #[test]
    fn reports_errors_on_mismatched_begin_end() {
        let result = parse("begin s<-0");
        assert!(!result.ok);
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn parses_ascii_relational_operators() {
        let program = parse_ok("begin if (1 <= 2) then begin x<-1 end end");
        assert_eq!(program.main_stmts().len(), 1);
    }

    #[test]
    fn every_begin_has_exactly_one_matching_end() {
        // invariant #1: a well-formed nested program parses to a tree
        // whose block structure matches 1:1 with begin/end pairs.
        let program = parse_ok(
            "begin for i<-1 to n do begin if (i>1) then begin x<-1 end end end",
        );
        assert_eq!(program.max_depth(), 3);
    }
}
