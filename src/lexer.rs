//! Lexer for the pseudocode dialect.
//!
//! A hand-written character scanner tracking `(line, column)` for every
//! token, since the parser's error list and the AST's per-statement
//! [`crate::ast::Span`] both need it.

use crate::ast::Span;

/// A lexical token together with the position of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Number(i64),
    /// `<-` or the Unicode left-arrow `←`.
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    DotDot,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    /// `≤` or `<=`.
    Le,
    /// `≥` or `>=`.
    Ge,
    Lt,
    Gt,
    Eq,
    /// `≠` or `!=`.
    Neq,
    /// `⌊` or `⌈` — the matching close is inferred by the parser.
    FloorOpen,
    FloorClose,
    CeilOpen,
    CeilClose,
    Eof,
}

/// Tokenize pseudocode source into a flat token stream, dropping line
/// comments (`► ... EOL`) and blank lines.
pub fn tokenize(source: &str) -> Vec<Token> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1usize;
    let mut col = 1usize;

    macro_rules! advance {
        ($n:expr) => {{
            for _ in 0..$n {
                if i < chars.len() {
                    if chars[i] == '\n' {
                        line += 1;
                        col = 1;
                    } else {
                        col += 1;
                    }
                    i += 1;
                }
            }
        }};
    }

    while i < chars.len() {
        let c = chars[i];
        let start = Span::new(line, col);

        match c {
            ' ' | '\t' | '\r' | '\n' => advance!(1),
            '►' => {
                while i < chars.len() && chars[i] != '\n' {
                    advance!(1);
                }
            }
            '(' => {
                tokens.push(Token { kind: TokenKind::LParen, span: start });
                advance!(1);
            }
            ')' => {
                tokens.push(Token { kind: TokenKind::RParen, span: start });
                advance!(1);
            }
            '[' => {
                tokens.push(Token { kind: TokenKind::LBracket, span: start });
                advance!(1);
            }
            ']' => {
                tokens.push(Token { kind: TokenKind::RBracket, span: start });
                advance!(1);
            }
            ',' => {
                tokens.push(Token { kind: TokenKind::Comma, span: start });
                advance!(1);
            }
            '.' => {
                if i + 1 < chars.len() && chars[i + 1] == '.' {
                    tokens.push(Token { kind: TokenKind::DotDot, span: start });
                    advance!(2);
                } else {
                    tokens.push(Token { kind: TokenKind::Dot, span: start });
                    advance!(1);
                }
            }
            '+' => {
                tokens.push(Token { kind: TokenKind::Plus, span: start });
                advance!(1);
            }
            '-' => {
                tokens.push(Token { kind: TokenKind::Minus, span: start });
                advance!(1);
            }
            '*' => {
                tokens.push(Token { kind: TokenKind::Star, span: start });
                advance!(1);
            }
            '/' => {
                tokens.push(Token { kind: TokenKind::Slash, span: start });
                advance!(1);
            }
            '≤' => {
                tokens.push(Token { kind: TokenKind::Le, span: start });
                advance!(1);
            }
            '≥' => {
                tokens.push(Token { kind: TokenKind::Ge, span: start });
                advance!(1);
            }
            '≠' => {
                tokens.push(Token { kind: TokenKind::Neq, span: start });
                advance!(1);
            }
            '⌊' => {
                tokens.push(Token { kind: TokenKind::FloorOpen, span: start });
                advance!(1);
            }
            '⌋' => {
                tokens.push(Token { kind: TokenKind::FloorClose, span: start });
                advance!(1);
            }
            '⌈' => {
                tokens.push(Token { kind: TokenKind::CeilOpen, span: start });
                advance!(1);
            }
            '⌉' => {
                tokens.push(Token { kind: TokenKind::CeilClose, span: start });
                advance!(1);
            }
            '←' => {
                tokens.push(Token { kind: TokenKind::Assign, span: start });
                advance!(1);
            }
            '<' => {
                if i + 1 < chars.len() && chars[i + 1] == '-' {
                    tokens.push(Token { kind: TokenKind::Assign, span: start });
                    advance!(2);
                } else if i + 1 < chars.len() && chars[i + 1] == '=' {
                    tokens.push(Token { kind: TokenKind::Le, span: start });
                    advance!(2);
                } else if i + 1 < chars.len() && chars[i + 1] == '>' {
                    tokens.push(Token { kind: TokenKind::Neq, span: start });
                    advance!(2);
                } else {
                    tokens.push(Token { kind: TokenKind::Lt, span: start });
                    advance!(1);
                }
            }
            '>' => {
                if i + 1 < chars.len() && chars[i + 1] == '=' {
                    tokens.push(Token { kind: TokenKind::Ge, span: start });
                    advance!(2);
                } else {
                    tokens.push(Token { kind: TokenKind::Gt, span: start });
                    advance!(1);
                }
            }
            '=' => {
                tokens.push(Token { kind: TokenKind::Eq, span: start });
                advance!(1);
            }
            '!' => {
                if i + 1 < chars.len() && chars[i + 1] == '=' {
                    tokens.push(Token { kind: TokenKind::Neq, span: start });
                    advance!(2);
                } else {
                    advance!(1);
                }
            }
            c if c.is_ascii_digit() => {
                let mut num = String::new();
                while i < chars.len() && chars[i].is_ascii_digit() {
                    num.push(chars[i]);
                    advance!(1);
                }
                let value: i64 = num.parse().unwrap_or(0);
                tokens.push(Token { kind: TokenKind::Number(value), span: start });
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    word.push(chars[i]);
                    advance!(1);
                }
                tokens.push(Token { kind: TokenKind::Ident(word), span: start });
            }
            _ => {
                // Unrecognized character: skip it. The parser will report a
                // downstream syntax error if this leaves the grammar stuck.
                advance!(1);
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(line, col),
    });
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn drops_comments_and_blank_lines() {
        let toks = kinds("► a comment\n\ni ← 1\n");
        assert_eq!(
            toks,
            vec![
                TokenKind::Ident("i".into()),
                TokenKind::Assign,
                TokenKind::Number(1),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn ascii_relational_equivalents() {
        assert_eq!(kinds("<="), vec![TokenKind::Le, TokenKind::Eof]);
        assert_eq!(kinds(">="), vec![TokenKind::Ge, TokenKind::Eof]);
        assert_eq!(kinds("!="), vec![TokenKind::Neq, TokenKind::Eof]);
        assert_eq!(kinds("<>"), vec![TokenKind::Neq, TokenKind::Eof]);
    }

    #[test]
    fn unicode_operators() {
        assert_eq!(kinds("≤ ≥ ≠"), vec![TokenKind::Le, TokenKind::Ge, TokenKind::Neq, TokenKind::Eof]);
    }

    #[test]
    fn tracks_line_and_column() {
        let toks = tokenize("a\nbb");
        assert_eq!(toks[0].span, Span::new(1, 1));
        assert_eq!(toks[1].span, Span::new(2, 1));
    }

    #[test]
    fn boolean_literals_are_uppercase_only() {
        let toks = kinds("T t F f");
        assert_eq!(
            toks,
            vec![
                TokenKind::Ident("T".into()),
                TokenKind::Ident("t".into()),
                TokenKind::Ident("F".into()),
                TokenKind::Ident("f".into()),
                TokenKind::Eof,
            ]
        );
    }
}
