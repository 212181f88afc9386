use crate::ast::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum TokKind {
    // trivia / eof / error
    Eof,
    /// Malformed input (unterminated string, bad number, stray byte)
    Error(String),
    // punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    ColonColon, // C::m member references
    Semicolon,
    Arrow, // -> before a return type
    Eq,
    Minus,
    // idents / keywords
    Ident(String),
    KwTrue,
    KwFalse,
    KwNull,
    // literals
    Int(i64),
    Long(i64), // 12L
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone)]
pub struct Tok {
    pub kind: TokKind,
    pub span: Span,
}
