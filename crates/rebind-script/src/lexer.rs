use crate::ast::Span;
use crate::token::{Tok, TokKind};

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.src.get(self.pos).copied()?;
        self.pos += 1;
        Some(b)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }
    fn peek2(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }

    fn span(&self, start: usize) -> Span {
        Span {
            start: start as u32,
            end: self.pos as u32,
        }
    }

    fn tok(&self, kind: TokKind, start: usize) -> Tok {
        Tok {
            kind,
            span: self.span(start),
        }
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
                self.bump();
            }
            // line comment: //
            if self.peek() == Some(b'/') && self.peek2() == Some(b'/') {
                while let Some(b) = self.peek() {
                    if b == b'\n' {
                        break;
                    }
                    self.bump();
                }
                continue;
            }
            break;
        }
    }

    pub fn next_tok(&mut self) -> Tok {
        self.skip_ws_and_comments();
        let start = self.pos;
        let Some(b) = self.bump() else {
            return self.tok(TokKind::Eof, start);
        };

        // 2-char punctuation first
        if b == b':' && self.peek() == Some(b':') {
            self.bump();
            return self.tok(TokKind::ColonColon, start);
        }
        if b == b'-' && self.peek() == Some(b'>') {
            self.bump();
            return self.tok(TokKind::Arrow, start);
        }

        let single = match b {
            b'(' => Some(TokKind::LParen),
            b')' => Some(TokKind::RParen),
            b'[' => Some(TokKind::LBracket),
            b']' => Some(TokKind::RBracket),
            b',' => Some(TokKind::Comma),
            b':' => Some(TokKind::Colon),
            b';' => Some(TokKind::Semicolon),
            b'=' => Some(TokKind::Eq),
            b'-' => Some(TokKind::Minus),
            _ => None,
        };
        if let Some(k) = single {
            return self.tok(k, start);
        }

        if b == b'"' {
            return self.string(start);
        }
        if b.is_ascii_digit() {
            return self.number(start);
        }

        if b.is_ascii_alphabetic() || b == b'_' {
            while matches!(self.peek(), Some(p) if p.is_ascii_alphanumeric() || p == b'_') {
                self.bump();
            }
            let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
            let kind = match text.as_str() {
                "true" => TokKind::KwTrue,
                "false" => TokKind::KwFalse,
                "null" => TokKind::KwNull,
                _ => TokKind::Ident(text),
            };
            return self.tok(kind, start);
        }

        // skip the rest of a multi-byte character
        while matches!(self.peek(), Some(p) if p & 0xC0 == 0x80) {
            self.bump();
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        self.tok(TokKind::Error(format!("unexpected character {text:?}")), start)
    }

    fn string(&mut self, start: usize) -> Tok {
        let mut bytes = Vec::new();
        loop {
            let Some(b) = self.bump() else {
                return self.tok(TokKind::Error("unterminated string".into()), start);
            };
            match b {
                b'"' => break,
                b'\\' => {
                    let Some(esc) = self.bump() else {
                        return self.tok(TokKind::Error("unterminated string".into()), start);
                    };
                    bytes.push(match esc {
                        b'n' => b'\n',
                        b't' => b'\t',
                        other => other,
                    });
                }
                other => bytes.push(other),
            }
        }
        let s = String::from_utf8_lossy(&bytes).into_owned();
        self.tok(TokKind::Str(s), start)
    }

    fn number(&mut self, start: usize) -> Tok {
        let mut dot = false;
        while let Some(p) = self.peek() {
            if p.is_ascii_digit() {
                self.bump();
            } else if p == b'.' && !dot && matches!(self.peek2(), Some(d) if d.is_ascii_digit()) {
                dot = true;
                self.bump();
            } else {
                break;
            }
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        let long = !dot && matches!(self.peek(), Some(b'L' | b'l'));
        if long {
            self.bump();
        }
        let kind = if dot {
            text.parse()
                .map(TokKind::Float)
                .unwrap_or_else(|_| TokKind::Error(format!("bad number {text}")))
        } else {
            match text.parse::<i64>() {
                Ok(v) if long => TokKind::Long(v),
                Ok(v) => TokKind::Int(v),
                Err(_) => TokKind::Error(format!("integer literal {text} out of range")),
            }
        };
        self.tok(kind, start)
    }
}
