use anyhow::{bail, Result};

use crate::ast::{
    Binding, Endpoint, Ident, Lit, MemberRef, Param, Pattern, Script, SigExpr, Span, Stmt,
    StmtKind, TypeExpr,
};
use crate::lexer::Lexer;
use crate::token::{Tok, TokKind};

pub fn parse_str(_file: &str, src: &str) -> Result<Script> {
    check_len(src.len())?;
    let mut p = Parser::new(src);
    p.parse_script()
}

/// Spans are `u32` byte offsets.
fn check_len(len: usize) -> Result<()> {
    if u32::try_from(len).is_err() {
        bail!("source too large to parse ({} bytes)", len);
    }
    Ok(())
}

struct Parser<'a> {
    lex: Lexer<'a>,
    cur: Tok,
    nxt: Tok,
    /// End of the last consumed token.
    last_end: u32,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        let mut lex = Lexer::new(src);
        let cur = lex.next_tok();
        let nxt = lex.next_tok();
        Self {
            lex,
            cur,
            nxt,
            last_end: 0,
        }
    }

    fn bump(&mut self) {
        self.last_end = self.cur.span.end;
        self.cur = std::mem::replace(&mut self.nxt, self.lex.next_tok());
    }

    fn at(&self, k: &TokKind) -> bool {
        std::mem::discriminant(&self.cur.kind) == std::mem::discriminant(k)
    }

    fn expect(&mut self, k: TokKind) -> Result<Tok> {
        if self.at(&k) {
            let t = self.cur.clone();
            self.bump();
            Ok(t)
        } else {
            self.fail(&format!("expected {:?}", k))
        }
    }

    fn fail<T>(&self, what: &str) -> Result<T> {
        match &self.cur.kind {
            TokKind::Error(msg) => bail!("{} at {}", msg, self.cur.span),
            found => bail!("{}, found {:?} at {}", what, found, self.cur.span),
        }
    }

    fn span_from(&self, start: u32, end: u32) -> Span {
        Span { start, end }
    }

    // ======= script / statements =======

    fn parse_script(&mut self) -> Result<Script> {
        let start = self.cur.span.start;
        let mut stmts = Vec::new();
        while !matches!(self.cur.kind, TokKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(Script {
            stmts,
            span: self.span_from(start, self.cur.span.end),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        let start = self.cur.span.start;
        let TokKind::Ident(word) = &self.cur.kind else {
            return self.fail("expected a statement");
        };
        let word = word.clone();
        let keyword = self.cur.span;
        self.bump();

        let kind = match word.as_str() {
            "sig" => StmtKind::Sig(self.parse_sig()?),
            "drop" => StmtKind::Drop(self.parse_ident()?),
            "insert" => {
                let index = match self.cur.kind {
                    TokKind::Int(i) if (0..=i64::from(u32::MAX)).contains(&i) => i as u32,
                    _ => return self.fail("expected an argument index"),
                };
                self.bump();
                StmtKind::Insert {
                    index,
                    binding: self.parse_binding()?,
                }
            }
            "append" => StmtKind::Append(self.parse_binding()?),
            "prepend" => StmtKind::Prepend(self.parse_binding()?),
            "permute" => StmtKind::Permute(self.parse_patterns()?),
            "exclude" => StmtKind::Exclude(self.parse_patterns()?),
            "spread" => StmtKind::Spread(self.parse_list(Self::parse_param)?),
            "collect" => {
                let name = self.parse_ident()?;
                self.expect(TokKind::Eq)?;
                StmtKind::Collect {
                    name,
                    pattern: self.parse_pattern()?,
                }
            }
            "convert" => StmtKind::Convert(self.parse_sig()?),
            "cast" => StmtKind::Cast(self.parse_sig()?),
            "fold" => {
                let name = self.parse_ident()?;
                self.expect(TokKind::Eq)?;
                StmtKind::Fold {
                    name,
                    function: self.parse_member()?,
                }
            }
            "fold_void" => StmtKind::FoldVoid(self.parse_member()?),
            "filter" => {
                let pattern = self.parse_pattern()?;
                self.expect(TokKind::Eq)?;
                StmtKind::Filter {
                    pattern,
                    function: self.parse_member()?,
                }
            }
            "filter_return" => StmtKind::FilterReturn(self.parse_member()?),
            "catch" => {
                let throwable = self.parse_type()?;
                self.expect(TokKind::Eq)?;
                StmtKind::Catch {
                    throwable,
                    function: self.parse_member()?,
                }
            }
            "finally" => StmtKind::Finally(self.parse_member()?),
            "invoke" => StmtKind::Endpoint(self.parse_invoke()?),
            "get_static" => StmtKind::Endpoint(Endpoint::GetStatic(self.parse_member()?)),
            "set_static" => StmtKind::Endpoint(Endpoint::SetStatic(self.parse_member()?)),
            "get_field" => StmtKind::Endpoint(Endpoint::GetField(self.parse_ident()?)),
            "set_field" => StmtKind::Endpoint(Endpoint::SetField(self.parse_ident()?)),
            "identity" => StmtKind::Endpoint(Endpoint::Identity),
            "constant" => StmtKind::Endpoint(Endpoint::Constant(self.parse_lit()?)),
            "nop" => StmtKind::Endpoint(Endpoint::Nop),
            "throw" => StmtKind::Endpoint(Endpoint::Throw),
            "call" => {
                self.expect(TokKind::LParen)?;
                let args = if matches!(self.cur.kind, TokKind::RParen) {
                    Vec::new()
                } else {
                    self.parse_list(Self::parse_lit)?
                };
                self.expect(TokKind::RParen)?;
                StmtKind::Call(args)
            }
            other => bail!("unknown statement `{}` at {}", other, keyword),
        };
        let end = self.expect(TokKind::Semicolon)?.span.end;
        Ok(Stmt {
            kind,
            span: self.span_from(start, end),
        })
    }

    fn parse_invoke(&mut self) -> Result<Endpoint> {
        let how = self.parse_ident()?;
        Ok(match how.text.as_str() {
            "static" => Endpoint::InvokeStatic(self.parse_member()?),
            "virtual" => Endpoint::InvokeVirtual(self.parse_ident()?),
            "special" => Endpoint::InvokeSpecial(self.parse_member()?),
            "constructor" => Endpoint::InvokeConstructor(self.parse_ident()?),
            other => bail!(
                "expected static, virtual, special or constructor after invoke, found `{}` at {}",
                other,
                how.span
            ),
        })
    }

    // ======= pieces =======

    fn parse_list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let mut items = vec![item(self)?];
        while matches!(self.cur.kind, TokKind::Comma) {
            self.bump();
            items.push(item(self)?);
        }
        Ok(items)
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        match &self.cur.kind {
            TokKind::Ident(s) => {
                let id = Ident {
                    text: s.clone(),
                    span: self.cur.span,
                };
                self.bump();
                Ok(id)
            }
            _ => self.fail("expected identifier"),
        }
    }

    fn parse_type(&mut self) -> Result<TypeExpr> {
        let name = self.parse_ident()?;
        let start = name.span.start;
        let mut end = name.span.end;
        let mut dims = 0;
        while matches!(self.cur.kind, TokKind::LBracket) {
            self.bump();
            end = self.expect(TokKind::RBracket)?.span.end;
            dims += 1;
        }
        Ok(TypeExpr {
            name,
            dims,
            span: self.span_from(start, end),
        })
    }

    fn parse_param(&mut self) -> Result<Param> {
        let name = self.parse_ident()?;
        self.expect(TokKind::Colon)?;
        let ty = self.parse_type()?;
        let span = self.span_from(name.span.start, ty.span.end);
        Ok(Param { name, ty, span })
    }

    fn parse_sig(&mut self) -> Result<SigExpr> {
        let start = self.expect(TokKind::LParen)?.span.start;
        let params = if matches!(self.cur.kind, TokKind::RParen) {
            Vec::new()
        } else {
            self.parse_list(Self::parse_param)?
        };
        self.expect(TokKind::RParen)?;
        self.expect(TokKind::Arrow)?;
        let ret = self.parse_type()?;
        let span = self.span_from(start, ret.span.end);
        Ok(SigExpr { params, ret, span })
    }

    fn parse_member(&mut self) -> Result<MemberRef> {
        let class = self.parse_ident()?;
        self.expect(TokKind::ColonColon)?;
        let member = self.parse_ident()?;
        let span = self.span_from(class.span.start, member.span.end);
        Ok(MemberRef {
            class,
            member,
            span,
        })
    }

    fn parse_pattern(&mut self) -> Result<Pattern> {
        let (text, quoted) = match &self.cur.kind {
            TokKind::Ident(s) => (s.clone(), false),
            TokKind::Str(s) => (s.clone(), true),
            _ => return self.fail("expected a name or pattern"),
        };
        let span = self.cur.span;
        self.bump();
        Ok(Pattern { text, quoted, span })
    }

    fn parse_patterns(&mut self) -> Result<Vec<Pattern>> {
        self.parse_list(Self::parse_pattern)
    }

    fn parse_binding(&mut self) -> Result<Binding> {
        let name = self.parse_ident()?;
        let ty = if matches!(self.cur.kind, TokKind::Colon) {
            self.bump();
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokKind::Eq)?;
        let start = name.span.start;
        let value = self.parse_lit()?;
        Ok(Binding {
            name,
            ty,
            value,
            span: self.span_from(start, self.last_end),
        })
    }

    fn parse_lit(&mut self) -> Result<Lit> {
        if matches!(self.cur.kind, TokKind::LBracket) {
            self.bump();
            let items = if matches!(self.cur.kind, TokKind::RBracket) {
                Vec::new()
            } else {
                self.parse_list(Self::parse_lit)?
            };
            self.expect(TokKind::RBracket)?;
            return Ok(Lit::Array(items));
        }
        let negative = matches!(self.cur.kind, TokKind::Minus);
        if negative {
            self.bump();
        }
        let lit = match &self.cur.kind {
            TokKind::Int(v) => Lit::Int(if negative { -v } else { *v }),
            TokKind::Long(v) => Lit::Long(if negative { -v } else { *v }),
            TokKind::Float(v) => Lit::Float(if negative { -v } else { *v }),
            TokKind::Str(s) if !negative => Lit::Str(s.clone()),
            TokKind::KwTrue if !negative => Lit::Bool(true),
            TokKind::KwFalse if !negative => Lit::Bool(false),
            TokKind::KwNull if !negative => Lit::Null,
            _ if negative => return self.fail("expected a number after `-`"),
            _ => return self.fail("expected a literal"),
        };
        self.bump();
        Ok(lit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_render_back() {
        let src = r#"sig (a: String, xs: int[]) -> String; insert 1 n: long = -3L; filter "a|b" = C::m; invoke static Strings::concat; call ("x", null, [1, -2]);"#;
        let script = parse_str("<mem>", src).unwrap();
        let rendered: Vec<String> = script.stmts.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "sig (a: String, xs: int[]) -> String;",
                "insert 1 n: long = -3L;",
                "filter \"a|b\" = C::m;",
                "invoke static Strings::concat;",
                "call (\"x\", null, [1, -2]);",
            ]
        );
    }

    #[test]
    fn sources_must_fit_u32_spans() {
        assert!(check_len(0).is_ok());
        assert!(check_len(u32::MAX as usize).is_ok());
        #[cfg(target_pointer_width = "64")]
        {
            let err = check_len(u32::MAX as usize + 1).unwrap_err();
            assert!(err.to_string().starts_with("source too large to parse"), "{err}");
        }
    }

    #[test]
    fn statement_spans_cover_the_semicolon() {
        let script = parse_str("<mem>", "  drop x;").unwrap();
        assert_eq!(script.stmts[0].span, Span { start: 2, end: 9 });
    }
}
