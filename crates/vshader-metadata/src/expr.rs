//! Evaluator for `only_if(…)` keyword constraints.
//!
//! Grammar, smallest thing that covers real material permutation rules:
//!
//! ```text
//! expr    := or
//! or      := and ('||' and)*
//! and     := cmp ('&&' cmp)*
//! cmp     := primary (('==' | '!=') primary)?
//! primary := IDENT | NUMBER | 'true' | 'false' | '(' expr ')'
//! ```
//!
//! Identifiers resolve in order: boolean literal, keyword value in the
//! context, enumerant of any Enum declaration (yielding its index).
//! A bare primary with no comparator is truthy iff non-zero.

use std::collections::BTreeMap;

use vshader_types::{Error, Result};

use crate::keywords::{KeywordDecl, KeywordValueKind};

/// Resolution context for one variant: keyword values plus the declarations
/// used for enumerant lookup.
#[derive(Debug, Default)]
pub struct KeywordValueContext<'a> {
    /// Keyword name -> numeric value (bool: 0/1, enum: index).
    pub values: BTreeMap<&'a str, u32>,
    /// Keyword name -> declaration.
    pub decls: BTreeMap<&'a str, &'a KeywordDecl>,
}

impl<'a> KeywordValueContext<'a> {
    fn resolve_ident(&self, name: &str) -> Result<u32> {
        match name {
            "true" | "TRUE" | "True" => return Ok(1),
            "false" | "FALSE" | "False" => return Ok(0),
            _ => {}
        }

        if let Some(v) = self.values.get(name) {
            return Ok(*v);
        }

        // Enumerant search across all Enum declarations; the set is small.
        for decl in self.decls.values() {
            if decl.kind != KeywordValueKind::Enum {
                continue;
            }
            if let Some(i) = decl.enumerants.iter().position(|e| e == name) {
                return Ok(i as u32);
            }
        }

        Err(Error::parse(format!("unknown identifier in only_if: {name}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Number(u32),
    LParen,
    RParen,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    End,
}

struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            bytes: s.as_bytes(),
            pos: 0,
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        let Some(&c) = self.bytes.get(self.pos) else {
            return Ok(Token::End);
        };

        let two = |lexer: &Self, b: u8| lexer.bytes.get(lexer.pos + 1) == Some(&b);

        match c {
            b'(' => {
                self.pos += 1;
                Ok(Token::LParen)
            }
            b')' => {
                self.pos += 1;
                Ok(Token::RParen)
            }
            b'=' if two(self, b'=') => {
                self.pos += 2;
                Ok(Token::EqEq)
            }
            b'!' if two(self, b'=') => {
                self.pos += 2;
                Ok(Token::NotEq)
            }
            b'&' if two(self, b'&') => {
                self.pos += 2;
                Ok(Token::AndAnd)
            }
            b'|' if two(self, b'|') => {
                self.pos += 2;
                Ok(Token::OrOr)
            }
            b'0'..=b'9' => {
                let start = self.pos;
                while self
                    .bytes
                    .get(self.pos)
                    .is_some_and(|b| b.is_ascii_digit())
                {
                    self.pos += 1;
                }
                let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("");
                let value = text
                    .parse::<u32>()
                    .map_err(|_| Error::parse(format!("number overflow in only_if: {text}")))?;
                Ok(Token::Number(value))
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = self.pos;
                while self
                    .bytes
                    .get(self.pos)
                    .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
                {
                    self.pos += 1;
                }
                let text = std::str::from_utf8(&self.bytes[start..self.pos])
                    .map_err(|_| Error::parse("non-ASCII identifier in only_if"))?;
                Ok(Token::Ident(text.to_string()))
            }
            other => Err(Error::parse(format!(
                "unexpected character in only_if: '{}'",
                other as char
            ))),
        }
    }
}

struct Parser<'a, 'c> {
    lexer: Lexer<'a>,
    cur: Token,
    ctx: &'a KeywordValueContext<'c>,
}

impl<'a, 'c> Parser<'a, 'c> {
    fn new(text: &'a str, ctx: &'a KeywordValueContext<'c>) -> Result<Self> {
        let mut lexer = Lexer::new(text);
        let cur = lexer.next_token()?;
        Ok(Self { lexer, cur, ctx })
    }

    fn advance(&mut self) -> Result<()> {
        self.cur = self.lexer.next_token()?;
        Ok(())
    }

    fn parse_primary(&mut self) -> Result<u32> {
        match self.cur.clone() {
            Token::Ident(name) => {
                self.advance()?;
                self.ctx.resolve_ident(&name)
            }
            Token::Number(v) => {
                self.advance()?;
                Ok(v)
            }
            Token::LParen => {
                self.advance()?;
                let v = self.parse_or()?;
                if self.cur != Token::RParen {
                    return Err(Error::parse("expected ')' in only_if"));
                }
                self.advance()?;
                Ok(u32::from(v))
            }
            _ => Err(Error::parse("expected primary expression in only_if")),
        }
    }

    fn parse_cmp(&mut self) -> Result<bool> {
        let lhs = self.parse_primary()?;
        match self.cur {
            Token::EqEq => {
                self.advance()?;
                let rhs = self.parse_primary()?;
                Ok(lhs == rhs)
            }
            Token::NotEq => {
                self.advance()?;
                let rhs = self.parse_primary()?;
                Ok(lhs != rhs)
            }
            _ => Ok(lhs != 0),
        }
    }

    fn parse_and(&mut self) -> Result<bool> {
        let mut v = self.parse_cmp()?;
        while self.cur == Token::AndAnd {
            self.advance()?;
            let rhs = self.parse_cmp()?;
            v = v && rhs;
        }
        Ok(v)
    }

    fn parse_or(&mut self) -> Result<bool> {
        let mut v = self.parse_and()?;
        while self.cur == Token::OrOr {
            self.advance()?;
            let rhs = self.parse_and()?;
            v = v || rhs;
        }
        Ok(v)
    }
}

/// Strips the optional `only_if(…)` wrapper, leaving the bare expression.
fn strip_only_if(constraint: &str) -> &str {
    let s = constraint.trim();
    if let Some(rest) = s.strip_prefix("only_if") {
        if let (Some(lp), Some(rp)) = (rest.find('('), rest.rfind(')')) {
            if rp > lp {
                return rest[lp + 1..rp].trim();
            }
        }
    }
    s
}

/// Evaluates a constraint against the given context.
///
/// Accepts either `only_if(<expr>)` or a bare `<expr>`. An empty
/// constraint evaluates to `true`. Trailing tokens after a complete
/// expression are an error.
pub fn eval_only_if(constraint: &str, ctx: &KeywordValueContext<'_>) -> Result<bool> {
    let expr = strip_only_if(constraint);
    if expr.is_empty() {
        return Ok(true);
    }

    let mut parser = Parser::new(expr, ctx)?;
    let value = parser.parse_or()?;

    if parser.cur != Token::End {
        return Err(Error::parse("trailing tokens in only_if expression"));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::KeywordDecl;

    fn ctx_with<'a>(
        values: &[(&'a str, u32)],
        decls: &'a [KeywordDecl],
    ) -> KeywordValueContext<'a> {
        let mut ctx = KeywordValueContext::default();
        for (name, v) in values {
            ctx.values.insert(name, *v);
        }
        for d in decls {
            ctx.decls.insert(d.name.as_str(), d);
        }
        ctx
    }

    fn surface_decls() -> Vec<KeywordDecl> {
        vec![
            KeywordDecl::parse_tokens(&["permute", "SURFACE=OPAQUE|CUTOUT"]).unwrap(),
            KeywordDecl::parse_tokens(&["permute", "ALPHA_CLIP=0"]).unwrap(),
        ]
    }

    #[test]
    fn grammar_table() {
        let decls = surface_decls();
        let ctx = ctx_with(&[("SURFACE", 1), ("ALPHA_CLIP", 0), ("LIGHTS", 3)], &decls);

        let cases: &[(&str, bool)] = &[
            ("", true),
            ("true", true),
            ("false", false),
            ("0", false),
            ("7", true),
            ("LIGHTS", true),
            ("ALPHA_CLIP", false),
            ("SURFACE==CUTOUT", true),
            ("SURFACE==OPAQUE", false),
            ("SURFACE!=OPAQUE", true),
            ("LIGHTS==3", true),
            ("LIGHTS!=3", false),
            ("SURFACE==CUTOUT && ALPHA_CLIP", false),
            ("SURFACE==CUTOUT || ALPHA_CLIP", true),
            // '&&' binds tighter than '||'.
            ("true || false && false", true),
            ("(true || false) && false", false),
            ("only_if(SURFACE==CUTOUT)", true),
            ("(SURFACE==CUTOUT)", true),
            ("LIGHTS == 3 && SURFACE == CUTOUT || ALPHA_CLIP", true),
        ];

        for (expr, expected) in cases {
            assert_eq!(
                eval_only_if(expr, &ctx).unwrap(),
                *expected,
                "expr: {expr}"
            );
        }
    }

    #[test]
    fn short_circuit_still_requires_valid_operands() {
        // The evaluator parses eagerly, so unknown identifiers fail even on
        // the short-circuited side.
        let decls = surface_decls();
        let ctx = ctx_with(&[("SURFACE", 0)], &decls);
        assert!(eval_only_if("true || NO_SUCH", &ctx).is_err());
        assert!(eval_only_if("false && NO_SUCH", &ctx).is_err());
    }

    #[test]
    fn enumerant_lookup_spans_all_enum_decls() {
        let decls = surface_decls();
        let ctx = ctx_with(&[("SURFACE", 1)], &decls);
        assert_eq!(eval_only_if("CUTOUT", &ctx).unwrap(), true);
        assert_eq!(eval_only_if("OPAQUE", &ctx).unwrap(), false);
    }

    #[test]
    fn rejects_malformed_expressions() {
        let decls = surface_decls();
        let ctx = ctx_with(&[("SURFACE", 1)], &decls);
        assert!(eval_only_if("SURFACE ==", &ctx).is_err());
        assert!(eval_only_if("(SURFACE", &ctx).is_err());
        assert!(eval_only_if("SURFACE CUTOUT", &ctx).is_err());
        assert!(eval_only_if("NO_SUCH", &ctx).is_err());
        assert!(eval_only_if("SURFACE @ 1", &ctx).is_err());
    }
}
