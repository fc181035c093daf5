//! Recursive-descent, operator-precedence parser for the formula surface
//! syntax (Module C). Structured as a precedence chain
//! (`parse_iff` → `parse_implies` → `parse_or` → `parse_and` →
//! `parse_unary_or_quantifier` → `parse_atom_or_paren`), in the style of
//! `preprocessing/parser.rs`'s `parse_1_hybrid` .. `parse_9_terminal`
//! chain.
//!
//! Precedence, highest first: quantifier = `~` > `&` > `|` > `->` > `<->`.
//! Binary operators are left-associative; unary and quantifier are
//! right-associative (they recurse into their own precedence level for
//! their operand).

use crate::error::{Error, Result};
use crate::expr::{Context, Node};
use crate::tokenizer::{tokenize, Token};

struct Parser<'a> {
    ctx: &'a mut Context,
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

/// Parses `input` into a [`Node`] owned by `ctx`. The printed (infix) form
/// of the result round-trips through this function (spec §6).
pub fn parse(ctx: &mut Context, input: &str) -> Result<Node> {
    let tokens = tokenize(input)?;
    let mut p = Parser { ctx, tokens, pos: 0 };
    let node = p.parse_iff()?;
    if p.pos != p.tokens.len() {
        let (_, at) = p.tokens[p.pos].clone();
        return Err(Error::Parse {
            position: at,
            message: "trailing input after a complete formula".to_string(),
        });
    }
    Ok(node)
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_pos(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, p)| *p)
            .unwrap_or_else(|| self.tokens.last().map(|(_, p)| p + 1).unwrap_or(0))
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, tok: &Token, what: &str) -> Result<()> {
        match self.peek() {
            Some(t) if t == tok => {
                self.advance();
                Ok(())
            }
            _ => Err(Error::Parse {
                position: self.peek_pos(),
                message: format!("expected {what}"),
            }),
        }
    }

    fn eof_error(&self, what: &str) -> Error {
        Error::Parse {
            position: self.peek_pos(),
            message: format!("unexpected end of input, expected {what}"),
        }
    }

    // <-> : lowest precedence, left-associative
    fn parse_iff(&mut self) -> Result<Node> {
        let mut left = self.parse_implies()?;
        while matches!(self.peek(), Some(Token::DoubleArrow)) {
            self.advance();
            let right = self.parse_implies()?;
            left = self.ctx.iff(left, right);
        }
        Ok(left)
    }

    // -> : left-associative
    fn parse_implies(&mut self) -> Result<Node> {
        let mut left = self.parse_or()?;
        while matches!(self.peek(), Some(Token::Arrow)) {
            self.advance();
            let right = self.parse_or()?;
            left = self.ctx.implies(left, right);
        }
        Ok(left)
    }

    // | : left-associative
    fn parse_or(&mut self) -> Result<Node> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            let right = self.parse_and()?;
            left = self.ctx.lor(left, right);
        }
        Ok(left)
    }

    // & : left-associative
    fn parse_and(&mut self) -> Result<Node> {
        let mut left = self.parse_unary_or_quantifier()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.advance();
            let right = self.parse_unary_or_quantifier()?;
            left = self.ctx.land(left, right);
        }
        Ok(left)
    }

    // ~, !, ? : highest precedence, prefix, right-associative (the operand
    // is parsed at this same level, so a chain of prefixes nests directly
    // without needing parentheses: `~![x]:T` = `~(![x]:T)`).
    fn parse_unary_or_quantifier(&mut self) -> Result<Node> {
        match self.peek() {
            Some(Token::Not) => {
                self.advance();
                let operand = self.parse_unary_or_quantifier()?;
                Ok(self.ctx.neg(operand))
            }
            Some(Token::Forall) | Some(Token::Exists) => {
                let is_forall = matches!(self.peek(), Some(Token::Forall));
                self.advance();
                self.expect(&Token::LBracket, "'[' after quantifier")?;
                let var_name = self.parse_lower_ident()?;
                self.expect(&Token::RBracket, "']' after bound variable")?;
                self.expect(&Token::Colon, "':' after quantifier variable")?;
                let x = self.ctx.names.lookup_index(&var_name)?;
                let body = self.parse_unary_or_quantifier()?;
                Ok(if is_forall {
                    self.ctx.forall(x, body)
                } else {
                    self.ctx.exists(x, body)
                })
            }
            _ => self.parse_atom_or_paren(),
        }
    }

    fn parse_atom_or_paren(&mut self) -> Result<Node> {
        match self.peek().cloned() {
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_iff()?;
                self.expect(&Token::RParen, "closing ')'")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) if name == "T" => {
                self.advance();
                Ok(self.ctx.true_const())
            }
            Some(Token::Ident(name)) if name == "F" => {
                self.advance();
                Ok(self.ctx.false_const())
            }
            Some(Token::Ident(name)) if name == "edg" && self.peek_nth_is(1, &Token::LParen) => {
                self.advance(); // 'edg'
                self.advance(); // '('
                let x = self.parse_term()?;
                self.expect(&Token::Comma, "',' between edg arguments")?;
                let y = self.parse_term()?;
                self.expect(&Token::RParen, "closing ')' of edg(...)")?;
                self.ctx.edg(x, y)
            }
            Some(Token::Ident(name)) => {
                self.advance();
                self.finish_term_atom(name)
            }
            _ => Err(self.eof_error("an atom")),
        }
    }

    fn peek_nth_is(&self, n: usize, tok: &Token) -> bool {
        self.tokens.get(self.pos + n).map(|(t, _)| t) == Some(tok)
    }

    fn finish_term_atom(&mut self, first: String) -> Result<Node> {
        match self.peek() {
            Some(Token::At) => {
                self.advance();
                let pos = self.peek_pos();
                match self.advance() {
                    Some(Token::Number(n)) if n >= 1 => {
                        let i = self.ctx.names.lookup_index(&format!("{first}@{n}"))?;
                        Ok(self.ctx.var(i))
                    }
                    _ => Err(Error::Parse {
                        position: pos,
                        message: "propositional variable position must be >= 1".to_string(),
                    }),
                }
            }
            Some(Token::Eq) => {
                self.advance();
                let second = self.parse_term_ident()?;
                let x = self.ctx.names.lookup_index(&first)?;
                let y = self.ctx.names.lookup_index(&second)?;
                self.ctx.eq(x, y)
            }
            Some(Token::Lt) => {
                self.advance();
                let second = self.parse_term_ident()?;
                let x = self.ctx.names.lookup_index(&first)?;
                let y = self.ctx.names.lookup_index(&second)?;
                Ok(self.ctx.lt(x, y))
            }
            _ => Err(Error::Parse {
                position: self.peek_pos(),
                message: format!("bare term '{first}' is not a valid atom by itself"),
            }),
        }
    }

    fn parse_term(&mut self) -> Result<usize> {
        let name = self.parse_term_ident()?;
        self.ctx.names.lookup_index(&name)
    }

    fn parse_term_ident(&mut self) -> Result<String> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name),
            _ => Err(Error::Parse {
                position: self.peek_pos(),
                message: "expected an identifier (term)".to_string(),
            }),
        }
    }

    fn parse_lower_ident(&mut self) -> Result<String> {
        let pos = self.peek_pos();
        let name = self.parse_term_ident()?;
        if !name.chars().next().is_some_and(|c| c.is_lowercase()) {
            return Err(Error::Parse {
                position: pos,
                message: "bound variable name must start with a lowercase letter".to_string(),
            });
        }
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// Round-trip: `parse(print(phi)) == phi` for a mixed formula.
    fn round_trips_through_infix_printer() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "~(x=y) & edg(x,z)").unwrap();
        let printed = ctx.to_infix(&phi);
        let reparsed = parse(&mut ctx, &printed).unwrap();
        assert!(std::rc::Rc::ptr_eq(&phi, &reparsed));
    }

    #[test]
    /// Round-trip for a formula containing a bare propositional `var`
    /// atom: printing must not append a spurious second `@index`.
    fn round_trips_a_var_atom() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "p@1 | edg(x,y)").unwrap();
        let printed = ctx.to_infix(&phi);
        assert!(!printed.contains("p@1@"), "printed form was {printed:?}");
        let reparsed = parse(&mut ctx, &printed).unwrap();
        assert!(std::rc::Rc::ptr_eq(&phi, &reparsed));
    }

    #[test]
    /// `~ ! [x] : T` parses as `~ (! [x] : T)` (quantifier/not share the
    /// tightest, right-associative precedence level).
    fn unary_and_quantifier_nest_without_parens() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "~![x]:T").unwrap();
        let x = ctx.names.lookup_index("x").unwrap();
        let t = ctx.true_const();
        let qf = ctx.forall(x, t);
        let expected = ctx.neg(qf);
        assert!(std::rc::Rc::ptr_eq(&phi, &expected));
    }

    #[test]
    /// Binary operators are left-associative.
    fn binary_operators_are_left_associative() {
        let mut ctx = Context::new();
        let phi = parse(&mut ctx, "T & T & F").unwrap();
        let t = ctx.true_const();
        let f = ctx.false_const();
        let inner = ctx.land(t.clone(), t);
        let expected = ctx.land(inner, f);
        assert!(std::rc::Rc::ptr_eq(&phi, &expected));
    }

    #[test]
    /// Propositional variable positions must be >= 1.
    fn rejects_zero_propositional_position() {
        let mut ctx = Context::new();
        assert!(parse(&mut ctx, "x@0").is_err());
    }

    #[test]
    /// A bare term is not itself a valid atom.
    fn bare_term_is_a_parse_error() {
        let mut ctx = Context::new();
        assert!(parse(&mut ctx, "x").is_err());
    }
}
