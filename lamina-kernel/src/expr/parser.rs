//! Recursive-descent parser for condition strings.
//!
//! ```text
//! or      = and (("or" | "||" | "|") and)*
//! and     = not (("and" | "&&" | "&") not)*
//! not     = ("not" | "!") not | compare
//! compare = primary (cmp-op primary)*
//! primary = ident | int | string | "true" | "false" | "True" | "False" | "(" or ")"
//! ```

use crate::context::ContextValue;
use crate::error::ParseError;

use super::ast::{BinaryOp, Expr};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Str(String),
    Bool(bool),
    Op(BinaryOp),
    Not,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Int(n) => format!("integer {}", n),
            Token::Str(s) => format!("string {:?}", s),
            Token::Bool(b) => format!("{}", b),
            Token::Op(op) => format!("'{}'", op),
            Token::Not => "'not'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

/// Split `input` into `(position, token)` pairs.
fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let mut word = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    word.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            let token = match word.as_str() {
                "and" => Token::Op(BinaryOp::And),
                "or" => Token::Op(BinaryOp::Or),
                "not" => Token::Not,
                "true" | "True" => Token::Bool(true),
                "false" | "False" => Token::Bool(false),
                _ => Token::Ident(word),
            };
            tokens.push((pos, token));
            continue;
        }

        let negative = ch == '-';
        if ch.is_ascii_digit() || negative {
            chars.next();
            let mut digits = String::from(ch);
            while let Some(&(_, c)) = chars.peek() {
                if c.is_ascii_digit() {
                    digits.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if digits == "-" {
                return Err(ParseError::new("expected digits after '-'", pos));
            }
            let value = digits
                .parse::<i64>()
                .map_err(|_| ParseError::new(format!("integer out of range: {}", digits), pos))?;
            tokens.push((pos, Token::Int(value)));
            continue;
        }

        if ch == '\'' || ch == '"' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            while let Some((_, c)) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some((_, escaped)) => text.push(escaped),
                        None => break,
                    },
                    c if c == ch => {
                        closed = true;
                        break;
                    }
                    c => text.push(c),
                }
            }
            if !closed {
                return Err(ParseError::new("unterminated string", pos));
            }
            tokens.push((pos, Token::Str(text)));
            continue;
        }

        chars.next();
        let next = chars.peek().map(|&(_, c)| c);
        let (token, doubled) = match (ch, next) {
            ('=', Some('=')) => (Token::Op(BinaryOp::Eq), true),
            ('!', Some('=')) => (Token::Op(BinaryOp::Ne), true),
            ('<', Some('=')) => (Token::Op(BinaryOp::Le), true),
            ('>', Some('=')) => (Token::Op(BinaryOp::Ge), true),
            ('&', Some('&')) => (Token::Op(BinaryOp::And), true),
            ('|', Some('|')) => (Token::Op(BinaryOp::Or), true),
            ('<', _) => (Token::Op(BinaryOp::Lt), false),
            ('>', _) => (Token::Op(BinaryOp::Gt), false),
            ('&', _) => (Token::Op(BinaryOp::And), false),
            ('|', _) => (Token::Op(BinaryOp::Or), false),
            ('!', _) => (Token::Not, false),
            ('(', _) => (Token::LParen, false),
            (')', _) => (Token::RParen, false),
            _ => return Err(ParseError::new(format!("unexpected character '{}'", ch), pos)),
        };
        if doubled {
            chars.next();
        }
        tokens.push((pos, token));
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    cursor: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|(_, token)| token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.cursor)
            .map(|(pos, _)| *pos)
            .unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).map(|(_, token)| token.clone());
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    /// Consume a binary operator accepted by `accept`.
    fn binary_op(&mut self, accept: fn(BinaryOp) -> bool) -> Option<BinaryOp> {
        match self.peek() {
            Some(Token::Op(op)) if accept(*op) => {
                let op = *op;
                self.cursor += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while let Some(op) = self.binary_op(|op| op == BinaryOp::Or) {
            let right = self.parse_and()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while let Some(op) = self.binary_op(|op| op == BinaryOp::And) {
            let right = self.parse_not()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == Some(&Token::Not) {
            self.cursor += 1;
            return Ok(!self.parse_not()?);
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_primary()?;
        while let Some(op) = self.binary_op(BinaryOp::is_comparison) {
            let right = self.parse_primary()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let position = self.position();
        match self.advance() {
            Some(Token::Ident(name)) => Ok(Expr::Name(name)),
            Some(Token::Int(n)) => Ok(Expr::Constant(ContextValue::Int(n))),
            Some(Token::Str(s)) => Ok(Expr::Constant(ContextValue::Str(s))),
            Some(Token::Bool(b)) => Ok(Expr::Constant(ContextValue::Bool(b))),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ParseError::new(
                        format!("expected ')', found {}", other.describe()),
                        self.tokens[self.cursor - 1].0,
                    )),
                    None => Err(ParseError::new("expected ')', found end of input", self.end)),
                }
            }
            Some(other) => Err(ParseError::new(
                format!("expected an operand, found {}", other.describe()),
                position,
            )),
            None => Err(ParseError::new("expected an operand, found end of input", position)),
        }
    }
}

/// Parse a condition string into an [`Expr`].
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        end: input.len(),
    };
    let expr = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ParseError::new(
            format!("unexpected {}", token.describe()),
            parser.position(),
        )),
    }
}
