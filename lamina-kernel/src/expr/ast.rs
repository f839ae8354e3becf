//! Expression tree for action conditions.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use serde::{Deserialize, Serialize};

use crate::context::{ContextKey, ContextValue};

/// A condition over context variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Name(String),
    Constant(ContextValue),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Canonical spelling, as accepted by [`Expr::parse`].
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }

    pub fn is_comparison(self) -> bool {
        !matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_ordering(self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            _ => 4,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

const NOT_PRECEDENCE: u8 = 3;
const ATOM_PRECEDENCE: u8 = 5;

impl Expr {
    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name(name.into())
    }

    pub fn constant(value: impl Into<ContextValue>) -> Self {
        Expr::Constant(value.into())
    }

    pub fn binary(op: BinaryOp, left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Expr::Binary(op, Box::new(left.into()), Box::new(right.into()))
    }

    pub fn equals(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Eq, self, other)
    }

    pub fn not_equals(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Ne, self, other)
    }

    pub fn lt(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Lt, self, other)
    }

    pub fn le(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Le, self, other)
    }

    pub fn gt(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Gt, self, other)
    }

    pub fn ge(self, other: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Ge, self, other)
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Name(_) | Expr::Constant(_) => ATOM_PRECEDENCE,
            Expr::Unary(UnaryOp::Not, _) => NOT_PRECEDENCE,
            Expr::Binary(op, _, _) => op.precedence(),
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Name(name) => f.write_str(name),
            Expr::Constant(ContextValue::Bool(b)) => f.write_str(if *b { "true" } else { "false" }),
            Expr::Constant(ContextValue::Int(n)) => write!(f, "{}", n),
            Expr::Constant(ContextValue::Str(s)) => {
                f.write_str("'")?;
                for ch in s.chars() {
                    if ch == '\'' || ch == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{}", ch)?;
                }
                f.write_str("'")
            }
            Expr::Unary(UnaryOp::Not, operand) => {
                f.write_str("not ")?;
                operand.fmt_operand(f, NOT_PRECEDENCE)
            }
            Expr::Binary(op, left, right) => {
                // Left-associative: an equal-precedence right operand needs parens.
                let p = op.precedence();
                left.fmt_operand(f, p)?;
                write!(f, " {} ", op)?;
                right.fmt_operand(f, p + 1)
            }
        }
    }
}

impl From<ContextKey> for Expr {
    fn from(key: ContextKey) -> Self {
        key.expr()
    }
}

impl From<ContextValue> for Expr {
    fn from(value: ContextValue) -> Self {
        Expr::Constant(value)
    }
}

macro_rules! constant_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Expr {
                fn from(value: $t) -> Self {
                    Expr::Constant(value.into())
                }
            }
        )*
    };
}

constant_from!(bool, i32, i64, usize, &str, String);

impl BitAnd for Expr {
    type Output = Expr;

    fn bitand(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::And, self, rhs)
    }
}

impl BitOr for Expr {
    type Output = Expr;

    fn bitor(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Or, self, rhs)
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Unary(UnaryOp::Not, Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_produces_tree() {
        let expr = ContextKey::NumSelectedLayers.expr().equals(1)
            & ContextKey::ActiveLayerType.expr().equals("image");
        match &expr {
            Expr::Binary(BinaryOp::And, left, right) => {
                assert_eq!(
                    **left,
                    Expr::binary(BinaryOp::Eq, Expr::name("num_selected_layers"), 1)
                );
                assert_eq!(
                    **right,
                    Expr::binary(BinaryOp::Eq, Expr::name("active_layer_type"), "image")
                );
            }
            other => panic!("expected and, got {:?}", other),
        }
    }

    #[test]
    fn test_display_parenthesizes_by_precedence() {
        let a = || Expr::name("a");
        let b = || Expr::name("b");
        let c = || Expr::name("c");
        assert_eq!(((a() | b()) & c()).to_string(), "(a or b) and c");
        assert_eq!((a() | (b() & c())).to_string(), "a or b and c");
        assert_eq!((a() & (b() & c())).to_string(), "a and (b and c)");
        assert_eq!((!(a() & b())).to_string(), "not (a and b)");
        assert_eq!((!a().equals(2)).to_string(), "not a == 2");
        assert_eq!((!a()).equals(false).to_string(), "(not a) == false");
    }

    #[test]
    fn test_display_escapes_strings() {
        assert_eq!(Expr::constant("it's").to_string(), r"'it\'s'");
    }
}
