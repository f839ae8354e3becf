//! Condition expressions over context keys.
//!
//! Conditions are built in code with the builder methods and operator
//! overloads on [`Expr`], or parsed from strings in configuration files.
//! Both routes produce the same tree.

mod ast;
mod eval;
mod parser;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use parser::parse;

impl Expr {
    /// Parse a condition string. See [`parse`].
    pub fn parse(input: &str) -> Result<Expr, crate::error::ParseError> {
        parser::parse(input)
    }
}

impl std::str::FromStr for Expr {
    type Err = crate::error::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse(s)
    }
}
