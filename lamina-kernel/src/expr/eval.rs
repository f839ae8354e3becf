//! Evaluation and static checking of expressions.

use std::cmp::Ordering;

use indexmap::IndexSet;

use crate::context::{ContextSnapshot, ContextValue, Schema, ValueKind};
use crate::error::EvalError;

use super::ast::{BinaryOp, Expr, UnaryOp};

impl Expr {
    /// Evaluate against a snapshot. Pure; `and`/`or` short-circuit.
    pub fn eval(&self, context: &ContextSnapshot) -> Result<ContextValue, EvalError> {
        match self {
            Expr::Name(name) => context
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
            Expr::Constant(value) => Ok(value.clone()),
            Expr::Unary(UnaryOp::Not, operand) => {
                Ok(ContextValue::Bool(!operand.eval(context)?.truthy()))
            }
            Expr::Binary(BinaryOp::And, left, right) => {
                let result = left.eval(context)?.truthy() && right.eval(context)?.truthy();
                Ok(ContextValue::Bool(result))
            }
            Expr::Binary(BinaryOp::Or, left, right) => {
                let result = left.eval(context)?.truthy() || right.eval(context)?.truthy();
                Ok(ContextValue::Bool(result))
            }
            Expr::Binary(op, left, right) => {
                let left = left.eval(context)?;
                let right = right.eval(context)?;
                compare(*op, &left, &right).map(ContextValue::Bool)
            }
        }
    }

    /// Evaluate and reduce to a bool by truthiness.
    pub fn eval_bool(&self, context: &ContextSnapshot) -> Result<bool, EvalError> {
        self.eval(context).map(|value| value.truthy())
    }

    /// Free variables, in order of first appearance.
    pub fn names(&self) -> IndexSet<&str> {
        let mut names = IndexSet::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut IndexSet<&'a str>) {
        match self {
            Expr::Name(name) => {
                names.insert(name.as_str());
            }
            Expr::Constant(_) => {}
            Expr::Unary(_, operand) => operand.collect_names(names),
            Expr::Binary(_, left, right) => {
                left.collect_names(names);
                right.collect_names(names);
            }
        }
    }

    /// Check that every name is declared in `schema` and that compared
    /// operands have the same kind. Returns the kind of the result.
    pub fn check(&self, schema: &impl Schema) -> Result<ValueKind, EvalError> {
        match self {
            Expr::Name(name) => schema
                .kind_of(name)
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
            Expr::Constant(value) => Ok(value.kind()),
            Expr::Unary(UnaryOp::Not, operand) => {
                operand.check(schema)?;
                Ok(ValueKind::Bool)
            }
            Expr::Binary(op, left, right) => {
                let left = left.check(schema)?;
                let right = right.check(schema)?;
                if op.is_comparison() && left != right {
                    return Err(EvalError::TypeMismatch {
                        op: *op,
                        left,
                        right,
                    });
                }
                Ok(ValueKind::Bool)
            }
        }
    }
}

fn compare(op: BinaryOp, left: &ContextValue, right: &ContextValue) -> Result<bool, EvalError> {
    match op {
        BinaryOp::Eq => return Ok(left == right),
        BinaryOp::Ne => return Ok(left != right),
        _ => {}
    }

    let ordering = match (left, right) {
        (ContextValue::Int(a), ContextValue::Int(b)) => a.cmp(b),
        (ContextValue::Str(a), ContextValue::Str(b)) => a.cmp(b),
        (ContextValue::Bool(a), ContextValue::Bool(b)) => a.cmp(b),
        _ => {
            return Err(EvalError::TypeMismatch {
                op,
                left: left.kind(),
                right: right.kind(),
            });
        }
    };

    Ok(match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        BinaryOp::And | BinaryOp::Or | BinaryOp::Eq | BinaryOp::Ne => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextKey, ContextKeys};
    use crate::expr::parse;

    fn context() -> ContextSnapshot {
        ContextSnapshot::from_values([
            ("num_selected_layers", ContextValue::Int(2)),
            ("active_layer_type", ContextValue::from("labels")),
            ("active_layer_is_rgb", ContextValue::Bool(false)),
            ("active_layer_dtype", ContextValue::from("")),
        ])
    }

    #[test]
    fn test_truthiness_drives_logic() {
        let ctx = context();
        let truthy = |source: &str| parse(source).unwrap().eval_bool(&ctx).unwrap();
        assert!(truthy("num_selected_layers and active_layer_type"));
        assert!(!truthy("active_layer_dtype or active_layer_is_rgb"));
        assert_eq!(
            parse("not active_layer_dtype").unwrap().eval(&ctx),
            Ok(ContextValue::Bool(true))
        );
        assert_eq!(
            parse("num_selected_layers and 7").unwrap().eval(&ctx),
            Ok(ContextValue::Bool(true))
        );
    }

    #[test]
    fn test_short_circuit_skips_missing_names() {
        let ctx = context();
        assert_eq!(
            parse("active_layer_is_rgb and nope").unwrap().eval(&ctx),
            Ok(ContextValue::Bool(false))
        );
        assert_eq!(
            parse("num_selected_layers or nope").unwrap().eval(&ctx),
            Ok(ContextValue::Bool(true))
        );
        assert_eq!(
            parse("nope or num_selected_layers").unwrap().eval(&ctx),
            Err(EvalError::UndefinedVariable("nope".to_string()))
        );
    }

    #[test]
    fn test_comparisons() {
        let ctx = context();
        let eval = |src: &str| parse(src).unwrap().eval_bool(&ctx);
        assert_eq!(eval("num_selected_layers >= 2"), Ok(true));
        assert_eq!(eval("num_selected_layers < 2"), Ok(false));
        assert_eq!(eval("active_layer_type == 'labels'"), Ok(true));
        assert_eq!(eval("active_layer_type != 'image'"), Ok(true));
        assert_eq!(eval("'abc' < 'abd'"), Ok(true));
    }

    #[test]
    fn test_mixed_kinds() {
        let ctx = context();
        assert_eq!(parse("num_selected_layers == '2'").unwrap().eval_bool(&ctx), Ok(false));
        assert_eq!(parse("1 == true").unwrap().eval_bool(&ctx), Ok(false));
        assert_eq!(parse("num_selected_layers != '2'").unwrap().eval_bool(&ctx), Ok(true));
        assert_eq!(
            parse("num_selected_layers > 'a'").unwrap().eval(&ctx),
            Err(EvalError::TypeMismatch {
                op: BinaryOp::Gt,
                left: ValueKind::Int,
                right: ValueKind::Str,
            })
        );
    }

    #[test]
    fn test_names_in_first_appearance_order() {
        let expr = parse("b == 1 and (a or b) and not c").unwrap();
        assert_eq!(expr.names().into_iter().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert!(Expr::constant(true).names().is_empty());
    }

    #[test]
    fn test_check_against_context_keys() {
        let ok = ContextKey::NumSelectedLayers.expr().ge(1) & ContextKey::HasActiveLayer.expr();
        assert_eq!(ok.check(&ContextKeys), Ok(ValueKind::Bool));
        assert_eq!(ContextKey::ActiveLayerType.expr().check(&ContextKeys), Ok(ValueKind::Str));

        let undefined = parse("num_selected_widgets == 1").unwrap();
        assert_eq!(
            undefined.check(&ContextKeys),
            Err(EvalError::UndefinedVariable("num_selected_widgets".to_string()))
        );

        let mismatched = ContextKey::ActiveLayerType.expr().equals(3);
        assert!(matches!(
            mismatched.check(&ContextKeys),
            Err(EvalError::TypeMismatch { op: BinaryOp::Eq, .. })
        ));
    }
}
