//! Kernel error types.

use std::path::PathBuf;

use lamina_api::{CastError, DType, LayerError, LayerKind, LayerListError};
use thiserror::Error;

use crate::actions::ActionId;
use crate::context::ValueKind;
use crate::expr::BinaryOp;

/// Failure to evaluate or type-check an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("cannot apply {op} to {left} and {right}")]
    TypeMismatch {
        op: BinaryOp,
        left: ValueKind,
        right: ValueKind,
    },
}

/// A syntax error in a condition string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the input.
    pub position: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Rejected action or submenu registration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("action already registered: {0}")]
    DuplicateAction(ActionId),

    #[error("submenu already registered: {0}")]
    DuplicateSubmenu(String),

    #[error("{action}: unknown submenu {submenu}")]
    UnknownSubmenu { action: ActionId, submenu: String },

    #[error("{action}: {field} references undefined variable {name}")]
    UndefinedVariable {
        action: ActionId,
        field: &'static str,
        name: String,
    },

    #[error("{action}: {field} is ill-typed: {source}")]
    TypeMismatch {
        action: ActionId,
        field: &'static str,
        source: EvalError,
    },

    #[error("{id}: unknown field {field}")]
    UnknownField { id: String, field: String },

    #[error("{id}: missing field {field}")]
    MissingField { id: String, field: &'static str },

    #[error("{id}: invalid {field}: {reason}")]
    InvalidField {
        id: String,
        field: &'static str,
        reason: String,
    },

    #[error("{id}: cannot parse {field}: {source}")]
    Parse {
        id: String,
        field: &'static str,
        source: ParseError,
    },

    #[error("unknown action: {0}")]
    UnknownAction(String),
}

/// A layer whose dtype conversion would have lost data.
#[derive(Debug, Clone, PartialEq)]
pub struct DtypeFailure {
    pub layer: String,
    pub source: CastError,
}

/// Shapes whose bounds exceed the largest paintable canvas.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("shapes need a {rows} x {cols} canvas, limit is {limit} pixels")]
pub struct CanvasTooLarge {
    pub rows: f64,
    pub cols: f64,
    pub limit: usize,
}

/// Failure of a transformation operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperationError {
    #[error("no active layer")]
    NoActiveLayer,

    #[error("cannot project: {0}")]
    NotReducible(String),

    #[error("layer {layer} is {found}, expected {expected}")]
    KindMismatch {
        layer: String,
        expected: LayerKind,
        found: LayerKind,
    },

    #[error("{0} is not an integer dtype")]
    InvalidDtype(DType),

    #[error("conversion would lose data: {}", describe_failures(.0))]
    DataLoss(Vec<DtypeFailure>),

    #[error("cannot convert {from} layer {layer} to {to}")]
    UnsupportedConversion {
        layer: String,
        from: LayerKind,
        to: LayerKind,
    },

    #[error("cannot rasterize {layer}: {source}")]
    CanvasTooLarge {
        layer: String,
        source: CanvasTooLarge,
    },

    #[error("layer error: {0}")]
    Layer(#[from] LayerError),

    #[error("layer list error: {0}")]
    List(#[from] LayerListError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

fn describe_failures(failures: &[DtypeFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.layer, f.source))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure to load a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config rejected: {0}")]
    Registry(#[from] RegistryError),
}
