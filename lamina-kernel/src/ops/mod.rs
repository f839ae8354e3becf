//! Layer transformation operations.
//!
//! Each operation validates its preconditions against the layer list before
//! mutating anything. Actions refer to operations through [`Operation`],
//! which is the closed table of things an action can do.

mod convert_dtype;
mod convert_type;
mod duplicate;
mod project;
mod rasterize;
mod visibility;

use std::fmt;
use std::str::FromStr;

use lamina_api::{DType, LayerId, LayerKind, LayerList};
use serde::{Deserialize, Serialize};

use crate::error::OperationError;

pub use convert_dtype::convert_dtype;
pub use convert_type::{convert_type, is_supported_conversion};
pub use duplicate::duplicate;
pub use project::project;
pub use rasterize::rasterize;
pub use visibility::toggle_visibility;

/// Reduction applied by [`project`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    Max,
    Min,
    Std,
    Sum,
    Mean,
    Median,
}

impl ProjectionMode {
    pub const ALL: [ProjectionMode; 6] = [
        ProjectionMode::Max,
        ProjectionMode::Min,
        ProjectionMode::Std,
        ProjectionMode::Sum,
        ProjectionMode::Mean,
        ProjectionMode::Median,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ProjectionMode::Max => "max",
            ProjectionMode::Min => "min",
            ProjectionMode::Std => "std",
            ProjectionMode::Sum => "sum",
            ProjectionMode::Mean => "mean",
            ProjectionMode::Median => "median",
        }
    }
}

impl fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProjectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectionMode::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| format!("unknown projection mode: {}", s))
    }
}

/// An operation together with its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Duplicate,
    Project(ProjectionMode),
    ConvertDtype(DType),
    ConvertType(LayerKind),
    ToggleVisibility,
}

impl Operation {
    /// Operation names accepted in the `action` field of a declarative spec.
    pub const NAMES: [&'static str; 5] = [
        "duplicate",
        "project",
        "convert_dtype",
        "convert_type",
        "toggle_visibility",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Duplicate => "duplicate",
            Operation::Project(_) => "project",
            Operation::ConvertDtype(_) => "convert_dtype",
            Operation::ConvertType(_) => "convert_type",
            Operation::ToggleVisibility => "toggle_visibility",
        }
    }

    /// The `mode` argument, for operations that take one.
    pub fn mode(&self) -> Option<String> {
        match self {
            Operation::Duplicate | Operation::ToggleVisibility => None,
            Operation::Project(mode) => Some(mode.to_string()),
            Operation::ConvertDtype(dtype) => Some(dtype.to_string()),
            Operation::ConvertType(kind) => Some(kind.to_string()),
        }
    }

    /// Resolve an operation name and its optional mode.
    pub fn from_parts(action: &str, mode: Option<&str>) -> Result<Operation, String> {
        let required = || mode.ok_or_else(|| format!("{} requires a mode", action));
        let operation = match action {
            "duplicate" => Operation::Duplicate,
            "toggle_visibility" => Operation::ToggleVisibility,
            "project" => Operation::Project(required()?.parse::<ProjectionMode>()?),
            "convert_dtype" => {
                let dtype = required()?.parse::<DType>().map_err(|e| format!("{}", e))?;
                Operation::ConvertDtype(dtype)
            }
            "convert_type" => {
                let kind = required()?.parse::<LayerKind>().map_err(|e| format!("{}", e))?;
                Operation::ConvertType(kind)
            }
            other => return Err(format!("unknown operation: {}", other)),
        };
        if operation.mode().is_none() && mode.is_some() {
            return Err(format!("{} takes no mode", action));
        }
        Ok(operation)
    }

    /// Run against `layers`, returning the ids of created or changed layers.
    pub fn apply(&self, layers: &mut LayerList) -> Result<Vec<LayerId>, OperationError> {
        match *self {
            Operation::Duplicate => duplicate(layers).map(|id| vec![id]),
            Operation::Project(mode) => project(layers, mode).map(|id| vec![id]),
            Operation::ConvertDtype(dtype) => convert_dtype(layers, dtype),
            Operation::ConvertType(kind) => convert_type(layers, kind),
            Operation::ToggleVisibility => Ok(toggle_visibility(layers)),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode() {
            Some(mode) => write!(f, "{}({})", self.name(), mode),
            None => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts() {
        assert_eq!(Operation::from_parts("duplicate", None), Ok(Operation::Duplicate));
        assert_eq!(
            Operation::from_parts("project", Some("median")),
            Ok(Operation::Project(ProjectionMode::Median))
        );
        assert_eq!(
            Operation::from_parts("convert_dtype", Some("uint16")),
            Ok(Operation::ConvertDtype(DType::UInt16))
        );
        assert_eq!(
            Operation::from_parts("convert_type", Some("labels")),
            Ok(Operation::ConvertType(LayerKind::Labels))
        );
        assert!(Operation::from_parts("project", None).is_err());
        assert!(Operation::from_parts("project", Some("mode")).is_err());
        assert!(Operation::from_parts("duplicate", Some("max")).is_err());
        assert!(Operation::from_parts("explode", None).is_err());
    }

    #[test]
    fn test_names_cover_every_operation() {
        let ops = [
            Operation::Duplicate,
            Operation::Project(ProjectionMode::Max),
            Operation::ConvertDtype(DType::Int8),
            Operation::ConvertType(LayerKind::Image),
            Operation::ToggleVisibility,
        ];
        for op in ops {
            assert!(Operation::NAMES.contains(&op.name()));
            let mode = op.mode();
            assert_eq!(Operation::from_parts(op.name(), mode.as_deref()), Ok(op));
        }
    }
}
