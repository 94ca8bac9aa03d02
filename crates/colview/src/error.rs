//! Error types for view resolution, layout and rendering.
//!
//! The taxonomy follows how far each failure is allowed to travel:
//!
//! | Error | Travels to |
//! |-------|-----------|
//! | [`FormatError::LookupMiss`], [`FormatError::Evaluation`] | absorbed at the cell or group header, recorded as a [`Diagnostic`](crate::pipeline::Diagnostic) |
//! | [`FormatError::Configuration`], [`FormatError::Layout`] | the immediate caller of the register/render call |
//! | [`FormatError::FrozenMutation`] | always propagates |

use thiserror::Error;

pub use colview_markup::FrozenMutationError;

/// A property or expression failed while producing a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EvalError {
    pub message: String,
}

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<minijinja::Error> for EvalError {
    fn from(err: minijinja::Error) -> Self {
        // The detail carries the useful part; Display adds template context we don't have.
        let message = match err.detail() {
            Some(detail) => format!("{}: {}", err.kind(), detail),
            None => err.kind().to_string(),
        };
        EvalError::new(message)
    }
}

/// Auto-sized columns have no usable width.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not enough width for {auto_columns} auto-sized column(s): {remaining} column(s) left, need {needed}")]
pub struct LayoutError {
    pub auto_columns: usize,
    pub remaining: isize,
    pub needed: usize,
}

/// Error type for all colview operations.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Invalid registration or request (empty type name, malformed template, ...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A property or type was absent.
    #[error("property '{property}' not found")]
    LookupMiss { property: String },

    /// A property getter or expression failed.
    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvalError),

    /// Mutation of a frozen value or collection.
    #[error(transparent)]
    FrozenMutation(#[from] FrozenMutationError),

    /// No usable width for auto columns.
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Reading a config file or view source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing YAML config or view definitions.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl FormatError {
    /// True for the errors that rendering absorbs into diagnostics.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FormatError::LookupMiss { .. } | FormatError::Evaluation(_))
    }
}

/// Result type for colview operations.
pub type Result<T> = std::result::Result<T, FormatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FormatError::LookupMiss {
            property: "Name".into(),
        };
        assert_eq!(err.to_string(), "property 'Name' not found");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_layout_error_is_fatal() {
        let err: FormatError = LayoutError {
            auto_columns: 2,
            remaining: 3,
            needed: 8,
        }
        .into();
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("2 auto-sized"));
    }

    #[test]
    fn test_frozen_mutation_is_transparent() {
        let err: FormatError = FrozenMutationError::new("multimap").into();
        assert_eq!(err.to_string(), "cannot modify frozen multimap");
    }

    #[test]
    fn test_from_minijinja_error() {
        let mj = minijinja::Error::new(minijinja::ErrorKind::UndefinedError, "'x' is undefined");
        let err: EvalError = mj.into();
        assert!(err.message.contains("'x' is undefined"));
    }
}
