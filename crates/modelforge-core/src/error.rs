//! Error types for ModelForge

use thiserror::Error;

/// Failure raised by a user-supplied function (coefficient, predicate,
/// index function, data query) while it is being evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct EvalError {
    message: String,
}

impl EvalError {
    /// Creates a new evaluation error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Main error type for ModelForge operations
#[derive(Debug, Error)]
pub enum ModelForgeError {
    /// Invalid or incomplete model configuration; the caller must fix the input.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Feature that this layer does not implement.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// A user function failed while evaluating the named variable or constraint.
    #[error("Evaluation error in '{entity}': {source}")]
    Evaluation {
        /// Name of the variable or constraint family being evaluated.
        entity: String,
        /// The underlying failure.
        #[source]
        source: EvalError,
    },

    /// Rational conversion could not produce a consistent result.
    #[error("Rational conversion error: {0}")]
    Rational(String),

    /// The external optimizer failed to run.
    #[error("Solver error: {0}")]
    Solver(String),

    /// Invalid operation for the current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl ModelForgeError {
    /// Wraps an evaluation failure with the name of the offending entity.
    pub fn evaluation(entity: impl Into<String>, source: EvalError) -> Self {
        ModelForgeError::Evaluation {
            entity: entity.into(),
            source,
        }
    }

    /// Returns true for configuration errors.
    pub fn is_config(&self) -> bool {
        matches!(self, ModelForgeError::Config(_))
    }

    /// Returns true for unsupported-feature errors.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ModelForgeError::Unsupported(_))
    }
}

/// Result type alias for ModelForge operations
pub type Result<T> = std::result::Result<T, ModelForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_error_names_entity() {
        let err = ModelForgeError::evaluation("capacity", EvalError::new("missing field 'cap'"));
        let rendered = err.to_string();
        assert!(rendered.contains("capacity"));
        assert!(rendered.contains("missing field 'cap'"));
    }

    #[test]
    fn test_error_classification() {
        assert!(ModelForgeError::Config("x".into()).is_config());
        assert!(ModelForgeError::Unsupported("y".into()).is_unsupported());
        assert!(!ModelForgeError::Solver("z".into()).is_config());
    }
}
