//! Error type for template compilation and evaluation.

use ftbar_core::error::FtbarError;

/// Why a template produced no value.
///
/// Render pipelines never surface these to the user; they are logged and
/// the affected content, tooltip or click action is treated as empty.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("Syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },
    #[error("Undefined symbol: {0}")]
    UndefinedVariable(String),
    #[error("Type error: {0}")]
    Type(String),
    #[error("Value is not callable: {0}")]
    NotCallable(String),
    #[error("Invalid arguments for {function}: {message}")]
    InvalidArguments { function: String, message: String },
    #[error("Evaluation exceeded {0} steps")]
    StepLimitExceeded(u64),
    #[error("Expression nesting exceeds depth {0}")]
    DepthLimitExceeded(usize),
}

impl EvaluationError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        EvaluationError::Syntax {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_args(function: &str, message: impl Into<String>) -> Self {
        EvaluationError::InvalidArguments {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

impl From<EvaluationError> for FtbarError {
    fn from(err: EvaluationError) -> Self {
        FtbarError::Template(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_error_display() {
        let err = EvaluationError::syntax(4, "unexpected token ')'");
        assert_eq!(err.to_string(), "Syntax error at offset 4: unexpected token ')'");

        let err = EvaluationError::UndefinedVariable("battery".to_string());
        assert_eq!(err.to_string(), "Undefined symbol: battery");

        let err = EvaluationError::invalid_args("round", "expected a number");
        assert_eq!(
            err.to_string(),
            "Invalid arguments for round: expected a number"
        );

        let err = EvaluationError::StepLimitExceeded(10);
        assert_eq!(err.to_string(), "Evaluation exceeded 10 steps");

        let err = EvaluationError::DepthLimitExceeded(64);
        assert_eq!(err.to_string(), "Expression nesting exceeds depth 64");
    }

    #[test]
    fn test_evaluation_error_into_ftbar_error() {
        let err: FtbarError = EvaluationError::NotCallable("string".to_string()).into();
        assert!(matches!(err, FtbarError::Template(_)));
        assert!(err.to_string().contains("not callable"));
    }
}
