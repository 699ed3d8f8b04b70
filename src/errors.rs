use thiserror::Error;

/// Raised while turning expression text into a compiled expression.
/// Surfaces to the caller of the constructor; never swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expression text is empty")]
    Empty,

    #[error("parse error at position {position}: {message}")]
    InvalidSyntax { message: String, position: usize },

    #[error("template expression opened at position {position} is missing closing '{suffix}'")]
    UnclosedTemplate { suffix: String, position: usize },
}

impl ParseError {
    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        ParseError::InvalidSyntax {
            message: message.into(),
            position,
        }
    }
}

/// Raised while evaluating a compiled expression against one fact set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("fact '{0}' is not defined")]
    UndefinedFact(String),

    #[error("variable '#{0}' is not defined")]
    UndefinedVariable(String),

    #[error("property '{property}' cannot be found on {target}")]
    PropertyNotFound { property: String, target: &'static str },

    #[error("cannot access '{0}' on null")]
    NullReference(String),

    #[error("operator '{op}' is not supported between {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("cannot convert {0} to boolean")]
    NotBoolean(&'static str),

    #[error("expression evaluated to null")]
    NullResult,

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow in '{0}'")]
    Overflow(&'static str),

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("function '{function}' is not applicable to {target}")]
    NotApplicable {
        function: &'static str,
        target: &'static str,
    },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("'between' expects a list of two bounds, got {0}")]
    InvalidBounds(usize),

    #[error("invalid regular expression '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, EvalError>;
