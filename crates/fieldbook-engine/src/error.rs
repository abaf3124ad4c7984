use thiserror::Error;

/// Internal evaluation failure.
///
/// These never reach the host: `functions::call_function` is the single
/// boundary that converts any `Err` into `Value::Null`, preserving the
/// safe-mode contract (a malformed input can never fail a record's
/// evaluation, only blank the affected sub-expression).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unknown function {0}")]
    UnknownFunction(String),
    #[error("{name} expects between {min} and {max} arguments, got {got}")]
    ArgCount {
        name: &'static str,
        min: usize,
        max: usize,
        got: usize,
    },
    #[error("{name}: argument {index} has an unsupported type")]
    ArgType { name: &'static str, index: usize },
    #[error("{name}: unsupported unit {unit:?}")]
    BadUnit { name: &'static str, unit: String },
    #[error("{name}: {message}")]
    Failed {
        name: &'static str,
        message: &'static str,
    },
}
