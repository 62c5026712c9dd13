//! Runtime error types for dotpipe evaluation.

use crate::value::Arity;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("unbound variable: {0}")]
    Unbound(String),
    #[error("attempt to apply non-function: {0}")]
    NotFunc(String),
    #[error("type error: {0}")]
    Type(String),
    #[error("{name}: expected {expected} argument(s), got {got}")]
    Arity { name: String, expected: Arity, got: usize },
    #[error("division by zero")]
    DivisionByZero,
    // raised by `stop()`
    #[error("{0}")]
    User(String),
    #[error("deferred value depends on itself")]
    RecursiveThunk,
    #[error("evaluation nested too deeply: more than {0} deferred values forced at once")]
    TooDeep(usize),
    #[error("invalid assignment target: {0}")]
    InvalidAssignTarget(String),
    #[error("malformed pipe chain: {0}")]
    MalformedChain(String),
    #[error("internal error: {0}")]
    Internal(String),
}
