//! Runtime for dotpipe: values, scopes, the evaluator and the pipe operators.

mod builtins;
pub mod env;
mod error;
pub mod eval;
pub mod helpers;
pub mod options;
pub mod pipe;
mod thunk;
pub mod value;

pub use env::{Binding, Env};
pub use error::EvalError;
pub use eval::{apply_call, apply_value, eval, eval_program, inline};
pub use options::{Options, PipeMode};
pub use pipe::{pipe, PipeCall, PipeKind, Unrolled};
pub use thunk::{Thunk, ThunkState};
pub use value::{Arity, Closure, Value};
