//! Runtime value types for dotpipe evaluation.

use crate::{Env, EvalError};
use dotpipe_ast::ast::Expr;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Builtin taking evaluated arguments.
pub type NativeFn = fn(&Env, &[Value]) -> Result<Value, EvalError>;
/// Builtin taking its argument expressions unevaluated, plus the calling environment.
pub type SpecialFn = fn(&Env, &[Expr]) -> Result<Value, EvalError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == k,
            Arity::AtLeast(k) => n >= k,
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exact(k) => write!(f, "{k}"),
            Arity::AtLeast(k) => write!(f, "at least {k}"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<Vec<Value>>),
    Record(Rc<BTreeMap<String, Value>>),
    Closure(Rc<Closure>),
    Native { name: &'static str, arity: Arity, f: NativeFn },
    Special { name: &'static str, f: SpecialFn },
    // Functional sequence built from a pipe chain that starts with `.`
    Sequence(Rc<[Value]>),
}

pub struct Closure {
    pub params: Vec<String>,
    pub body: Expr,
    pub env: Env,
}

// The captured environment usually contains the closure itself; print the signature only.
impl std::fmt::Debug for Closure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Closure({})", self.params.join(", "))
    }
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Value {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(items))
    }

    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Record(Rc::new(fields.into_iter().map(|(k, v)| (k.into(), v)).collect()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Closure(_) => "function",
            Value::Native { .. } | Value::Special { .. } => "builtin",
            Value::Sequence(_) => "sequence",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        crate::helpers::v_equal(self, other)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::helpers::to_str_like(self, false))
    }
}
