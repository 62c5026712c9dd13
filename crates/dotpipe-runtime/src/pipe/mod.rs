//! Pipe operators: unroll a chain, then evaluate it eagerly or lazily with `.`
//! bound to each intermediate value.

pub mod symbols;
pub mod unroll;

pub use unroll::{assign_target, classify, unroll, PipeKind, Unrolled};

use crate::env::Binding;
use crate::value::{Arity, Closure};
use crate::{eval, Env, EvalError, Value};
use dotpipe_ast::ast::Expr;
use dotpipe_ast::pretty::print_expr;
use std::rc::Rc;
use symbols::PLACEHOLDER;
use tracing::{debug, trace};

/// One pipe invocation, as handed over by the operator builtins.
#[derive(Debug, Clone, Copy)]
pub struct PipeCall<'a> {
    pub lhs: &'a Expr,
    pub rhs: &'a Expr,
    pub kind: PipeKind,
    pub env: &'a Env,
    /// Whether the call site asked for lazy evaluation.
    pub lazy: bool,
}

pub fn pipe(call: PipeCall<'_>) -> Result<Value, EvalError> {
    let PipeCall { lhs, rhs, kind, env, lazy } = call;
    let Unrolled { exprs, assign } = unroll(lhs, rhs, env, kind)?;
    debug!(
        ?kind,
        steps = exprs.len(),
        assign = %assign.as_ref().map(print_expr).unwrap_or_default(),
        "unrolled pipe chain"
    );

    if let Some((head, body)) = exprs.split_first() {
        if head.is_placeholder() {
            debug!(steps = body.len(), "pipe chain starts with `.`; building a function");
            return Ok(build_lambda(body, env));
        }
    }

    let assign = assign.as_ref().map(assign_target).transpose()?;
    let lazy = env.options().pipe_mode.use_lazy(lazy);
    debug!(lazy, "evaluating pipe chain");
    let out = if lazy { eval_lazy(&exprs, env)? } else { eval_eager(&exprs, env)? };

    if let Some(name) = assign {
        env.define(name, out.clone());
    }
    Ok(out)
}

/// Saves the frame-local binding of `.` and puts it back when dropped.
struct PlaceholderGuard<'a> {
    env: &'a Env,
    saved: Option<Binding>,
}

impl<'a> PlaceholderGuard<'a> {
    fn capture(env: &'a Env) -> Self {
        Self { env, saved: env.local(PLACEHOLDER) }
    }
}

impl Drop for PlaceholderGuard<'_> {
    fn drop(&mut self) {
        match self.saved.take() {
            Some(b) => self.env.set_local(PLACEHOLDER, b),
            None => {
                self.env.unbind(PLACEHOLDER);
            }
        }
    }
}

/// Evaluate every step in order in `env`, rebinding `.` after each one.
pub fn eval_eager(exprs: &[Expr], env: &Env) -> Result<Value, EvalError> {
    let (last, init) = exprs
        .split_last()
        .ok_or_else(|| EvalError::Internal("empty pipe sequence".into()))?;
    let _guard = PlaceholderGuard::capture(env);
    for (i, e) in init.iter().enumerate() {
        let v = eval(env, e)?;
        trace!(step = i, expr = %print_expr(e), value = %v, "pipe step");
        env.define(PLACEHOLDER, v);
    }
    eval(env, last)
}

/// Bind `.` in a fresh scope per step to the deferred previous step, then
/// evaluate only the last step. Steps nobody reads never run.
pub fn eval_lazy(exprs: &[Expr], env: &Env) -> Result<Value, EvalError> {
    let (last, init) = exprs
        .split_last()
        .ok_or_else(|| EvalError::Internal("empty pipe sequence".into()))?;
    let mut scope = env.clone();
    for e in init {
        let next = scope.child();
        next.bind_lazy(PLACEHOLDER, e.clone(), scope);
        scope = next;
    }
    eval(&scope, last)
}

/// `function(.) step` for every step, packed as a callable sequence.
pub fn build_lambda(body: &[Expr], env: &Env) -> Value {
    let steps: Vec<Value> = body
        .iter()
        .map(|step| {
            Value::Closure(Rc::new(Closure {
                params: vec![PLACEHOLDER.to_string()],
                body: step.clone(),
                env: env.clone(),
            }))
        })
        .collect();
    Value::Sequence(Rc::from(steps))
}

fn pipe_operator(
    env: &Env,
    args: &[Expr],
    name: &str,
    kind: PipeKind,
    lazy: bool,
) -> Result<Value, EvalError> {
    match args {
        [lhs, rhs] => pipe(PipeCall { lhs, rhs, kind, env, lazy }),
        _ => Err(EvalError::Arity {
            name: name.to_string(),
            expected: Arity::Exact(2),
            got: args.len(),
        }),
    }
}

pub(crate) fn pipe_standard(env: &Env, args: &[Expr]) -> Result<Value, EvalError> {
    pipe_operator(env, args, symbols::PIPE, PipeKind::Standard, true)
}

pub(crate) fn pipe_eager(env: &Env, args: &[Expr]) -> Result<Value, EvalError> {
    pipe_operator(env, args, symbols::PIPE_EAGER, PipeKind::Standard, false)
}

pub(crate) fn pipe_compound(env: &Env, args: &[Expr]) -> Result<Value, EvalError> {
    pipe_operator(env, args, symbols::COMPOUND, PipeKind::CompoundAssign, true)
}

pub(crate) fn pipe_tee(env: &Env, args: &[Expr]) -> Result<Value, EvalError> {
    pipe_operator(env, args, symbols::TEE, PipeKind::Tee, true)
}

pub(crate) fn pipe_dollar(env: &Env, args: &[Expr]) -> Result<Value, EvalError> {
    pipe_operator(env, args, symbols::DOLLAR, PipeKind::Dollar, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotpipe_parser::parse_program;

    fn run(env: &Env, src: &str) -> Result<Value, EvalError> {
        crate::eval_program(env, &parse_program(src).unwrap())
    }

    #[test]
    fn eager_guard_restores_previous_binding() {
        let env = Env::with_builtins();
        env.define(".", Value::Int(99));
        let exprs = parse_program("1\n. + 1\nstop(\"boom\")").unwrap();
        assert!(eval_eager(&exprs, &env).is_err());
        assert_eq!(env.local(".").map(|b| b.force().unwrap()), Some(Value::Int(99)));
    }

    #[test]
    fn eager_guard_keeps_lazy_bindings_unforced() {
        let env = Env::with_builtins();
        let src = parse_program("stop(\"never\")").unwrap();
        env.bind_lazy(".", src[0].clone(), env.clone());
        let exprs = parse_program("1\n. * 2").unwrap();
        assert_eq!(eval_eager(&exprs, &env).unwrap(), Value::Int(2));
        assert!(matches!(env.local("."), Some(Binding::Lazy(t)) if !t.is_forced()));
    }

    #[test]
    fn lazy_chain_leaves_caller_scope_alone() {
        let env = Env::with_builtins();
        let exprs = parse_program("2\n. * 10\n. + 1").unwrap();
        assert_eq!(eval_lazy(&exprs, &env).unwrap(), Value::Int(21));
        assert!(env.local(".").is_none());
    }

    #[test]
    fn empty_sequences_are_internal_errors() {
        let env = Env::with_builtins();
        assert!(matches!(eval_eager(&[], &env), Err(EvalError::Internal(_))));
        assert!(matches!(eval_lazy(&[], &env), Err(EvalError::Internal(_))));
    }

    #[test]
    fn pipe_mode_overrides_the_call_site() {
        let env = Env::with_options(crate::Options { pipe_mode: crate::PipeMode::Eager });
        run(&env, "hits <- 0\nbump <- function(x) { hits <<- hits + 1; x }").unwrap();
        let v = run(&env, "1 %>% bump() %>% (function(x) 7)").unwrap();
        assert_eq!(v, Value::Int(7));
        assert_eq!(env.lookup("hits").unwrap(), Value::Int(1));
    }

    #[test]
    fn lambda_shortcut_builds_a_sequence() {
        let env = Env::with_builtins();
        let v = run(&env, ". %>% rev() %>% head(1)").unwrap();
        assert!(matches!(&v, Value::Sequence(steps) if steps.len() == 2));
        env.define("f", v);
        assert_eq!(run(&env, "f([1, 2, 3])").unwrap(), Value::list(vec![Value::Int(3)]));
    }
}
