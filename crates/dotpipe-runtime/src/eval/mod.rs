//! Evaluation functions for the dotpipe runtime.

use crate::helpers::{as_bool, as_record};
use crate::value::{Arity, Closure};
use crate::{Env, EvalError, Value};
use dotpipe_ast::ast::{AssignScope, Expr, ExprKind, InlineValue};
use dotpipe_ast::pretty::print_expr;
use dotpipe_ast::span::Span;
use std::rc::Rc;

/// Embed an already computed value in an expression tree.
pub fn inline(value: Value, span: Span) -> Expr {
    let label = value.to_string();
    Expr::new(ExprKind::Inline(InlineValue::new(value, label)), span)
}

/// Evaluate top-level statements in order; the program's value is the last one.
pub fn eval_program(env: &Env, prog: &[Expr]) -> Result<Value, EvalError> {
    let mut last = Value::Null;
    for e in prog {
        last = eval(env, e)?;
    }
    Ok(last)
}

pub fn eval(env: &Env, e: &Expr) -> Result<Value, EvalError> {
    match &e.kind {
        ExprKind::Null => Ok(Value::Null),
        ExprKind::Bool(b) => Ok(Value::Bool(*b)),
        ExprKind::Int(n) => Ok(Value::Int(*n)),
        ExprKind::Float(f) => Ok(Value::Float(*f)),
        ExprKind::Str(s) => Ok(Value::str(s)),
        ExprKind::Sym(name) => env.lookup(name),
        ExprKind::Inline(v) => v
            .downcast_ref::<Value>()
            .cloned()
            .ok_or_else(|| EvalError::Internal(format!("foreign inline value {}", v.label()))),
        ExprKind::Paren(inner) => eval(env, inner),
        ExprKind::Block(stmts) => eval_program(env, stmts),
        ExprKind::List(items) => {
            let vals = items.iter().map(|x| eval(env, x)).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::list(vals))
        }
        ExprKind::Record(fields) => {
            let mut map = std::collections::BTreeMap::new();
            for (k, x) in fields {
                map.insert(k.clone(), eval(env, x)?);
            }
            Ok(Value::Record(Rc::new(map)))
        }
        ExprKind::Field { target, name } => {
            let v = eval(env, target)?;
            Ok(as_record(&v)?.get(name).cloned().unwrap_or(Value::Null))
        }
        ExprKind::Lambda { params, body } => Ok(Value::Closure(Rc::new(Closure {
            params: params.clone(),
            body: (**body).clone(),
            env: env.clone(),
        }))),
        ExprKind::If { cond, then, otherwise } => {
            if as_bool(&eval(env, cond)?)? {
                eval(env, then)
            } else {
                match otherwise {
                    Some(o) => eval(env, o),
                    None => Ok(Value::Null),
                }
            }
        }
        ExprKind::Assign { target, value, scope } => {
            let ExprKind::Sym(name) = &target.kind else {
                return Err(EvalError::InvalidAssignTarget(print_expr(target)));
            };
            let v = eval(env, value)?;
            match scope {
                AssignScope::Local => env.define(name.as_str(), v.clone()),
                AssignScope::Super => env.assign_super(name, v.clone()),
            }
            Ok(v)
        }
        ExprKind::Call { func, args } => {
            let f = eval(env, func)?;
            apply_call(env, &f, args, func)
        }
    }
}

fn check_arity(name: &str, arity: Arity, got: usize) -> Result<(), EvalError> {
    if arity.accepts(got) {
        Ok(())
    } else {
        Err(EvalError::Arity { name: name.to_string(), expected: arity, got })
    }
}

/// Apply `f` to unevaluated argument expressions from `env`.
///
/// Closures receive each argument as a deferred binding over `env`, builtins
/// receive evaluated values, specials receive the expressions themselves.
pub fn apply_call(env: &Env, f: &Value, args: &[Expr], callee: &Expr) -> Result<Value, EvalError> {
    match f {
        Value::Special { f, .. } => f(env, args),
        Value::Closure(c) => {
            check_arity(&print_expr(callee), Arity::Exact(c.params.len()), args.len())?;
            let scope = c.env.child();
            for (p, a) in c.params.iter().zip(args) {
                scope.bind_lazy(p.as_str(), a.clone(), env.clone());
            }
            eval(&scope, &c.body)
        }
        Value::Native { .. } | Value::Sequence(_) => {
            let vals = args.iter().map(|a| eval(env, a)).collect::<Result<Vec<_>, _>>()?;
            apply_value(env, f, vals)
        }
        _ => Err(EvalError::NotFunc(print_expr(callee))),
    }
}

/// Apply `f` to values that are already computed.
pub fn apply_value(env: &Env, f: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
    match f {
        Value::Native { name, arity, f } => {
            check_arity(name, *arity, args.len())?;
            f(env, &args)
        }
        Value::Closure(c) => {
            check_arity("function", Arity::Exact(c.params.len()), args.len())?;
            let scope = c.env.child();
            for (p, a) in c.params.iter().zip(args) {
                scope.define(p.as_str(), a);
            }
            eval(&scope, &c.body)
        }
        Value::Special { f, .. } => {
            let exprs: Vec<Expr> = args.into_iter().map(|v| inline(v, Span::default())).collect();
            f(env, &exprs)
        }
        Value::Sequence(steps) => {
            check_arity("sequence", Arity::Exact(1), args.len())?;
            let mut acc = args.into_iter().next().unwrap_or(Value::Null);
            for step in steps.iter() {
                acc = apply_value(env, step, vec![acc])?;
            }
            Ok(acc)
        }
        other => Err(EvalError::NotFunc(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotpipe_parser::parse_program;

    fn run(src: &str) -> Result<Value, EvalError> {
        let env = Env::with_builtins();
        eval_program(&env, &parse_program(src).unwrap())
    }

    #[test]
    fn closures_capture_their_scope() {
        let v = run("make <- function(n) function(x) x + n\nadd2 <- make(2)\nadd2(40)").unwrap();
        assert_eq!(v, Value::Int(42));
    }

    #[test]
    fn closure_arguments_are_lazy() {
        assert_eq!(run("k <- function(a, b) a\nk(1, stop(\"unused\"))").unwrap(), Value::Int(1));
    }

    #[test]
    fn arity_mismatch_names_the_callee() {
        let err = run("f <- function(x) x\nf(1, 2)").unwrap_err();
        assert_eq!(err, EvalError::Arity { name: "f".into(), expected: Arity::Exact(1), got: 2 });
    }

    #[test]
    fn calling_a_number_is_not_a_function() {
        assert_eq!(run("x <- 1\nx(2)").unwrap_err(), EvalError::NotFunc("x".into()));
    }

    #[test]
    fn if_without_else_is_null() {
        assert_eq!(run("if (false) 1").unwrap(), Value::Null);
        assert!(matches!(run("if (1) 2"), Err(EvalError::Type(_))));
    }

    #[test]
    fn missing_record_field_is_null() {
        assert_eq!(run("r <- { a: 1 }\nr$b").unwrap(), Value::Null);
        assert_eq!(run("r <- { a: 1 }\nr$a").unwrap(), Value::Int(1));
    }

    #[test]
    fn only_names_are_assignable() {
        assert!(matches!(run("f(x) <- 1"), Err(EvalError::InvalidAssignTarget(_))));
    }

    #[test]
    fn inline_values_evaluate_to_themselves() {
        let env = Env::with_builtins();
        let e = inline(Value::str("hi"), Span::default());
        assert_eq!(eval(&env, &e).unwrap(), Value::str("hi"));
    }
}
