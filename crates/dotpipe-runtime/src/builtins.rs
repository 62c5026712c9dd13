//! The root frame: arithmetic, list helpers, scope injection and the pipe operators.

use crate::helpers::{as_bool, as_int, as_list, as_record, v_equal};
use crate::pipe;
use crate::value::{Arity, NativeFn, SpecialFn};
use crate::{apply_value, eval, Env, EvalError, Options, Value};
use dotpipe_ast::ast::Expr;
use std::cmp::Ordering;

enum NumPair {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn numeric_pair(op: &str, a: &Value, b: &Value) -> Result<NumPair, EvalError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(NumPair::Ints(*x, *y)),
        (Value::Int(x), Value::Float(y)) => Ok(NumPair::Floats(*x as f64, *y)),
        (Value::Float(x), Value::Int(y)) => Ok(NumPair::Floats(*x, *y as f64)),
        (Value::Float(x), Value::Float(y)) => Ok(NumPair::Floats(*x, *y)),
        _ => Err(EvalError::Type(format!(
            "non-numeric argument to `{}`: {} and {}",
            op,
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn arith(
    op: &str,
    args: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    match numeric_pair(op, &args[0], &args[1])? {
        NumPair::Ints(x, y) => int_op(x, y)
            .map(Value::Int)
            .ok_or_else(|| EvalError::Type(format!("integer overflow in `{op}`"))),
        NumPair::Floats(x, y) => Ok(Value::Float(float_op(x, y))),
    }
}

fn divide(_env: &Env, args: &[Value]) -> Result<Value, EvalError> {
    if let NumPair::Ints(_, 0) = numeric_pair("/", &args[0], &args[1])? {
        return Err(EvalError::DivisionByZero);
    }
    arith("/", args, i64::checked_div, |x, y| x / y)
}

fn compare(op: &str, a: &Value, b: &Value) -> Result<Ordering, EvalError> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        _ => match numeric_pair(op, a, b)? {
            NumPair::Ints(x, y) => Ok(x.cmp(&y)),
            NumPair::Floats(x, y) => x
                .partial_cmp(&y)
                .ok_or_else(|| EvalError::Type(format!("`{op}` on NaN"))),
        },
    }
}

fn negate(_env: &Env, args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::Int(n) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| EvalError::Type("integer overflow in negation".into())),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(EvalError::Type(format!("cannot negate {}", other.type_name()))),
    }
}

fn length(_env: &Env, args: &[Value]) -> Result<Value, EvalError> {
    let n = match &args[0] {
        Value::Null => 0,
        Value::List(xs) => xs.len(),
        Value::Str(s) => s.chars().count(),
        Value::Record(m) => m.len(),
        Value::Sequence(steps) => steps.len(),
        other => return Err(EvalError::Type(format!("length of {}", other.type_name()))),
    };
    Ok(Value::Int(n as i64))
}

fn sum(_env: &Env, args: &[Value]) -> Result<Value, EvalError> {
    let mut acc = Value::Int(0);
    for x in as_list(&args[0])? {
        acc = arith("sum", &[acc, x.clone()], i64::checked_add, |a, b| a + b)?;
    }
    Ok(acc)
}

fn head(_env: &Env, args: &[Value]) -> Result<Value, EvalError> {
    let xs = as_list(&args[0])?;
    let n = usize::try_from(as_int(&args[1])?).unwrap_or(0);
    Ok(Value::list(xs.iter().take(n).cloned().collect()))
}

fn nth(_env: &Env, args: &[Value]) -> Result<Value, EvalError> {
    let xs = as_list(&args[0])?;
    let i = as_int(&args[1])?;
    usize::try_from(i)
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| xs.get(i))
        .cloned()
        .ok_or_else(|| EvalError::Type(format!("index {} out of range for length {}", i, xs.len())))
}

fn map(env: &Env, args: &[Value]) -> Result<Value, EvalError> {
    let out = as_list(&args[0])?
        .iter()
        .map(|x| apply_value(env, &args[1], vec![x.clone()]))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::list(out))
}

fn filter(env: &Env, args: &[Value]) -> Result<Value, EvalError> {
    let mut out = Vec::new();
    for x in as_list(&args[0])? {
        if as_bool(&apply_value(env, &args[1], vec![x.clone()])?)? {
            out.push(x.clone());
        }
    }
    Ok(Value::list(out))
}

fn seq(_env: &Env, args: &[Value]) -> Result<Value, EvalError> {
    let (from, to) = (as_int(&args[0])?, as_int(&args[1])?);
    let items: Vec<Value> = if from <= to {
        (from..=to).map(Value::Int).collect()
    } else {
        (to..=from).rev().map(Value::Int).collect()
    };
    Ok(Value::list(items))
}

fn freduce(env: &Env, args: &[Value]) -> Result<Value, EvalError> {
    let fs: Vec<Value> = match &args[1] {
        Value::Sequence(steps) => steps.to_vec(),
        other => as_list(other)?.to_vec(),
    };
    let mut acc = args[0].clone();
    for f in &fs {
        acc = apply_value(env, f, vec![acc])?;
    }
    Ok(acc)
}

fn functions(_env: &Env, args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::Sequence(steps) => Ok(Value::list(steps.to_vec())),
        other => Err(EvalError::Type(format!("expected sequence, got {}", other.type_name()))),
    }
}

fn and(env: &Env, args: &[Expr]) -> Result<Value, EvalError> {
    let [a, b] = args else {
        return Err(EvalError::Arity { name: "&&".into(), expected: Arity::Exact(2), got: args.len() });
    };
    if !as_bool(&eval(env, a)?)? {
        return Ok(Value::Bool(false));
    }
    Ok(Value::Bool(as_bool(&eval(env, b)?)?))
}

fn or(env: &Env, args: &[Expr]) -> Result<Value, EvalError> {
    let [a, b] = args else {
        return Err(EvalError::Arity { name: "||".into(), expected: Arity::Exact(2), got: args.len() });
    };
    if as_bool(&eval(env, a)?)? {
        return Ok(Value::Bool(true));
    }
    Ok(Value::Bool(as_bool(&eval(env, b)?)?))
}

/// `with(data, expr)`: evaluate `expr` with the record's fields in scope.
fn with(env: &Env, args: &[Expr]) -> Result<Value, EvalError> {
    let [data, body] = args else {
        return Err(EvalError::Arity { name: "with".into(), expected: Arity::Exact(2), got: args.len() });
    };
    let data = eval(env, data)?;
    let fields = as_record(&data)?;
    let scope = env.child();
    for (k, v) in fields {
        scope.define(k.as_str(), v.clone());
    }
    eval(&scope, body)
}

impl Env {
    /// A global frame over a root frame holding the builtins, with default options.
    pub fn with_builtins() -> Env {
        Env::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Env {
        let root = Env::new(options);
        install(&root);
        root.child()
    }
}

fn native(env: &Env, name: &'static str, arity: Arity, f: NativeFn) {
    env.define(name, Value::Native { name, arity, f });
}

fn special(env: &Env, name: &'static str, f: SpecialFn) {
    env.define(name, Value::Special { name, f });
}

fn install(e: &Env) {
    use Arity::{AtLeast, Exact};

    native(e, "+", Exact(2), |_, a| arith("+", a, i64::checked_add, |x, y| x + y));
    native(e, "-", Exact(2), |_, a| arith("-", a, i64::checked_sub, |x, y| x - y));
    native(e, "*", Exact(2), |_, a| arith("*", a, i64::checked_mul, |x, y| x * y));
    native(e, "/", Exact(2), divide);
    native(e, "neg", Exact(1), negate);

    native(e, "==", Exact(2), |_, a| Ok(Value::Bool(v_equal(&a[0], &a[1]))));
    native(e, "!=", Exact(2), |_, a| Ok(Value::Bool(!v_equal(&a[0], &a[1]))));
    native(e, "<", Exact(2), |_, a| Ok(Value::Bool(compare("<", &a[0], &a[1])?.is_lt())));
    native(e, "<=", Exact(2), |_, a| Ok(Value::Bool(compare("<=", &a[0], &a[1])?.is_le())));
    native(e, ">", Exact(2), |_, a| Ok(Value::Bool(compare(">", &a[0], &a[1])?.is_gt())));
    native(e, ">=", Exact(2), |_, a| Ok(Value::Bool(compare(">=", &a[0], &a[1])?.is_ge())));
    native(e, "!", Exact(1), |_, a| Ok(Value::Bool(!as_bool(&a[0])?)));
    special(e, "&&", and);
    special(e, "||", or);

    native(e, "paste", AtLeast(1), |_, a| {
        Ok(Value::str(a.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")))
    });
    native(e, "print", Exact(1), |_, a| {
        println!("{}", a[0]);
        Ok(a[0].clone())
    });
    native(e, "identity", Exact(1), |_, a| Ok(a[0].clone()));
    native(e, "stop", Exact(1), |_, a| Err(EvalError::User(a[0].to_string())));
    native(e, "is_null", Exact(1), |_, a| Ok(Value::Bool(matches!(a[0], Value::Null))));

    native(e, "length", Exact(1), length);
    native(e, "sum", Exact(1), sum);
    native(e, "head", Exact(2), head);
    native(e, "rev", Exact(1), |_, a| {
        Ok(Value::list(as_list(&a[0])?.iter().rev().cloned().collect()))
    });
    native(e, "nth", Exact(2), nth);
    native(e, "map", Exact(2), map);
    native(e, "filter", Exact(2), filter);
    native(e, "seq", Exact(2), seq);

    native(e, "names", Exact(1), |_, a| {
        Ok(Value::list(as_record(&a[0])?.keys().map(Value::str).collect()))
    });
    native(e, "get", Exact(2), |_, a| match &a[1] {
        Value::Str(k) => Ok(as_record(&a[0])?.get(&**k).cloned().unwrap_or(Value::Null)),
        other => Err(EvalError::Type(format!("field name must be a string, got {}", other.type_name()))),
    });
    special(e, "with", with);

    native(e, "freduce", Exact(2), freduce);
    native(e, "functions", Exact(1), functions);

    special(e, pipe::symbols::PIPE, pipe::pipe_standard);
    special(e, pipe::symbols::PIPE_EAGER, pipe::pipe_eager);
    special(e, pipe::symbols::COMPOUND, pipe::pipe_compound);
    special(e, pipe::symbols::TEE, pipe::pipe_tee);
    special(e, pipe::symbols::DOLLAR, pipe::pipe_dollar);
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotpipe_parser::parse_program;

    fn run(src: &str) -> Result<Value, EvalError> {
        crate::eval_program(&Env::with_builtins(), &parse_program(src).unwrap())
    }

    #[test]
    fn integer_arithmetic_is_checked() {
        assert_eq!(run("7 / 2").unwrap(), Value::Int(3));
        assert_eq!(run("7.0 / 2").unwrap(), Value::Float(3.5));
        assert_eq!(run("1 / 0").unwrap_err(), EvalError::DivisionByZero);
        assert!(matches!(run("9223372036854775807 + 1"), Err(EvalError::Type(_))));
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(run("false && stop(\"no\")").unwrap(), Value::Bool(false));
        assert_eq!(run("true || stop(\"no\")").unwrap(), Value::Bool(true));
    }

    #[test]
    fn list_helpers() {
        assert_eq!(run("sum(seq(1, 4))").unwrap(), Value::Int(10));
        assert_eq!(run("seq(3, 1)").unwrap().to_string(), "[3, 2, 1]");
        assert_eq!(run("nth([10, 20, 30], 2)").unwrap(), Value::Int(20));
        assert!(run("nth([10], 0)").is_err());
        assert_eq!(
            run("filter(map([1, 2, 3], function(x) x * 2), function(x) x > 2)").unwrap().to_string(),
            "[4, 6]"
        );
    }

    #[test]
    fn with_injects_record_fields() {
        assert_eq!(run("x <- 100\nwith({ x: 1, y: 2 }, x + y)").unwrap(), Value::Int(3));
        assert!(matches!(run("with(1, x)"), Err(EvalError::Type(_))));
    }

    #[test]
    fn stop_raises_a_user_error() {
        assert_eq!(run("stop(\"bad input\")").unwrap_err(), EvalError::User("bad input".into()));
    }

    #[test]
    fn paste_joins_with_spaces() {
        assert_eq!(run("paste(\"a\", 1, [2])").unwrap(), Value::str("a 1 [2]"));
    }
}
