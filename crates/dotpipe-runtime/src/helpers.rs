use crate::{EvalError, Value};

/// Render a value for printing. Strings are quoted only when nested in a container.
pub fn to_str_like(v: &Value, nested: bool) -> String {
    match v {
        Value::Null => "null".into(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) if nested => format!("{:?}", s),
        Value::Str(s) => s.to_string(),
        Value::List(xs) => {
            format!("[{}]", xs.iter().map(|x| to_str_like(x, true)).collect::<Vec<_>>().join(", "))
        }
        Value::Record(map) => {
            let inner = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, to_str_like(v, true)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{}}}", inner)
        }
        Value::Closure(c) => format!("<function({})>", c.params.join(", ")),
        Value::Native { name, .. } | Value::Special { name, .. } => format!("<builtin {name}>"),
        Value::Sequence(steps) => format!("<sequence of {}>", steps.len()),
    }
}

pub fn v_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => (*x as f64) == *y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| v_equal(x, y))
        }
        (Value::Record(xm), Value::Record(ym)) => {
            xm.len() == ym.len()
                && xm.iter().zip(ym.iter()).all(|((kx, vx), (ky, vy))| kx == ky && v_equal(vx, vy))
        }
        // Functions compare by identity
        (Value::Closure(x), Value::Closure(y)) => std::rc::Rc::ptr_eq(x, y),
        (Value::Sequence(x), Value::Sequence(y)) => std::rc::Rc::ptr_eq(x, y),
        (Value::Native { name: x, .. }, Value::Native { name: y, .. }) => x == y,
        (Value::Special { name: x, .. }, Value::Special { name: y, .. }) => x == y,
        _ => false,
    }
}

pub fn as_bool(v: &Value) -> Result<bool, EvalError> {
    match v {
        Value::Bool(b) => Ok(*b),
        other => Err(EvalError::Type(format!("expected bool, got {}", other.type_name()))),
    }
}

pub fn as_int(v: &Value) -> Result<i64, EvalError> {
    match v {
        Value::Int(n) => Ok(*n),
        Value::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
        other => Err(EvalError::Type(format!("expected int, got {}", other.type_name()))),
    }
}

pub fn as_list(v: &Value) -> Result<&[Value], EvalError> {
    match v {
        Value::List(xs) => Ok(xs.as_slice()),
        Value::Null => Ok(&[]),
        other => Err(EvalError::Type(format!("expected list, got {}", other.type_name()))),
    }
}

pub fn as_record(
    v: &Value,
) -> Result<&std::collections::BTreeMap<String, Value>, EvalError> {
    match v {
        Value::Record(m) => Ok(m),
        other => Err(EvalError::Type(format!("expected record, got {}", other.type_name()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_strings_are_quoted() {
        let v = Value::list(vec![Value::str("a"), Value::Int(1)]);
        assert_eq!(v.to_string(), "[\"a\", 1]");
        assert_eq!(Value::str("a").to_string(), "a");
    }

    #[test]
    fn numbers_compare_across_int_and_float() {
        assert!(v_equal(&Value::Int(2), &Value::Float(2.0)));
        assert!(!v_equal(&Value::Int(2), &Value::str("2")));
    }

    #[test]
    fn records_render_sorted_by_key() {
        let r = Value::record([("b", Value::Int(2)), ("a", Value::Null)]);
        assert_eq!(r.to_string(), "{a: null, b: 2}");
    }
}
