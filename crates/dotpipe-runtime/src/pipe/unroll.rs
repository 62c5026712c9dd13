//! Flattening a nested pipe chain into an ordered list of call expressions.

use super::symbols::{self, PLACEHOLDER};
use crate::{eval, inline, Env, EvalError};
use dotpipe_ast::ast::{Expr, ExprKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeKind {
    None,
    Standard,
    CompoundAssign,
    Tee,
    Dollar,
}

/// Kind of the pipe link `expr` denotes, or `PipeKind::None`.
pub fn classify(expr: &Expr) -> PipeKind {
    expr.call_op().map_or(PipeKind::None, symbols::operator_kind)
}

/// `f` becomes `f()`, then the placeholder is added when missing.
pub fn as_pipe_call(rhs: Expr) -> Expr {
    let call = match rhs.kind {
        ExprKind::Call { .. } | ExprKind::Block(_) => rhs,
        _ => {
            let span = rhs.span;
            Expr::call(rhs, Vec::new(), span)
        }
    };
    add_dot(call)
}

/// Prepend `.` unless one of the direct arguments already is `.`.
/// Mentions nested deeper (`f(g(.))`) do not count.
pub fn add_dot(expr: Expr) -> Expr {
    let span = expr.span;
    let dot = Expr::sym(PLACEHOLDER, span);
    match expr.kind {
        ExprKind::Call { func, mut args } => {
            if !args.iter().any(Expr::is_placeholder) {
                args.insert(0, dot);
            }
            Expr::new(ExprKind::Call { func, args }, span)
        }
        ExprKind::Block(mut stmts) => {
            if !stmts.iter().any(Expr::is_placeholder) {
                stmts.insert(0, dot);
            }
            Expr::new(ExprKind::Block(stmts), span)
        }
        kind => Expr::new(kind, span),
    }
}

/// `{ rhs(.); . }`: run the call, pass the input along.
pub fn as_tee_call(rhs: Expr) -> Expr {
    let span = rhs.span;
    Expr::new(ExprKind::Block(vec![as_pipe_call(rhs), Expr::sym(PLACEHOLDER, span)]), span)
}

/// `base::with(., rhs)`
pub fn as_dollar_call(rhs: Expr) -> Expr {
    let span = rhs.span;
    Expr::call(Expr::sym(symbols::WITH, span), vec![Expr::sym(PLACEHOLDER, span), rhs], span)
}

/// Parenthesized right-hand sides are evaluated on the spot and spliced in as values.
fn escape(rhs: Expr, env: &Env) -> Result<Expr, EvalError> {
    if !matches!(rhs.kind, ExprKind::Paren(_)) {
        return Ok(rhs);
    }
    let value = eval(env, &rhs)?;
    Ok(inline(value, rhs.span))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unrolled {
    /// Head operand first, then one rewritten call per link.
    pub exprs: Vec<Expr>,
    /// Left operand of the compound-assign link, if the chain has one.
    /// Checked with [`assign_target`] once the chain is known to run.
    pub assign: Option<Expr>,
}

/// Walk `lhs OP rhs` leftwards while the left operand is itself a pipe call.
pub fn unroll(lhs: &Expr, rhs: &Expr, env: &Env, kind: PipeKind) -> Result<Unrolled, EvalError> {
    let mut out = Vec::new();
    let mut target: Option<Expr> = None;
    let mut lhs = lhs.clone();
    let mut rhs = rhs.clone();
    let mut kind = kind;

    loop {
        if kind != PipeKind::Dollar {
            rhs = escape(rhs, env)?;
        }
        let step = match kind {
            PipeKind::Standard => as_pipe_call(rhs),
            PipeKind::CompoundAssign => {
                if target.is_some() {
                    return Err(EvalError::MalformedChain(
                        "only one compound assignment is allowed per chain".into(),
                    ));
                }
                target = Some(lhs.clone());
                as_pipe_call(rhs)
            }
            PipeKind::Tee => as_tee_call(rhs),
            PipeKind::Dollar => as_dollar_call(rhs),
            PipeKind::None => {
                return Err(EvalError::Internal("unroll reached a non-pipe link".into()));
            }
        };
        out.push(step);

        kind = classify(&lhs);
        if kind == PipeKind::None {
            break;
        }
        let (next_lhs, next_rhs) = match lhs.kind {
            ExprKind::Call { mut args, .. } if args.len() == 2 => {
                let r = args.pop();
                let l = args.pop();
                match (l, r) {
                    (Some(l), Some(r)) => (l, r),
                    _ => return Err(EvalError::Internal("pipe call lost its operands".into())),
                }
            }
            _ => {
                return Err(EvalError::MalformedChain("pipe operator needs two operands".into()));
            }
        };
        lhs = next_lhs;
        rhs = next_rhs;
    }

    out.push(lhs);
    out.reverse();

    Ok(Unrolled { exprs: out, assign: target })
}

/// The name a compound-assign link writes back to. Only a plain name other
/// than `.` qualifies.
pub fn assign_target(target: &Expr) -> Result<String, EvalError> {
    match &target.kind {
        ExprKind::Sym(name) if name.as_str() != PLACEHOLDER => Ok(name.clone()),
        _ => Err(EvalError::InvalidAssignTarget(dotpipe_ast::pretty::print_expr(target))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotpipe_ast::pretty::print_expr;
    use dotpipe_parser::parse_expr;

    fn printed(src: &str) -> Vec<String> {
        let env = Env::with_builtins();
        let e = parse_expr(src).unwrap();
        let ExprKind::Call { args, .. } = &e.kind else { panic!("not a call: {src}") };
        let u = unroll(&args[0], &args[1], &env, classify(&e)).unwrap();
        u.exprs.iter().map(print_expr).collect()
    }

    fn unroll_src(src: &str) -> Result<Unrolled, EvalError> {
        let env = Env::with_builtins();
        let e = parse_expr(src).unwrap();
        let ExprKind::Call { args, .. } = &e.kind else { panic!("not a call: {src}") };
        unroll(&args[0], &args[1], &env, classify(&e))
    }

    #[test]
    fn classifies_by_operator_symbol() {
        assert_eq!(classify(&parse_expr("a %>% f").unwrap()), PipeKind::Standard);
        assert_eq!(classify(&parse_expr("a %!>% f").unwrap()), PipeKind::Standard);
        assert_eq!(classify(&parse_expr("a %<>% f").unwrap()), PipeKind::CompoundAssign);
        assert_eq!(classify(&parse_expr("a %T>% f").unwrap()), PipeKind::Tee);
        assert_eq!(classify(&parse_expr("a %$% f").unwrap()), PipeKind::Dollar);
        assert_eq!(classify(&parse_expr("a + f").unwrap()), PipeKind::None);
        assert_eq!(classify(&parse_expr("a").unwrap()), PipeKind::None);
    }

    #[test]
    fn placeholder_is_added_once() {
        let with_dot = parse_expr("f(x, .)").unwrap();
        assert_eq!(print_expr(&add_dot(with_dot)), "f(x, .)");
        let without = parse_expr("f(x)").unwrap();
        assert_eq!(print_expr(&add_dot(without)), "f(., x)");
        let nested = parse_expr("f(g(.))").unwrap();
        assert_eq!(print_expr(&add_dot(nested)), "f(., g(.))");
    }

    #[test]
    fn bare_names_become_calls() {
        assert_eq!(print_expr(&as_pipe_call(parse_expr("sum").unwrap())), "sum(.)");
    }

    #[test]
    fn chain_unrolls_left_to_right() {
        assert_eq!(printed("a %>% f() %>% g() %>% h()"), ["a", "f(.)", "g(.)", "h(.)"]);
    }

    #[test]
    fn tee_and_dollar_rewrites() {
        assert_eq!(printed("a %T>% f %>% g"), ["a", "{ f(.); . }", "g(.)"]);
        assert_eq!(printed("a %$% (x + y)"), ["a", "base::with(., (x + y))"]);
    }

    #[test]
    fn escape_splices_the_value() {
        assert_eq!(printed("a %>% (1 + 2)"), ["a", "3(.)"]);
    }

    #[test]
    fn compound_assignment_captures_the_head() {
        let u = unroll_src("x %<>% f() %>% g()").unwrap();
        let target = u.assign.expect("compound link sets a target");
        assert_eq!(assign_target(&target).unwrap(), "x");
        assert_eq!(u.exprs.len(), 3);
    }

    #[test]
    fn malformed_compound_chains_are_rejected() {
        assert!(matches!(unroll_src("x %<>% f() %<>% g()"), Err(EvalError::MalformedChain(_))));
    }

    #[test]
    fn only_plain_names_are_assign_targets() {
        for src in ["x %>% f() %<>% g()", "1 %<>% f()", ". %<>% f()"] {
            let target = unroll_src(src).unwrap().assign.expect("compound link sets a target");
            assert!(
                matches!(assign_target(&target), Err(EvalError::InvalidAssignTarget(_))),
                "{src}"
            );
        }
    }

    #[test]
    fn entering_with_no_kind_is_internal() {
        let env = Env::with_builtins();
        let a = parse_expr("a").unwrap();
        assert!(matches!(unroll(&a, &a, &env, PipeKind::None), Err(EvalError::Internal(_))));
    }
}
