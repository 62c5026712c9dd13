//! Deferred, memoized computations (lazy bindings).

use crate::{eval, Env, EvalError, Value};
use dotpipe_ast::ast::Expr;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, trace};

/// Most deferred values that may be mid-evaluation on one thread. Each lazy
/// pipe link forces its predecessor from inside its own evaluation, so this
/// also bounds the length of a lazily evaluated chain.
pub const MAX_FORCE_DEPTH: usize = 128;

thread_local! {
    static FORCE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Counts one level of nested forcing until dropped.
struct DepthGuard;

impl DepthGuard {
    fn enter() -> Result<Self, EvalError> {
        FORCE_DEPTH.with(|d| {
            let depth = d.get() + 1;
            if depth > MAX_FORCE_DEPTH {
                debug!(depth, "deferred value nesting limit reached");
                return Err(EvalError::TooDeep(MAX_FORCE_DEPTH));
            }
            d.set(depth);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        FORCE_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

pub enum ThunkState {
    Pending { expr: Expr, env: Env },
    Evaluating,
    Forced(Value),
}

/// An expression plus the scope it closes over, evaluated at most once.
#[derive(Clone)]
pub struct Thunk(Rc<RefCell<ThunkState>>);

impl Thunk {
    pub fn new(expr: Expr, env: Env) -> Self {
        Thunk(Rc::new(RefCell::new(ThunkState::Pending { expr, env })))
    }

    pub fn is_forced(&self) -> bool {
        matches!(&*self.0.borrow(), ThunkState::Forced(_))
    }

    /// Evaluate on first demand and cache the result.
    ///
    /// A failed evaluation puts the thunk back to pending, so the next demand
    /// raises the error again instead of observing a half-built value.
    /// Forcing more than [`MAX_FORCE_DEPTH`] values inside one another fails
    /// with [`EvalError::TooDeep`].
    pub fn force(&self) -> Result<Value, EvalError> {
        if let ThunkState::Forced(v) = &*self.0.borrow() {
            return Ok(v.clone());
        }
        let _depth = DepthGuard::enter()?;
        let (expr, env) = {
            let mut st = self.0.borrow_mut();
            match std::mem::replace(&mut *st, ThunkState::Evaluating) {
                ThunkState::Forced(v) => {
                    *st = ThunkState::Forced(v.clone());
                    return Ok(v);
                }
                ThunkState::Evaluating => return Err(EvalError::RecursiveThunk),
                ThunkState::Pending { expr, env } => (expr, env),
            }
        };
        trace!(expr = %dotpipe_ast::pretty::print_expr(&expr), "forcing deferred value");
        match eval(&env, &expr) {
            Ok(v) => {
                *self.0.borrow_mut() = ThunkState::Forced(v.clone());
                Ok(v)
            }
            Err(err) => {
                *self.0.borrow_mut() = ThunkState::Pending { expr, env };
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Thunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.0.borrow() {
            ThunkState::Pending { .. } => "pending",
            ThunkState::Evaluating => "evaluating",
            ThunkState::Forced(_) => "forced",
        };
        write!(f, "Thunk({state})")
    }
}
