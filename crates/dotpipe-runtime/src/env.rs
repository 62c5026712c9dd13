//! Lexical scopes.
//!
//! An [`Env`] is a cheap handle to a frame; frames chain to their parent up to
//! the root frame holding the builtins. Lookups walk outward, definitions
//! always land in the frame the handle points at.

use crate::{EvalError, Options, Thunk, Value};
use ahash::AHashMap;
use dotpipe_ast::ast::Expr;
use std::cell::RefCell;
use std::rc::Rc;

/// What a name is bound to inside one frame.
#[derive(Debug, Clone)]
pub enum Binding {
    Value(Value),
    Lazy(Thunk),
}

impl Binding {
    pub fn force(self) -> Result<Value, EvalError> {
        match self {
            Binding::Value(v) => Ok(v),
            Binding::Lazy(t) => t.force(),
        }
    }
}

pub struct Frame {
    vars: RefCell<AHashMap<String, Binding>>,
    parent: Option<Env>,
    options: Options,
}

#[derive(Clone)]
pub struct Env(Rc<Frame>);

impl Env {
    /// A detached frame with no parent. Most callers want [`Env::with_builtins`].
    pub fn new(options: Options) -> Self {
        Env(Rc::new(Frame { vars: RefCell::new(AHashMap::new()), parent: None, options }))
    }

    pub fn child(&self) -> Env {
        Env(Rc::new(Frame {
            vars: RefCell::new(AHashMap::new()),
            parent: Some(self.clone()),
            options: self.0.options,
        }))
    }

    pub fn options(&self) -> Options {
        self.0.options
    }

    pub fn parent(&self) -> Option<&Env> {
        self.0.parent.as_ref()
    }

    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.vars.borrow_mut().insert(name.into(), Binding::Value(value));
    }

    /// Bind `name` to `expr`, evaluated in `scope` the first time it is read.
    pub fn bind_lazy(&self, name: impl Into<String>, expr: Expr, scope: Env) {
        self.0.vars.borrow_mut().insert(name.into(), Binding::Lazy(Thunk::new(expr, scope)));
    }

    pub fn unbind(&self, name: &str) -> Option<Binding> {
        self.0.vars.borrow_mut().remove(name)
    }

    /// The binding of `name` in this frame only.
    pub fn local(&self, name: &str) -> Option<Binding> {
        self.0.vars.borrow().get(name).cloned()
    }

    pub fn set_local(&self, name: impl Into<String>, binding: Binding) {
        self.0.vars.borrow_mut().insert(name.into(), binding);
    }

    /// Nearest binding of `name`, searching outward.
    pub fn find(&self, name: &str) -> Option<Binding> {
        let mut cur = Some(self);
        while let Some(env) = cur {
            if let Some(b) = env.local(name) {
                return Some(b);
            }
            cur = env.parent();
        }
        None
    }

    pub fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        if let Some((_, bare)) = name.split_once("::") {
            return self.lookup_qualified(bare);
        }
        // the borrow is released before forcing; the thunk may define names
        match self.find(name) {
            Some(b) => b.force(),
            None => Err(EvalError::Unbound(name.to_string())),
        }
    }

    /// Resolve `ns::name` against the root frame, ignoring user shadowing.
    pub fn lookup_qualified(&self, name: &str) -> Result<Value, EvalError> {
        match self.root().local(name) {
            Some(b) => b.force(),
            None => Err(EvalError::Unbound(name.to_string())),
        }
    }

    pub fn root(&self) -> &Env {
        let mut cur = self;
        while let Some(p) = cur.parent() {
            cur = p;
        }
        cur
    }

    /// `name <<- value`: rebind in the nearest enclosing frame that has `name`,
    /// else define it in the global frame. The builtin root frame is never written.
    pub fn assign_super(&self, name: &str, value: Value) {
        let mut cur = self.parent();
        let mut global = self;
        while let Some(env) = cur {
            if env.parent().is_none() {
                break;
            }
            if env.0.vars.borrow().contains_key(name) {
                env.define(name, value);
                return;
            }
            global = env;
            cur = env.parent();
        }
        global.define(name, value);
    }

    /// Names defined directly in this frame, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut out: Vec<String> = self.0.vars.borrow().keys().cloned().collect();
        out.sort();
        out
    }
}

// Frames reference closures that reference frames; never recurse into them.
impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut depth = 0;
        let mut cur = self.parent();
        while let Some(p) = cur {
            depth += 1;
            cur = p.parent();
        }
        write!(f, "Env(depth={}, names={:?})", depth, self.names())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_shadows_parent_without_touching_it() {
        let env = Env::with_builtins();
        env.define("x", Value::Int(1));
        let inner = env.child();
        inner.define("x", Value::Int(2));
        assert_eq!(inner.lookup("x").unwrap(), Value::Int(2));
        assert_eq!(env.lookup("x").unwrap(), Value::Int(1));
    }

    #[test]
    fn qualified_lookup_skips_user_shadowing() {
        let env = Env::with_builtins();
        env.define("length", Value::Int(0));
        assert_eq!(env.lookup("length").unwrap(), Value::Int(0));
        assert!(matches!(env.lookup("base::length"), Ok(Value::Native { name: "length", .. })));
    }

    #[test]
    fn super_assignment_updates_existing_binding() {
        let env = Env::with_builtins();
        env.define("n", Value::Int(0));
        let inner = env.child().child();
        inner.assign_super("n", Value::Int(5));
        assert_eq!(env.lookup("n").unwrap(), Value::Int(5));
        assert!(inner.local("n").is_none());
    }

    #[test]
    fn super_assignment_defaults_to_global_frame() {
        let env = Env::with_builtins();
        let inner = env.child();
        inner.assign_super("fresh", Value::Bool(true));
        assert!(env.local("fresh").is_some());
        assert!(env.root().local("fresh").is_none());
    }
}
