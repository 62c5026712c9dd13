pub mod span {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
    pub struct Span {
        pub offset: usize,
        pub len: usize,
    }
    impl Span {
        pub fn new(offset: usize, len: usize) -> Self {
            Self { offset, len }
        }
        /// Smallest span covering both `self` and `other`.
        pub fn join(self, other: Span) -> Span {
            let start = self.offset.min(other.offset);
            let end = (self.offset + self.len).max(other.offset + other.len);
            Span::new(start, end - start)
        }
    }
}

pub mod ast {
    use crate::span::Span;
    use serde::{Deserialize, Serialize};
    use std::any::Any;
    use std::rc::Rc;

    /// Reserved name of the pipe placeholder.
    pub const PLACEHOLDER: &str = ".";

    /// A runtime value spliced into a tree after evaluation.
    ///
    /// The tree does not know the runtime's value type, so the payload is
    /// type-erased; the runtime downcasts it back. `label` is what the pretty
    /// printer shows in place of the value.
    #[derive(Clone)]
    pub struct InlineValue {
        payload: Rc<dyn Any>,
        label: String,
    }

    impl InlineValue {
        pub fn new<T: Any>(value: T, label: impl Into<String>) -> Self {
            Self { payload: Rc::new(value), label: label.into() }
        }
        pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
            self.payload.downcast_ref::<T>()
        }
        pub fn label(&self) -> &str {
            &self.label
        }
    }

    impl std::fmt::Debug for InlineValue {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "InlineValue({})", self.label)
        }
    }

    // identity, not structure: two splices of equal values are still distinct nodes
    impl PartialEq for InlineValue {
        fn eq(&self, other: &Self) -> bool {
            Rc::ptr_eq(&self.payload, &other.payload)
        }
    }

    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    pub enum AssignScope {
        Local, // <-
        Super, // <<-
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub enum ExprKind {
        Null,
        Bool(bool),
        Int(i64),
        Float(f64),
        Str(String),
        Sym(String),
        // Infix operators are calls too: `a %>% b` is Call { func: Sym("%>%"), args: [a, b] }
        Call {
            func: Box<Expr>,
            args: Vec<Expr>,
        },
        Paren(Box<Expr>),
        Block(Vec<Expr>),
        List(Vec<Expr>),
        Record(Vec<(String, Expr)>),
        Field {
            target: Box<Expr>,
            name: String,
        },
        Lambda {
            params: Vec<String>,
            body: Box<Expr>,
        },
        If {
            cond: Box<Expr>,
            then: Box<Expr>,
            otherwise: Option<Box<Expr>>,
        },
        Assign {
            target: Box<Expr>,
            value: Box<Expr>,
            scope: AssignScope,
        },
        #[serde(skip)]
        Inline(InlineValue),
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct Expr {
        pub kind: ExprKind,
        pub span: Span,
    }
    impl Expr {
        pub fn new(kind: ExprKind, span: Span) -> Self {
            Self { kind, span }
        }
        pub fn sym(name: impl Into<String>, span: Span) -> Self {
            Self::new(ExprKind::Sym(name.into()), span)
        }
        pub fn call(func: Expr, args: Vec<Expr>, span: Span) -> Self {
            Self::new(ExprKind::Call { func: Box::new(func), args }, span)
        }
        pub fn is_sym(&self, name: &str) -> bool {
            matches!(&self.kind, ExprKind::Sym(s) if s == name)
        }
        pub fn is_placeholder(&self) -> bool {
            self.is_sym(PLACEHOLDER)
        }
        /// Operator name when this is a call on a bare symbol.
        pub fn call_op(&self) -> Option<&str> {
            match &self.kind {
                ExprKind::Call { func, .. } => match &func.kind {
                    ExprKind::Sym(op) => Some(op.as_str()),
                    _ => None,
                },
                _ => None,
            }
        }
    }
}

pub mod pretty {
    use crate::ast::*;

    fn is_infix(op: &str) -> bool {
        (op.len() >= 2 && op.starts_with('%') && op.ends_with('%'))
            || matches!(
                op,
                "+" | "-" | "*" | "/" | "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||"
            )
    }

    fn join(xs: &[Expr], sep: &str) -> String {
        xs.iter().map(print_expr).collect::<Vec<_>>().join(sep)
    }

    pub fn print_expr(e: &Expr) -> String {
        match &e.kind {
            ExprKind::Null => "null".into(),
            ExprKind::Bool(b) => b.to_string(),
            ExprKind::Int(n) => n.to_string(),
            ExprKind::Float(f) => {
                let s = f.to_string();
                if s.contains(['.', 'e', 'i', 'N']) {
                    s
                } else {
                    format!("{s}.0")
                }
            }
            ExprKind::Str(s) => format!("{:?}", s),
            ExprKind::Sym(s) => s.clone(),
            ExprKind::Call { func, args } => {
                if let ExprKind::Sym(op) = &func.kind {
                    if args.len() == 2 && is_infix(op) {
                        return format!("{} {} {}", print_expr(&args[0]), op, print_expr(&args[1]));
                    }
                    if args.len() == 1 && (op == "neg" || op == "!") {
                        let sign = if op == "neg" { "-" } else { "!" };
                        return format!("{}{}", sign, print_expr(&args[0]));
                    }
                }
                let callee = match &func.kind {
                    ExprKind::Sym(_) | ExprKind::Inline(_) | ExprKind::Paren(_) => print_expr(func),
                    _ => format!("({})", print_expr(func)),
                };
                format!("{}({})", callee, join(args, ", "))
            }
            ExprKind::Paren(inner) => format!("({})", print_expr(inner)),
            ExprKind::Block(xs) => {
                if xs.is_empty() {
                    "{}".into()
                } else {
                    format!("{{ {} }}", join(xs, "; "))
                }
            }
            ExprKind::List(xs) => format!("[{}]", join(xs, ", ")),
            ExprKind::Record(fields) => {
                let inner = fields
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, print_expr(v)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{ {} }}", inner)
            }
            ExprKind::Field { target, name } => format!("{}${}", print_expr(target), name),
            ExprKind::Lambda { params, body } => {
                format!("function({}) {}", params.join(", "), print_expr(body))
            }
            ExprKind::If { cond, then, otherwise } => match otherwise {
                Some(o) => format!(
                    "if ({}) {} else {}",
                    print_expr(cond),
                    print_expr(then),
                    print_expr(o)
                ),
                None => format!("if ({}) {}", print_expr(cond), print_expr(then)),
            },
            ExprKind::Assign { target, value, scope } => {
                let op = match scope {
                    AssignScope::Local => "<-",
                    AssignScope::Super => "<<-",
                };
                format!("{} {} {}", print_expr(target), op, print_expr(value))
            }
            ExprKind::Inline(v) => v.label().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ast::*;
    use super::pretty::print_expr;
    use super::span::Span;

    fn sp() -> Span {
        Span::new(0, 0)
    }

    #[test]
    fn prints_infix_calls_and_plain_calls() {
        let f = Expr::call(Expr::sym("f", sp()), vec![Expr::sym(".", sp())], sp());
        let pipe = Expr::call(Expr::sym("%>%", sp()), vec![Expr::sym("x", sp()), f], sp());
        assert_eq!(print_expr(&pipe), "x %>% f(.)");
    }

    #[test]
    fn inline_values_compare_by_identity() {
        let a = InlineValue::new(1i64, "1");
        let b = InlineValue::new(1i64, "1");
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.downcast_ref::<i64>(), Some(&1));
        assert_eq!(print_expr(&Expr::new(ExprKind::Inline(a), sp())), "1");
    }

    #[test]
    fn span_join_covers_both() {
        assert_eq!(Span::new(2, 3).join(Span::new(8, 2)), Span::new(2, 8));
    }

    #[test]
    fn serializes_without_inline_payloads() {
        let e = Expr::call(Expr::sym("g", sp()), vec![Expr::new(ExprKind::Int(3), sp())], sp());
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"Call\""));
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
