//! Names the pipe machinery recognizes, resolved once per process.

use super::unroll::PipeKind;
use ahash::AHashMap;
use std::sync::OnceLock;

pub use dotpipe_ast::ast::PLACEHOLDER;

pub const PIPE: &str = "%>%";
pub const PIPE_EAGER: &str = "%!>%";
pub const COMPOUND: &str = "%<>%";
pub const TEE: &str = "%T>%";
pub const DOLLAR: &str = "%$%";

/// Callee of the scope-injection template `base::with(., rhs)`.
pub const WITH: &str = "base::with";

static OPERATORS: OnceLock<AHashMap<&'static str, PipeKind>> = OnceLock::new();

fn operators() -> &'static AHashMap<&'static str, PipeKind> {
    OPERATORS.get_or_init(|| {
        AHashMap::from_iter([
            (PIPE, PipeKind::Standard),
            (PIPE_EAGER, PipeKind::Standard),
            (COMPOUND, PipeKind::CompoundAssign),
            (TEE, PipeKind::Tee),
            (DOLLAR, PipeKind::Dollar),
        ])
    })
}

pub fn operator_kind(op: &str) -> PipeKind {
    operators().get(op).copied().unwrap_or(PipeKind::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_standard_spellings_share_a_kind() {
        assert_eq!(operator_kind(PIPE), PipeKind::Standard);
        assert_eq!(operator_kind(PIPE_EAGER), PipeKind::Standard);
        assert_eq!(operator_kind("%in%"), PipeKind::None);
    }
}
