//! Runtime configuration carried by every environment.

/// How pipe chains are evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PipeMode {
    /// Each operator decides: `%!>%` is eager, the other pipes are lazy.
    #[default]
    Auto,
    Eager,
    Lazy,
}

impl PipeMode {
    /// Resolve the strategy for one pipe call site.
    pub fn use_lazy(self, requested: bool) -> bool {
        match self {
            PipeMode::Auto => requested,
            PipeMode::Eager => false,
            PipeMode::Lazy => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    pub pipe_mode: PipeMode,
}
