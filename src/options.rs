use std::path::PathBuf;

/// Engine-wide knobs that are genuinely configuration rather than per-call data. Populated
/// programmatically by the embedding application, since declaring a command-line surface for the
/// engine itself is out of scope.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// When set, `Runtime::update` writes Graphviz renderings of the class graph and each
    /// method's dispatch table to this directory.
    pub render_graphs: Option<PathBuf>,

    /// Whether registering two overrides with identical parameter tuples for the same method is
    /// a setup-misuse panic (the default) or silently keeps the first registration, which is
    /// useful when incrementally assembling a test fixture.
    pub deny_duplicate_overrides: bool,
}

impl EngineOptions {
    pub fn new() -> Self {
        Self {
            render_graphs: None,
            deny_duplicate_overrides: true,
        }
    }
}
