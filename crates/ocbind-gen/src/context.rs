//! Run-wide mutable state.

use rustc_hash::FxHashSet;

/// State shared by every module of one generation run: the visited-class
/// record, the enum-cast registry, and non-fatal diagnostics.
///
/// Passed `&mut` through driver and emitter; nothing here is global.
#[derive(Debug, Default)]
pub struct RunContext {
    visited: FxHashSet<String>,
    /// Accumulated `luabridge::Stack` specializations, written once to the
    /// shared enum header after all modules ran.
    pub enum_casts: String,
    /// Non-fatal anomalies, for human review after the run.
    pub diagnostics: Vec<String>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` as emitted. Returns false if it was already present,
    /// in which case the caller must not emit it again.
    pub fn add_visited(&mut self, name: &str) -> bool {
        self.visited.insert(name.to_string())
    }

    pub fn is_visited(&self, name: &str) -> bool {
        self.visited.contains(name)
    }

    pub fn diag(&mut self, message: impl Into<String>) {
        self.diagnostics.push(message.into());
    }
}
