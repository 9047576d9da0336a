//! Reconciliation engine: resolve a plan, then bring each target into the
//! declared state.
//!
//! A run is strictly sequential. Packages are installed first, then modules
//! in load order, then each module's links, copies and scripts in order.
//! Failures are recorded in the [`RunSummary`] and never abort the run.

pub mod context;
pub mod dispatch;
pub mod plan;
pub mod reconcile;
pub mod summary;

pub use context::{ConflictPolicy, Context, Resolution};
pub use dispatch::{Dispatcher, dispatch};
pub use plan::{ModulePlan, Plan, ResolvedAction};
pub use reconcile::{Displaced, Outcome, reconcile_copy, reconcile_link, run_script, unlink};
pub use summary::RunSummary;

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub mod test_helpers {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use super::Context;
    use crate::exec::Executor;
    use crate::logging::MemoryLog;
    use crate::platform::{Os, Platform};
    use crate::resources::test_helpers::MockExecutor;

    /// Linux context for host `box` with a capturing log and an executor
    /// that succeeds with empty output.
    pub fn make_context(home: PathBuf) -> (Context, Arc<MemoryLog>) {
        make_context_with_executor(home, Arc::new(MockExecutor::ok("")))
    }

    /// Like [`make_context`] with a caller-supplied executor.
    pub fn make_context_with_executor(
        home: PathBuf,
        executor: Arc<dyn Executor>,
    ) -> (Context, Arc<MemoryLog>) {
        let log = Arc::new(MemoryLog::new());
        let ctx = Context::new(
            Platform::new(Os::Linux, "box"),
            Arc::clone(&log) as Arc<dyn crate::logging::Log>,
            home,
            executor,
        );
        (ctx, log)
    }

    /// Sorted listing of everything under `dir`: relative path and either
    /// `dir`, `link -> target` or the file contents.
    pub fn snapshot(dir: &Path) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = walkdir::WalkDir::new(dir)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .map(|entry| {
                let entry = entry.unwrap();
                let rel = entry
                    .path()
                    .strip_prefix(dir)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/");
                let kind = entry.file_type();
                let state = if kind.is_symlink() {
                    let target = std::fs::read_link(entry.path()).unwrap();
                    format!("link -> {}", target.display())
                } else if kind.is_dir() {
                    "dir".to_string()
                } else {
                    std::fs::read_to_string(entry.path()).unwrap_or_else(|_| "<binary>".into())
                };
                (rel, state)
            })
            .collect();
        entries.sort();
        entries
    }
}
