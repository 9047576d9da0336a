use std::sync::Arc;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::engine::{Context, Dispatcher, RunSummary};
use crate::exec::SystemExecutor;
use crate::logging::Log;

/// Run the unlink command: remove every configured link that still points
/// at its source. Copies and scripts are never touched.
///
/// # Errors
///
/// Returns an error if the root or home cannot be resolved or the
/// configuration cannot be loaded.
pub fn run(global: &GlobalOpts, log: &Arc<dyn Log>) -> Result<RunSummary> {
    let setup = CommandSetup::init(global, log.as_ref())?;
    let ctx = Context::new(
        setup.platform.clone(),
        Arc::clone(log),
        setup.home.clone(),
        Arc::new(SystemExecutor),
    )
    .with_dry_run(global.dry_run);

    let summary = Dispatcher::new(&ctx).unlink(&setup.plan);
    summary.report(log.as_ref(), global.dry_run);
    Ok(summary)
}
