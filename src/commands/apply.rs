use std::sync::Arc;

use anyhow::Result;

use super::{CommandSetup, version};
use crate::cli::{ApplyOpts, GlobalOpts};
use crate::engine::{ConflictPolicy, Context, Dispatcher, RunSummary};
use crate::exec::{Executor, SystemExecutor};
use crate::logging::Log;
use crate::platform::Platform;
use crate::resources::error::ResourceError;
use crate::resources::package::{PackageManager, SystemPackageInstaller};

/// Run the apply command.
///
/// Individual action failures are reported in the returned summary; only
/// setup failures are returned as errors.
///
/// # Errors
///
/// Returns an error if the root or home cannot be resolved or the
/// configuration cannot be loaded.
pub fn run(global: &GlobalOpts, opts: &ApplyOpts, log: &Arc<dyn Log>) -> Result<RunSummary> {
    log.info(&format!("homelink {}", version()));
    let setup = CommandSetup::init(global, log.as_ref())?;
    Ok(execute(&setup, global, opts, log, Arc::new(SystemExecutor)))
}

/// Apply an already-resolved plan with `executor` as the process boundary.
#[must_use]
pub fn execute(
    setup: &CommandSetup,
    global: &GlobalOpts,
    opts: &ApplyOpts,
    log: &Arc<dyn Log>,
    executor: Arc<dyn Executor>,
) -> RunSummary {
    let policy = if opts.backup {
        ConflictPolicy::BackupAndReplace
    } else {
        ConflictPolicy::SkipUnlessForced
    };
    let ctx = Context::new(
        setup.platform.clone(),
        Arc::clone(log),
        setup.home.clone(),
        Arc::clone(&executor),
    )
    .with_dry_run(global.dry_run)
    .with_force(opts.force)
    .with_policy(policy);

    let installer = if opts.no_packages || setup.plan.packages.is_empty() {
        None
    } else {
        package_installer(&setup.platform, executor.as_ref(), log.as_ref())
    };

    let dispatcher = Dispatcher::new(&ctx);
    let summary = match &installer {
        Some(installer) => dispatcher.with_installer(installer).run(&setup.plan),
        None => dispatcher.run(&setup.plan),
    };
    summary.report(log.as_ref(), global.dry_run);
    summary
}

/// Pick the native package manager, or warn and return `None` when there is
/// none or it is not installed.
fn package_installer<'a>(
    platform: &Platform,
    executor: &'a dyn Executor,
    log: &dyn Log,
) -> Option<SystemPackageInstaller<'a>> {
    let Some(manager) = PackageManager::for_os(platform.os) else {
        let err = ResourceError::UnsupportedPlatform {
            operation: "package install".to_string(),
            platform: platform.os.to_string(),
        };
        log.warn(&format!("{err}; skipping packages"));
        return None;
    };
    if !executor.which(manager.program()) {
        log.warn(&format!(
            "{} not found on PATH; skipping packages",
            manager.program()
        ));
        return None;
    }
    Some(SystemPackageInstaller::new(manager, executor))
}
