//! Per-target reconciliation: inspect, decide, perform the minimal change.
//!
//! Every function here returns an [`Outcome`] and never an error: failures
//! are reported and the run continues with the next action.
use std::path::{Path, PathBuf};

use super::context::{Context, Resolution};
use crate::paths::display_path;
use crate::resources::copy::CopyResource;
use crate::resources::error::ResourceError;
use crate::resources::helpers::fs::{backup_existing, backup_path, remove_existing};
use crate::resources::script::ScriptResource;
use crate::resources::symlink::SymlinkResource;
use crate::resources::{Applicable, Resource, ResourceChange, ResourceState};

/// What happened to a conflicting occupant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Displaced {
    /// Deleted (forced).
    Removed,
    /// Moved to this `.bak` path.
    BackedUp(PathBuf),
}

/// Result of reconciling one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Target created where nothing was.
    Created,
    /// Target created after displacing an occupant.
    Replaced(Displaced),
    /// Nothing to do.
    AlreadyCorrect,
    /// Left alone on purpose; `reason` says why.
    Skipped {
        /// Why.
        reason: String,
    },
    /// Script ran and exited zero.
    Ran,
    /// Dry-run preview of a script.
    Previewed,
    /// Managed link removed.
    Removed,
    /// Could not be done.
    Failed {
        /// Underlying cause.
        reason: String,
    },
}

impl Outcome {
    /// Whether the action took effect (or would, under dry run).
    #[must_use]
    pub const fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Replaced(_) | Self::Ran | Self::Previewed | Self::Removed
        )
    }
}

/// Reconcile a symlink at `target` pointing to `source`.
pub fn reconcile_link(ctx: &Context, source: &Path, target: &Path) -> Outcome {
    let resource = SymlinkResource::new(source.to_path_buf(), target.to_path_buf());
    reconcile(ctx, &resource, target, ("link", "linked"))
}

/// Reconcile a copy of `source` at `target`.
///
/// Any existing target is a conflict; contents are never compared.
pub fn reconcile_copy(ctx: &Context, source: &Path, target: &Path) -> Outcome {
    let resource = CopyResource::new(source.to_path_buf(), target.to_path_buf());
    reconcile(ctx, &resource, target, ("copy", "copied"))
}

/// Base and past-tense forms of the action verb, for messages.
type Verb = (&'static str, &'static str);

fn reconcile<R: Resource>(ctx: &Context, resource: &R, target: &Path, verb: Verb) -> Outcome {
    let shown = display_path(target, &ctx.home);
    let state = match resource.current_state() {
        Ok(state) => state,
        Err(e) => return failed(ctx, &shown, format!("{e:#}")),
    };

    match state {
        ResourceState::Invalid { reason } => failed(ctx, &shown, reason),
        ResourceState::Correct => {
            ctx.log.info(&format!("ok: {shown} already {}", verb.1));
            Outcome::AlreadyCorrect
        }
        ResourceState::Missing => {
            if ctx.dry_run {
                ctx.log
                    .dry_run(&format!("would {}: {}", verb.0, resource.description()));
                return Outcome::Created;
            }
            match place(resource) {
                Ok(()) => {
                    ctx.log
                        .info(&format!("{}: {}", verb.1, resource.description()));
                    Outcome::Created
                }
                Err(reason) => failed(ctx, &shown, reason),
            }
        }
        ResourceState::Incorrect { current } => {
            resolve_conflict(ctx, resource, target, &shown, verb, &format!("a link that {current}"))
        }
        ResourceState::Occupied { occupant } => resolve_conflict(
            ctx,
            resource,
            target,
            &shown,
            verb,
            &format!("occupied by {occupant}"),
        ),
    }
}

fn resolve_conflict<R: Applicable>(
    ctx: &Context,
    resource: &R,
    target: &Path,
    shown: &str,
    verb: Verb,
    what: &str,
) -> Outcome {
    let displaced = match ctx.resolution() {
        Resolution::Refuse => {
            let reason = format!("{shown} is {what}; use --force to replace it");
            ctx.log.warn(&format!("skipped: {reason}"));
            return Outcome::Skipped { reason };
        }
        Resolution::Remove => {
            if ctx.dry_run {
                ctx.log.dry_run(&format!(
                    "would remove {shown} ({what}) and {}: {}",
                    verb.0,
                    resource.description()
                ));
                return Outcome::Replaced(Displaced::Removed);
            }
            if let Err(e) = remove_existing(target) {
                return failed(ctx, shown, format!("{e:#}"));
            }
            Displaced::Removed
        }
        Resolution::Backup => {
            if ctx.dry_run {
                ctx.log.dry_run(&format!(
                    "would back up {shown} to {} and {}: {}",
                    display_path(&backup_path(target), &ctx.home),
                    verb.0,
                    resource.description()
                ));
                return Outcome::Replaced(Displaced::BackedUp(backup_path(target)));
            }
            match backup_existing(target) {
                Ok(path) => {
                    ctx.log.info(&format!(
                        "backed up {shown} to {}",
                        display_path(&path, &ctx.home)
                    ));
                    Displaced::BackedUp(path)
                }
                Err(e) => return failed(ctx, shown, format!("{e:#}")),
            }
        }
    };

    match place(resource) {
        Ok(()) => {
            ctx.log
                .info(&format!("{} (replaced): {}", verb.1, resource.description()));
            Outcome::Replaced(displaced)
        }
        Err(reason) => failed(ctx, shown, reason),
    }
}

fn place<R: Applicable>(resource: &R) -> Result<(), String> {
    match resource.apply() {
        Ok(ResourceChange::Applied | ResourceChange::AlreadyCorrect) => Ok(()),
        Ok(ResourceChange::Skipped { reason }) => Err(reason),
        Err(e) => Err(format!("{e:#}")),
    }
}

fn failed(ctx: &Context, shown: &str, reason: String) -> Outcome {
    ctx.log.error(&format!("{shown}: {reason}"));
    Outcome::Failed { reason }
}

/// Run `script` with `args` through the platform shell.
///
/// A non-zero exit is a failure but never stops the run.
pub fn run_script(ctx: &Context, script: &Path, args: &[String]) -> Outcome {
    let shown = display_path(script, &ctx.home);
    if !script.is_file() {
        let reason = ResourceError::MissingSource {
            path: script.display().to_string(),
        }
        .to_string();
        return failed(ctx, &shown, reason);
    }

    let resource = ScriptResource::new(
        script.to_path_buf(),
        args.to_vec(),
        ctx.platform.os,
        ctx.executor.as_ref(),
    );
    if ctx.dry_run {
        ctx.log
            .dry_run(&format!("would run: {}", resource.description()));
        return Outcome::Previewed;
    }

    ctx.log.info(&format!("running: {}", resource.description()));
    match resource.run() {
        Ok(result) if result.success => Outcome::Ran,
        Ok(result) => {
            let code = result
                .code
                .map_or_else(|| "a signal".to_string(), |c| format!("exit code {c}"));
            failed(ctx, &shown, format!("script failed with {code}"))
        }
        Err(e) => failed(ctx, &shown, format!("{e:#}")),
    }
}

/// Remove the link at `target` if it points at `source`; leave anything
/// else alone.
pub fn unlink(ctx: &Context, source: &Path, target: &Path) -> Outcome {
    let shown = display_path(target, &ctx.home);
    let resource = SymlinkResource::new(source.to_path_buf(), target.to_path_buf());
    let state = match resource.current_state() {
        Ok(state) => state,
        Err(e) => return failed(ctx, &shown, format!("{e:#}")),
    };
    if state != ResourceState::Correct {
        let reason = match state {
            ResourceState::Missing => "not present".to_string(),
            ResourceState::Incorrect { current } => format!("a link that {current}"),
            ResourceState::Occupied { occupant } => format!("occupied by {occupant}"),
            ResourceState::Invalid { reason } => reason,
            ResourceState::Correct => String::new(),
        };
        ctx.log.info(&format!("left alone: {shown} ({reason})"));
        return Outcome::AlreadyCorrect;
    }
    if ctx.dry_run {
        ctx.log.dry_run(&format!("would remove link {shown}"));
        return Outcome::Removed;
    }
    match resource.remove() {
        Ok(ResourceChange::Applied) => {
            ctx.log.info(&format!("removed link {shown}"));
            Outcome::Removed
        }
        Ok(ResourceChange::AlreadyCorrect) => Outcome::AlreadyCorrect,
        Ok(ResourceChange::Skipped { reason }) => Outcome::Skipped { reason },
        Err(e) => failed(ctx, &shown, format!("{e:#}")),
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::engine::context::ConflictPolicy;
    use crate::engine::test_helpers::{make_context, make_context_with_executor, snapshot};
    use crate::logging::LogLevel;
    use crate::resources::test_helpers::MockExecutor;
    use std::sync::Arc;

    struct Fixture {
        _dir: tempfile::TempDir,
        repo: PathBuf,
        home: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        let home = dir.path().join("home");
        std::fs::create_dir_all(&repo).unwrap();
        std::fs::create_dir_all(&home).unwrap();
        std::fs::write(repo.join("bashrc"), "# bashrc").unwrap();
        Fixture {
            _dir: dir,
            repo,
            home,
        }
    }

    #[test]
    fn creates_missing_link_and_parents() {
        let fx = fixture();
        let (ctx, _) = make_context(fx.home.clone());
        let target = fx.home.join(".config/bash/bashrc");

        let outcome = reconcile_link(&ctx, &fx.repo.join("bashrc"), &target);

        assert_eq!(outcome, Outcome::Created);
        assert!(target.symlink_metadata().unwrap().is_symlink());
    }

    #[test]
    fn second_run_is_already_correct() {
        let fx = fixture();
        let (ctx, _) = make_context(fx.home.clone());
        let target = fx.home.join(".bashrc");
        reconcile_link(&ctx, &fx.repo.join("bashrc"), &target);
        let before = snapshot(&fx.home);

        let outcome = reconcile_link(&ctx, &fx.repo.join("bashrc"), &target);

        assert_eq!(outcome, Outcome::AlreadyCorrect);
        assert_eq!(snapshot(&fx.home), before);
    }

    #[test]
    fn missing_source_fails_without_creating_parents() {
        let fx = fixture();
        let (ctx, log) = make_context(fx.home.clone());
        let source = fx.repo.join("absent");
        let target = fx.home.join("deep/dir/file");

        let outcome = reconcile_link(&ctx, &source, &target);

        let Outcome::Failed { reason } = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert!(reason.contains(&source.display().to_string()), "{reason}");
        assert!(!fx.home.join("deep").exists());
        assert_eq!(log.messages(LogLevel::Error).len(), 1);
    }

    #[test]
    fn parent_that_is_a_file_fails() {
        let fx = fixture();
        let (ctx, _) = make_context(fx.home.clone());
        std::fs::write(fx.home.join(".config"), "oops").unwrap();

        let outcome = reconcile_link(&ctx, &fx.repo.join("bashrc"), &fx.home.join(".config/x"));

        assert!(matches!(outcome, Outcome::Failed { .. }));
        assert_eq!(
            std::fs::read_to_string(fx.home.join(".config")).unwrap(),
            "oops"
        );
    }

    #[test]
    fn uncreatable_parent_fails_without_mutation() {
        let fx = fixture();
        let (ctx, log) = make_context(fx.home.clone());
        std::fs::write(fx.home.join(".config"), "oops").unwrap();
        let before = snapshot(&fx.home);

        for outcome in [
            reconcile_link(&ctx, &fx.repo.join("bashrc"), &fx.home.join(".config/bash/bashrc")),
            reconcile_copy(&ctx, &fx.repo.join("bashrc"), &fx.home.join(".config/bash/copy")),
        ] {
            let Outcome::Failed { reason } = outcome else {
                panic!("expected failure, got {outcome:?}");
            };
            assert!(reason.contains("create parent"), "{reason}");
        }
        assert_eq!(snapshot(&fx.home), before);
        assert_eq!(log.messages(LogLevel::Error).len(), 2);
    }

    #[test]
    fn conflict_without_force_leaves_file_untouched() {
        let fx = fixture();
        let (ctx, log) = make_context(fx.home.clone());
        let target = fx.home.join(".bashrc");
        std::fs::write(&target, "mine").unwrap();

        let outcome = reconcile_link(&ctx, &fx.repo.join("bashrc"), &target);

        assert!(matches!(outcome, Outcome::Skipped { ref reason } if reason.contains("--force")));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "mine");
        assert_eq!(log.messages(LogLevel::Warn).len(), 1);
    }

    #[test]
    fn conflict_with_force_replaces_file() {
        let fx = fixture();
        let (ctx, _) = make_context(fx.home.clone());
        let ctx = ctx.with_force(true);
        let target = fx.home.join(".bashrc");
        std::fs::write(&target, "mine").unwrap();

        let outcome = reconcile_link(&ctx, &fx.repo.join("bashrc"), &target);

        assert_eq!(outcome, Outcome::Replaced(Displaced::Removed));
        assert!(target.symlink_metadata().unwrap().is_symlink());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "# bashrc");
    }

    #[test]
    fn force_removes_directory_recursively() {
        let fx = fixture();
        let (ctx, _) = make_context(fx.home.clone());
        let ctx = ctx.with_force(true);
        let target = fx.home.join(".bashrc");
        std::fs::create_dir_all(target.join("nested")).unwrap();
        std::fs::write(target.join("nested/f"), "x").unwrap();

        let outcome = reconcile_link(&ctx, &fx.repo.join("bashrc"), &target);

        assert_eq!(outcome, Outcome::Replaced(Displaced::Removed));
        assert!(target.symlink_metadata().unwrap().is_symlink());
    }

    #[cfg(unix)]
    #[test]
    fn wrong_link_needs_force() {
        let fx = fixture();
        let (ctx, _) = make_context(fx.home.clone());
        let target = fx.home.join(".bashrc");
        std::fs::write(fx.repo.join("other"), "x").unwrap();
        std::os::unix::fs::symlink(fx.repo.join("other"), &target).unwrap();

        let outcome = reconcile_link(&ctx, &fx.repo.join("bashrc"), &target);
        assert!(matches!(outcome, Outcome::Skipped { .. }));

        let ctx = ctx.with_force(true);
        let outcome = reconcile_link(&ctx, &fx.repo.join("bashrc"), &target);
        assert_eq!(outcome, Outcome::Replaced(Displaced::Removed));
        assert_eq!(
            std::fs::read_link(&target).unwrap(),
            fx.repo.join("bashrc")
        );
        assert!(fx.repo.join("other").exists());
    }

    #[test]
    fn backup_policy_moves_occupant_aside() {
        let fx = fixture();
        let (ctx, _) = make_context(fx.home.clone());
        let ctx = ctx.with_policy(ConflictPolicy::BackupAndReplace);
        let target = fx.home.join(".bashrc");
        std::fs::write(&target, "mine").unwrap();
        std::fs::write(fx.home.join(".bashrc.bak"), "older").unwrap();

        let outcome = reconcile_link(&ctx, &fx.repo.join("bashrc"), &target);

        assert_eq!(
            outcome,
            Outcome::Replaced(Displaced::BackedUp(fx.home.join(".bashrc.bak")))
        );
        assert_eq!(
            std::fs::read_to_string(fx.home.join(".bashrc.bak")).unwrap(),
            "mine"
        );
        assert!(target.symlink_metadata().unwrap().is_symlink());
    }

    #[test]
    fn dry_run_never_mutates() {
        let fx = fixture();
        std::fs::write(fx.home.join(".occupied"), "mine").unwrap();
        let before = snapshot(&fx.home);

        for policy in [
            ConflictPolicy::SkipUnlessForced,
            ConflictPolicy::BackupAndReplace,
        ] {
            let (ctx, log) = make_context(fx.home.clone());
            let ctx = ctx.with_dry_run(true).with_force(true).with_policy(policy);
            let created = reconcile_link(&ctx, &fx.repo.join("bashrc"), &fx.home.join("a/b/c"));
            let replaced = reconcile_link(&ctx, &fx.repo.join("bashrc"), &fx.home.join(".occupied"));
            let copied = reconcile_copy(&ctx, &fx.repo.join("bashrc"), &fx.home.join(".copy"));

            assert_eq!(created, Outcome::Created);
            assert!(matches!(replaced, Outcome::Replaced(_)));
            assert_eq!(copied, Outcome::Created);
            assert_eq!(log.messages(LogLevel::DryRun).len(), 3);
        }

        assert_eq!(snapshot(&fx.home), before);
    }

    #[test]
    fn copy_conflicts_on_any_existing_target() {
        let fx = fixture();
        let (ctx, _) = make_context(fx.home.clone());
        let target = fx.home.join(".bashrc");

        assert_eq!(
            reconcile_copy(&ctx, &fx.repo.join("bashrc"), &target),
            Outcome::Created
        );
        assert!(matches!(
            reconcile_copy(&ctx, &fx.repo.join("bashrc"), &target),
            Outcome::Skipped { .. }
        ));

        let ctx = ctx.with_force(true);
        assert_eq!(
            reconcile_copy(&ctx, &fx.repo.join("bashrc"), &target),
            Outcome::Replaced(Displaced::Removed)
        );
        assert!(!target.symlink_metadata().unwrap().is_symlink());
    }

    #[test]
    fn missing_script_fails() {
        let fx = fixture();
        let (ctx, _) = make_context(fx.home.clone());
        let outcome = run_script(&ctx, &fx.repo.join("setup.sh"), &[]);
        assert!(matches!(outcome, Outcome::Failed { ref reason } if reason.contains("setup.sh")));
    }

    #[test]
    fn script_exit_code_is_reported() {
        let fx = fixture();
        std::fs::write(fx.repo.join("setup.sh"), "exit 3").unwrap();
        let executor = Arc::new(MockExecutor::with_responses(vec![
            (true, String::new()),
            (false, String::new()),
        ]));
        let (ctx, _) = make_context_with_executor(fx.home.clone(), executor.clone());

        assert_eq!(
            run_script(&ctx, &fx.repo.join("setup.sh"), &["a".to_string()]),
            Outcome::Ran
        );
        assert!(matches!(
            run_script(&ctx, &fx.repo.join("setup.sh"), &[]),
            Outcome::Failed { ref reason } if reason.contains("exit code 1")
        ));
        let calls = executor.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].ends_with("setup.sh a"), "{calls:?}");
    }

    #[test]
    fn dry_run_script_is_previewed() {
        let fx = fixture();
        std::fs::write(fx.repo.join("setup.sh"), "").unwrap();
        let executor = Arc::new(MockExecutor::ok(""));
        let (ctx, _) = make_context_with_executor(fx.home.clone(), executor.clone());
        let ctx = ctx.with_dry_run(true);

        assert_eq!(
            run_script(&ctx, &fx.repo.join("setup.sh"), &[]),
            Outcome::Previewed
        );
        assert_eq!(executor.call_count(), 0);
    }

    #[test]
    fn unlink_removes_only_managed_links() {
        let fx = fixture();
        let (ctx, _) = make_context(fx.home.clone());
        let managed = fx.home.join(".bashrc");
        let foreign = fx.home.join(".profile");
        reconcile_link(&ctx, &fx.repo.join("bashrc"), &managed);
        std::fs::write(&foreign, "mine").unwrap();

        assert_eq!(unlink(&ctx, &fx.repo.join("bashrc"), &managed), Outcome::Removed);
        assert_eq!(
            unlink(&ctx, &fx.repo.join("bashrc"), &foreign),
            Outcome::AlreadyCorrect
        );
        assert!(managed.symlink_metadata().is_err());
        assert!(fx.repo.join("bashrc").exists());
        assert_eq!(std::fs::read_to_string(&foreign).unwrap(), "mine");
    }
}
