//! Shared state for one reconciliation run.
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::exec::Executor;
use crate::logging::Log;
use crate::platform::Platform;

/// How a conflicting occupant of a target is handled.
///
/// Exactly one policy is active per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Leave the occupant alone and report it, unless `force` is set, in
    /// which case it is removed (recursively for directories).
    #[default]
    SkipUnlessForced,
    /// Move the occupant to a `<name>.bak` sibling, replacing any previous
    /// backup, then create the new target.
    BackupAndReplace,
}

/// What to do with one conflicting target under the active policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Leave it and report.
    Refuse,
    /// Delete it.
    Remove,
    /// Move it aside.
    Backup,
}

/// Shared context for a run.
pub struct Context {
    /// Machine identity.
    pub platform: Platform,
    /// Logger for decisions and outcomes.
    pub log: Arc<dyn Log>,
    /// Home directory targets are expanded against.
    pub home: PathBuf,
    /// Preview only; never mutate the filesystem.
    pub dry_run: bool,
    /// Replace conflicting targets under [`ConflictPolicy::SkipUnlessForced`].
    pub force: bool,
    /// Active conflict policy.
    pub policy: ConflictPolicy,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("platform", &self.platform)
            .field("log", &"<dyn Log>")
            .field("home", &self.home)
            .field("dry_run", &self.dry_run)
            .field("force", &self.force)
            .field("policy", &self.policy)
            .field("executor", &self.executor)
            .finish()
    }
}

impl Context {
    /// Create a context with the conservative defaults: no dry run, no
    /// force, [`ConflictPolicy::SkipUnlessForced`].
    #[must_use]
    pub fn new(
        platform: Platform,
        log: Arc<dyn Log>,
        home: PathBuf,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            platform,
            log,
            home,
            dry_run: false,
            force: false,
            policy: ConflictPolicy::default(),
            executor,
        }
    }

    /// Set the dry-run flag.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the force flag.
    #[must_use]
    pub const fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Set the conflict policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// How a conflicting target is resolved in this run.
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        match self.policy {
            ConflictPolicy::BackupAndReplace => Resolution::Backup,
            ConflictPolicy::SkipUnlessForced if self.force => Resolution::Remove,
            ConflictPolicy::SkipUnlessForced => Resolution::Refuse,
        }
    }
}
