//! Run-level counters and error list.
use serde::Serialize;

use super::reconcile::Outcome;
use crate::config::ActionKind;
use crate::logging::Log;

/// Counters and errors for one run (or one part of it).
///
/// Parts are combined with `+=`.
///
/// # Examples
///
/// ```
/// use homelink::engine::RunSummary;
///
/// let mut total = RunSummary::default();
/// let mut part = RunSummary::default();
/// part.links = 2;
/// part.errors.push("copy gitconfig: source does not exist".into());
/// total += part;
///
/// assert_eq!(total.links, 2);
/// assert!(total.has_errors());
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Modules processed.
    pub modules: u32,
    /// Modules skipped by their platform/host filters.
    pub modules_skipped: u32,
    /// Links created or replaced.
    pub links: u32,
    /// Copies created or replaced.
    pub copies: u32,
    /// Scripts run.
    pub scripts: u32,
    /// Packages installed.
    pub packages: u32,
    /// Links removed.
    pub removed: u32,
    /// Items already in the desired state.
    pub unchanged: u32,
    /// Items left alone because of a conflict.
    pub skipped: u32,
    /// Items that failed.
    pub failed: u32,
    /// Every conflict and failure message, in occurrence order.
    pub errors: Vec<String>,
}

impl RunSummary {
    /// Count one action outcome.
    pub fn record(&mut self, kind: ActionKind, key: &str, outcome: &Outcome) {
        match outcome {
            Outcome::Created | Outcome::Replaced(_) => match kind {
                ActionKind::Link => self.links += 1,
                ActionKind::Copy => self.copies += 1,
                ActionKind::Exec => self.scripts += 1,
            },
            Outcome::Ran | Outcome::Previewed => self.scripts += 1,
            Outcome::Removed => self.removed += 1,
            Outcome::AlreadyCorrect => self.unchanged += 1,
            Outcome::Skipped { reason } => {
                self.skipped += 1;
                self.errors.push(format!("{kind} {key}: {reason}"));
            }
            Outcome::Failed { reason } => {
                self.failed += 1;
                self.errors.push(format!("{kind} {key}: {reason}"));
            }
        }
    }

    /// Record a failure that is not tied to one action.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(message.into());
    }

    /// Whether anything was skipped or failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Summary lines, without the error list.
    #[must_use]
    pub fn lines(&self, dry_run: bool) -> Vec<String> {
        let verb = if dry_run { "would be applied" } else { "applied" };
        let mut lines = vec![format!(
            "{} modules processed, {} skipped by filters",
            self.modules, self.modules_skipped
        )];
        lines.push(format!(
            "{} links, {} copies, {} scripts, {} packages {verb}",
            self.links, self.copies, self.scripts, self.packages
        ));
        if self.removed > 0 {
            let verb = if dry_run { "would be removed" } else { "removed" };
            lines.push(format!("{} links {verb}", self.removed));
        }
        lines.push(format!(
            "{} already correct, {} skipped, {} failed",
            self.unchanged, self.skipped, self.failed
        ));
        lines
    }

    /// Log the summary, restating every error verbatim.
    pub fn report(&self, log: &dyn Log, dry_run: bool) {
        log.stage("Summary");
        for line in self.lines(dry_run) {
            log.info(&line);
        }
        if self.errors.is_empty() {
            log.info("0 errors");
        } else {
            log.error(&format!("{} errors:", self.errors.len()));
            for error in &self.errors {
                log.error(&format!("  {error}"));
            }
        }
    }
}

impl std::ops::AddAssign for RunSummary {
    fn add_assign(&mut self, other: Self) {
        self.modules += other.modules;
        self.modules_skipped += other.modules_skipped;
        self.links += other.links;
        self.copies += other.copies;
        self.scripts += other.scripts;
        self.packages += other.packages;
        self.removed += other.removed;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.errors.extend(other.errors);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::engine::reconcile::Displaced;
    use crate::logging::{LogLevel, MemoryLog};

    #[test]
    fn records_by_kind_and_outcome() {
        let mut summary = RunSummary::default();
        summary.record(ActionKind::Link, "a", &Outcome::Created);
        summary.record(ActionKind::Link, "b", &Outcome::Replaced(Displaced::Removed));
        summary.record(ActionKind::Copy, "c", &Outcome::Created);
        summary.record(ActionKind::Exec, "d.sh", &Outcome::Ran);
        summary.record(ActionKind::Link, "e", &Outcome::AlreadyCorrect);

        assert_eq!(summary.links, 2);
        assert_eq!(summary.copies, 1);
        assert_eq!(summary.scripts, 1);
        assert_eq!(summary.unchanged, 1);
        assert!(!summary.has_errors());
    }

    #[test]
    fn conflicts_and_failures_are_listed_in_order() {
        let mut summary = RunSummary::default();
        summary.record(
            ActionKind::Link,
            "bashrc",
            &Outcome::Skipped {
                reason: "~/.bashrc is occupied".to_string(),
            },
        );
        summary.record(
            ActionKind::Copy,
            "gitconfig",
            &Outcome::Failed {
                reason: "source does not exist: /r/gitconfig".to_string(),
            },
        );

        assert_eq!(summary.links, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            summary.errors,
            [
                "link bashrc: ~/.bashrc is occupied",
                "copy gitconfig: source does not exist: /r/gitconfig"
            ]
        );
    }

    #[test]
    fn add_assign_combines_parts() {
        let mut total = RunSummary {
            links: 1,
            errors: vec!["first".to_string()],
            ..RunSummary::default()
        };
        total += RunSummary {
            links: 2,
            packages: 3,
            errors: vec!["second".to_string()],
            ..RunSummary::default()
        };
        assert_eq!(total.links, 3);
        assert_eq!(total.packages, 3);
        assert_eq!(total.errors, ["first", "second"]);
    }

    #[test]
    fn dry_run_lines_say_would() {
        let summary = RunSummary {
            links: 2,
            ..RunSummary::default()
        };
        assert_eq!(
            summary.lines(true)[1],
            "2 links, 0 copies, 0 scripts, 0 packages would be applied"
        );
    }

    #[test]
    fn report_restates_errors() {
        let log = MemoryLog::new();
        let mut summary = RunSummary::default();
        summary.record_error("package installation (apt): exit 100");
        summary.report(&log, false);

        let errors = log.messages(LogLevel::Error);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1], "  package installation (apt): exit 100");
        assert_eq!(log.messages(LogLevel::Stage), ["Summary"]);
    }

    #[test]
    fn clean_report_says_zero_errors() {
        let log = MemoryLog::new();
        RunSummary::default().report(&log, false);
        assert!(log.contains(LogLevel::Info, "0 errors"));
    }
}
