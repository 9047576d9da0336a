use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::platform::Os;

/// Top-level CLI entry point for homelink.
#[derive(Parser, Debug)]
#[command(
    name = "homelink",
    about = "Declarative, platform- and host-aware dotfile linking",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Configuration root directory (default: current directory)
    #[arg(long, global = true, env = "HOMELINK_ROOT")]
    pub root: Option<PathBuf>,

    /// Load exactly this configuration document instead of discovering
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Home directory used to expand `~` in targets
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Override the detected operating system (linux, macos, windows)
    #[arg(long, global = true, value_parser = parse_os)]
    pub platform: Option<Os>,

    /// Override the detected hostname
    #[arg(long, global = true)]
    pub hostname: Option<String>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install packages and bring every link, copy and script up to date
    #[command(visible_alias = "install")]
    Apply(ApplyOpts),
    /// Print the plan resolved for this machine
    Show(ShowOpts),
    /// Remove links that still point at their configured source
    Unlink,
    /// Print a shell completion script
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the per-command log file.
    #[must_use]
    pub const fn log_name(&self) -> &'static str {
        match self {
            Self::Apply(_) => "apply",
            Self::Show(_) => "show",
            Self::Unlink => "unlink",
            Self::Completions { .. } => "completions",
            Self::Version => "version",
        }
    }
}

/// Options for the `apply` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct ApplyOpts {
    /// Replace conflicting targets (directories are removed recursively)
    #[arg(short, long)]
    pub force: bool,

    /// Move conflicting targets to `<name>.bak` before replacing them
    #[arg(long, conflicts_with = "force")]
    pub backup: bool,

    /// Do not install packages
    #[arg(long)]
    pub no_packages: bool,
}

/// Options for the `show` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct ShowOpts {
    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_os(value: &str) -> Result<Os, String> {
    match Os::from_name(value) {
        Os::Unknown => Err(format!(
            "unknown platform '{value}' (expected linux, macos or windows)"
        )),
        os => Ok(os),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_apply_defaults_are_conservative() {
        let cli = Cli::parse_from(["homelink", "apply"]);
        assert!(!cli.global.dry_run);
        assert!(
            matches!(&cli.command, Command::Apply(opts) if !opts.force && !opts.backup),
            "expected apply without force or backup"
        );
    }

    #[test]
    fn install_is_an_alias_for_apply() {
        let cli = Cli::parse_from(["homelink", "install", "--force"]);
        assert!(matches!(cli.command, Command::Apply(ApplyOpts { force: true, .. })));
    }

    #[test]
    fn parse_dry_run_short() {
        let cli = Cli::parse_from(["homelink", "-n", "apply"]);
        assert!(cli.global.dry_run);
    }

    #[test]
    fn backup_conflicts_with_force() {
        let result = Cli::try_parse_from(["homelink", "apply", "--force", "--backup"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_identity_overrides() {
        let cli = Cli::parse_from([
            "homelink",
            "--platform",
            "darwin",
            "--hostname",
            "work",
            "show",
        ]);
        assert_eq!(cli.global.platform, Some(Os::Macos));
        assert_eq!(cli.global.hostname.as_deref(), Some("work"));
    }

    #[test]
    fn unknown_platform_is_rejected() {
        assert!(Cli::try_parse_from(["homelink", "--platform", "plan9", "show"]).is_err());
    }

    #[test]
    fn parse_show_json() {
        let cli = Cli::parse_from(["homelink", "show", "--json"]);
        assert!(matches!(cli.command, Command::Show(ShowOpts { json: true })));
    }

    #[test]
    fn parse_config_and_home() {
        let cli = Cli::parse_from([
            "homelink",
            "-c",
            "/tmp/links.yaml",
            "--home",
            "/tmp/home",
            "unlink",
        ]);
        assert_eq!(cli.global.config, Some(PathBuf::from("/tmp/links.yaml")));
        assert_eq!(cli.global.home, Some(PathBuf::from("/tmp/home")));
        assert_eq!(cli.command.log_name(), "unlink");
    }

    #[test]
    fn parse_completions() {
        let cli = Cli::parse_from(["homelink", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Command::Completions { shell: Shell::Bash }
        ));
    }

    #[test]
    fn parse_version() {
        let cli = Cli::parse_from(["homelink", "version"]);
        assert!(matches!(cli.command, Command::Version));
    }
}
