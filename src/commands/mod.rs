pub mod apply;
pub mod show;
pub mod unlink;

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::Config;
use crate::engine::Plan;
use crate::error::HomelinkError;
use crate::logging::Log;
use crate::paths::{resolve_home, resolve_root};
use crate::platform::{Os, Platform};

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates identity resolution, configuration loading and plan
/// building so that each command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Machine identity for this run.
    pub platform: Platform,
    /// Configuration root.
    pub root: PathBuf,
    /// Effective home directory.
    pub home: PathBuf,
    /// Plan resolved for `platform`.
    pub plan: Plan,
}

impl CommandSetup {
    /// Resolve the identity, load all configuration and build the plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the root or home directory cannot be determined,
    /// or a [`HomelinkError::Config`] if any document fails to load.
    pub fn init(global: &GlobalOpts, log: &dyn Log) -> Result<Self> {
        let platform =
            Platform::detect().with_overrides(global.platform, global.hostname.clone());
        if platform.os == Os::Unknown {
            log.warn("unrecognised operating system; platform-specific entries will not apply");
        }
        log.debug(&format!("platform: {platform}"));

        let root = resolve_root(global.root.as_deref())?;
        let home = resolve_home(global.home.as_deref())?;

        log.stage("Loading configuration");
        let config =
            Config::load(&root, global.config.as_deref()).map_err(HomelinkError::from)?;
        log.info(&format!(
            "loaded {} module(s) from {}",
            config.modules.len(),
            root.display()
        ));

        if !config.warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                config.warnings.len()
            ));
            for warning in &config.warnings {
                log.warn(&format!("  {warning}"));
            }
        }

        let plan = Plan::build(&config, &platform, &home);
        log.debug(&format!(
            "{} action(s), {} package(s)",
            plan.action_count(),
            plan.packages.len()
        ));

        Ok(Self {
            platform,
            root,
            home,
            plan,
        })
    }
}

/// Version string embedded at build time, falling back to the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("HOMELINK_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}
