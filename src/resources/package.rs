//! Package installation resource.
use anyhow::Result;
use std::path::Path;

use super::error::ResourceError;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;
use crate::platform::Os;

/// Supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    /// Debian/Ubuntu packages (apt-get).
    Apt,
    /// Homebrew formulae and casks.
    Brew,
    /// Windows packages (winget).
    Winget,
}

impl PackageManager {
    /// The native manager for `os`, if there is one.
    #[must_use]
    pub const fn for_os(os: Os) -> Option<Self> {
        match os {
            Os::Linux => Some(Self::Apt),
            Os::Macos => Some(Self::Brew),
            Os::Windows => Some(Self::Winget),
            Os::Unknown => None,
        }
    }

    /// Executable that must be on `PATH` for this manager to work.
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Brew => "brew",
            Self::Winget => "winget",
        }
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Apt => write!(f, "apt"),
            Self::Brew => write!(f, "brew"),
            Self::Winget => write!(f, "winget"),
        }
    }
}

/// Queries and installs packages for one platform.
#[cfg_attr(test, mockall::automock)]
pub trait PackageInstaller {
    /// Which manager this installer drives.
    fn manager(&self) -> PackageManager;

    /// Whether `name` is already installed.
    ///
    /// # Errors
    ///
    /// Returns an error if the query command cannot be run.
    fn is_installed(&self, name: &str) -> Result<bool>;

    /// Install every package in `names`, in as few invocations as the
    /// manager allows.
    ///
    /// # Errors
    ///
    /// Returns an error if any installation fails.
    fn install(&self, names: &[String]) -> Result<()>;
}

/// [`PackageInstaller`] that shells out to the native package manager.
#[derive(Debug)]
pub struct SystemPackageInstaller<'a> {
    manager: PackageManager,
    executor: &'a dyn Executor,
}

impl<'a> SystemPackageInstaller<'a> {
    /// Create an installer for `manager`.
    #[must_use]
    pub const fn new(manager: PackageManager, executor: &'a dyn Executor) -> Self {
        Self { manager, executor }
    }

    fn run_install(&self, program: &str, args: &[&str]) -> Result<()> {
        let result = self.executor.run_attached(Path::new("."), program, args)?;
        if result.success {
            Ok(())
        } else {
            Err(ResourceError::ExecutionFailed {
                program: program.to_string(),
                exit_code: result.code.unwrap_or(-1),
                stderr: result.stderr.trim().to_string(),
            }
            .into())
        }
    }
}

impl PackageInstaller for SystemPackageInstaller<'_> {
    fn manager(&self) -> PackageManager {
        self.manager
    }

    fn is_installed(&self, name: &str) -> Result<bool> {
        match self.manager {
            PackageManager::Apt => {
                let result = self
                    .executor
                    .run_unchecked("dpkg-query", &["-W", "-f=${Status}", name])?;
                Ok(result.success && result.stdout.contains("install ok installed"))
            }
            PackageManager::Brew => {
                let result = self
                    .executor
                    .run_unchecked("brew", &["list", "--versions", name])?;
                Ok(result.success && !result.stdout.trim().is_empty())
            }
            PackageManager::Winget => {
                let result = self.executor.run_unchecked(
                    "winget",
                    &[
                        "list",
                        "--id",
                        name,
                        "--exact",
                        "--accept-source-agreements",
                    ],
                )?;
                Ok(result.success && result.stdout.contains(name))
            }
        }
    }

    fn install(&self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        match self.manager {
            PackageManager::Apt => {
                let mut args = vec!["apt-get", "install", "-y"];
                args.extend(&names);
                // Root shells without sudo (containers) run apt-get directly.
                if self.executor.which("sudo") {
                    self.run_install("sudo", &args)
                } else {
                    self.run_install("apt-get", args.get(1..).unwrap_or_default())
                }
            }
            PackageManager::Brew => {
                let mut args = vec!["install"];
                args.extend(&names);
                self.run_install("brew", &args)
            }
            PackageManager::Winget => {
                // No multi-package install; try each and report all failures.
                let mut failed = Vec::new();
                for name in names {
                    let result = self.executor.run_unchecked(
                        "winget",
                        &[
                            "install",
                            "--id",
                            name,
                            "--exact",
                            "--source",
                            "winget",
                            "--accept-source-agreements",
                            "--accept-package-agreements",
                        ],
                    )?;
                    if !result.success {
                        // winget writes most diagnostics to stdout.
                        let detail = if result.stderr.trim().is_empty() {
                            result.stdout.trim().to_string()
                        } else {
                            format!("{}\n{}", result.stdout.trim(), result.stderr.trim())
                        };
                        failed.push(format!("{name}: {detail}"));
                    }
                }
                if failed.is_empty() {
                    Ok(())
                } else {
                    anyhow::bail!("winget install failed for {}", failed.join("; "))
                }
            }
        }
    }
}

/// A system package resource that can be checked and installed.
pub struct PackageResource<'a> {
    /// Package name (or winget ID).
    pub name: String,
    installer: &'a dyn PackageInstaller,
}

impl std::fmt::Debug for PackageResource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageResource")
            .field("name", &self.name)
            .field("manager", &self.installer.manager())
            .finish()
    }
}

impl<'a> PackageResource<'a> {
    /// Create a new package resource.
    #[must_use]
    pub const fn new(name: String, installer: &'a dyn PackageInstaller) -> Self {
        Self { name, installer }
    }
}

impl Applicable for PackageResource<'_> {
    fn description(&self) -> String {
        format!("{} ({})", self.name, self.installer.manager())
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.installer.install(std::slice::from_ref(&self.name))?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for PackageResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        if self.installer.is_installed(&self.name)? {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }
}

/// Install every resource in one call to their shared installer.
///
/// # Errors
///
/// Returns an error if the installer fails.
pub fn batch_install_packages(resources: &[&PackageResource<'_>]) -> Result<()> {
    let Some(first) = resources.first() else {
        return Ok(());
    };
    let names: Vec<String> = resources.iter().map(|r| r.name.clone()).collect();
    first.installer.install(&names)
}
