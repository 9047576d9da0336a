//! Path resolution: repository root, home directory, and target expansion.
//!
//! Targets in configuration documents are written for a shell user:
//! `~/.bashrc`, `$XDG_CONFIG_HOME/nvim`, or plain `.gitconfig`. They are
//! expanded here once, against the effective home directory, so the
//! reconciliation engine only ever sees absolute paths.

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

/// Resolve the repository root: the explicit `--root`, else the current
/// directory. The result is canonical (without `\\?\` on Windows).
///
/// # Errors
///
/// Returns an error if the directory does not exist or the current
/// directory cannot be read.
pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
    let root = match explicit {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir().context("reading current directory")?,
    };
    dunce::canonicalize(&root)
        .with_context(|| format!("root directory does not exist: {}", root.display()))
}

/// Resolve the effective home directory: the explicit `--home`, else
/// `$HOME`, else `%USERPROFILE%`.
///
/// An explicit home is made absolute against the current directory, and
/// canonical when it exists.
///
/// # Errors
///
/// Returns an error if no home directory can be determined.
pub fn resolve_home(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(home) = explicit {
        let home = std::path::absolute(home)
            .with_context(|| format!("resolving home directory {}", home.display()))?;
        return Ok(dunce::canonicalize(&home).unwrap_or(home));
    }
    std::env::var_os("HOME")
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var_os("USERPROFILE").filter(|v| !v.is_empty()))
        .map(PathBuf::from)
        .context("cannot determine home directory. Use --home or set HOME")
}

/// Expand a configured target into an absolute path.
///
/// Environment variables are expanded first (`HOME` always maps to `home`,
/// unknown variables are left verbatim), then a leading `~`. Anything still
/// relative is taken relative to `home`.
#[must_use]
pub fn expand_target(raw: &str, home: &Path) -> PathBuf {
    let home_str = home.to_string_lossy();
    let with_env = shellexpand::env_with_context_no_errors(raw, |var| match var {
        "HOME" => Some(home_str.to_string()),
        _ => std::env::var(var).ok(),
    });
    let expanded = shellexpand::tilde_with_context(&with_env, || Some(home_str.as_ref()));
    let path = PathBuf::from(expanded.as_ref());
    if path.is_absolute() {
        path
    } else {
        home.join(path)
    }
}

/// Render `path` for log output, abbreviating `home` to `~`.
#[must_use]
pub fn display_path(path: &Path, home: &Path) -> String {
    path.strip_prefix(home).map_or_else(
        |_| path.display().to_string(),
        |rest| {
            if rest.as_os_str().is_empty() {
                "~".to_string()
            } else {
                format!("~/{}", rest.display())
            }
        },
    )
}
