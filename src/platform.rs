//! Machine identity: operating system family and hostname.
use std::fmt;

use serde::Serialize;

/// Detected operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Linux.
    Linux,
    /// macOS.
    Macos,
    /// Windows.
    Windows,
    /// Anything else. Never matches a platform selector.
    Unknown,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Macos => write!(f, "macos"),
            Self::Windows => write!(f, "windows"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl Os {
    /// Map an OS name to a family.
    ///
    /// Accepts the names used in configuration documents as well as the
    /// runtime-reported names (`darwin`, `win32`). Matching is
    /// case-insensitive; anything unrecognised maps to [`Os::Unknown`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "linux" => Self::Linux,
            "macos" | "darwin" | "osx" | "mac" => Self::Macos,
            "windows" | "win32" | "win" => Self::Windows,
            _ => Self::Unknown,
        }
    }

    /// Whether a single selector token names this OS family.
    ///
    /// [`Os::Unknown`] matches nothing, not even the token `unknown`.
    #[must_use]
    pub fn matches(self, token: &str) -> bool {
        self != Self::Unknown && Self::from_name(token) == self
    }

    /// Whether `name` is recognised as an OS name at all.
    #[must_use]
    pub fn is_os_name(name: &str) -> bool {
        Self::from_name(name) != Self::Unknown
    }
}

/// Identity of the machine for the current run.
///
/// Computed once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
    /// Network hostname, verbatim. Empty when it could not be determined.
    pub hostname: String,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            os: Self::detect_os(),
            hostname: Self::detect_hostname(),
        }
    }

    /// Create a platform with explicit values.
    #[must_use]
    pub fn new(os: Os, hostname: impl Into<String>) -> Self {
        Self {
            os,
            hostname: hostname.into(),
        }
    }

    /// Replace the detected values with user-supplied ones.
    #[must_use]
    pub fn with_overrides(mut self, os: Option<Os>, hostname: Option<String>) -> Self {
        if let Some(os) = os {
            self.os = os;
        }
        if let Some(hostname) = hostname {
            self.hostname = hostname;
        }
        self
    }

    /// Returns `true` on Windows.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    fn detect_os() -> Os {
        Os::from_name(std::env::consts::OS)
    }

    fn detect_hostname() -> String {
        hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hostname.is_empty() {
            write!(f, "{} (hostname unknown)", self.os)
        } else {
            write!(f, "{} on {}", self.hostname, self.os)
        }
    }
}
