//! Domain-specific error types for the homelink engine.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g. [`ConfigError`]) while command
//! handlers at the CLI boundary convert them to [`anyhow::Error`] via the
//! standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! HomelinkError
//! ├── Config(ConfigError)     : discovery, parsing, top-level shape (fatal)
//! └── Resource(ResourceError) : links, copies, scripts, packages (per action)
//! ```

use thiserror::Error;

pub use crate::resources::error::ResourceError;

/// Top-level error type for the homelink engine.
#[derive(Error, Debug)]
pub enum HomelinkError {
    /// Configuration could not be loaded. Always fatal.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A resource operation failed.
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),
}

impl HomelinkError {
    /// Process exit status for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Resource(_) => 1,
        }
    }
}

/// Errors that arise while discovering and loading configuration documents.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No configuration document exists under the root.
    #[error("no configuration found under {root}")]
    NotFound {
        /// Directory that was searched.
        root: String,
    },

    /// An explicitly requested configuration file does not exist.
    #[error("configuration file not found: {0}")]
    MissingFile(String),

    /// The file extension does not name a supported document format.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// An I/O error occurred while reading a config file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The document could not be parsed.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path to the document.
        path: String,
        /// Parser message.
        message: String,
    },

    /// The document parsed, but its top level is not a mapping.
    #[error("{path}: top level must be a mapping, found {found}")]
    NotAMapping {
        /// Path to the document.
        path: String,
        /// Kind of value found instead.
        found: String,
    },
}
