//! Typed error variants for resource operations.
//!
//! This module provides [`ResourceError`], a structured error type for
//! resource check and apply operations. Resource code raises these through
//! [`anyhow`] so callers can still attach context.

use thiserror::Error;

/// Errors that arise from resource checks and apply operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The configured source path does not exist.
    #[error("source does not exist: {path}")]
    MissingSource {
        /// Source path that was expected.
        path: String,
    },

    /// The target's parent exists but is not a directory.
    #[error("parent of target is not a directory: {path}")]
    ParentNotDirectory {
        /// The offending parent path.
        path: String,
    },

    /// A command invoked by a resource failed with a non-zero exit code.
    #[error("command '{program}' failed (exit {exit_code}): {stderr}")]
    ExecutionFailed {
        /// Name of the program that was invoked.
        program: String,
        /// Exit code returned by the process.
        exit_code: i32,
        /// Captured standard error output.
        stderr: String,
    },

    /// No implementation exists for the current platform.
    #[error("{operation} is not supported on {platform}")]
    UnsupportedPlatform {
        /// What was attempted.
        operation: String,
        /// Platform name.
        platform: String,
    },

    /// The requested operation is not supported for this resource type.
    #[error("operation '{operation}' is not supported for resource '{resource}'")]
    UnsupportedOperation {
        /// Name of the unsupported operation (e.g. `"remove"`).
        operation: String,
        /// Name or description of the resource.
        resource: String,
    },
}
