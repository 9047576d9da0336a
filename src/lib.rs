//! Declarative dotfile linking engine.
//!
//! Applies a configuration describing files to link, copy or execute into a
//! home directory, selecting entries by operating system and hostname, and
//! optionally installs OS packages through the native package manager.
//!
//! The public API is organised into these layers:
//!
//! - **[`platform`]**: the machine identity (OS family and hostname)
//! - **[`config`]**: discover, parse and normalise configuration documents
//! - **[`resources`]**: idempotent `check + apply` primitives (symlinks, copies, scripts, packages)
//! - **[`engine`]**: resolve a plan and reconcile every target against it
//! - **[`commands`]**: top-level subcommand orchestration (`apply`, `show`, `unlink`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod logging;
pub mod paths;
pub mod platform;
pub mod resources;
