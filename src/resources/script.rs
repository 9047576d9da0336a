//! Script resource: run a repository script through the platform shell.
use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::exec::{ExecResult, Executor};
use crate::platform::Os;

/// A script to run with fixed arguments.
#[derive(Debug)]
pub struct ScriptResource<'a> {
    /// Script path.
    pub script: PathBuf,
    /// Arguments appended verbatim.
    pub args: Vec<String>,
    /// Platform deciding the interpreter.
    pub os: Os,
    /// Executor for running the interpreter.
    pub executor: &'a dyn Executor,
}

impl<'a> ScriptResource<'a> {
    /// Create a new script resource.
    #[must_use]
    pub const fn new(script: PathBuf, args: Vec<String>, os: Os, executor: &'a dyn Executor) -> Self {
        Self {
            script,
            args,
            os,
            executor,
        }
    }

    /// Human-readable description of the invocation.
    #[must_use]
    pub fn description(&self) -> String {
        let (program, args) = shell_command(self.os, &self.script, &self.args);
        std::iter::once(program)
            .chain(args)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the script from its own directory, inheriting stdio.
    ///
    /// A non-zero exit is returned in [`ExecResult::code`].
    ///
    /// # Errors
    ///
    /// Returns an error if the interpreter cannot be spawned.
    pub fn run(&self) -> Result<ExecResult> {
        let (program, args) = shell_command(self.os, &self.script, &self.args);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let dir = self
            .script
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        self.executor.run_attached(dir, &program, &args)
    }
}

/// Interpreter and argument vector for running `script` on `os`.
///
/// `.ps1` files run under PowerShell on Windows, anything else under
/// `cmd /C`; every other platform uses `sh`.
#[must_use]
pub fn shell_command(os: Os, script: &Path, args: &[String]) -> (String, Vec<String>) {
    let script_arg = script.display().to_string();
    let (program, mut argv): (&str, Vec<String>) = match os {
        Os::Windows
            if script
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("ps1")) =>
        {
            (
                "powershell",
                ["-NoProfile", "-ExecutionPolicy", "Bypass", "-File"]
                    .iter()
                    .map(ToString::to_string)
                    .chain(std::iter::once(script_arg))
                    .collect(),
            )
        }
        Os::Windows => ("cmd", vec!["/C".to_string(), script_arg]),
        Os::Linux | Os::Macos | Os::Unknown => ("sh", vec![script_arg]),
    };
    argv.extend(args.iter().cloned());
    (program.to_string(), argv)
}
