// Shared helpers for integration tests.
//
// Provides a temporary dotfiles repository plus a fake home directory and a
// fluent builder so each integration test can set up an isolated
// environment without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use homelink::cli::GlobalOpts;
use homelink::config::Config;
use homelink::engine::Plan;
use homelink::logging::{Log, MemoryLog};
use homelink::platform::{Os, Platform};

/// An isolated repository and home directory backed by one
/// [`tempfile::TempDir`].
pub struct IntegrationTestContext {
    /// Temporary directory holding `repo/` and `home/`.
    pub dir: tempfile::TempDir,
    /// Identity the plan is resolved for.
    pub platform: Platform,
}

impl IntegrationTestContext {
    /// Path to the repository root.
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("repo")
    }

    /// Path to the fake home directory.
    pub fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    /// Global options pointing every command at this context.
    pub fn global(&self) -> GlobalOpts {
        GlobalOpts {
            root: Some(self.root()),
            home: Some(self.home()),
            platform: Some(self.platform.os),
            hostname: Some(self.platform.hostname.clone()),
            ..GlobalOpts::default()
        }
    }

    /// Same options with `--dry-run`.
    pub fn global_dry_run(&self) -> GlobalOpts {
        GlobalOpts {
            dry_run: true,
            ..self.global()
        }
    }

    /// Discover and load the repository's configuration.
    pub fn load_config(&self) -> Config {
        Config::discover(&self.root()).expect("load config")
    }

    /// Build the plan for this context's platform.
    pub fn plan(&self) -> Plan {
        self.plan_for(&self.platform)
    }

    /// Build the plan for an explicit platform.
    pub fn plan_for(&self, platform: &Platform) -> Plan {
        Plan::build(&self.load_config(), platform, &self.home())
    }

    /// A fresh capturing log, both as itself and as the trait object the
    /// commands take.
    pub fn log(&self) -> (Arc<MemoryLog>, Arc<dyn Log>) {
        let memory = Arc::new(MemoryLog::new());
        let log: Arc<dyn Log> = memory.clone();
        (memory, log)
    }

    /// Read a file under home, following links.
    pub fn read_home(&self, rel: &str) -> String {
        std::fs::read_to_string(self.home().join(rel)).expect("read home file")
    }

    /// Whether `rel` under home is a symlink.
    pub fn is_link(&self, rel: &str) -> bool {
        self.home()
            .join(rel)
            .symlink_metadata()
            .is_ok_and(|m| m.file_type().is_symlink())
    }
}

/// Fluent builder for [`IntegrationTestContext`].
pub struct TestContextBuilder {
    ctx: IntegrationTestContext,
}

impl TestContextBuilder {
    /// Begin building an empty repository and home for `box` on Linux.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(dir.path().join("repo")).expect("create repo dir");
        std::fs::create_dir_all(dir.path().join("home")).expect("create home dir");
        Self {
            ctx: IntegrationTestContext {
                dir,
                platform: Platform::new(Os::Linux, "box"),
            },
        }
    }

    /// Resolve plans for `os` and `hostname` instead.
    pub fn platform(mut self, os: Os, hostname: &str) -> Self {
        self.ctx.platform = Platform::new(os, hostname);
        self
    }

    /// Write `content` to `rel` inside the repository.
    pub fn repo_file(self, rel: &str, content: &str) -> Self {
        write(&self.ctx.root().join(rel), content);
        self
    }

    /// Write `content` to `rel` inside the home directory.
    pub fn home_file(self, rel: &str, content: &str) -> Self {
        write(&self.ctx.home().join(rel), content);
        self
    }

    /// Write the root document `homelink.yaml`.
    pub fn config(self, yaml: &str) -> Self {
        self.repo_file("homelink.yaml", yaml)
    }

    /// Write `modules/<name>/module.yaml`.
    pub fn module(self, name: &str, yaml: &str) -> Self {
        self.repo_file(&format!("modules/{name}/module.yaml"), yaml)
    }

    /// Finalise and return the context.
    pub fn build(self) -> IntegrationTestContext {
        self.ctx
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, content).expect("write file");
}
