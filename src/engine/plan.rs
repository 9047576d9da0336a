//! The resolved plan: every action that applies to this machine, in order.
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::selector::resolve;
use crate::config::{ActionKind, ActionMap, ActionSpec, Config, Merge, Module, PackageList};
use crate::paths::{display_path, expand_target};
use crate::platform::Platform;

/// One selected config entry with its paths resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResolvedAction {
    /// Symlink `target` to `source`.
    Link {
        /// Config key (relative source path).
        key: String,
        /// Absolute source path.
        source: PathBuf,
        /// Expanded target path.
        target: PathBuf,
    },
    /// Copy `source` to `target`.
    Copy {
        /// Config key (relative source path).
        key: String,
        /// Absolute source path.
        source: PathBuf,
        /// Expanded target path.
        target: PathBuf,
    },
    /// Run `script` with `args`.
    Exec {
        /// Config key (relative script path).
        key: String,
        /// Absolute script path.
        script: PathBuf,
        /// Arguments appended verbatim.
        args: Vec<String>,
    },
}

impl ResolvedAction {
    /// Resolve `spec` for `key` against the module's base directory and the
    /// home directory.
    #[must_use]
    pub fn new(key: &str, spec: &ActionSpec, base_dir: &Path, home: &Path) -> Self {
        let source = base_dir.join(key);
        match spec {
            ActionSpec::Link { target } => Self::Link {
                key: key.to_string(),
                source,
                target: expand_target(target, home),
            },
            ActionSpec::Copy { target } => Self::Copy {
                key: key.to_string(),
                source,
                target: expand_target(target, home),
            },
            ActionSpec::Exec { args } => Self::Exec {
                key: key.to_string(),
                script: source,
                args: args.clone(),
            },
        }
    }

    /// The action's kind.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Link { .. } => ActionKind::Link,
            Self::Copy { .. } => ActionKind::Copy,
            Self::Exec { .. } => ActionKind::Exec,
        }
    }

    /// The config key.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Link { key, .. } | Self::Copy { key, .. } | Self::Exec { key, .. } => key,
        }
    }
}

/// Resolved actions of one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModulePlan {
    /// Module name.
    pub name: String,
    /// Document the module came from.
    pub document: PathBuf,
    /// Why the module does not apply here, if it does not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    /// Links, then copies, then exec entries, each in merged order.
    pub actions: Vec<ResolvedAction>,
}

impl ModulePlan {
    /// Build the plan of one module for `platform`.
    #[must_use]
    pub fn build(module: &Module, platform: &Platform, home: &Path) -> Self {
        let mut plan = Self {
            name: module.name.clone(),
            document: module.document.clone(),
            skipped: None,
            actions: Vec::new(),
        };
        if let Err(reason) = module.applies_to(platform) {
            plan.skipped = Some(reason);
            return plan;
        }

        // Keys override each other within a section only; the same key in
        // `links` and `copy` yields two actions.
        let resolved: Vec<ResolvedAction> = [&module.links, &module.copies]
            .into_iter()
            .flat_map(|section| resolve::<ActionMap>(section, platform))
            .map(|(key, spec)| ResolvedAction::new(&key, &spec, &module.base_dir, home))
            .collect();
        // Object entries may override the section's default kind.
        for kind in [ActionKind::Link, ActionKind::Copy, ActionKind::Exec] {
            plan.actions
                .extend(resolved.iter().filter(|a| a.kind() == kind).cloned());
        }
        plan
    }

    /// Actions of `kind`, in order.
    pub fn actions_of(&self, kind: ActionKind) -> impl Iterator<Item = &ResolvedAction> {
        self.actions.iter().filter(move |a| a.kind() == kind)
    }
}

/// Everything one run will do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Machine identity the plan was resolved for.
    pub platform: Platform,
    /// Configuration root.
    pub root: PathBuf,
    /// Home directory targets were expanded against.
    pub home: PathBuf,
    /// Modules in load order.
    pub modules: Vec<ModulePlan>,
    /// Union of every applicable module's packages.
    pub packages: PackageList,
}

impl Plan {
    /// Resolve every module of `config` for `platform`.
    #[must_use]
    pub fn build(config: &Config, platform: &Platform, home: &Path) -> Self {
        let mut packages = PackageList::new();
        let modules = config
            .modules
            .iter()
            .map(|module| {
                let plan = ModulePlan::build(module, platform, home);
                if plan.skipped.is_none() {
                    packages.merge(&resolve(&module.packages, platform));
                }
                plan
            })
            .collect();
        Self {
            platform: platform.clone(),
            root: config.root.clone(),
            home: home.to_path_buf(),
            modules,
            packages,
        }
    }

    /// Number of actions across all applicable modules.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.modules.iter().map(|m| m.actions.len()).sum()
    }

    /// Human-readable rendering: sources relative to the root, targets
    /// relative to home.
    #[must_use]
    pub fn render(&self) -> String {
        let source = |path: &Path| {
            path.strip_prefix(&self.root)
                .unwrap_or(path)
                .display()
                .to_string()
        };
        let mut out = String::new();
        let _ = writeln!(out, "platform: {}", self.platform);
        for module in &self.modules {
            let document = source(&module.document);
            if let Some(reason) = &module.skipped {
                let _ = writeln!(out, "module {} ({document}): skipped, {reason}", module.name);
                continue;
            }
            let _ = writeln!(out, "module {} ({document})", module.name);
            if module.actions.is_empty() {
                let _ = writeln!(out, "  (nothing to do)");
            }
            for action in &module.actions {
                match action {
                    ResolvedAction::Link {
                        source: src,
                        target,
                        ..
                    } => {
                        let _ = writeln!(
                            out,
                            "  link {} -> {}",
                            display_path(target, &self.home),
                            source(src)
                        );
                    }
                    ResolvedAction::Copy {
                        source: src,
                        target,
                        ..
                    } => {
                        let _ = writeln!(
                            out,
                            "  copy {} <= {}",
                            display_path(target, &self.home),
                            source(src)
                        );
                    }
                    ResolvedAction::Exec { script, args, .. } => {
                        let mut line = format!("  exec {}", source(script));
                        for arg in args {
                            line.push(' ');
                            line.push_str(arg);
                        }
                        let _ = writeln!(out, "{line}");
                    }
                }
            }
        }
        if !self.packages.is_empty() {
            let _ = writeln!(out, "packages: {}", self.packages.as_slice().join(", "));
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::ConfigNode;
    use crate::platform::Os;

    fn module(name: &str, links: ActionMap, copies: ActionMap) -> Module {
        Module {
            name: name.to_string(),
            document: PathBuf::from(format!("/repo/modules/{name}/module.yaml")),
            base_dir: PathBuf::from(format!("/repo/modules/{name}")),
            platforms: None,
            hostnames: None,
            links: ConfigNode::Leaf(links),
            copies: ConfigNode::Leaf(copies),
            packages: ConfigNode::Empty,
        }
    }

    fn linux() -> Platform {
        Platform::new(Os::Linux, "box")
    }

    #[test]
    fn actions_grouped_links_copies_exec() {
        let links: ActionMap = [
            (
                "setup.sh",
                ActionSpec::Exec {
                    args: vec!["-q".to_string()],
                },
            ),
            ("bashrc", ActionSpec::link("~/.bashrc")),
            ("gitconfig", ActionSpec::copy("~/.gitconfig")),
        ]
        .into_iter()
        .collect();
        let copies: ActionMap = [("profile", ActionSpec::copy("~/.profile"))]
            .into_iter()
            .collect();
        let plan = ModulePlan::build(
            &module("shell", links, copies),
            &linux(),
            Path::new("/home/u"),
        );
        let keys: Vec<&str> = plan.actions.iter().map(ResolvedAction::key).collect();
        assert_eq!(keys, ["bashrc", "gitconfig", "profile", "setup.sh"]);
        assert_eq!(
            plan.actions[0],
            ResolvedAction::Link {
                key: "bashrc".to_string(),
                source: PathBuf::from("/repo/modules/shell/bashrc"),
                target: PathBuf::from("/home/u/.bashrc"),
            }
        );
        assert_eq!(plan.actions_of(ActionKind::Exec).count(), 1);
    }

    #[test]
    fn same_key_in_links_and_copy_keeps_both_actions() {
        let links: ActionMap = [("gitconfig", ActionSpec::link("~/.gitconfig"))]
            .into_iter()
            .collect();
        let copies: ActionMap = [("gitconfig", ActionSpec::copy("~/backup/gitconfig"))]
            .into_iter()
            .collect();
        let plan = ModulePlan::build(&module("git", links, copies), &linux(), Path::new("/h"));
        assert_eq!(
            plan.actions,
            [
                ResolvedAction::Link {
                    key: "gitconfig".to_string(),
                    source: PathBuf::from("/repo/modules/git/gitconfig"),
                    target: PathBuf::from("/h/.gitconfig"),
                },
                ResolvedAction::Copy {
                    key: "gitconfig".to_string(),
                    source: PathBuf::from("/repo/modules/git/gitconfig"),
                    target: PathBuf::from("/h/backup/gitconfig"),
                },
            ]
        );
    }

    #[test]
    fn filtered_module_is_skipped_and_contributes_no_packages() {
        let mut m = module("work", ActionMap::new(), ActionMap::new());
        m.hostnames = Some(vec!["work".to_string()]);
        m.packages = ConfigNode::Leaf(["slack"].into_iter().collect());
        let mut other = module("base", ActionMap::new(), ActionMap::new());
        other.packages = ConfigNode::Leaf(["git"].into_iter().collect());
        let config = Config {
            root: PathBuf::from("/repo"),
            modules: vec![m, other],
            warnings: Vec::new(),
        };

        let plan = Plan::build(&config, &linux(), Path::new("/home/u"));

        assert!(plan.modules[0].skipped.is_some());
        assert!(plan.modules[1].skipped.is_none());
        assert_eq!(plan.packages.as_slice(), ["git"]);
        assert_eq!(plan.action_count(), 0);
    }

    #[test]
    fn relative_target_is_under_home() {
        let action = ResolvedAction::new(
            "vimrc",
            &ActionSpec::link(".vimrc"),
            Path::new("/repo"),
            Path::new("/home/u"),
        );
        assert!(matches!(
            action,
            ResolvedAction::Link { target, .. } if target == Path::new("/home/u/.vimrc")
        ));
    }

    #[test]
    fn serializes_with_kind_tags() {
        let action = ResolvedAction::new(
            "x.sh",
            &ActionSpec::Exec { args: vec![] },
            Path::new("/repo"),
            Path::new("/home/u"),
        );
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["kind"], "exec");
        assert_eq!(json["script"], "/repo/x.sh");
    }
}
