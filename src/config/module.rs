//! Module documents: one configuration file, normalised.
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use super::loader::kind_name;
use super::node::{
    ActionKind, ActionMap, ActionSection, ConfigNode, PackageList, PackageSection, normalize,
    split_tokens,
};
use super::validation::Diagnostics;
use crate::platform::Platform;

/// Top-level keys that select the structured module form.
const SECTION_KEYS: &[&str] = &["links", "copy", "packages"];

/// Top-level keys consumed before the rest of a document is interpreted.
const META_KEYS: &[&str] = &["name", "base_dir", "description"];

/// One normalised configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Display name.
    pub name: String,
    /// Document this module was read from.
    pub document: PathBuf,
    /// Directory sources are resolved against.
    pub base_dir: PathBuf,
    /// Module-level platform filter; `None` means every platform.
    pub platforms: Option<Vec<String>>,
    /// Module-level hostname filter; `None` means every host.
    pub hostnames: Option<Vec<String>>,
    /// Link section (bare strings are links).
    pub links: ConfigNode<ActionMap>,
    /// Copy section (bare strings are copies).
    pub copies: ConfigNode<ActionMap>,
    /// Package section.
    pub packages: ConfigNode<PackageList>,
}

impl Module {
    /// Normalise a parsed document.
    ///
    /// A document containing any of `links`, `copy` or `packages` is in the
    /// structured form. Otherwise the whole document (minus `name` and
    /// `base_dir`) is the link section.
    pub(crate) fn from_document(
        doc: &Map<String, Value>,
        document: &Path,
        default_name: &str,
        diag: &mut Diagnostics<'_>,
    ) -> Self {
        let doc_dir = document.parent().unwrap_or_else(|| Path::new("."));

        let name = match doc.get("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
            None | Some(Value::Null) => default_name.to_string(),
            Some(other) => {
                diag.warn(
                    "name",
                    format!("expected a string, found {}; ignored", kind_name(other)),
                );
                default_name.to_string()
            }
        };

        let base_dir = match doc.get("base_dir") {
            Some(Value::String(dir)) if !dir.trim().is_empty() => doc_dir.join(dir.trim()),
            None | Some(Value::Null) => doc_dir.to_path_buf(),
            Some(other) => {
                diag.warn(
                    "base_dir",
                    format!("expected a string, found {}; ignored", kind_name(other)),
                );
                doc_dir.to_path_buf()
            }
        };

        let mut module = Self {
            name,
            document: document.to_path_buf(),
            base_dir,
            platforms: None,
            hostnames: None,
            links: ConfigNode::Empty,
            copies: ConfigNode::Empty,
            packages: ConfigNode::Empty,
        };

        // List or string `platforms`/`hostnames` filter the whole module; a
        // mapping is a selector and belongs to the link section.
        let mut rest = Map::new();
        for (key, value) in doc {
            if META_KEYS.contains(&key.as_str()) {
                continue;
            }
            match (key.as_str(), filter_tokens(value)) {
                ("platforms", Some(tokens)) => module.platforms = Some(tokens),
                ("hostnames", Some(tokens)) => module.hostnames = Some(tokens),
                _ => {
                    rest.insert(key.clone(), value.clone());
                }
            }
        }

        let links = ActionSection {
            default_kind: ActionKind::Link,
        };
        if SECTION_KEYS.iter().any(|k| rest.contains_key(*k)) {
            for (key, value) in &rest {
                match key.as_str() {
                    "links" => module.links = normalize(&links, value, "links", true, diag),
                    "copy" => {
                        let copy = ActionSection {
                            default_kind: ActionKind::Copy,
                        };
                        module.copies = normalize(&copy, value, "copy", true, diag);
                    }
                    "packages" => {
                        module.packages = normalize(&PackageSection, value, "packages", true, diag);
                    }
                    other => diag.warn(other, "unknown top-level key ignored"),
                }
            }
        } else {
            module.links = normalize(&links, &Value::Object(rest), "", true, diag);
        }
        module
    }

    /// Check the module-level filters against `platform`.
    ///
    /// # Errors
    ///
    /// Returns the reason the module does not apply.
    pub fn applies_to(&self, platform: &Platform) -> Result<(), String> {
        if let Some(platforms) = &self.platforms
            && !platforms.iter().any(|t| platform.os.matches(t))
        {
            return Err(format!(
                "limited to platforms [{}], this is {}",
                platforms.join(", "),
                platform.os
            ));
        }
        if let Some(hostnames) = &self.hostnames
            && !hostnames.iter().any(|h| *h == platform.hostname)
        {
            return Err(format!(
                "limited to hosts [{}], this is '{}'",
                hostnames.join(", "),
                platform.hostname
            ));
        }
        Ok(())
    }
}

/// Tokens of a module filter value: a list of strings or a comma-separated
/// string. Returns `None` for any other shape.
fn filter_tokens(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(split_tokens(s)),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(split_tokens))
            .collect::<Option<Vec<_>>>()
            .map(|nested| nested.into_iter().flatten().collect()),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::selector::resolve;
    use crate::config::node::ActionSpec;
    use crate::config::validation::ConfigWarning;
    use crate::platform::Os;
    use serde_json::json;

    fn module(doc: &Value) -> (Module, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();
        let map = doc.as_object().expect("test documents are mappings");
        let module = Module::from_document(
            map,
            Path::new("/repo/modules/git/module.yaml"),
            "git",
            &mut Diagnostics::new("module.yaml", &mut warnings),
        );
        (module, warnings)
    }

    #[test]
    fn structured_module_sections() {
        let (m, warnings) = module(&json!({
            "name": "shell",
            "base_dir": "files",
            "links": {"bashrc": "~/.bashrc"},
            "copy": {"gitconfig": "~/.gitconfig"},
            "packages": {"linux": ["bash"]},
        }));
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(m.name, "shell");
        assert_eq!(m.base_dir, Path::new("/repo/modules/git").join("files"));
        let linux = Platform::new(Os::Linux, "box");
        let copies: ActionMap = resolve(&m.copies, &linux);
        assert_eq!(
            copies.get("gitconfig"),
            Some(&ActionSpec::copy("~/.gitconfig"))
        );
        let packages: PackageList = resolve(&m.packages, &linux);
        assert_eq!(packages.as_slice(), ["bash"]);
    }

    #[test]
    fn legacy_document_is_link_section() {
        let (m, warnings) = module(&json!({
            "base_dir": ".",
            "common": {"a.conf": "~/a.conf"},
            "linux": {"b.conf": "~/b.conf"},
        }));
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(m.name, "git");
        let links: ActionMap = resolve(&m.links, &Platform::new(Os::Linux, "box"));
        assert_eq!(links.len(), 2);
        assert!(m.copies.is_empty());
    }

    #[test]
    fn legacy_flat_document_is_a_leaf() {
        let (m, _) = module(&json!({"vimrc": "~/.vimrc"}));
        let links: ActionMap = resolve(&m.links, &Platform::new(Os::Windows, "pc"));
        assert_eq!(links.get("vimrc"), Some(&ActionSpec::link("~/.vimrc")));
    }

    #[test]
    fn list_filters_become_module_filters() {
        let (m, _) = module(&json!({
            "platforms": ["linux", "macos"],
            "hostnames": "work, laptop",
            "links": {},
        }));
        assert_eq!(m.platforms, Some(vec!["linux".to_string(), "macos".to_string()]));
        assert_eq!(
            m.hostnames,
            Some(vec!["work".to_string(), "laptop".to_string()])
        );
        assert!(m.applies_to(&Platform::new(Os::Macos, "work")).is_ok());
        let reason = m
            .applies_to(&Platform::new(Os::Windows, "work"))
            .unwrap_err();
        assert!(reason.contains("windows"), "{reason}");
        let reason = m.applies_to(&Platform::new(Os::Linux, "home")).unwrap_err();
        assert!(reason.contains("'home'"), "{reason}");
    }

    #[test]
    fn mapping_platforms_in_legacy_form_is_a_selector() {
        let (m, _) = module(&json!({
            "platforms": {"linux": {"a": "~/a"}},
        }));
        assert!(m.platforms.is_none());
        let links: ActionMap = resolve(&m.links, &Platform::new(Os::Linux, "box"));
        assert!(links.get("a").is_some());
    }

    #[test]
    fn unknown_structured_keys_warn() {
        let (_, warnings) = module(&json!({"links": {}, "services": {}}));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].item, "services");
    }

    #[test]
    fn bad_name_falls_back_to_default() {
        let (m, warnings) = module(&json!({"name": 3, "links": {}}));
        assert_eq!(m.name, "git");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn no_filters_apply_everywhere() {
        let (m, _) = module(&json!({"links": {}}));
        assert!(m.applies_to(&Platform::new(Os::Unknown, "")).is_ok());
    }
}
