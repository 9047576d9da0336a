//! Configuration discovery, loading and normalisation.
pub mod loader;
pub mod module;
pub mod node;
pub mod selector;
pub mod validation;

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

pub use module::Module;
pub use node::{ActionKind, ActionMap, ActionSpec, ConfigNode, Merge, PackageList};
pub use validation::ConfigWarning;

use crate::error::ConfigError;
use validation::Diagnostics;

/// Root document names, in priority order. The first one found is used.
pub const ROOT_DOCUMENTS: &[&str] = &[
    "homelink.yaml",
    "homelink.yml",
    "homelink.json",
    "homelink.toml",
    "links.yaml",
    "links.yml",
    "links.json",
];

/// Module document names, in priority order within one directory.
pub const MODULE_DOCUMENTS: &[&str] = &["module.yaml", "module.yml", "module.json", "module.toml"];

/// Directory under the root that holds module documents.
pub const MODULES_DIR: &str = "modules";

/// All loaded configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the configuration was discovered in.
    pub root: PathBuf,
    /// Modules in load order: the root document first, then module
    /// documents sorted by path.
    pub modules: Vec<Module>,
    /// Advisory warnings collected during normalisation.
    pub warnings: Vec<ConfigWarning>,
}

impl Config {
    /// Load an explicit document, or discover documents under `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if no document exists, or any document is
    /// unreadable, unparsable, or not a mapping at the top level.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        explicit.map_or_else(|| Self::discover(root), |path| Self::from_file(root, path))
    }

    /// Load exactly one document.
    ///
    /// A relative `path` is taken from the current directory. The document
    /// path is canonicalised so every source under it is absolute.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is missing or malformed.
    pub fn from_file(root: &Path, path: &Path) -> Result<Self, ConfigError> {
        let path = dunce::canonicalize(path)
            .map_err(|_| ConfigError::MissingFile(path.display().to_string()))?;
        let mut config = Self::empty(root);
        config.push_document(&path, &file_stem(&path))?;
        Ok(config)
    }

    /// Discover the root document and every module document under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] when neither exists, or an error for
    /// the first malformed document.
    pub fn discover(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::empty(root);

        if let Some(path) = find_root_document(root) {
            config.push_document(&path, &file_stem(&path))?;
        }

        let (modules, shadowed) = find_module_documents(root);
        for path in shadowed {
            config.warnings.push(ConfigWarning::new(
                relative_label(root, &path),
                "",
                "another module document in the same directory takes priority; ignored",
            ));
        }
        for path in modules {
            let name = path
                .parent()
                .and_then(Path::file_name)
                .map_or_else(|| file_stem(&path), |n| n.to_string_lossy().into_owned());
            config.push_document(&path, &name)?;
        }

        if config.modules.is_empty() {
            return Err(ConfigError::NotFound {
                root: root.display().to_string(),
            });
        }
        Ok(config)
    }

    fn empty(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            modules: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn push_document(&mut self, path: &Path, default_name: &str) -> Result<(), ConfigError> {
        let doc = loader::load_document(path)?;
        let label = relative_label(&self.root, path);
        let mut diag = Diagnostics::new(&label, &mut self.warnings);
        self.modules
            .push(Module::from_document(&doc, path, default_name, &mut diag));
        Ok(())
    }
}

fn find_root_document(root: &Path) -> Option<PathBuf> {
    ROOT_DOCUMENTS
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

/// Module documents under `<root>/modules`, sorted by path, plus any
/// lower-priority documents shadowed by another in the same directory.
fn find_module_documents(root: &Path) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let dir = root.join(MODULES_DIR);
    if !dir.is_dir() {
        return (Vec::new(), Vec::new());
    }

    let mut found: Vec<PathBuf> = WalkDir::new(&dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            MODULE_DOCUMENTS
                .iter()
                .any(|name| entry.file_name() == *name)
        })
        .map(walkdir::DirEntry::into_path)
        .collect();
    found.sort_by_key(|path| {
        let rank = path
            .file_name()
            .and_then(|n| MODULE_DOCUMENTS.iter().position(|d| n == *d))
            .unwrap_or(usize::MAX);
        (path.parent().map(Path::to_path_buf), rank)
    });

    let mut modules: Vec<PathBuf> = Vec::new();
    let mut shadowed = Vec::new();
    for path in found {
        if modules
            .last()
            .is_some_and(|prev| prev.parent() == path.parent())
        {
            shadowed.push(path);
        } else {
            modules.push(path);
        }
    }
    (modules, shadowed)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "config".to_string(), |s| s.to_string_lossy().into_owned())
}

/// `path` relative to `root` for diagnostics, or verbatim outside it.
fn relative_label(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn discovers_root_document_by_priority() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "links.yaml", "common: {a: ~/a}\n");
        write(dir.path(), "homelink.yaml", "links: {b: ~/b}\n");
        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.modules.len(), 1);
        assert_eq!(config.modules[0].name, "homelink");
    }

    #[test]
    fn discovers_modules_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "modules/zsh/module.yaml", "links: {zshrc: ~/.zshrc}\n");
        write(dir.path(), "modules/git/module.json", r#"{"links": {"gitconfig": "~/.gitconfig"}}"#);
        write(dir.path(), "modules/nested/tmux/module.toml", "[links]\ntmux = \"~/.tmux.conf\"\n");
        let config = Config::discover(dir.path()).unwrap();
        let names: Vec<&str> = config.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["git", "tmux", "zsh"]);
    }

    #[test]
    fn root_document_precedes_modules() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "modules/a/module.yaml", "links: {}\n");
        write(dir.path(), "links.yaml", "common: {}\n");
        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.modules[0].name, "links");
        assert_eq!(config.modules[1].name, "a");
    }

    #[test]
    fn shadowed_module_document_warns() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "modules/a/module.yaml", "links: {}\n");
        write(dir.path(), "modules/a/module.json", "{}");
        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.modules.len(), 1);
        assert!(config.modules[0].document.ends_with("module.yaml"));
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].source.ends_with("module.json"));
    }

    #[test]
    fn nothing_found_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::discover(dir.path()),
            Err(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn malformed_module_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "links.yaml", "common: {}\n");
        write(dir.path(), "modules/bad/module.yaml", "- just\n- a list\n");
        assert!(matches!(
            Config::discover(dir.path()),
            Err(ConfigError::NotAMapping { .. })
        ));
    }

    #[test]
    fn explicit_file_skips_discovery() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "modules/a/module.yaml", "links: {}\n");
        write(dir.path(), "other/custom.yaml", "common: {x: ~/x}\n");
        let config =
            Config::load(dir.path(), Some(&dir.path().join("other/custom.yaml"))).unwrap();
        assert_eq!(config.modules.len(), 1);
        assert_eq!(config.modules[0].name, "custom");
        assert_eq!(
            config.modules[0].base_dir,
            dunce::canonicalize(dir.path().join("other")).unwrap()
        );
    }

    #[test]
    fn explicit_file_sources_are_absolute() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "sub/custom.yaml", "links: {a: ~/a}\n");
        let indirect = dir.path().join("sub/../sub/custom.yaml");
        let config = Config::load(dir.path(), Some(&indirect)).unwrap();
        let module = &config.modules[0];
        assert!(module.document.is_absolute());
        assert!(module.base_dir.is_absolute());
        assert!(module.base_dir.ends_with("sub"));
        assert!(!module.document.to_string_lossy().contains(".."));
    }

    #[test]
    fn explicit_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load(dir.path(), Some(&dir.path().join("nope.yaml"))),
            Err(ConfigError::MissingFile(_))
        ));
    }

    #[test]
    fn warnings_are_labelled_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "modules/a/module.yaml", "links: {x: 42}\n");
        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.warnings.len(), 1);
        assert_eq!(
            Path::new(&config.warnings[0].source),
            Path::new("modules/a/module.yaml")
        );
        assert_eq!(config.warnings[0].item, "links.x");
    }
}
