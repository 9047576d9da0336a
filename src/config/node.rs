//! Canonical configuration shapes and the normaliser that produces them.
//!
//! Raw documents allow several shorthands: bare strings for links, bare
//! platform keys next to `common`, `host-<name>` keys. They are all lifted
//! into [`ConfigNode`] trees here, once, so selector resolution never has to
//! sniff shapes.
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use super::loader::kind_name;
use super::validation::{Diagnostics, child_path};
use crate::platform::Os;

/// Keys accepted inside an object-form action entry.
const ACTION_KEYS: &[&str] = &["type", "kind", "target", "args"];

/// What an action does with its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Symlink the target to the source.
    Link,
    /// Copy the source to the target.
    Copy,
    /// Run the source as a script.
    Exec,
}

impl ActionKind {
    /// Parse an action type name. Returns `None` for unknown names.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "link" | "symlink" => Some(Self::Link),
            "copy" => Some(Self::Copy),
            "exec" => Some(Self::Exec),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link => write!(f, "link"),
            Self::Copy => write!(f, "copy"),
            Self::Exec => write!(f, "exec"),
        }
    }
}

/// Desired effect for one source path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ActionSpec {
    /// Symlink `target` to the source.
    Link {
        /// Unexpanded target path.
        target: String,
    },
    /// Copy the source to `target`.
    Copy {
        /// Unexpanded target path.
        target: String,
    },
    /// Run the source as a script with `args` appended verbatim.
    Exec {
        /// Arguments, in order.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
    },
}

impl ActionSpec {
    /// Shorthand for a link action.
    #[must_use]
    pub fn link(target: impl Into<String>) -> Self {
        Self::Link {
            target: target.into(),
        }
    }

    /// Shorthand for a copy action.
    #[must_use]
    pub fn copy(target: impl Into<String>) -> Self {
        Self::Copy {
            target: target.into(),
        }
    }

    /// The action's kind tag.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Link { .. } => ActionKind::Link,
            Self::Copy { .. } => ActionKind::Copy,
            Self::Exec { .. } => ActionKind::Exec,
        }
    }

    /// The unexpanded target, for link and copy actions.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Link { target } | Self::Copy { target } => Some(target),
            Self::Exec { .. } => None,
        }
    }
}

/// Combine a later leaf into an accumulated one.
pub trait Merge {
    /// Fold `other` into `self`; `other` wins on conflicts.
    fn merge(&mut self, other: &Self);
}

/// Ordered mapping of relative source path to [`ActionSpec`].
///
/// Re-inserting an existing key replaces its spec but keeps the key's
/// original position, so iteration order is first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionMap {
    entries: Vec<(String, ActionSpec)>,
}

impl ActionMap {
    /// Create an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert or replace the spec for `key`.
    pub fn insert(&mut self, key: impl Into<String>, spec: ActionSpec) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = spec;
        } else {
            self.entries.push((key, spec));
        }
    }

    /// Look up the spec for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ActionSpec> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActionSpec)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Merge for ActionMap {
    fn merge(&mut self, other: &Self) {
        for (key, spec) in &other.entries {
            self.insert(key.clone(), spec.clone());
        }
    }
}

impl<K: Into<String>> FromIterator<(K, ActionSpec)> for ActionMap {
    fn from_iter<I: IntoIterator<Item = (K, ActionSpec)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for ActionMap {
    type Item = (String, ActionSpec);
    type IntoIter = std::vec::IntoIter<(String, ActionSpec)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Ordered, de-duplicated list of package names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PackageList {
    names: Vec<String>,
}

impl PackageList {
    /// Create an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { names: Vec::new() }
    }

    /// Append `name` unless it is already present.
    pub fn push(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name);
        }
    }

    /// Package names in first-seen order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    /// Number of packages.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Merge for PackageList {
    fn merge(&mut self, other: &Self) {
        for name in &other.names {
            self.push(name.clone());
        }
    }
}

impl<S: Into<String>> FromIterator<S> for PackageList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = Self::new();
        for name in iter {
            list.push(name);
        }
        list
    }
}

/// A normalised configuration subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigNode<T> {
    /// Contributes nothing (absent, null, or dropped as malformed).
    Empty,
    /// A leaf value merged as-is.
    Leaf(T),
    /// A node resolved against the machine identity.
    Selector(Box<Selector<T>>),
}

impl<T> Default for ConfigNode<T> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<T> ConfigNode<T> {
    /// Whether the node contributes nothing on any machine.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// The reserved-key form of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector<T> {
    /// `all` / `common` children, merged first in declaration order.
    pub all: Vec<ConfigNode<T>>,
    /// Platform-scoped children.
    pub platforms: SelectorGroup<T>,
    /// Hostname-scoped children.
    pub hostnames: SelectorGroup<T>,
    /// `host-<name>` children, merged last.
    pub pinned_hosts: Vec<(String, ConfigNode<T>)>,
}

impl<T> Default for Selector<T> {
    fn default() -> Self {
        Self {
            all: Vec::new(),
            platforms: SelectorGroup::default(),
            hostnames: SelectorGroup::default(),
            pinned_hosts: Vec::new(),
        }
    }
}

/// Entries keyed by comma-separated selector tokens, plus a fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorGroup<T> {
    /// Entries in declaration order.
    pub entries: Vec<SelectorEntry<T>>,
    /// Used only when no entry matched.
    pub default: Option<ConfigNode<T>>,
}

impl<T> Default for SelectorGroup<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            default: None,
        }
    }
}

/// One `"a,b": node` entry of a [`SelectorGroup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorEntry<T> {
    /// Trimmed, non-empty tokens.
    pub tokens: Vec<String>,
    /// The scoped subtree.
    pub node: ConfigNode<T>,
}

/// Split a selector key on commas, trimming and dropping empty tokens.
#[must_use]
pub fn split_tokens(key: &str) -> Vec<String> {
    key.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

fn is_platform_key(key: &str) -> bool {
    let tokens = split_tokens(key);
    !tokens.is_empty() && tokens.iter().all(|t| Os::is_os_name(t))
}

/// Section-specific leaf shape and parsing.
pub(crate) trait Section {
    type Leaf;

    /// Whether leaves are mappings (path to action) rather than sequences.
    fn mapping_leaves(&self) -> bool;

    /// Whether `host-<name>` keys are honoured at the section root.
    fn pinned_hosts(&self) -> bool;

    fn parse_leaf(&self, value: &Value, at: &str, diag: &mut Diagnostics<'_>)
    -> Option<Self::Leaf>;
}

/// `links` / `copy` sections.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ActionSection {
    /// Kind used for bare-string entries and objects without `type`.
    pub(crate) default_kind: ActionKind,
}

impl ActionSection {
    fn parse_entry(&self, raw: &Value, at: &str, diag: &mut Diagnostics<'_>) -> Option<ActionSpec> {
        match raw {
            Value::String(target) => Self::with_target(self.default_kind, target, at, diag),
            Value::Object(obj) => self.parse_object(obj, at, diag),
            other => {
                diag.warn(
                    at,
                    format!(
                        "expected a target path or an action object, found {}; entry dropped",
                        kind_name(other)
                    ),
                );
                None
            }
        }
    }

    fn parse_object(
        &self,
        obj: &Map<String, Value>,
        at: &str,
        diag: &mut Diagnostics<'_>,
    ) -> Option<ActionSpec> {
        for key in obj.keys().filter(|k| !ACTION_KEYS.contains(&k.as_str())) {
            diag.warn(at, format!("unknown action key '{key}' ignored"));
        }

        let kind = match obj.get("type").or_else(|| obj.get("kind")) {
            None | Some(Value::Null) => self.default_kind,
            Some(Value::String(name)) => {
                if let Some(kind) = ActionKind::from_name(name) {
                    kind
                } else {
                    diag.warn(at, format!("unknown action type '{name}'; entry dropped"));
                    return None;
                }
            }
            Some(other) => {
                diag.warn(
                    at,
                    format!(
                        "action type must be a string, found {}; entry dropped",
                        kind_name(other)
                    ),
                );
                return None;
            }
        };

        match kind {
            ActionKind::Exec => {
                let args = parse_args(obj.get("args"), at, diag)?;
                Some(ActionSpec::Exec { args })
            }
            ActionKind::Link | ActionKind::Copy => match obj.get("target") {
                Some(Value::String(target)) => Self::with_target(kind, target, at, diag),
                None | Some(Value::Null) => {
                    diag.warn(at, format!("{kind} action has no target; entry dropped"));
                    None
                }
                Some(other) => {
                    diag.warn(
                        at,
                        format!(
                            "target must be a string, found {}; entry dropped",
                            kind_name(other)
                        ),
                    );
                    None
                }
            },
        }
    }

    fn with_target(
        kind: ActionKind,
        target: &str,
        at: &str,
        diag: &mut Diagnostics<'_>,
    ) -> Option<ActionSpec> {
        if target.trim().is_empty() {
            diag.warn(at, "empty target; entry dropped");
            return None;
        }
        match kind {
            ActionKind::Link => Some(ActionSpec::link(target)),
            ActionKind::Copy => Some(ActionSpec::copy(target)),
            ActionKind::Exec => Some(ActionSpec::Exec { args: Vec::new() }),
        }
    }
}

fn parse_args(raw: Option<&Value>, at: &str, diag: &mut Diagnostics<'_>) -> Option<Vec<String>> {
    match raw {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::String(arg)) => Some(vec![arg.clone()]),
        Some(Value::Array(items)) => {
            let mut args = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => args.push(s.clone()),
                    Value::Number(n) => args.push(n.to_string()),
                    Value::Bool(b) => args.push(b.to_string()),
                    other => {
                        diag.warn(
                            at,
                            format!(
                                "args must be strings, found {}; entry dropped",
                                kind_name(other)
                            ),
                        );
                        return None;
                    }
                }
            }
            Some(args)
        }
        Some(other) => {
            diag.warn(
                at,
                format!(
                    "args must be a list, found {}; entry dropped",
                    kind_name(other)
                ),
            );
            None
        }
    }
}

impl Section for ActionSection {
    type Leaf = ActionMap;

    fn mapping_leaves(&self) -> bool {
        true
    }

    fn pinned_hosts(&self) -> bool {
        true
    }

    fn parse_leaf(&self, value: &Value, at: &str, diag: &mut Diagnostics<'_>) -> Option<ActionMap> {
        let Value::Object(map) = value else {
            diag.warn(
                at,
                format!(
                    "expected a mapping of paths to actions, found {}; ignored",
                    kind_name(value)
                ),
            );
            return None;
        };
        let mut actions = ActionMap::new();
        for (key, raw) in map {
            let here = child_path(at, key);
            if key.trim().is_empty() {
                diag.warn(&here, "empty source path; entry dropped");
                continue;
            }
            if let Some(spec) = self.parse_entry(raw, &here, diag) {
                actions.insert(key.clone(), spec);
            }
        }
        Some(actions)
    }
}

/// `packages` section.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PackageSection;

impl Section for PackageSection {
    type Leaf = PackageList;

    fn mapping_leaves(&self) -> bool {
        false
    }

    fn pinned_hosts(&self) -> bool {
        false
    }

    fn parse_leaf(
        &self,
        value: &Value,
        at: &str,
        diag: &mut Diagnostics<'_>,
    ) -> Option<PackageList> {
        let Value::Array(items) = value else {
            diag.warn(
                at,
                format!(
                    "expected a list of package names, found {}; ignored",
                    kind_name(value)
                ),
            );
            return None;
        };
        let mut list = PackageList::new();
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::String(name) if !name.trim().is_empty() => list.push(name.trim()),
                other => diag.warn(
                    &format!("{at}[{i}]"),
                    format!(
                        "expected a package name, found {}; dropped",
                        if other.is_string() {
                            "an empty string"
                        } else {
                            kind_name(other)
                        }
                    ),
                ),
            }
        }
        Some(list)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyRole<'a> {
    All,
    Platforms,
    Hostnames,
    BarePlatform,
    PinnedHost(&'a str),
    Path,
}

fn key_role<'a, S: Section>(key: &'a str, value: &Value, root: bool, section: &S) -> KeyRole<'a> {
    match key {
        "all" | "common" => KeyRole::All,
        "platforms" => KeyRole::Platforms,
        "hostnames" => KeyRole::Hostnames,
        _ => {
            let nested = value.is_object() || value.is_null() || !section.mapping_leaves();
            if !root || !nested {
                return KeyRole::Path;
            }
            if section.pinned_hosts()
                && let Some(host) = key.strip_prefix("host-")
                && !host.is_empty()
            {
                return KeyRole::PinnedHost(host);
            }
            if is_platform_key(key) {
                KeyRole::BarePlatform
            } else {
                KeyRole::Path
            }
        }
    }
}

/// Lift a raw section value into a [`ConfigNode`].
///
/// `root` is true at the top of a section, where legacy bare platform keys
/// and `host-<name>` keys are recognised.
pub(crate) fn normalize<S: Section>(
    section: &S,
    value: &Value,
    at: &str,
    root: bool,
    diag: &mut Diagnostics<'_>,
) -> ConfigNode<S::Leaf> {
    let map = match value {
        Value::Null => return ConfigNode::Empty,
        Value::Object(map) if map.is_empty() => return ConfigNode::Empty,
        Value::Object(map) => map,
        other => return section.parse_leaf(other, at, diag).map_or(ConfigNode::Empty, ConfigNode::Leaf),
    };

    let roles: Vec<(&String, &Value, KeyRole<'_>)> = map
        .iter()
        .map(|(k, v)| (k, v, key_role(k, v, root, section)))
        .collect();
    let paths: Vec<&str> = roles
        .iter()
        .filter(|(_, _, role)| *role == KeyRole::Path)
        .map(|(k, _, _)| k.as_str())
        .collect();

    if paths.is_empty() {
        return ConfigNode::Selector(Box::new(build_selector(section, &roles, at, diag)));
    }
    if paths.len() == roles.len() {
        if section.mapping_leaves() {
            return section
                .parse_leaf(value, at, diag)
                .map_or(ConfigNode::Empty, ConfigNode::Leaf);
        }
        diag.warn(
            at,
            format!(
                "unrecognised selector keys ({}); ignored",
                paths.join(", ")
            ),
        );
        return ConfigNode::Empty;
    }
    diag.warn(
        at,
        format!(
            "mixes selector keys with entries ({}); ignored",
            paths.join(", ")
        ),
    );
    ConfigNode::Empty
}

fn build_selector<S: Section>(
    section: &S,
    roles: &[(&String, &Value, KeyRole<'_>)],
    at: &str,
    diag: &mut Diagnostics<'_>,
) -> Selector<S::Leaf> {
    let mut selector = Selector::default();
    for (key, value, role) in roles {
        let here = child_path(at, key);
        match role {
            KeyRole::All => selector
                .all
                .push(normalize(section, value, &here, false, diag)),
            KeyRole::Platforms => {
                parse_group(section, value, &here, true, &mut selector.platforms, diag);
            }
            KeyRole::Hostnames => {
                parse_group(section, value, &here, false, &mut selector.hostnames, diag);
            }
            KeyRole::BarePlatform => selector.platforms.entries.push(SelectorEntry {
                tokens: split_tokens(key),
                node: normalize(section, value, &here, false, diag),
            }),
            KeyRole::PinnedHost(host) => selector
                .pinned_hosts
                .push(((*host).to_string(), normalize(section, value, &here, false, diag))),
            KeyRole::Path => {}
        }
    }
    selector
}

fn parse_group<S: Section>(
    section: &S,
    value: &Value,
    at: &str,
    platforms: bool,
    group: &mut SelectorGroup<S::Leaf>,
    diag: &mut Diagnostics<'_>,
) {
    let map = match value {
        Value::Null => return,
        Value::Object(map) => map,
        other => {
            diag.warn(
                at,
                format!(
                    "expected a mapping of selectors, found {}; ignored",
                    kind_name(other)
                ),
            );
            return;
        }
    };
    for (key, child) in map {
        let here = child_path(at, key);
        if key == "default" {
            group.default = Some(normalize(section, child, &here, false, diag));
            continue;
        }
        let tokens = split_tokens(key);
        if tokens.is_empty() {
            diag.warn(&here, "empty selector key; ignored");
            continue;
        }
        if platforms {
            for token in tokens.iter().filter(|t| !Os::is_os_name(t)) {
                diag.warn(&here, format!("unknown platform '{token}' never matches"));
            }
        }
        group.entries.push(SelectorEntry {
            tokens,
            node: normalize(section, child, &here, false, diag),
        });
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::config::validation::ConfigWarning;
    use serde_json::json;

    const LINKS: ActionSection = ActionSection {
        default_kind: ActionKind::Link,
    };

    fn links(value: &Value) -> (ConfigNode<ActionMap>, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();
        let node = normalize(
            &LINKS,
            value,
            "links",
            true,
            &mut Diagnostics::new("t.yaml", &mut warnings),
        );
        (node, warnings)
    }

    fn packages(value: &Value) -> (ConfigNode<PackageList>, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();
        let node = normalize(
            &PackageSection,
            value,
            "packages",
            true,
            &mut Diagnostics::new("t.yaml", &mut warnings),
        );
        (node, warnings)
    }

    fn leaf(node: ConfigNode<ActionMap>) -> ActionMap {
        match node {
            ConfigNode::Leaf(map) => map,
            other => panic!("expected leaf, got {other:?}"),
        }
    }

    fn selector<T: std::fmt::Debug>(node: ConfigNode<T>) -> Selector<T> {
        match node {
            ConfigNode::Selector(s) => *s,
            other => panic!("expected selector, got {other:?}"),
        }
    }

    #[test]
    fn bare_string_is_link() {
        let (node, warnings) = links(&json!({"bashrc": "~/.bashrc"}));
        assert!(warnings.is_empty());
        assert_eq!(leaf(node).get("bashrc"), Some(&ActionSpec::link("~/.bashrc")));
    }

    #[test]
    fn bare_string_in_copy_section_is_copy() {
        let section = ActionSection {
            default_kind: ActionKind::Copy,
        };
        let mut warnings = Vec::new();
        let node = normalize(
            &section,
            &json!({"gitconfig": "~/.gitconfig"}),
            "copy",
            true,
            &mut Diagnostics::new("t.yaml", &mut warnings),
        );
        assert_eq!(
            leaf(node).get("gitconfig"),
            Some(&ActionSpec::copy("~/.gitconfig"))
        );
    }

    #[test]
    fn object_entries_parse_all_kinds() {
        let (node, warnings) = links(&json!({
            "a": {"type": "copy", "target": "~/a"},
            "b": {"kind": "link", "target": "~/b"},
            "setup.sh": {"type": "exec", "args": ["--fast", 3]},
        }));
        assert!(warnings.is_empty(), "{warnings:?}");
        let map = leaf(node);
        assert_eq!(map.get("a"), Some(&ActionSpec::copy("~/a")));
        assert_eq!(map.get("b"), Some(&ActionSpec::link("~/b")));
        assert_eq!(
            map.get("setup.sh"),
            Some(&ActionSpec::Exec {
                args: vec!["--fast".to_string(), "3".to_string()]
            })
        );
    }

    #[test]
    fn malformed_entries_are_dropped_with_warnings() {
        let (node, warnings) = links(&json!({
            "a": {"type": "teleport", "target": "~/a"},
            "b": {"type": "link"},
            "c": 42,
            "d": "",
            "": "~/e",
            "ok": "~/ok",
        }));
        let map = leaf(node);
        assert_eq!(map.len(), 1);
        assert!(map.get("ok").is_some());
        assert_eq!(warnings.len(), 5, "{warnings:?}");
        assert!(warnings[0].message.contains("unknown action type 'teleport'"));
        assert_eq!(warnings[0].item, "links.a");
    }

    #[test]
    fn unknown_object_keys_warn_but_keep_entry() {
        let (node, warnings) = links(&json!({"a": {"target": "~/a", "mode": "0644"}}));
        assert_eq!(leaf(node).get("a"), Some(&ActionSpec::link("~/a")));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("'mode'"));
    }

    #[test]
    fn legacy_platform_keys_become_platform_entries() {
        let (node, warnings) = links(&json!({
            "common": {"a.conf": "~/a.conf"},
            "linux": {"b.conf": "~/b.conf"},
            "macos,windows": {"c.conf": "~/c.conf"},
        }));
        assert!(warnings.is_empty(), "{warnings:?}");
        let sel = selector(node);
        assert_eq!(sel.all.len(), 1);
        assert_eq!(sel.platforms.entries.len(), 2);
        assert_eq!(sel.platforms.entries[1].tokens, ["macos", "windows"]);
    }

    #[test]
    fn host_keys_are_pinned() {
        let (node, _) = links(&json!({
            "common": {},
            "host-box": {"x": "~/x"},
        }));
        let sel = selector(node);
        assert_eq!(sel.pinned_hosts.len(), 1);
        assert_eq!(sel.pinned_hosts[0].0, "box");
    }

    #[test]
    fn nested_selectors_do_not_take_bare_platform_keys() {
        let (node, warnings) = links(&json!({
            "common": {"linux": {"x": "~/x"}}
        }));
        assert!(!warnings.is_empty());
        let sel = selector(node);
        assert_eq!(sel.all, vec![ConfigNode::Leaf(ActionMap::new())]);
    }

    #[test]
    fn path_named_like_platform_with_string_value_is_a_path() {
        let (node, warnings) = links(&json!({"linux": "~/linux"}));
        assert!(warnings.is_empty());
        assert!(leaf(node).get("linux").is_some());
    }

    #[test]
    fn mixed_node_is_empty_with_warning() {
        let (node, warnings) = links(&json!({
            "common": {"a": "~/a"},
            "b": "~/b",
        }));
        assert!(node.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("mixes selector keys"));
    }

    #[test]
    fn selector_groups_collect_entries_and_default() {
        let (node, warnings) = links(&json!({
            "platforms": {"linux, macos": {"a": "~/a"}, "default": {"b": "~/b"}},
            "hostnames": {"work,home": {"c": "~/c"}},
        }));
        assert!(warnings.is_empty(), "{warnings:?}");
        let sel = selector(node);
        assert_eq!(sel.platforms.entries[0].tokens, ["linux", "macos"]);
        assert!(sel.platforms.default.is_some());
        assert_eq!(sel.hostnames.entries[0].tokens, ["work", "home"]);
        assert!(sel.hostnames.default.is_none());
    }

    #[test]
    fn unknown_platform_token_warns() {
        let (_, warnings) = links(&json!({"platforms": {"beos": {"a": "~/a"}}}));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("unknown platform 'beos'"));
    }

    #[test]
    fn non_mapping_group_is_ignored() {
        let (node, warnings) = links(&json!({"platforms": ["linux"]}));
        assert!(selector(node).platforms.entries.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn packages_accept_platform_keys_with_lists() {
        let (node, warnings) = packages(&json!({
            "linux": ["git", "curl"],
            "darwin": ["git"],
        }));
        assert!(warnings.is_empty(), "{warnings:?}");
        let sel = selector(node);
        assert_eq!(sel.platforms.entries.len(), 2);
        assert_eq!(
            sel.platforms.entries[0].node,
            ConfigNode::Leaf(["git", "curl"].into_iter().collect())
        );
    }

    #[test]
    fn packages_list_is_leaf_and_deduplicated() {
        let (node, warnings) = packages(&json!(["git", "git", " vim ", "", 7]));
        assert_eq!(warnings.len(), 2);
        assert_eq!(node, ConfigNode::Leaf(["git", "vim"].into_iter().collect()));
    }

    #[test]
    fn packages_ignore_host_keys() {
        let (node, warnings) = packages(&json!({"host-box": ["x"]}));
        assert!(node.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn action_map_overwrite_keeps_position() {
        let mut map = ActionMap::new();
        map.insert("a", ActionSpec::link("~/a"));
        map.insert("b", ActionSpec::link("~/b"));
        map.insert("a", ActionSpec::copy("~/a2"));
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(map.get("a"), Some(&ActionSpec::copy("~/a2")));
    }

    #[test]
    fn package_merge_is_ordered_union() {
        let mut a: PackageList = ["git", "vim"].into_iter().collect();
        let b: PackageList = ["vim", "tmux"].into_iter().collect();
        a.merge(&b);
        assert_eq!(a.as_slice(), ["git", "vim", "tmux"]);
    }

    #[test]
    fn action_kind_names() {
        assert_eq!(ActionKind::from_name("Symlink"), Some(ActionKind::Link));
        assert_eq!(ActionKind::from_name("exec"), Some(ActionKind::Exec));
        assert_eq!(ActionKind::from_name("run"), None);
        assert_eq!(ActionKind::Copy.to_string(), "copy");
    }

    #[test]
    fn action_spec_serializes_with_kind_tag() {
        let json = serde_json::to_value(ActionSpec::link("~/a")).unwrap();
        assert_eq!(json, json!({"kind": "link", "target": "~/a"}));
        let json = serde_json::to_value(ActionSpec::Exec { args: vec![] }).unwrap();
        assert_eq!(json, json!({"kind": "exec"}));
    }
}
