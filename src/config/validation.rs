//! Advisory configuration warnings.
//!
//! Malformed sections and entries never abort a run: they are dropped during
//! normalisation and reported as [`ConfigWarning`]s instead.
use std::fmt;

/// A warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// The document that produced the warning (e.g. `modules/git/module.yaml`).
    pub source: String,
    /// Dotted location of the offending item inside the document.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ConfigWarning {
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.item.is_empty() {
            write!(f, "{}: {}", self.source, self.message)
        } else {
            write!(f, "{} [{}]: {}", self.source, self.item, self.message)
        }
    }
}

/// Collects warnings for one document, tracking the current location.
#[derive(Debug)]
pub(crate) struct Diagnostics<'a> {
    source: &'a str,
    warnings: &'a mut Vec<ConfigWarning>,
}

impl<'a> Diagnostics<'a> {
    pub(crate) const fn new(source: &'a str, warnings: &'a mut Vec<ConfigWarning>) -> Self {
        Self { source, warnings }
    }

    pub(crate) fn warn(&mut self, item: &str, message: impl Into<String>) {
        self.warnings
            .push(ConfigWarning::new(self.source, item, message));
    }
}

/// Append `key` to a dotted location.
pub(crate) fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn display_with_item() {
        let w = ConfigWarning::new("links.yaml", "links.common", "not a mapping");
        assert_eq!(w.to_string(), "links.yaml [links.common]: not a mapping");
    }

    #[test]
    fn display_without_item() {
        let w = ConfigWarning::new("links.yaml", "", "unknown key");
        assert_eq!(w.to_string(), "links.yaml: unknown key");
    }

    #[test]
    fn diagnostics_record_source() {
        let mut warnings = Vec::new();
        let mut diag = Diagnostics::new("m.yaml", &mut warnings);
        diag.warn("links.x", "bad");
        assert_eq!(warnings, vec![ConfigWarning::new("m.yaml", "links.x", "bad")]);
    }

    #[test]
    fn child_path_joins_with_dot() {
        assert_eq!(child_path("", "links"), "links");
        assert_eq!(child_path("links", "common"), "links.common");
    }
}
