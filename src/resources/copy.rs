//! Copy resource: materialise a source file or directory at the target.
use anyhow::{Context as _, Result};
use std::path::PathBuf;

use super::helpers::fs::{
    copy_dir_recursive, copy_file, ensure_parent_dir, is_absent, placement_problem,
};
use super::{Applicable, Occupant, Resource, ResourceChange, ResourceState};

/// A copied file or directory tree.
///
/// There is no content comparison: any existing target is a conflict.
#[derive(Debug, Clone)]
pub struct CopyResource {
    /// What to copy.
    pub source: PathBuf,
    /// Where the copy lands.
    pub target: PathBuf,
}

impl CopyResource {
    /// Create a new copy resource.
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf) -> Self {
        Self { source, target }
    }
}

impl Applicable for CopyResource {
    fn description(&self) -> String {
        format!("{} <= {}", self.target.display(), self.source.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        ensure_parent_dir(&self.target)?;
        if self.source.is_dir() {
            copy_dir_recursive(&self.source, &self.target)
        } else {
            copy_file(&self.source, &self.target)
        }
        .with_context(|| format!("copy to {}", self.target.display()))?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for CopyResource {
    fn current_state(&self) -> Result<ResourceState> {
        if let Some(reason) = placement_problem(&self.source, &self.target) {
            return Ok(ResourceState::Invalid { reason });
        }
        match std::fs::symlink_metadata(&self.target) {
            Ok(meta) => {
                let occupant = if meta.is_symlink() {
                    Occupant::Symlink
                } else if meta.is_dir() {
                    Occupant::Directory
                } else {
                    Occupant::File
                };
                Ok(ResourceState::Occupied { occupant })
            }
            Err(e) if is_absent(&e) => Ok(ResourceState::Missing),
            Err(e) => {
                Err(e).with_context(|| format!("reading metadata: {}", self.target.display()))
            }
        }
    }
}
