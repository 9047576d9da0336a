//! Symlink resource.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::helpers::fs::{ensure_parent_dir, is_absent, placement_problem, remove_existing};
use super::{Applicable, Occupant, Resource, ResourceChange, ResourceState};

/// A symlink resource that can be checked and applied.
#[derive(Debug, Clone)]
pub struct SymlinkResource {
    /// The source file/directory (what the symlink points to).
    pub source: PathBuf,
    /// The target path (where the symlink will be created).
    pub target: PathBuf,
}

impl SymlinkResource {
    /// Create a new symlink resource.
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf) -> Self {
        Self { source, target }
    }

    /// Whether the existing link at `target`, stored as `stored`, resolves
    /// to the configured source.
    fn points_at_source(&self, stored: &Path) -> bool {
        let resolved = if stored.is_relative() {
            self.target
                .parent()
                .map_or_else(|| stored.to_path_buf(), |dir| dir.join(stored))
        } else {
            stored.to_path_buf()
        };
        match (
            dunce::canonicalize(&resolved),
            dunce::canonicalize(&self.source),
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl Applicable for SymlinkResource {
    fn description(&self) -> String {
        format!("{} -> {}", self.target.display(), self.source.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        ensure_parent_dir(&self.target)?;
        create_symlink(&self.source, &self.target)
            .with_context(|| format!("create link: {}", self.target.display()))?;
        Ok(ResourceChange::Applied)
    }

    /// Remove the link, but only when it still points at the source.
    fn remove(&self) -> Result<ResourceChange> {
        match self.current_state()? {
            ResourceState::Correct => {
                remove_existing(&self.target)?;
                Ok(ResourceChange::Applied)
            }
            ResourceState::Missing => Ok(ResourceChange::AlreadyCorrect),
            ResourceState::Incorrect { current } => Ok(ResourceChange::Skipped {
                reason: format!("links elsewhere ({current})"),
            }),
            ResourceState::Occupied { occupant } => Ok(ResourceChange::Skipped {
                reason: format!("target is {occupant}"),
            }),
            ResourceState::Invalid { reason } => Ok(ResourceChange::Skipped { reason }),
        }
    }
}

impl Resource for SymlinkResource {
    fn current_state(&self) -> Result<ResourceState> {
        if let Some(reason) = placement_problem(&self.source, &self.target) {
            return Ok(ResourceState::Invalid { reason });
        }

        let meta = match std::fs::symlink_metadata(&self.target) {
            Ok(meta) => meta,
            Err(e) if is_absent(&e) => {
                return Ok(ResourceState::Missing);
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading metadata: {}", self.target.display()));
            }
        };

        if meta.is_symlink() {
            return Ok(std::fs::read_link(&self.target).map_or(
                ResourceState::Occupied {
                    occupant: Occupant::UnreadableLink,
                },
                |stored| {
                    if self.points_at_source(&stored) {
                        ResourceState::Correct
                    } else {
                        ResourceState::Incorrect {
                            current: format!("points to {}", stored.display()),
                        }
                    }
                },
            ));
        }

        let occupant = if meta.is_dir() {
            Occupant::Directory
        } else {
            Occupant::File
        };
        Ok(ResourceState::Occupied { occupant })
    }
}

/// File symlinks on Windows have no unprivileged fallback.
#[cfg(windows)]
const WINDOWS_PRIVILEGE_HINT: &str =
    "file links need Developer Mode or an Administrator shell";

/// Create a symlink at `link` pointing to `target`.
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).with_context(|| {
            format!(
                "creating symlink {} -> {}",
                link.display(),
                target.display()
            )
        })?;
    }

    #[cfg(windows)]
    {
        use crate::exec::{Executor as _, SystemExecutor};

        if target.is_dir() {
            if std::os::windows::fs::symlink_dir(target, link).is_err() {
                // Junctions need no privilege.
                let link_str = link.to_string_lossy();
                let target_str = target.to_string_lossy();
                SystemExecutor.run("cmd", &["/c", "mklink", "/J", &*link_str, &*target_str])?;
            }
        } else {
            std::os::windows::fs::symlink_file(target, link).with_context(|| {
                format!(
                    "creating symlink {} -> {} ({WINDOWS_PRIVILEGE_HINT})",
                    link.display(),
                    target.display()
                )
            })?;
        }
    }

    Ok(())
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

    fn fixture() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = temp_dir.path().join("source");
        std::fs::write(&source, "test").unwrap();
        let target = temp_dir.path().join("home").join("target");
        (temp_dir, source, target)
    }

    #[test]
    fn symlink_resource_description() {
        let resource = SymlinkResource::new(PathBuf::from("/source"), PathBuf::from("/target"));
        assert!(resource.description().contains("/source"));
        assert!(resource.description().contains("/target"));
    }

    #[test]
    fn invalid_when_source_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = temp_dir.path().join("nonexistent");
        let resource = SymlinkResource::new(source.clone(), temp_dir.path().join("target"));

        let state = resource.current_state().unwrap();
        let ResourceState::Invalid { reason } = state else {
            panic!("expected Invalid, got {state:?}");
        };
        assert!(reason.contains(&source.display().to_string()));
    }

    #[test]
    fn invalid_when_parent_is_a_file() {
        let (temp_dir, source, _) = fixture();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let resource = SymlinkResource::new(source, blocker.join("target"));

        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
    }

    #[test]
    fn missing_when_target_not_exists() {
        let (_temp_dir, source, target) = fixture();
        let resource = SymlinkResource::new(source, target);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
    }

    #[test]
    fn apply_creates_parents_and_link() {
        let (_temp_dir, source, target) = fixture();
        let resource = SymlinkResource::new(source, target.clone());

        assert_eq!(resource.apply().unwrap(), ResourceChange::Applied);

        assert!(target.symlink_metadata().unwrap().is_symlink());
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[cfg(unix)]
    #[test]
    fn relative_link_to_source_is_correct() {
        let (temp_dir, source, _) = fixture();
        let target = temp_dir.path().join("link");
        std::os::unix::fs::symlink("source", &target).unwrap();

        let resource = SymlinkResource::new(source, target);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[cfg(unix)]
    #[test]
    fn link_through_equivalent_path_is_correct() {
        let (temp_dir, source, _) = fixture();
        let target = temp_dir.path().join("link");
        let roundabout = temp_dir.path().join("home").join("..").join("source");
        std::fs::create_dir(temp_dir.path().join("home")).unwrap();
        std::os::unix::fs::symlink(&roundabout, &target).unwrap();

        let resource = SymlinkResource::new(source, target);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[cfg(unix)]
    #[test]
    fn incorrect_when_link_points_elsewhere() {
        let (temp_dir, source, _) = fixture();
        let other = temp_dir.path().join("other");
        let target = temp_dir.path().join("target");
        std::fs::write(&other, "other").unwrap();
        std::os::unix::fs::symlink(&other, &target).unwrap();

        let resource = SymlinkResource::new(source, target);
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Incorrect { .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_link_is_incorrect() {
        let (temp_dir, source, _) = fixture();
        let target = temp_dir.path().join("target");
        std::os::unix::fs::symlink(temp_dir.path().join("gone"), &target).unwrap();

        let resource = SymlinkResource::new(source, target);
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Incorrect { .. }
        ));
    }

    #[test]
    fn occupied_by_regular_file() {
        let (temp_dir, source, _) = fixture();
        let target = temp_dir.path().join("target");
        std::fs::write(&target, "other content").unwrap();

        let resource = SymlinkResource::new(source, target);
        assert_eq!(
            resource.current_state().unwrap(),
            ResourceState::Occupied {
                occupant: Occupant::File
            }
        );
    }

    #[test]
    fn occupied_by_directory() {
        let (temp_dir, source, _) = fixture();
        let target = temp_dir.path().join("target");
        std::fs::create_dir(&target).unwrap();

        let resource = SymlinkResource::new(source, target);
        assert_eq!(
            resource.current_state().unwrap(),
            ResourceState::Occupied {
                occupant: Occupant::Directory
            }
        );
    }

    #[test]
    fn remove_deletes_only_matching_link() {
        let (_temp_dir, source, target) = fixture();
        let resource = SymlinkResource::new(source.clone(), target.clone());
        resource.apply().unwrap();

        assert_eq!(resource.remove().unwrap(), ResourceChange::Applied);
        assert!(target.symlink_metadata().is_err());
        assert!(source.exists());
        assert_eq!(resource.remove().unwrap(), ResourceChange::AlreadyCorrect);
    }

    #[test]
    fn remove_leaves_regular_file_alone() {
        let (temp_dir, source, _) = fixture();
        let target = temp_dir.path().join("target");
        std::fs::write(&target, "mine").unwrap();

        let resource = SymlinkResource::new(source, target.clone());
        assert!(matches!(
            resource.remove().unwrap(),
            ResourceChange::Skipped { .. }
        ));
        assert_eq!(std::fs::read_to_string(target).unwrap(), "mine");
    }

    #[test]
    fn missing_when_an_ancestor_is_a_file() {
        let (temp_dir, source, _) = fixture();
        std::fs::write(temp_dir.path().join("home"), "file").unwrap();
        let target = temp_dir.path().join("home").join(".config").join("x");

        let resource = SymlinkResource::new(source, target);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Missing);
        let err = resource.apply().unwrap_err();
        assert!(format!("{err:#}").contains("create parent"), "{err:#}");
    }

    #[cfg(windows)]
    #[test]
    fn directory_link_falls_back_to_junction() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = temp_dir.path().join("nvim");
        std::fs::create_dir(&source).unwrap();
        let target = temp_dir.path().join("home").join("nvim");

        let resource = SymlinkResource::new(source, target);
        assert_eq!(resource.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }
}
