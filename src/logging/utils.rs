//! Log file location and timestamps.
use std::ffi::OsString;
use std::path::PathBuf;

/// `$XDG_CACHE_HOME`, else `<home>/.cache`, else `./.cache`.
fn cache_root(xdg: Option<OsString>, home: Option<OsString>) -> PathBuf {
    match xdg.filter(|v| !v.is_empty()) {
        Some(xdg) => PathBuf::from(xdg),
        None => home
            .map_or_else(|| PathBuf::from("."), PathBuf::from)
            .join(".cache"),
    }
}

/// Log file for `command`, under `homelink/` in the cache root. Creates the
/// directory; `None` if that fails.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
    let dir = cache_root(std::env::var_os("XDG_CACHE_HOME"), home).join("homelink");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

pub(super) fn format_utc_datetime() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub(super) fn format_utc_time() -> String {
    chrono::Utc::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn cache_root_prefers_xdg() {
        let root = cache_root(Some("/xdg".into()), Some("/home/u".into()));
        assert_eq!(root, PathBuf::from("/xdg"));
    }

    #[test]
    fn cache_root_ignores_empty_xdg() {
        let root = cache_root(Some(OsString::new()), Some("/home/u".into()));
        assert_eq!(root, PathBuf::from("/home/u").join(".cache"));
    }

    #[test]
    fn cache_root_without_home_uses_cwd() {
        assert_eq!(cache_root(None, None), PathBuf::from(".").join(".cache"));
    }

    #[test]
    fn timestamps_are_fixed_width() {
        assert_eq!(format_utc_time().len(), "HH:MM:SS".len());
        let stamp = format_utc_datetime();
        assert_eq!(stamp.len(), "YYYY-MM-DD HH:MM:SS".len());
        assert_eq!(&stamp[10..11], " ");
    }
}
