use std::path::{Path, PathBuf};

/// Relative path from the platform config directory to the editor's
/// workspace storage.
pub const STORAGE_SUBPATH: [&str; 3] = ["Code", "User", "workspaceStorage"];

/// Resolve the single root directory to scan.
///
/// An override that exists on disk wins. Otherwise the platform default is
/// derived from the config directory (`~/Library/Application Support` on
/// macOS, `%APPDATA%` on Windows, `~/.config` elsewhere), falling back to a
/// home-relative `.config` when the platform lookup fails.
///
/// Never fails: the returned path may not exist, in which case discovery
/// simply finds nothing.
pub fn resolve_storage_root(override_path: Option<&Path>) -> PathBuf {
    if let Some(path) = override_path {
        if path.exists() {
            return path.to_path_buf();
        }
        tracing::warn!(path = %path.display(), "storage root override does not exist, using platform default");
    }

    let base = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    STORAGE_SUBPATH.iter().fold(base, |acc, part| acc.join(part))
}

/// Default location of the persisted cache snapshot.
pub fn default_cache_path() -> PathBuf {
    dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chatlens")
        .join("cache.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_when_it_exists() {
        let dir = tempfile::TempDir::new().unwrap();
        let resolved = resolve_storage_root(Some(dir.path()));
        assert_eq!(resolved, dir.path());
    }

    #[test]
    fn missing_override_falls_back_to_default() {
        let resolved = resolve_storage_root(Some(Path::new("/definitely/not/here")));
        assert!(resolved.ends_with("Code/User/workspaceStorage"));
    }

    #[test]
    fn no_override_is_best_effort() {
        let resolved = resolve_storage_root(None);
        assert!(resolved.ends_with("Code/User/workspaceStorage"));
    }
}
