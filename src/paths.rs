use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

// Deliberately not tagged implicit or explicit here; the kind is derived from
// the location name at scan time, so a new path only needs one entry.
#[cfg(not(windows))]
const SYSTEM_SEARCH_PATHS: [&str; 10] = [
    "/usr/local/etc/vulkan/explicit_layer.d",
    "/usr/local/etc/vulkan/implicit_layer.d",
    "/usr/local/share/vulkan/explicit_layer.d",
    "/usr/local/share/vulkan/implicit_layer.d",
    "/etc/vulkan/explicit_layer.d",
    "/etc/vulkan/implicit_layer.d",
    "/usr/share/vulkan/explicit_layer.d",
    "/usr/share/vulkan/implicit_layer.d",
    "$HOME/.local/share/vulkan/explicit_layer.d",
    "$HOME/.local/share/vulkan/implicit_layer.d",
];

const CUSTOM_PATHS_FILENAME: &str = "custom_paths.txt";
const SETTINGS_FILENAME: &str = "settings.json";

/// The compiled-in layer search directories, `$HOME` expanded.
///
/// On Windows layers are registered in the registry rather than in fixed
/// directories, so the directory table is empty there.
pub fn system_search_dirs() -> Vec<PathBuf> {
    #[cfg(not(windows))]
    {
        SYSTEM_SEARCH_PATHS
            .iter()
            .filter_map(|path| match path.strip_prefix("$HOME/") {
                Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
                None => Some(PathBuf::from(path)),
            })
            .collect()
    }

    #[cfg(windows)]
    {
        Vec::new()
    }
}

/// Per-user directory holding this tool's own files.
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| {
        Error::Config("could not determine platform config directory".to_string())
    })?;
    Ok(base.join("vk-layerman"))
}

pub fn custom_paths_file(config_dir: &Path) -> PathBuf {
    config_dir.join(CUSTOM_PATHS_FILENAME)
}

pub fn settings_file(config_dir: &Path) -> PathBuf {
    config_dir.join(SETTINGS_FILENAME)
}

/// Reads the user's extra search paths, one per line.
///
/// A missing file means zero entries, not an error. Blank lines are ignored.
pub fn load_additional_search_paths(file: &Path) -> Vec<PathBuf> {
    let Ok(text) = fs::read_to_string(file) else {
        debug!(file = %file.display(), "no additional search path file");
        return Vec::new();
    };
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Rewrites the extra search path file, one path per line.
///
/// An empty list still truncates the file so that stale paths do not
/// resurface on the next load.
pub fn save_additional_search_paths(file: &Path, search_paths: &[PathBuf]) -> Result<()> {
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent).map_err(|source| Error::io(parent, source))?;
    }
    let mut text = String::new();
    for path in search_paths {
        text.push_str(&path.to_string_lossy());
        text.push('\n');
    }
    fs::write(file, text).map_err(|source| Error::io(file, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_path_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom_paths.txt");

        let paths = vec![
            PathBuf::from("/opt/layers/b"),
            PathBuf::from("/opt/layers/a"),
            PathBuf::from("/home/dev/layers"),
        ];
        save_additional_search_paths(&file, &paths).unwrap();
        assert_eq!(load_additional_search_paths(&file), paths);
    }

    #[test]
    fn missing_file_means_zero_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("never_written.txt");
        assert!(load_additional_search_paths(&file).is_empty());
    }

    #[test]
    fn saving_an_empty_list_clears_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom_paths.txt");

        save_additional_search_paths(&file, &[PathBuf::from("/opt/layers")]).unwrap();
        save_additional_search_paths(&file, &[]).unwrap();
        assert!(load_additional_search_paths(&file).is_empty());
    }

    #[test]
    fn save_creates_the_config_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested").join("custom_paths.txt");

        save_additional_search_paths(&file, &[PathBuf::from("/opt/layers")]).unwrap();
        assert_eq!(
            load_additional_search_paths(&file),
            vec![PathBuf::from("/opt/layers")]
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn system_search_dirs_expand_home() {
        let dirs = system_search_dirs();
        assert!(!dirs.is_empty());
        assert!(dirs.iter().all(|d| !d.starts_with("$HOME")));
    }
}
