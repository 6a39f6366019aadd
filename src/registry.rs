use crate::definitions::*;
use crate::error::{Error, Result};
use crate::manifest;
use crate::paths;
use crate::settings::AppSettings;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The model of the machine's Vulkan layer configuration.
///
/// Explicitly constructed and passed around by the caller; there is exactly
/// one reader and writer context, so no synchronization is involved.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    pub implicit_layers: Vec<LayerDescriptor>,
    pub explicit_layers: Vec<LayerDescriptor>,
    pub custom_layers: Vec<LayerDescriptor>,
    pub additional_search_paths: Vec<PathBuf>,
    pub settings: AppSettings,
    config_dir: PathBuf,
    system_dirs: Vec<PathBuf>,
}

impl LayerRegistry {
    /// Builds a registry rooted at the per-user config directory and loads
    /// the persisted search paths and settings. Layers are not scanned until
    /// [`rescan`](Self::rescan) is called.
    pub fn new() -> Result<Self> {
        Self::with_config_dir(paths::config_dir()?)
    }

    /// Same as [`new`](Self::new) with an explicit config directory. Tests
    /// point this at a temp dir.
    pub fn with_config_dir(config_dir: PathBuf) -> Result<Self> {
        let additional_search_paths =
            paths::load_additional_search_paths(&paths::custom_paths_file(&config_dir));
        let settings = AppSettings::load(&paths::settings_file(&config_dir))?;
        Ok(LayerRegistry {
            implicit_layers: Vec::new(),
            explicit_layers: Vec::new(),
            custom_layers: Vec::new(),
            additional_search_paths,
            settings,
            config_dir,
            system_dirs: paths::system_search_dirs(),
        })
    }

    /// Replaces the compiled-in search directories. Tests use this to scan
    /// fabricated layer trees.
    pub fn with_system_dirs(mut self, system_dirs: Vec<PathBuf>) -> Self {
        self.system_dirs = system_dirs;
        self
    }

    pub fn clear_lists(&mut self) {
        self.implicit_layers.clear();
        self.explicit_layers.clear();
        self.custom_layers.clear();
    }

    /// Discards every descriptor and rebuilds all three lists from the
    /// search locations. Absent locations and unparseable manifests are
    /// skipped; the report says what was seen and what was dropped.
    pub fn rescan(&mut self) -> ScanReport {
        self.clear_lists();
        let mut report = ScanReport::default();

        #[cfg(windows)]
        self.scan_registry_keys(&mut report);

        for dir in &self.system_dirs {
            // A location is implicit iff its name says so.
            if dir.to_string_lossy().contains("implicit") {
                load_layers_from_dir(
                    dir,
                    LayerKind::Implicit,
                    &mut self.implicit_layers,
                    &mut report,
                );
            } else {
                load_layers_from_dir(
                    dir,
                    LayerKind::Explicit,
                    &mut self.explicit_layers,
                    &mut report,
                );
            }
        }

        // User paths all land in the custom list, whatever they are named.
        for dir in &self.additional_search_paths {
            load_layers_from_dir(dir, LayerKind::Custom, &mut self.custom_layers, &mut report);
        }

        debug!(
            implicit = self.implicit_layers.len(),
            explicit = self.explicit_layers.len(),
            custom = self.custom_layers.len(),
            "rescan complete"
        );
        report
    }

    #[cfg(windows)]
    fn scan_registry_keys(&mut self, report: &mut ScanReport) {
        let manifests = crate::winreg::collect_layer_manifests(report);
        for (path, kind) in manifests {
            let list = match kind {
                LayerKind::Implicit => &mut self.implicit_layers,
                _ => &mut self.explicit_layers,
            };
            append_manifest(&path, kind, list, report);
        }
    }

    pub fn all_layers(&self) -> impl Iterator<Item = &LayerDescriptor> {
        self.implicit_layers
            .iter()
            .chain(&self.explicit_layers)
            .chain(&self.custom_layers)
    }

    /// Looks a layer up by name across the three lists, implicit first.
    pub fn find(&self, name: &str) -> Option<&LayerDescriptor> {
        self.all_layers().find(|descriptor| descriptor.name == name)
    }

    /// Appends a search path unless it is already present.
    pub fn add_search_path(&mut self, path: PathBuf) -> bool {
        if self.additional_search_paths.contains(&path) {
            return false;
        }
        self.additional_search_paths.push(path);
        true
    }

    pub fn remove_search_path(&mut self, path: &Path) -> bool {
        let before = self.additional_search_paths.len();
        self.additional_search_paths.retain(|p| p != path);
        self.additional_search_paths.len() != before
    }

    pub fn save_additional_search_paths(&self) -> Result<()> {
        paths::save_additional_search_paths(
            &paths::custom_paths_file(&self.config_dir),
            &self.additional_search_paths,
        )
    }

    pub fn load_app_settings(&mut self) -> Result<()> {
        self.settings = AppSettings::load(&paths::settings_file(&self.config_dir))?;
        Ok(())
    }

    pub fn save_app_settings(&self) -> Result<()> {
        self.settings.save(&paths::settings_file(&self.config_dir))
    }

    /// Layer profiles have no defined on-disk schema yet, so loading and
    /// saving them refuse instead of inventing one.
    pub fn load_profiles(&mut self) -> Result<()> {
        Err(Error::Unsupported("loading layer profiles"))
    }

    pub fn save_profiles(&self) -> Result<()> {
        Err(Error::Unsupported("saving layer profiles"))
    }
}

/// Walks one directory and appends every non-duplicate layer found there.
///
/// Files are visited in name order so scans are deterministic. Skipping a
/// missing directory or a broken manifest is policy, not an oversight; bulk
/// discovery must survive whatever is on disk.
fn load_layers_from_dir(
    dir: &Path,
    kind: LayerKind,
    list: &mut Vec<LayerDescriptor>,
    report: &mut ScanReport,
) {
    if !dir.is_dir() {
        report.paths_skipped += 1;
        return;
    }
    report.paths_visited += 1;

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), %err, "could not list search path");
            report
                .errors
                .push(format!("could not list {}: {}", dir.display(), err));
            return;
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().map_or(false, |ext| ext == "json")
        })
        .collect();
    files.sort();

    for file in files {
        append_manifest(&file, kind, list, report);
    }
}

fn append_manifest(
    file: &Path,
    kind: LayerKind,
    list: &mut Vec<LayerDescriptor>,
    report: &mut ScanReport,
) {
    let descriptors = match manifest::parse_manifest(file, kind) {
        Ok(descriptors) => descriptors,
        Err(err) => {
            debug!(file = %file.display(), %err, "skipping manifest");
            report.files_skipped += 1;
            report.errors.push(err.to_string());
            return;
        }
    };

    report.files_parsed += 1;
    for descriptor in descriptors {
        // First found wins; a later manifest for the same (library, name)
        // pair is dropped.
        let duplicate = list
            .iter()
            .any(|existing| existing.identity() == descriptor.identity());
        if duplicate {
            debug!(name = %descriptor.name, "duplicate layer discarded");
            report.duplicates_discarded += 1;
        } else {
            list.push(descriptor);
        }
    }
}
