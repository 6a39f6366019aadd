use std::env::var;
use std::path::PathBuf;

/// Where a layer manifest was found, which is the only way to know its kind.
/// The manifest's own `type` field is informational and is stored separately.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LayerKind {
    Implicit,
    Explicit,
    Custom,
}

impl LayerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Implicit => "implicit",
            LayerKind::Explicit => "explicit",
            LayerKind::Custom => "custom",
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SettingKind {
    String,
    Bool,
    Int,
    Path,
}

/// One setting exposed by a layer. Values are kept as strings; the kind tag
/// tells a front-end how to edit them.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LayerSetting {
    pub name: String,
    pub description: String,
    pub kind: SettingKind,
    pub default_value: String,
}

/// The parsed in-memory form of one layer manifest entry.
///
/// Identified by `(library_path, name)`. Immutable after load; a registry
/// rescan drops and recreates every descriptor.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LayerDescriptor {
    pub file_format_version: String,
    pub name: String,
    /// The manifest's own `type` string, stored opaque.
    pub type_field: String,
    pub library_path: String,
    pub api_version: String,
    pub implementation_version: String,
    pub description: String,
    pub kind: LayerKind,
    pub manifest_path: PathBuf,
    /// First variable of the manifest's `disable_environment` map, if any.
    pub disable_environment: Option<String>,
    /// First variable of the manifest's `enable_environment` map, if any.
    pub enable_environment: Option<String>,
    /// Empty after parsing; layers do not describe their own settings, so
    /// these must be supplied from elsewhere.
    pub settings: Vec<LayerSetting>,
}

impl LayerDescriptor {
    pub fn identity(&self) -> (&str, &str) {
        (&self.library_path, &self.name)
    }

    pub fn with_settings(mut self, settings: Vec<LayerSetting>) -> Self {
        self.settings = settings;
        self
    }

    /// Whether the layer would load in the current environment.
    ///
    /// A set disable variable turns the layer off. Layers that declare an
    /// enable variable are off unless it is set. Everything else is on.
    pub fn is_active(&self) -> bool {
        if let Some(disable_env) = &self.disable_environment {
            if var(disable_env).is_ok() {
                return false;
            }
        }
        if let Some(enable_env) = &self.enable_environment {
            return var(enable_env).is_ok();
        }
        true
    }
}

/// What one rescan saw. Discovery never fails; everything non-fatal lands
/// here instead.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ScanReport {
    /// Search locations that existed and were walked.
    pub paths_visited: usize,
    /// Search locations that were absent and silently skipped.
    pub paths_skipped: usize,
    pub files_parsed: usize,
    pub files_skipped: usize,
    pub duplicates_discarded: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LoaderInfo {
    /// Raw packed Vulkan version as reported by the loader.
    pub version: u32,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    /// Loaders older than 1.2.141 apply overrides to every application.
    pub supports_override: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(disable: Option<&str>, enable: Option<&str>) -> LayerDescriptor {
        LayerDescriptor {
            file_format_version: "1.1.2".to_string(),
            name: "VK_LAYER_TEST_activity".to_string(),
            type_field: "GLOBAL".to_string(),
            library_path: "./libtest.so".to_string(),
            api_version: "1.2.141".to_string(),
            implementation_version: "1".to_string(),
            description: "test layer".to_string(),
            kind: LayerKind::Implicit,
            manifest_path: PathBuf::from("./test.json"),
            disable_environment: disable.map(str::to_string),
            enable_environment: enable.map(str::to_string),
            settings: Vec::new(),
        }
    }

    #[test]
    fn layer_without_environment_variables_is_active() {
        assert!(descriptor(None, None).is_active());
    }

    #[test]
    fn set_disable_variable_turns_the_layer_off() {
        std::env::set_var("VKLM_TEST_DISABLE_A", "1");
        assert!(!descriptor(Some("VKLM_TEST_DISABLE_A"), None).is_active());
        assert!(descriptor(Some("VKLM_TEST_DISABLE_A_UNSET"), None).is_active());
    }

    #[test]
    fn enable_variable_must_be_set_for_opt_in_layers() {
        let layer = descriptor(Some("VKLM_TEST_DISABLE_B_UNSET"), Some("VKLM_TEST_ENABLE_B"));
        assert!(!layer.is_active());
        std::env::set_var("VKLM_TEST_ENABLE_B", "1");
        assert!(layer.is_active());
    }

    #[test]
    fn identity_is_library_path_and_name() {
        let layer = descriptor(None, None);
        assert_eq!(layer.identity(), ("./libtest.so", "VK_LAYER_TEST_activity"));
    }
}
