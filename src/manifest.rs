use crate::definitions::*;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
struct ManifestRoot {
    #[serde(default)]
    file_format_version: String,
    layer: Option<ManifestLayer>,
    layers: Option<Vec<ManifestLayer>>,
}

#[derive(Debug, Default, Deserialize)]
struct ManifestLayer {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    layer_type: String,
    #[serde(default)]
    library_path: String,
    #[serde(default)]
    api_version: String,
    #[serde(default)]
    implementation_version: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    disable_environment: HashMap<String, String>,
    #[serde(default)]
    enable_environment: HashMap<String, String>,
}

impl LayerDescriptor {
    /// Parses one manifest into a single descriptor, reading the `layer`
    /// object.
    ///
    /// Missing fields become empty strings. A manifest without a `layer`
    /// object still succeeds and yields a descriptor with empty fields; only
    /// unreadable files and malformed or structurally empty JSON fail.
    pub fn parse(path: &Path, kind: LayerKind) -> Result<LayerDescriptor> {
        let root = read_root(path)?;
        let layer = root.layer.unwrap_or_default();
        Ok(build_descriptor(
            layer,
            &root.file_format_version,
            path,
            kind,
        ))
    }
}

/// Parses every layer entry in a manifest.
///
/// Real manifests carry either a single `layer` object or a `layers` array;
/// both shapes are accepted, in that order. A manifest with neither key
/// yields an empty list.
pub fn parse_manifest(path: &Path, kind: LayerKind) -> Result<Vec<LayerDescriptor>> {
    let root = read_root(path)?;
    let mut descriptors = Vec::new();
    if let Some(layer) = root.layer {
        descriptors.push(build_descriptor(layer, &root.file_format_version, path, kind));
    }
    if let Some(layers) = root.layers {
        for layer in layers {
            descriptors.push(build_descriptor(layer, &root.file_format_version, path, kind));
        }
    }
    Ok(descriptors)
}

fn read_root(path: &Path) -> Result<ManifestRoot> {
    let text = fs::read_to_string(path).map_err(|source| Error::io(path, source))?;
    let document: serde_json::Value =
        serde_json::from_str(&text).map_err(|err| Error::format(path, err.to_string()))?;

    match document.as_object() {
        None => return Err(Error::format(path, "document is not a JSON object")),
        Some(object) if object.is_empty() => {
            return Err(Error::format(path, "document is empty"))
        }
        Some(_) => {}
    }

    serde_json::from_value(document).map_err(|err| Error::format(path, err.to_string()))
}

fn build_descriptor(
    layer: ManifestLayer,
    file_format_version: &str,
    path: &Path,
    kind: LayerKind,
) -> LayerDescriptor {
    // Real manifests put exactly one variable in each environment map.
    let disable_environment = layer.disable_environment.keys().next().cloned();
    let enable_environment = layer.enable_environment.keys().next().cloned();

    LayerDescriptor {
        file_format_version: file_format_version.to_string(),
        name: layer.name,
        type_field: layer.layer_type,
        library_path: layer.library_path,
        api_version: layer.api_version,
        implementation_version: layer.implementation_version,
        description: layer.description,
        kind,
        manifest_path: path.to_path_buf(),
        disable_environment,
        enable_environment,
        settings: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_manifest(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parses_a_complete_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            &dir,
            "overlay.json",
            r#"{
                "file_format_version": "1.1.2",
                "layer": {
                    "name": "VK_LAYER_LUNARG_overlay",
                    "type": "GLOBAL",
                    "library_path": "./liboverlay.so",
                    "api_version": "1.2.141",
                    "implementation_version": "2",
                    "description": "LunarG HUD layer",
                    "disable_environment": { "DISABLE_LAYER_OVERLAY_1": "1" },
                    "enable_environment": { "ENABLE_LAYER_OVERLAY_1": "1" }
                }
            }"#,
        );

        let descriptor = LayerDescriptor::parse(&path, LayerKind::Explicit).unwrap();
        assert_eq!(descriptor.file_format_version, "1.1.2");
        assert_eq!(descriptor.name, "VK_LAYER_LUNARG_overlay");
        assert_eq!(descriptor.type_field, "GLOBAL");
        assert_eq!(descriptor.library_path, "./liboverlay.so");
        assert_eq!(descriptor.api_version, "1.2.141");
        assert_eq!(descriptor.implementation_version, "2");
        assert_eq!(descriptor.description, "LunarG HUD layer");
        assert_eq!(descriptor.kind, LayerKind::Explicit);
        assert_eq!(descriptor.manifest_path, path);
        assert_eq!(
            descriptor.disable_environment.as_deref(),
            Some("DISABLE_LAYER_OVERLAY_1")
        );
        assert_eq!(
            descriptor.enable_environment.as_deref(),
            Some("ENABLE_LAYER_OVERLAY_1")
        );
        assert!(descriptor.settings.is_empty());
    }

    #[test]
    fn missing_fields_default_to_empty_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            &dir,
            "bare.json",
            r#"{ "layer": { "name": "VK_LAYER_TEST_bare" } }"#,
        );

        let descriptor = LayerDescriptor::parse(&path, LayerKind::Implicit).unwrap();
        assert_eq!(descriptor.name, "VK_LAYER_TEST_bare");
        assert_eq!(descriptor.file_format_version, "");
        assert_eq!(descriptor.library_path, "");
        assert_eq!(descriptor.api_version, "");
        assert_eq!(descriptor.description, "");
        assert_eq!(descriptor.disable_environment, None);
        assert_eq!(descriptor.enable_environment, None);
    }

    #[test]
    fn manifest_without_layer_object_yields_empty_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(&dir, "odd.json", r#"{ "file_format_version": "1.0.0" }"#);

        let descriptor = LayerDescriptor::parse(&path, LayerKind::Explicit).unwrap();
        assert_eq!(descriptor.file_format_version, "1.0.0");
        assert_eq!(descriptor.name, "");
        assert_eq!(descriptor.library_path, "");

        let all = parse_manifest(&path, LayerKind::Explicit).unwrap();
        assert!(all.is_empty());
    }

    #[test]
    fn malformed_json_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(&dir, "broken.json", "{ not json");

        match LayerDescriptor::parse(&path, LayerKind::Explicit) {
            Err(Error::Format { .. }) => {}
            other => panic!("expected a format error, got {:?}", other.map(|d| d.name)),
        }
    }

    #[test]
    fn empty_document_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();

        for contents in ["{}", "[]", "null", "\"layer\""] {
            let path = write_manifest(&dir, "empty.json", contents);
            assert!(
                matches!(LayerDescriptor::parse(&path, LayerKind::Explicit), Err(Error::Format { .. })),
                "{contents} should be rejected"
            );
        }
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let path = Path::new("/this/path/does/not/exist.json");
        assert!(matches!(
            LayerDescriptor::parse(path, LayerKind::Custom),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn multi_layer_manifest_yields_one_descriptor_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            &dir,
            "bundle.json",
            r#"{
                "file_format_version": "1.2.0",
                "layers": [
                    { "name": "VK_LAYER_TEST_first", "library_path": "./libfirst.so" },
                    { "name": "VK_LAYER_TEST_second", "library_path": "./libsecond.so" }
                ]
            }"#,
        );

        let descriptors = parse_manifest(&path, LayerKind::Implicit).unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "VK_LAYER_TEST_first");
        assert_eq!(descriptors[1].name, "VK_LAYER_TEST_second");
        assert_eq!(descriptors[0].file_format_version, "1.2.0");
        assert_eq!(descriptors[1].kind, LayerKind::Implicit);
    }
}
