use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Local application preferences, unrelated to the system's Vulkan state.
///
/// Persisted as a flat JSON object. Unknown keys in the file are ignored and
/// missing keys fall back to defaults, so old and new builds can share one
/// settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub launch_app: String,
    pub launch_args: String,
    pub working_dir: String,
    pub log_file: String,
    pub log_stdout: bool,
    pub intro_notice_dismissed: bool,
    pub loader_warning_dismissed: bool,
}

impl AppSettings {
    /// Loads settings from `path`, falling back to defaults when the file
    /// does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(file = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|source| Error::io(path, source))?;
        serde_json::from_str(&text).map_err(|err| Error::format(path, err.to_string()))
    }

    /// Writes settings to `path` via a temp file and rename, so a crash
    /// mid-write cannot leave a truncated settings file behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| Error::io(parent, source))?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|err| Error::format(path, err.to_string()))?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, text).map_err(|source| Error::io(&temp_path, source))?;
        fs::rename(&temp_path, path).map_err(|source| Error::io(path, source))
    }

    /// Updates one scalar by key. Used by the command line front-end.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "launch_app" => self.launch_app = value.to_string(),
            "launch_args" => self.launch_args = value.to_string(),
            "working_dir" => self.working_dir = value.to_string(),
            "log_file" => self.log_file = value.to_string(),
            "log_stdout" => self.log_stdout = parse_bool(key, value)?,
            "intro_notice_dismissed" => self.intro_notice_dismissed = parse_bool(key, value)?,
            "loader_warning_dismissed" => self.loader_warning_dismissed = parse_bool(key, value)?,
            _ => return Err(Error::Config(format!("unknown setting '{key}'"))),
        }
        Ok(())
    }

    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("launch_app", self.launch_app.clone()),
            ("launch_args", self.launch_args.clone()),
            ("working_dir", self.working_dir.clone()),
            ("log_file", self.log_file.clone()),
            ("log_stdout", self.log_stdout.to_string()),
            (
                "intro_notice_dismissed",
                self.intro_notice_dismissed.to_string(),
            ),
            (
                "loader_warning_dismissed",
                self.loader_warning_dismissed.to_string(),
            ),
        ]
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!(
            "setting '{key}' expects a boolean, got '{value}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load_preserve_every_scalar() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.json");

        let mut settings = AppSettings::default();
        settings.launch_app = "/usr/bin/vkcube".to_string();
        settings.launch_args = "--validate --size 512".to_string();
        settings.working_dir = "/home/dev/demos".to_string();
        settings.log_file = "/tmp/vkcube.log".to_string();
        settings.log_stdout = true;

        settings.save(&file).unwrap();
        assert_eq!(AppSettings::load(&file).unwrap(), settings);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AppSettings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, AppSettings::default());
    }

    #[test]
    fn unknown_keys_in_the_file_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.json");
        fs::write(
            &file,
            r#"{ "launch_app": "vkcube", "retired_option": 7 }"#,
        )
        .unwrap();

        let loaded = AppSettings::load(&file).unwrap();
        assert_eq!(loaded.launch_app, "vkcube");
        assert_eq!(loaded.launch_args, "");
    }

    #[test]
    fn corrupt_settings_file_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.json");
        fs::write(&file, "launch_app=vkcube").unwrap();

        assert!(matches!(
            AppSettings::load(&file),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn set_updates_scalars_and_rejects_unknown_keys() {
        let mut settings = AppSettings::default();
        settings.set("launch_app", "vkcube").unwrap();
        settings.set("log_stdout", "true").unwrap();
        assert_eq!(settings.launch_app, "vkcube");
        assert!(settings.log_stdout);

        assert!(settings.set("no_such_key", "x").is_err());
        assert!(settings.set("log_stdout", "maybe").is_err());
    }

    #[test]
    fn dismissal_flags_survive_a_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.json");

        let mut settings = AppSettings::default();
        settings.intro_notice_dismissed = true;
        settings.loader_warning_dismissed = true;
        settings.save(&file).unwrap();

        let loaded = AppSettings::load(&file).unwrap();
        assert!(loaded.intro_notice_dismissed);
        assert!(loaded.loader_warning_dismissed);
    }
}
