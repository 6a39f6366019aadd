//! Windows discovery and toggling. Layers are registered as values under the
//! Khronos registry keys, where each value name is a path to a manifest, and
//! implicit layers are disabled persistently by planting their disable
//! variable in the user environment.

use crate::definitions::{LayerKind, ScanReport};
use crate::error::{Error, Result};
use std::ffi::CString;
use std::path::PathBuf;
use windows::core::{s, PCSTR, PSTR};
use windows::Win32::Foundation::ERROR_FILE_NOT_FOUND;
use windows::Win32::System::Registry::*;

const LAYER_KEYS: [(HKEY, PCSTR, LayerKind); 4] = [
    (
        HKEY_LOCAL_MACHINE,
        s!("SOFTWARE\\Khronos\\Vulkan\\ImplicitLayers"),
        LayerKind::Implicit,
    ),
    (
        HKEY_LOCAL_MACHINE,
        s!("SOFTWARE\\Khronos\\Vulkan\\ExplicitLayers"),
        LayerKind::Explicit,
    ),
    (
        HKEY_CURRENT_USER,
        s!("SOFTWARE\\Khronos\\Vulkan\\ImplicitLayers"),
        LayerKind::Implicit,
    ),
    (
        HKEY_CURRENT_USER,
        s!("SOFTWARE\\Khronos\\Vulkan\\ExplicitLayers"),
        LayerKind::Explicit,
    ),
];

/// Enumerates the manifest paths registered under the four Khronos layer
/// keys. A key that does not exist counts as a skipped location; any other
/// registry failure is recorded in the report and enumeration continues.
pub fn collect_layer_manifests(report: &mut ScanReport) -> Vec<(PathBuf, LayerKind)> {
    let mut manifests = Vec::new();
    for (root, subkey, kind) in LAYER_KEYS {
        match enumerate_value_names(root, subkey) {
            Ok(names) => {
                report.paths_visited += 1;
                manifests.extend(names.into_iter().map(|name| (PathBuf::from(name), kind)));
            }
            Err(err) if err.code() == ERROR_FILE_NOT_FOUND.to_hresult() => {
                report.paths_skipped += 1;
            }
            Err(err) => {
                report.paths_skipped += 1;
                report
                    .errors
                    .push(format!("could not enumerate layer key: {}", err.message()));
            }
        }
    }
    manifests
}

fn enumerate_value_names(root: HKEY, subkey: PCSTR) -> windows::core::Result<Vec<String>> {
    let mut hkey = HKEY::default();
    let mut num_values = 0;
    let mut longest_name_length = 0;

    unsafe {
        RegOpenKeyExA(root, subkey, 0, KEY_READ, &mut hkey).ok()?;
        RegQueryInfoKeyA(
            hkey,
            PSTR::null(),
            None,
            None,
            None,
            None,
            None,
            Some(&mut num_values),
            Some(&mut longest_name_length),
            None,
            None,
            None,
        )
        .ok()?;

        let mut names = Vec::with_capacity(num_values as usize);
        let mut name_buffer = vec![0u8; longest_name_length as usize + 1];

        for index in 0..num_values {
            let mut name_length = name_buffer.len() as u32;
            RegEnumValueA(
                hkey,
                index,
                PSTR(name_buffer.as_mut_ptr()),
                &mut name_length,
                None,
                None,
                None,
                None,
            )
            .ok()?;
            names.push(String::from_utf8_lossy(&name_buffer[..name_length as usize]).into_owned());
        }

        let _ = RegCloseKey(hkey);
        Ok(names)
    }
}

/// Persistently sets an environment variable in the user environment, the
/// mechanism the loader honors for disabling implicit layers. Running
/// applications only pick it up after they restart.
pub fn set_user_environment(key: &str) -> Result<()> {
    let name = environment_value_name(key)?;
    unsafe {
        let mut hkey = HKEY::default();
        RegOpenKeyExA(HKEY_CURRENT_USER, s!("Environment"), 0, KEY_SET_VALUE, &mut hkey)
            .ok()
            .map_err(registry_error)?;
        let result = RegSetValueExA(
            hkey,
            PCSTR(name.as_ptr() as *const u8),
            0,
            REG_SZ,
            Some(b"1\0"),
        )
        .ok();
        let _ = RegCloseKey(hkey);
        result.map_err(registry_error)
    }
}

/// Removes a variable previously planted by [`set_user_environment`].
/// Removing a variable that is not there succeeds.
pub fn remove_user_environment(key: &str) -> Result<()> {
    let name = environment_value_name(key)?;
    unsafe {
        let mut hkey = HKEY::default();
        RegOpenKeyExA(HKEY_CURRENT_USER, s!("Environment"), 0, KEY_SET_VALUE, &mut hkey)
            .ok()
            .map_err(registry_error)?;
        let result = match RegDeleteValueA(hkey, PCSTR(name.as_ptr() as *const u8)) {
            err if err == ERROR_FILE_NOT_FOUND => Ok(()),
            other => other.ok().map_err(registry_error),
        };
        let _ = RegCloseKey(hkey);
        result
    }
}

/// Value names currently set in the user environment, for reporting which
/// disable variables are already planted.
pub fn user_environment_keys() -> Result<Vec<String>> {
    enumerate_value_names(HKEY_CURRENT_USER, s!("Environment")).map_err(registry_error)
}

fn environment_value_name(key: &str) -> Result<CString> {
    CString::new(key)
        .map_err(|_| Error::Config(format!("invalid environment variable name '{key}'")))
}

fn registry_error(err: windows::core::Error) -> Error {
    Error::Config(format!("registry access failed: {}", err.message()))
}
