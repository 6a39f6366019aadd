use crate::definitions::LoaderInfo;
use crate::error::{Error, Result};
use ash::vk;

/// Loaders older than this apply layer overrides to every Vulkan application
/// on the machine instead of per-application.
pub const MIN_OVERRIDE_LOADER_VERSION: u32 = vk::make_api_version(0, 1, 2, 141);

/// Loads the system Vulkan loader and asks it for its instance version.
///
/// Fails only when no loader library can be found. A loader too old to have
/// `vkEnumerateInstanceVersion` is reported as 1.0.
pub fn probe_loader() -> Result<LoaderInfo> {
    let entry = unsafe { ash::Entry::load() }.map_err(|err| Error::Loader(err.to_string()))?;
    probe_entry(&entry)
}

fn probe_entry(entry: &ash::Entry) -> Result<LoaderInfo> {
    let version = match unsafe { entry.try_enumerate_instance_version() } {
        Ok(Some(version)) => version,
        Ok(None) => vk::API_VERSION_1_0,
        Err(err) => return Err(Error::Loader(format!("{err:?}"))),
    };
    Ok(loader_info(version))
}

fn loader_info(version: u32) -> LoaderInfo {
    LoaderInfo {
        version,
        major: vk::api_version_major(version),
        minor: vk::api_version_minor(version),
        patch: vk::api_version_patch(version),
        supports_override: version >= MIN_OVERRIDE_LOADER_VERSION,
    }
}
