//! Extension registry operations - pure DOP functions (§4.E).
//!
//! Entry points are resolved as `extern "C" fn(*mut c_void, bool)` and
//! called with a type-erased pointer to whatever API registry
//! representation the host and its extensions agree on; this crate's own
//! `ApiRegistryData` is one valid choice but the registry does not
//! require it.

use std::ffi::c_void;
use std::path::Path;

use crate::error::{PilotLightError, PilotLightResult};
use crate::platform::library::{file_mtime, load_library};

use super::extension_registry_data::{
    ExtensionRecord, ExtensionRegistryData, DEFAULT_LOAD_FUNC_NAME, DEFAULT_UNLOAD_FUNC_NAME,
};

pub fn create_extension_registry() -> ExtensionRegistryData {
    ExtensionRegistryData::default()
}

/// Open `library_name`, resolve its load/unload entry points (defaulting
/// to `pl_load_ext`/`pl_unload_ext`), and call `load(api_registry,
/// reload=false)`. Records the file's mtime if `reloadable`.
pub fn load_extension(
    data: &mut ExtensionRegistryData,
    library_name: &str,
    load_func_name: Option<&str>,
    unload_func_name: Option<&str>,
    reloadable: bool,
    api_registry: *mut c_void,
) -> PilotLightResult<()> {
    let load_func_name = load_func_name.unwrap_or(DEFAULT_LOAD_FUNC_NAME).to_string();
    let unload_func_name = unload_func_name
        .unwrap_or(DEFAULT_UNLOAD_FUNC_NAME)
        .to_string();

    let path = Path::new(library_name);
    let handle = load_library(path)?;
    let load_fn = unsafe { handle.resolve_entry_point(&load_func_name)? };

    let last_mtime = if reloadable {
        file_mtime(path).ok()
    } else {
        None
    };

    load_fn(api_registry, false);
    log::info!("[extension_registry] loaded '{}' (reloadable={})", library_name, reloadable);

    data.records.push(ExtensionRecord {
        library_name: library_name.to_string(),
        load_func_name,
        unload_func_name,
        reloadable,
        handle: Some(handle),
        last_mtime,
        failed: false,
    });
    Ok(())
}

/// Call `unload(api_registry, reload=false)` and drop the library handle.
pub fn unload_extension(
    data: &mut ExtensionRegistryData,
    library_name: &str,
    api_registry: *mut c_void,
) -> PilotLightResult<()> {
    let index = data
        .records
        .iter()
        .position(|r| r.library_name == library_name)
        .ok_or_else(|| PilotLightError::NotFound {
            what: "extension".to_string(),
            key: library_name.to_string(),
        })?;

    let record = &mut data.records[index];
    if let Some(handle) = &record.handle {
        let unload_fn = unsafe { handle.resolve_entry_point(&record.unload_func_name)? };
        unload_fn(api_registry, false);
    }
    data.records.remove(index);
    log::info!("[extension_registry] unloaded '{}'", library_name);
    Ok(())
}

/// Per-frame poll (§4.E): for each reloadable record whose backing file's
/// mtime has advanced, reopen it and swap it in. The replacement library
/// is opened and its symbols resolved *before* anything about the old
/// library is disturbed, so a bad reload leaves the previous copy
/// running — best-effort continuity per §4.E's failure semantics.
pub fn poll_reloads(data: &mut ExtensionRegistryData, api_registry: *mut c_void) {
    for record in data.records.iter_mut().filter(|r| r.reloadable) {
        let Some(handle) = record.handle.as_ref() else {
            continue;
        };
        let path = handle.path.clone();

        let mtime = match file_mtime(&path) {
            Ok(m) => m,
            Err(e) => {
                log::warn!(
                    "[extension_registry] could not stat '{}' during poll: {}",
                    record.library_name,
                    e
                );
                continue;
            }
        };
        if record.last_mtime == Some(mtime) {
            continue;
        }

        log::info!(
            "[extension_registry] reload detected for '{}'",
            record.library_name
        );

        let new_handle = match load_library(&path) {
            Ok(h) => h,
            Err(e) => {
                log::error!(
                    "[extension_registry] reload of '{}' failed to open: {}",
                    record.library_name,
                    e
                );
                record.failed = true;
                continue;
            }
        };
        let new_load_fn = match unsafe { new_handle.resolve_entry_point(&record.load_func_name) } {
            Ok(f) => f,
            Err(e) => {
                log::error!(
                    "[extension_registry] reload of '{}' failed to resolve '{}': {}",
                    record.library_name,
                    record.load_func_name,
                    e
                );
                record.failed = true;
                continue;
            }
        };

        // Replacement verified loadable: now retire the old copy.
        if let Some(old_handle) = record.handle.as_ref() {
            match unsafe { old_handle.resolve_entry_point(&record.unload_func_name) } {
                Ok(unload_fn) => unload_fn(api_registry, true),
                Err(e) => log::warn!(
                    "[extension_registry] '{}' had no unload entry point during reload: {}",
                    record.library_name,
                    e
                ),
            }
        }

        new_load_fn(api_registry, true);
        record.handle = Some(new_handle);
        record.last_mtime = Some(mtime);
        record.failed = false;
        log::info!("[extension_registry] reloaded '{}'", record.library_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unload_missing_extension_not_found() {
        let mut registry = create_extension_registry();
        let result = unload_extension(&mut registry, "nope.so", std::ptr::null_mut());
        assert!(matches!(result, Err(PilotLightError::NotFound { .. })));
    }

    #[test]
    fn test_load_missing_library_is_load_failure() {
        let mut registry = create_extension_registry();
        let result = load_extension(
            &mut registry,
            "/nonexistent/extension.so",
            None,
            None,
            false,
            std::ptr::null_mut(),
        );
        assert!(matches!(
            result,
            Err(PilotLightError::LibraryLoadFailure { .. })
        ));
    }

    #[test]
    fn test_poll_skips_non_reloadable_records() {
        // A record with no handle and reloadable=false must be a no-op,
        // not a panic, even though it can never be polled successfully.
        let mut registry = create_extension_registry();
        registry.records.push(ExtensionRecord {
            library_name: "static.so".to_string(),
            load_func_name: DEFAULT_LOAD_FUNC_NAME.to_string(),
            unload_func_name: DEFAULT_UNLOAD_FUNC_NAME.to_string(),
            reloadable: false,
            handle: None,
            last_mtime: None,
            failed: false,
        });
        poll_reloads(&mut registry, std::ptr::null_mut());
        assert!(!registry.records[0].failed);
    }
}
