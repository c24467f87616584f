//! Shared library loading, wrapping `libloading` behind the narrow surface
//! the extension registry (§4.E) actually needs: open, resolve a symbol,
//! stat the backing file's mtime.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use libloading::{Library, Symbol};

use crate::error::{PilotLightError, PilotLightResult};

/// An opened shared library plus the path it was opened from, so the
/// extension registry can re-stat it for reload polling without keeping
/// the path separately.
pub struct LoadedLibrary {
    pub path: PathBuf,
    library: Library,
}

impl LoadedLibrary {
    /// Resolve a `extern "C" fn(*mut c_void, bool)`-shaped entry point by
    /// name. Extensions export `pl_load_ext`/`pl_unload_ext` with this
    /// shape (§6).
    ///
    /// # Safety
    /// The caller must ensure `name` refers to a symbol with the expected
    /// signature; an incorrect signature is undefined behaviour, same as
    /// `libloading::Library::get`.
    pub unsafe fn resolve_entry_point(
        &self,
        name: &str,
    ) -> PilotLightResult<extern "C" fn(*mut std::ffi::c_void, bool)> {
        let symbol: Symbol<extern "C" fn(*mut std::ffi::c_void, bool)> = self
            .library
            .get(name.as_bytes())
            .map_err(|e| PilotLightError::LibraryLoadFailure {
                library: self.path.display().to_string(),
                reason: format!("symbol '{}' not found: {}", name, e),
            })?;
        Ok(*symbol)
    }
}

/// Open a shared library at `path`.
pub fn load_library(path: &Path) -> PilotLightResult<LoadedLibrary> {
    // SAFETY: loading an extension necessarily runs its static
    // initializers and trusts its `pl_load_ext`/`pl_unload_ext` contract;
    // this is inherent to dynamic extension loading, not specific to this
    // call site.
    let library = unsafe { Library::new(path) }.map_err(|e| PilotLightError::LibraryLoadFailure {
        library: path.display().to_string(),
        reason: e.to_string(),
    })?;
    log::info!("[platform::library] loaded {}", path.display());
    Ok(LoadedLibrary {
        path: path.to_path_buf(),
        library,
    })
}

/// Query a file's modification time for reload polling (§4.E per-frame
/// `poll()`).
pub fn file_mtime(path: &Path) -> PilotLightResult<SystemTime> {
    let metadata = std::fs::metadata(path).map_err(|e| PilotLightError::IoError {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    metadata.modified().map_err(|e| PilotLightError::IoError {
        path: path.display().to_string(),
        error: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_mtime_missing_file_errors() {
        let result = file_mtime(Path::new("/nonexistent/path/to/nothing.so"));
        assert!(result.is_err());
    }

    #[test]
    fn test_file_mtime_of_tempfile() {
        let file = tempfile::NamedTempFile::new().expect("create tempfile");
        let mtime = file_mtime(file.path());
        assert!(mtime.is_ok());
    }
}
