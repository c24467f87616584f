//! Extension registry data - pure DOP.
//!
//! Dynamic library lifecycle with hot reload (component E). No methods;
//! transformations live in extension_registry_operations.rs.

use std::time::SystemTime;

use crate::platform::library::LoadedLibrary;

pub const DEFAULT_LOAD_FUNC_NAME: &str = "pl_load_ext";
pub const DEFAULT_UNLOAD_FUNC_NAME: &str = "pl_unload_ext";

pub struct ExtensionRecord {
    pub library_name: String,
    pub load_func_name: String,
    pub unload_func_name: String,
    pub reloadable: bool,
    pub handle: Option<LoadedLibrary>,
    pub last_mtime: Option<SystemTime>,
    /// Set when a reload attempt failed; the record keeps its previous
    /// handle and is reported, but polling does not retry automatically.
    pub failed: bool,
}

#[derive(Default)]
pub struct ExtensionRegistryData {
    pub records: Vec<ExtensionRecord>,
}
