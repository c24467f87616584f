//! Data registry data - pure DOP.
//!
//! Process-wide typed key→pointer map for cross-extension singletons
//! (component C). No methods; transformations live in
//! data_registry_operations.rs.

use std::any::Any;
use std::sync::Arc;

use rustc_hash::FxHashMap;

pub struct DataRegistryData {
    pub entries: FxHashMap<String, Arc<dyn Any + Send + Sync>>,
}
