//! API registry data - pure DOP.
//!
//! Versioned interface tables keyed by `(name, major, minor)` (component
//! D). No methods; transformations live in api_registry_operations.rs.

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;

/// `{name, major, minor, patch}`. Two descriptors match when names equal
/// and majors equal and the candidate's minor >= requested minor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiDescriptor {
    pub name: String,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ApiDescriptor {
    pub fn new(name: impl Into<String>, major: u32, minor: u32, patch: u32) -> Self {
        Self {
            name: name.into(),
            major,
            minor,
            patch,
        }
    }
}

/// A stable heap cell holding the current interface table, or `None` if
/// removed. Consumers clone the `Arc` once and observe replacements
/// in-place on every subsequent `read()` — the cell's address never
/// changes, which is what gives hot reload its pointer stability.
#[derive(Clone)]
pub struct ApiSlot(pub(super) Arc<RwLock<Option<Arc<dyn Any + Send + Sync>>>>);

impl ApiSlot {
    /// Read the current pointee, downcast to `T`. `None` if the slot was
    /// removed or never held a `T`.
    pub fn read<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let guard = self.0.read();
        guard.as_ref().and_then(|table| table.clone().downcast::<T>().ok())
    }
}

pub(super) struct ApiSlotEntry {
    pub name: String,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub slot: ApiSlot,
}

/// All registered API slots. A `(name, major)` pair normally maps to
/// exactly one entry, mutated in place on re-registration; entries only
/// multiply when a lower-minor registration follows a higher-minor one
/// (see `set` in api_registry_operations.rs).
#[derive(Default)]
pub struct ApiRegistryData {
    pub(super) entries: Vec<ApiSlotEntry>,
}
