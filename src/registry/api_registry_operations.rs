//! API registry operations - pure DOP functions (§4.D).
//!
//! Registration happens on a single control thread during startup and
//! reload callbacks (§5); no locking is specified here beyond what each
//! `ApiSlot` needs to let readers safely observe in-place replacement.

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;

use super::api_registry_data::{ApiDescriptor, ApiRegistryData, ApiSlot, ApiSlotEntry};

pub fn create_api_registry() -> ApiRegistryData {
    ApiRegistryData::default()
}

/// Register `table` under `descriptor`. If an entry with identical
/// `(name, major)` exists whose `minor <= descriptor.minor`, its pointee
/// is replaced in place and its recorded `(minor, patch)` updated;
/// otherwise a new slot is allocated. Returns the slot, stable for the
/// life of the process.
pub fn set<T: Any + Send + Sync>(
    data: &mut ApiRegistryData,
    descriptor: ApiDescriptor,
    table: T,
) -> ApiSlot {
    if let Some(entry) = data
        .entries
        .iter_mut()
        .find(|e| e.name == descriptor.name && e.major == descriptor.major && e.minor <= descriptor.minor)
    {
        log::info!(
            "[api_registry] replacing '{}' v{}.{}.{} -> v{}.{}.{}",
            descriptor.name,
            descriptor.major,
            entry.minor,
            entry.patch,
            descriptor.major,
            descriptor.minor,
            descriptor.patch
        );
        entry.minor = descriptor.minor;
        entry.patch = descriptor.patch;
        *entry.slot.0.write() = Some(Arc::new(table));
        return entry.slot.clone();
    }

    log::info!(
        "[api_registry] registering new slot '{}' v{}.{}.{}",
        descriptor.name,
        descriptor.major,
        descriptor.minor,
        descriptor.patch
    );
    let slot = ApiSlot(Arc::new(RwLock::new(Some(Arc::new(table) as Arc<dyn Any + Send + Sync>))));
    data.entries.push(ApiSlotEntry {
        name: descriptor.name,
        major: descriptor.major,
        minor: descriptor.minor,
        patch: descriptor.patch,
        slot: slot.clone(),
    });
    slot
}

/// Find the slot matching `descriptor` exactly on name+major with
/// `minor >= descriptor.minor`; among matches, the highest `(minor,
/// patch)` wins.
pub fn get(data: &ApiRegistryData, descriptor: &ApiDescriptor) -> Option<ApiSlot> {
    data.entries
        .iter()
        .filter(|e| e.name == descriptor.name && e.major == descriptor.major && e.minor >= descriptor.minor)
        .max_by_key(|e| (e.minor, e.patch))
        .map(|e| e.slot.clone())
}

/// The highest `(minor, patch)` slot registered under `name`+`major`,
/// regardless of requested minor.
pub fn get_latest(data: &ApiRegistryData, name: &str, major: u32) -> Option<ApiSlot> {
    data.entries
        .iter()
        .filter(|e| e.name == name && e.major == major)
        .max_by_key(|e| (e.minor, e.patch))
        .map(|e| e.slot.clone())
}

/// Clear a slot's pointee, keeping the slot itself (and its entry)
/// around so existing readers observe `None` rather than a dangling
/// reference.
pub fn remove(slot: &ApiSlot) {
    *slot.0.write() = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct VTable {
        tag: &'static str,
    }

    #[test]
    fn test_set_then_get_latest_same_slot_address() {
        let mut registry = create_api_registry();
        let slot_a = set(
            &mut registry,
            ApiDescriptor::new("pl_terrain", 1, 0, 0),
            VTable { tag: "A" },
        );

        let slot_b = set(
            &mut registry,
            ApiDescriptor::new("pl_terrain", 1, 1, 0),
            VTable { tag: "B" },
        );

        // Scenario S1: same slot, pointee replaced in place.
        assert!(Arc::ptr_eq(&slot_a.0, &slot_b.0));
        let latest = get_latest(&registry, "pl_terrain", 1).unwrap();
        assert_eq!(latest.read::<VTable>().unwrap().tag, "B");
    }

    #[test]
    fn test_get_respects_minor_floor() {
        let mut registry = create_api_registry();
        set(
            &mut registry,
            ApiDescriptor::new("pl_ecs", 2, 1, 0),
            VTable { tag: "v2.1" },
        );

        assert!(get(&registry, &ApiDescriptor::new("pl_ecs", 2, 5, 0)).is_none());
        assert!(get(&registry, &ApiDescriptor::new("pl_ecs", 2, 0, 0)).is_some());
    }

    #[test]
    fn test_remove_nulls_pointee_keeps_slot() {
        let mut registry = create_api_registry();
        let slot = set(
            &mut registry,
            ApiDescriptor::new("pl_ecs", 1, 0, 0),
            VTable { tag: "A" },
        );
        remove(&slot);
        assert!(slot.read::<VTable>().is_none());
        // The slot handle itself is still a valid, dereferenceable handle.
        assert!(get_latest(&registry, "pl_ecs", 1).is_some());
    }

    #[test]
    fn test_version_mismatch_returns_none() {
        let mut registry = create_api_registry();
        set(
            &mut registry,
            ApiDescriptor::new("pl_ecs", 1, 0, 0),
            VTable { tag: "A" },
        );
        assert!(get(&registry, &ApiDescriptor::new("pl_ecs", 1, 9, 0)).is_none());
    }
}
