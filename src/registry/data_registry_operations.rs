//! Data registry operations - pure DOP functions.
//!
//! Untyped `set`/`get` by string key (§6), with a typed convenience layer
//! on top via downcasting. This is the only state an extension may keep
//! across a reload (§9): `unload(reload=true)` publishes state here,
//! `load(reload=true)` reads it back out.

use std::any::Any;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::data_registry_data::DataRegistryData;

pub fn create_data_registry() -> DataRegistryData {
    DataRegistryData {
        entries: FxHashMap::default(),
    }
}

/// Publish `value` under `key`, overwriting any prior value.
pub fn data_set<T: Any + Send + Sync>(data: &mut DataRegistryData, key: &str, value: T) {
    log::debug!("[data_registry] set '{}'", key);
    data.entries.insert(key.to_string(), Arc::new(value));
}

/// Fetch the value published under `key`, if any, downcast to `T`.
///
/// Returns `None` both when the key is absent and when it is present but
/// holds a different type — both are "not found" from the caller's
/// perspective, matching the untyped contract of §6.
pub fn data_get<T: Any + Send + Sync>(data: &DataRegistryData, key: &str) -> Option<Arc<T>> {
    data.entries.get(key).and_then(|entry| {
        let entry = entry.clone();
        (entry as Arc<dyn Any + Send + Sync>).downcast::<T>().ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let mut registry = create_data_registry();
        data_set(&mut registry, "weather_state", 42u32);
        let value = data_get::<u32>(&registry, "weather_state");
        assert_eq!(value.map(|v| *v), Some(42));
    }

    #[test]
    fn test_get_missing_key() {
        let registry = create_data_registry();
        assert!(data_get::<u32>(&registry, "nope").is_none());
    }

    #[test]
    fn test_get_wrong_type_is_none() {
        let mut registry = create_data_registry();
        data_set(&mut registry, "k", 1u32);
        assert!(data_get::<String>(&registry, "k").is_none());
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let mut registry = create_data_registry();
        data_set(&mut registry, "k", 1u32);
        data_set(&mut registry, "k", 2u32);
        assert_eq!(data_get::<u32>(&registry, "k").map(|v| *v), Some(2));
    }
}
