//! The registry layer: process-wide singletons every extension shares
//! (components C, D, E).

pub mod api_registry_data;
pub mod api_registry_operations;
pub mod data_registry_data;
pub mod data_registry_operations;
pub mod extension_registry_data;
pub mod extension_registry_operations;

pub use api_registry_data::{ApiDescriptor, ApiRegistryData, ApiSlot};
pub use api_registry_operations::{create_api_registry, get, get_latest, remove, set};
pub use data_registry_data::DataRegistryData;
pub use data_registry_operations::{create_data_registry, data_get, data_set};
pub use extension_registry_data::{ExtensionRecord, ExtensionRegistryData};
pub use extension_registry_operations::{
    create_extension_registry, load_extension, poll_reloads, unload_extension,
};
