//! Pilot Light: a hot-reloadable runtime core.
//!
//! Three pieces compose into an embedding application:
//!
//! - [`registry`]: the API/data/extension registries that give hot-reloaded
//!   shared libraries a stable address to call back into (§4.E).
//! - [`ecs`]: a sparse-set entity-component store with fixed-phase system
//!   scheduling (§4.F).
//! - [`terrain`]: the CDLOD heightmap preprocessor and streaming chunk
//!   file format (§4.G, §4.H).
//!
//! [`platform`] and [`memory`] are the ambient shims these modules are
//! built on (virtual memory, atomics, dynamic library loading, allocation
//! tracking); [`config`] and [`error`] are the configuration and error
//! types shared across all of them.
//!
//! This crate is a library only: consumers embed it and supply their own
//! host binary, extensions, and renderer.

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;
pub mod platform;
pub mod registry;
pub mod terrain;

pub use config::PilotLightConfig;
pub use error::{PilotLightError, PilotLightResult};

/// Everything one embedding application typically owns: the extension/API
/// registries, the ECS world, and the configuration they were built from.
/// Extensions reach back into the registries (not this struct) through
/// the `ApiSlot`s they were handed at load time, so hot-reloading an
/// extension never needs to touch `Runtime` itself.
pub struct Runtime {
    pub config: PilotLightConfig,
    pub api_registry: registry::ApiRegistryData,
    pub data_registry: registry::DataRegistryData,
    pub extension_registry: registry::ExtensionRegistryData,
    pub world: ecs::World,
}

impl Runtime {
    pub fn new(config: PilotLightConfig) -> PilotLightResult<Self> {
        config.validate()?;
        log::info!("[pilot_light] starting runtime");
        Ok(Self {
            world: ecs::World::new(config.ecs.initial_entity_capacity),
            api_registry: registry::create_api_registry(),
            data_registry: registry::create_data_registry(),
            extension_registry: registry::create_extension_registry(),
            config,
        })
    }

    fn api_registry_ptr(&mut self) -> *mut std::ffi::c_void {
        &mut self.api_registry as *mut registry::ApiRegistryData as *mut std::ffi::c_void
    }

    /// Loads `library_name`, reusing §4.E's best-effort semantics: on
    /// failure the error is returned to the caller rather than aborting
    /// any other extension the embedder is loading in the same pass.
    pub fn load_extension(&mut self, library_name: &str, reloadable: bool) -> PilotLightResult<()> {
        let api_registry = self.api_registry_ptr();
        registry::load_extension(&mut self.extension_registry, library_name, None, None, reloadable, api_registry)
    }

    /// Polls every reloadable extension for a changed mtime and swaps it
    /// in (§4.E). Call this once per frame or on whatever cadence
    /// `config.extensions.reload_poll_interval_ms` suggests.
    pub fn poll_reloads(&mut self) {
        let api_registry = self.api_registry_ptr();
        registry::poll_reloads(&mut self.extension_registry, api_registry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_construction_validates_config() {
        let mut config = PilotLightConfig::default();
        config.ecs.initial_entity_capacity = 0;
        assert!(Runtime::new(config).is_err());
    }

    #[test]
    fn test_runtime_construction_succeeds_with_default_config() {
        let runtime = Runtime::new(PilotLightConfig::default()).unwrap();
        assert_eq!(runtime.config.ecs.initial_entity_capacity, 1024);
    }
}
