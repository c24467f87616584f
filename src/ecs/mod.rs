//! ECS core (component F): entity identity, component storage,
//! hierarchical updates, and ordered system execution.

pub mod component;
pub mod entity;
pub mod hierarchy;
pub mod system;

pub use component::{ComponentLibraryData, TypeKey};
pub use entity::EntityHandle;
pub use hierarchy::{HierarchyComponent, TransformComponent};
pub use system::{SystemPhase, SystemSchedulerData};

use crate::error::{PilotLightError, PilotLightResult};

/// Aggregates the independently-testable ECS pieces (entity allocation,
/// component library, hierarchy state, system scheduler) behind the one
/// operation that genuinely needs all of them together: destroying an
/// entity must also tear down its components.
pub struct World {
    pub entities: entity::EntityAllocatorData,
    pub components: component::ComponentLibraryData,
    pub hierarchy: hierarchy::HierarchyData,
    pub scheduler: system::SystemSchedulerData,
}

impl World {
    pub fn new(initial_entity_capacity: usize) -> Self {
        Self {
            entities: entity::create_allocator(initial_entity_capacity),
            components: component::create_component_library(),
            hierarchy: hierarchy::create_hierarchy_data(),
            scheduler: system::create_scheduler(),
        }
    }

    pub fn create_entity(&mut self) -> EntityHandle {
        entity::create_entity(&mut self.entities)
    }

    pub fn is_alive(&self, handle: EntityHandle) -> bool {
        entity::is_alive(&self.entities, handle)
    }

    /// Removes every component the entity carries (any column that holds
    /// it), clears its hierarchy link, and recycles its index with a
    /// bumped generation (§4.F).
    pub fn destroy_entity(&mut self, handle: EntityHandle) -> PilotLightResult<()> {
        if !self.is_alive(handle) {
            return Err(PilotLightError::InvariantViolation {
                what: format!("destroy_entity on stale handle {:?}", handle),
            });
        }
        component::remove_all(&mut self.components, handle);
        hierarchy::on_entity_destroyed(&mut self.hierarchy, handle);
        entity::destroy_entity(&mut self.entities, handle)
    }
}
