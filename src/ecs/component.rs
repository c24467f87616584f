//! Component library: sparse-set storage keyed by a dense integer type
//! key, with type-erased dense arrays (§3, §4.F).
//!
//! The source reaches for `void*` + stride; per §9's rearchitecture note,
//! this models each component type as a polymorphic store behind a small
//! trait, downcast to the concrete `Vec<T>` at the call site so per-
//! element access stays monomorphized rather than going through virtual
//! dispatch.

use std::any::Any;

use rustc_hash::FxHashMap;

use crate::error::{PilotLightError, PilotLightResult};

use super::entity::EntityHandle;

pub type TypeKey = u32;

/// Type-erased column operations needed by code that doesn't know the
/// concrete component type (bulk entity teardown, diagnostics).
trait ComponentColumn: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn swap_remove(&mut self, dense_index: usize);
    fn len(&self) -> usize;
}

struct TypedColumn<T> {
    dense: Vec<T>,
}

impl<T: Send + Sync + 'static> ComponentColumn for TypedColumn<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn swap_remove(&mut self, dense_index: usize) {
        self.dense.swap_remove(dense_index);
    }

    fn len(&self) -> usize {
        self.dense.len()
    }
}

struct ComponentType {
    /// `dense_entities[slot]` is the full handle (index + generation)
    /// owning that dense slot — comparing the full handle, not just the
    /// index, is what lets `get` reject a stale handle reusing a freed
    /// index.
    dense_entities: Vec<EntityHandle>,
    /// `entity.index -> dense slot`. Absent = entity has no component of
    /// this type.
    sparse: FxHashMap<u32, u32>,
    column: Box<dyn ComponentColumn>,
}

/// NO METHODS beyond what's needed to stay type-erased at the storage
/// level; all real transformations are the free functions below.
pub struct ComponentLibraryData {
    types: Vec<ComponentType>,
}

pub fn create_component_library() -> ComponentLibraryData {
    ComponentLibraryData { types: Vec::new() }
}

/// One-shot at initialize time (§4.F): allocates a dense integer type
/// key and an empty column for `T`.
pub fn register_type<T: Send + Sync + 'static>(lib: &mut ComponentLibraryData) -> TypeKey {
    let key = lib.types.len() as TypeKey;
    lib.types.push(ComponentType {
        dense_entities: Vec::new(),
        sparse: FxHashMap::default(),
        column: Box::new(TypedColumn::<T> { dense: Vec::new() }),
    });
    key
}

fn type_entry_mut(
    lib: &mut ComponentLibraryData,
    type_key: TypeKey,
) -> PilotLightResult<&mut ComponentType> {
    lib.types
        .get_mut(type_key as usize)
        .ok_or_else(|| PilotLightError::NotFound {
            what: "component type".to_string(),
            key: type_key.to_string(),
        })
}

fn typed_column_mut<T: Send + Sync + 'static>(
    entry: &mut ComponentType,
) -> PilotLightResult<&mut Vec<T>> {
    entry
        .column
        .as_any_mut()
        .downcast_mut::<TypedColumn<T>>()
        .map(|c| &mut c.dense)
        .ok_or_else(|| PilotLightError::InvariantViolation {
            what: "component type key used with mismatched type".to_string(),
        })
}

/// If `entity` already has the component, returns the existing slot.
/// Otherwise appends a zero/default-initialised slot. O(1).
pub fn add<T: Default + Send + Sync + 'static>(
    lib: &mut ComponentLibraryData,
    type_key: TypeKey,
    entity: EntityHandle,
) -> PilotLightResult<&mut T> {
    let entry = type_entry_mut(lib, type_key)?;
    if let Some(&slot) = entry.sparse.get(&entity.index) {
        let dense = typed_column_mut::<T>(entry)?;
        return Ok(&mut dense[slot as usize]);
    }

    let dense = typed_column_mut::<T>(entry)?;
    let slot = dense.len() as u32;
    dense.push(T::default());
    entry.dense_entities.push(entity);
    entry.sparse.insert(entity.index, slot);
    let dense = typed_column_mut::<T>(entry)?;
    Ok(&mut dense[slot as usize])
}

/// O(1) sparse lookup; also checks generation, so a stale handle whose
/// index was recycled for a live entity with a component of the same
/// type still returns `None`.
pub fn get<T: Send + Sync + 'static>(
    lib: &ComponentLibraryData,
    type_key: TypeKey,
    entity: EntityHandle,
) -> Option<&T> {
    let entry = lib.types.get(type_key as usize)?;
    let &slot = entry.sparse.get(&entity.index)?;
    if entry.dense_entities[slot as usize] != entity {
        return None;
    }
    entry
        .column
        .as_any()
        .downcast_ref::<TypedColumn<T>>()
        .map(|c| &c.dense[slot as usize])
}

pub fn get_mut<T: Send + Sync + 'static>(
    lib: &mut ComponentLibraryData,
    type_key: TypeKey,
    entity: EntityHandle,
) -> Option<&mut T> {
    let entry = lib.types.get_mut(type_key as usize)?;
    let &slot = entry.sparse.get(&entity.index)?;
    if entry.dense_entities[slot as usize] != entity {
        return None;
    }
    entry
        .column
        .as_any_mut()
        .downcast_mut::<TypedColumn<T>>()
        .map(|c| &mut c.dense[slot as usize])
}

/// Swap-delete: copy last dense element into the removed slot, update
/// the moved entity's sparse pointer, shrink. O(1).
pub fn remove<T: Send + Sync + 'static>(
    lib: &mut ComponentLibraryData,
    type_key: TypeKey,
    entity: EntityHandle,
) -> PilotLightResult<()> {
    let entry = type_entry_mut(lib, type_key)?;
    let Some(slot) = entry.sparse.remove(&entity.index) else {
        return Ok(());
    };
    remove_at_slot(entry, slot);
    Ok(())
}

fn remove_at_slot(entry: &mut ComponentType, slot: u32) {
    let last = entry.dense_entities.len() as u32 - 1;
    entry.column.swap_remove(slot as usize);
    entry.dense_entities.swap_remove(slot as usize);
    if slot != last {
        // The entity that used to own the last slot now owns `slot`.
        let moved_entity = entry.dense_entities[slot as usize];
        entry.sparse.insert(moved_entity.index, slot);
    }
}

/// Removes `entity` from every registered type that currently holds it
/// (used by entity teardown; §4.F `destroy_entity`).
pub fn remove_all(lib: &mut ComponentLibraryData, entity: EntityHandle) {
    for entry in lib.types.iter_mut() {
        if let Some(slot) = entry.sparse.remove(&entity.index) {
            remove_at_slot(entry, slot);
        }
    }
}

/// Systems iterate the dense arrays directly rather than through
/// per-entity lookup (§4.F).
pub fn get_components<T: Send + Sync + 'static>(
    lib: &ComponentLibraryData,
    type_key: TypeKey,
) -> PilotLightResult<(&[T], &[EntityHandle])> {
    let entry = lib
        .types
        .get(type_key as usize)
        .ok_or_else(|| PilotLightError::NotFound {
            what: "component type".to_string(),
            key: type_key.to_string(),
        })?;
    let dense = entry
        .column
        .as_any()
        .downcast_ref::<TypedColumn<T>>()
        .map(|c| c.dense.as_slice())
        .ok_or_else(|| PilotLightError::InvariantViolation {
            what: "component type key used with mismatched type".to_string(),
        })?;
    Ok((dense, &entry.dense_entities))
}

pub fn get_components_mut<T: Send + Sync + 'static>(
    lib: &mut ComponentLibraryData,
    type_key: TypeKey,
) -> PilotLightResult<(&mut [T], &[EntityHandle])> {
    let entry = lib
        .types
        .get_mut(type_key as usize)
        .ok_or_else(|| PilotLightError::NotFound {
            what: "component type".to_string(),
            key: type_key.to_string(),
        })?;
    let dense = entry
        .column
        .as_any_mut()
        .downcast_mut::<TypedColumn<T>>()
        .map(|c| c.dense.as_mut_slice())
        .ok_or_else(|| PilotLightError::InvariantViolation {
            what: "component type key used with mismatched type".to_string(),
        })?;
    Ok((dense, &entry.dense_entities))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq, Clone, Copy)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[test]
    fn test_add_get_remove() {
        let mut lib = create_component_library();
        let key = register_type::<Position>(&mut lib);
        let entity = EntityHandle { index: 0, generation: 0 };

        {
            let pos = add::<Position>(&mut lib, key, entity).unwrap();
            pos.x = 1.0;
            pos.y = 2.0;
        }

        assert_eq!(get::<Position>(&lib, key, entity), Some(&Position { x: 1.0, y: 2.0 }));

        remove::<Position>(&mut lib, key, entity).unwrap();
        assert_eq!(get::<Position>(&lib, key, entity), None);
    }

    #[test]
    fn test_swap_delete_keeps_others_reachable() {
        // Scenario S3.
        let mut lib = create_component_library();
        let key = register_type::<Position>(&mut lib);
        let a = EntityHandle { index: 0, generation: 0 };
        let b = EntityHandle { index: 1, generation: 0 };
        let c = EntityHandle { index: 2, generation: 0 };
        add::<Position>(&mut lib, key, a).unwrap();
        add::<Position>(&mut lib, key, b).unwrap();
        add::<Position>(&mut lib, key, c).unwrap();

        remove::<Position>(&mut lib, key, a).unwrap();

        assert_eq!(get::<Position>(&lib, key, a), None);
        assert!(get::<Position>(&lib, key, b).is_some());
        assert!(get::<Position>(&lib, key, c).is_some());
        let (dense, _) = get_components::<Position>(&lib, key).unwrap();
        assert_eq!(dense.len(), 2);
    }

    #[test]
    fn test_stale_handle_rejected_after_index_reuse() {
        let mut lib = create_component_library();
        let key = register_type::<Position>(&mut lib);
        let original = EntityHandle { index: 0, generation: 0 };
        add::<Position>(&mut lib, key, original).unwrap();
        remove::<Position>(&mut lib, key, original).unwrap();

        let reused = EntityHandle { index: 0, generation: 1 };
        add::<Position>(&mut lib, key, reused).unwrap();

        assert_eq!(get::<Position>(&lib, key, original), None);
        assert!(get::<Position>(&lib, key, reused).is_some());
    }

    #[test]
    fn test_add_twice_returns_existing_slot() {
        let mut lib = create_component_library();
        let key = register_type::<Position>(&mut lib);
        let entity = EntityHandle { index: 0, generation: 0 };
        add::<Position>(&mut lib, key, entity).unwrap().x = 5.0;
        add::<Position>(&mut lib, key, entity).unwrap();
        let (dense, _) = get_components::<Position>(&lib, key).unwrap();
        assert_eq!(dense.len(), 1);
        assert_eq!(dense[0].x, 5.0);
    }
}
