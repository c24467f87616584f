//! Entity allocation: a freelist of recycled indices with a monotonically
//! increasing generation per slot (§4.F).

use crate::error::{PilotLightError, PilotLightResult};

/// A 64-bit packed `{index, generation}` identifier. Not an object —
/// reused only after its generation is bumped, so stale handles are
/// detectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle {
    pub index: u32,
    pub generation: u32,
}

impl EntityHandle {
    pub const NONE_BITS: u64 = u64::MAX;

    pub fn to_bits(self) -> u64 {
        (self.index as u64) | ((self.generation as u64) << 32)
    }

    pub fn from_bits(bits: u64) -> Option<Self> {
        if bits == Self::NONE_BITS {
            return None;
        }
        Some(Self {
            index: (bits & 0xFFFF_FFFF) as u32,
            generation: (bits >> 32) as u32,
        })
    }
}

/// Entity allocator state. NO METHODS. Transformations live in the free
/// functions below.
pub struct EntityAllocatorData {
    /// `generations[i]` is the current generation for index `i`.
    pub generations: Vec<u32>,
    /// Recycled indices available for reuse, most-recently-freed last.
    pub free_list: Vec<u32>,
    pub alive_count: usize,
}

pub fn create_allocator(initial_capacity: usize) -> EntityAllocatorData {
    EntityAllocatorData {
        generations: Vec::with_capacity(initial_capacity),
        free_list: Vec::new(),
        alive_count: 0,
    }
}

/// Allocate a new entity: reuses a freed index if one is available,
/// otherwise grows the generation table.
pub fn create_entity(data: &mut EntityAllocatorData) -> EntityHandle {
    let handle = if let Some(index) = data.free_list.pop() {
        EntityHandle {
            index,
            generation: data.generations[index as usize],
        }
    } else {
        let index = data.generations.len() as u32;
        data.generations.push(0);
        EntityHandle { index, generation: 0 }
    };
    data.alive_count += 1;
    handle
}

/// `generation[e.index] == e.generation`. Out-of-range indices (never
/// allocated) are never alive.
pub fn is_alive(data: &EntityAllocatorData, handle: EntityHandle) -> bool {
    data.generations
        .get(handle.index as usize)
        .map(|&g| g == handle.generation)
        .unwrap_or(false)
}

/// Bump the slot's generation and recycle its index. Callers are
/// responsible for tearing down the entity's components first (the
/// `World` aggregator in `ecs::mod` does this); this function only
/// retires the handle itself.
pub fn destroy_entity(data: &mut EntityAllocatorData, handle: EntityHandle) -> PilotLightResult<()> {
    if !is_alive(data, handle) {
        return Err(PilotLightError::InvariantViolation {
            what: format!("double destroy of entity {:?}", handle),
        });
    }
    data.generations[handle.index as usize] = data.generations[handle.index as usize].wrapping_add(1);
    data.free_list.push(handle.index);
    data.alive_count -= 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_reuse_bumps_generation() {
        // Scenario S2.
        let mut allocator = create_allocator(4);
        let e1 = create_entity(&mut allocator);
        assert_eq!(e1, EntityHandle { index: 0, generation: 0 });

        destroy_entity(&mut allocator, e1).unwrap();
        let e2 = create_entity(&mut allocator);
        assert_eq!(e2, EntityHandle { index: 0, generation: 1 });

        assert!(!is_alive(&allocator, e1));
        assert!(is_alive(&allocator, e2));
    }

    #[test]
    fn test_double_destroy_is_invariant_violation() {
        let mut allocator = create_allocator(4);
        let e1 = create_entity(&mut allocator);
        destroy_entity(&mut allocator, e1).unwrap();
        let result = destroy_entity(&mut allocator, e1);
        assert!(matches!(result, Err(PilotLightError::InvariantViolation { .. })));
    }

    #[test]
    fn test_bits_roundtrip() {
        let handle = EntityHandle { index: 7, generation: 3 };
        assert_eq!(EntityHandle::from_bits(handle.to_bits()), Some(handle));
        assert_eq!(EntityHandle::from_bits(EntityHandle::NONE_BITS), None);
    }

    #[test]
    fn test_distinct_indices_allocated_before_any_free() {
        let mut allocator = create_allocator(4);
        let e1 = create_entity(&mut allocator);
        let e2 = create_entity(&mut allocator);
        assert_ne!(e1.index, e2.index);
    }
}
