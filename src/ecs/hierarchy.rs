//! Hierarchy and transform propagation (§4.F).
//!
//! Kept as an explicit parent pointer with lazy topological evaluation
//! each frame, per §9's design note, rather than a graph of owning
//! pointers — reparenting stays O(1) and component iteration stays
//! cache-friendly.

use glam::{Mat4, Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::error::{PilotLightError, PilotLightResult};

use super::entity::EntityHandle;

/// `{translation, rotation, scale, local, world}`. `local`/`world` are
/// recomputed each frame by `transform_system`/`hierarchy_system`, not
/// hand-edited.
#[derive(Debug, Clone, Copy)]
pub struct TransformComponent {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub local: Mat4,
    pub world: Mat4,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            local: Mat4::IDENTITY,
            world: Mat4::IDENTITY,
        }
    }
}

/// `{parent: EntityHandle}`. Forms a forest; invariants enforced by
/// `set_parent` below.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyComponent {
    pub parent: Option<EntityHandle>,
}

/// Parent links keyed by child entity index. Kept separate from the
/// generic component library because hierarchy traversal needs direct
/// parent/child adjacency, not a sparse-set scan.
pub struct HierarchyData {
    links: FxHashMap<u32, HierarchyComponent>,
}

pub fn create_hierarchy_data() -> HierarchyData {
    HierarchyData {
        links: FxHashMap::default(),
    }
}

fn is_ancestor(data: &HierarchyData, candidate_ancestor: EntityHandle, entity: EntityHandle) -> bool {
    let mut current = entity;
    // A forest has no cycles by construction once this check is enforced,
    // so this walk always terminates at a root (parent = None).
    while let Some(link) = data.links.get(&current.index) {
        match link.parent {
            Some(parent) if parent == candidate_ancestor => return true,
            Some(parent) => current = parent,
            None => return false,
        }
    }
    false
}

/// Sets `child`'s parent to `parent`. Fails if `parent` is a descendant
/// of `child` (§3 invariant i, §8 invariant 4 / scenario S4).
pub fn set_parent(
    data: &mut HierarchyData,
    child: EntityHandle,
    parent: EntityHandle,
) -> PilotLightResult<()> {
    if child == parent || is_ancestor(data, child, parent) {
        return Err(PilotLightError::InvariantViolation {
            what: format!(
                "set_parent({:?}, {:?}) would create a hierarchy cycle",
                child, parent
            ),
        });
    }
    data.links
        .entry(child.index)
        .or_insert(HierarchyComponent { parent: None })
        .parent = Some(parent);
    Ok(())
}

pub fn get_parent(data: &HierarchyData, child: EntityHandle) -> Option<EntityHandle> {
    data.links.get(&child.index)?.parent
}

/// Removing a parent re-parents its children to the parent's parent (or
/// root), per §3 invariant (iii).
pub fn on_entity_destroyed(data: &mut HierarchyData, entity: EntityHandle) {
    let grandparent = data.links.get(&entity.index).and_then(|l| l.parent);
    for link in data.links.values_mut() {
        if link.parent == Some(entity) {
            link.parent = grandparent;
        }
    }
    data.links.remove(&entity.index);
}

/// `local = T · R · S` for every transform (§4.F transform system).
pub fn transform_system(transforms: &mut [TransformComponent]) {
    for t in transforms.iter_mut() {
        t.local = Mat4::from_scale_rotation_translation(t.scale, t.rotation, t.translation);
    }
}

/// Visits parents before children and computes `world = parent.world ·
/// local` (§4.F hierarchy system, §8 invariant 5 / scenario S5). Order
/// is produced by, for each hierarchy entry, walking up to the root and
/// writing top-down so a child is never written before its parent.
pub fn hierarchy_system(
    hierarchy: &HierarchyData,
    entities: &[EntityHandle],
    transforms: &mut [TransformComponent],
) {
    let index_of: FxHashMap<EntityHandle, usize> = entities
        .iter()
        .enumerate()
        .map(|(i, &e)| (e, i))
        .collect();
    let mut resolved = vec![false; transforms.len()];

    fn resolve(
        entity: EntityHandle,
        hierarchy: &HierarchyData,
        index_of: &FxHashMap<EntityHandle, usize>,
        transforms: &mut [TransformComponent],
        resolved: &mut [bool],
    ) -> Option<Mat4> {
        let &slot = index_of.get(&entity)?;
        if resolved[slot] {
            return Some(transforms[slot].world);
        }
        let parent_world = match get_parent(hierarchy, entity) {
            Some(parent) => resolve(parent, hierarchy, index_of, transforms, resolved)
                .unwrap_or(Mat4::IDENTITY),
            None => Mat4::IDENTITY,
        };
        let world = parent_world * transforms[slot].local;
        transforms[slot].world = world;
        resolved[slot] = true;
        Some(world)
    }

    for (slot, &entity) in entities.iter().enumerate() {
        if !resolved[slot] {
            resolve(entity, hierarchy, &index_of, transforms, &mut resolved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(index: u32) -> EntityHandle {
        EntityHandle { index, generation: 0 }
    }

    #[test]
    fn test_cycle_rejected() {
        // Scenario S4.
        let mut hierarchy = create_hierarchy_data();
        let a = e(0);
        let b = e(1);
        set_parent(&mut hierarchy, b, a).unwrap();
        let result = set_parent(&mut hierarchy, a, b);
        assert!(result.is_err());
        assert_eq!(get_parent(&hierarchy, a), None);
    }

    #[test]
    fn test_reparent_on_destroy() {
        let mut hierarchy = create_hierarchy_data();
        let grandparent = e(0);
        let parent = e(1);
        let child = e(2);
        set_parent(&mut hierarchy, parent, grandparent).unwrap();
        set_parent(&mut hierarchy, child, parent).unwrap();

        on_entity_destroyed(&mut hierarchy, parent);

        assert_eq!(get_parent(&hierarchy, child), Some(grandparent));
    }

    #[test]
    fn test_transform_composition() {
        // Scenario S5.
        let a = e(0);
        let b = e(1);
        let entities = [a, b];

        let mut hierarchy = create_hierarchy_data();
        set_parent(&mut hierarchy, b, a).unwrap();

        let mut transforms = [
            TransformComponent {
                translation: Vec3::new(1.0, 0.0, 0.0),
                ..Default::default()
            },
            TransformComponent {
                translation: Vec3::new(0.0, 2.0, 0.0),
                ..Default::default()
            },
        ];

        transform_system(&mut transforms);
        hierarchy_system(&hierarchy, &entities, &mut transforms);

        let b_world_translation = transforms[1].world.transform_point3(Vec3::ZERO);
        assert!((b_world_translation - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
    }
}
