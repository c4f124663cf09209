//! Turns a disconnected group of world cells into a separated object.

use glam::IVec3;
use rubble_core::config::ObjectConfig;
use rubble_core::math::{world_to_chunk, world_to_local, CellSpace};
use rubble_core::types::{Voxel, WorldCoord};
use rubble_world::collaborators::{notify_changes, request_regeneration};
use rubble_world::{CellChangeListener, ChangeTracker, ChunkMap, ChunkRegenerator};

use crate::grid::VoxelGrid;
use crate::object::SeparatedObject;
use crate::registry::{SeparatedObjectRef, SeparatedObjectRegistry};

/// Inclusive cell bounds of a group, or None for an empty group.
pub fn group_bounds(group: &[WorldCoord]) -> Option<(WorldCoord, WorldCoord)> {
    let first = *group.first()?;
    Some(
        group
            .iter()
            .fold((first, first), |(min, max), c| (min.min(*c), max.max(*c))),
    )
}

/// Moves groups of cells out of the chunk store into new objects.
#[derive(Debug, Clone)]
pub struct Materializer {
    space: CellSpace,
    policy: ObjectConfig,
}

impl Materializer {
    pub fn new(space: CellSpace, policy: ObjectConfig) -> Self {
        Self { space, policy }
    }

    /// Extract `group` into a new object registered in `registry`.
    ///
    /// Each cell is copied into the object's grid before it is cleared in
    /// the store. Every chunk that loses cells is regenerated once and one
    /// change event covers the whole group. Returns None, without taking an
    /// id, if no cell of the group was solid.
    pub fn extract(
        &self,
        chunks: &mut ChunkMap,
        group: &[WorldCoord],
        registry: &mut SeparatedObjectRegistry,
        regenerator: Option<&mut (dyn ChunkRegenerator + '_)>,
        listener: Option<&mut (dyn CellChangeListener + '_)>,
    ) -> Option<SeparatedObjectRef> {
        let (min, max) = group_bounds(group)?;
        let dims = (max - min + IVec3::ONE).as_uvec3();
        let mut grid = VoxelGrid::new(dims);
        let mut tracker = ChangeTracker::new();

        for cell in group {
            let chunk = world_to_chunk(*cell);
            let local = world_to_local(*cell);
            let voxel = chunks.get_voxel(chunk, local);
            if voxel.is_empty() {
                continue;
            }
            if !grid.set(*cell - min, voxel) {
                continue;
            }
            tracker.write(chunks, chunk, local, Voxel::EMPTY);
        }

        if grid.is_empty() {
            log::warn!("Group of {} cell(s) held no material", group.len());
            return None;
        }
        let id = registry.allocate_id();

        notify_changes(listener, tracker.applied());
        request_regeneration(chunks, regenerator, tracker.dirty_chunks());

        log::debug!(
            "Object {id}: extracted {} cell(s) in a {}x{}x{} grid",
            grid.non_empty_count(),
            dims.x,
            dims.y,
            dims.z
        );
        let object = SeparatedObject::new(id, min, grid, self.space, self.policy.clone());
        Some(registry.insert(object))
    }
}
