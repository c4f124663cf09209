use std::collections::HashSet;

use crate::chunk_map::ChunkMap;
use rubble_core::math::{chunk_local_to_world, local_on_boundary};
use rubble_core::types::{CellChange, ChunkCoord, LocalCoord, Voxel};

/// Records the effect of a run of cell writes.
///
/// Only writes that changed a cell are recorded. A chunk written to is
/// dirty; a write on a chunk face also marks the six face neighbours as
/// affected, since their surfaces depend on the boundary cells.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    applied: Vec<CellChange>,
    dirty: Vec<ChunkCoord>,
    affected: Vec<ChunkCoord>,
    dirty_set: HashSet<ChunkCoord>,
    affected_set: HashSet<ChunkCoord>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one cell through the map and record it if it changed anything.
    pub fn write(
        &mut self,
        chunks: &mut ChunkMap,
        chunk: ChunkCoord,
        local: LocalCoord,
        voxel: Voxel,
    ) -> bool {
        let voxel = voxel.normalized();
        if !chunks.set_voxel(chunk, local, voxel) {
            return false;
        }
        self.applied.push(CellChange {
            coord: chunk_local_to_world(chunk, local),
            voxel,
        });
        if self.dirty_set.insert(chunk) {
            self.dirty.push(chunk);
        }
        self.mark_affected(chunk);
        if local_on_boundary(local) {
            for neighbor in ChunkMap::face_neighbors(&chunk) {
                self.mark_affected(neighbor);
            }
        }
        true
    }

    fn mark_affected(&mut self, chunk: ChunkCoord) {
        if self.affected_set.insert(chunk) {
            self.affected.push(chunk);
        }
    }

    /// Writes that changed a cell, in the order they were applied.
    pub fn applied(&self) -> &[CellChange] {
        &self.applied
    }

    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// Chunks that received at least one write, in first-write order.
    pub fn dirty_chunks(&self) -> &[ChunkCoord] {
        &self.dirty
    }

    /// Dirty chunks plus the face neighbours of boundary writes.
    pub fn affected_chunks(&self) -> &[ChunkCoord] {
        &self.affected
    }

    pub fn is_affected(&self, chunk: &ChunkCoord) -> bool {
        self.affected_set.contains(chunk)
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}
