use crate::chunk::Chunk;
use rubble_core::math::{chunk_local_to_world, index_to_local, world_to_chunk, world_to_local};
use rubble_core::types::{ChunkCoord, LocalCoord, Voxel, WorldCoord};
use glam::IVec3;
use std::collections::HashMap;

/// Spatial container for all chunks in the world.
///
/// The map is the only owner of chunk data: a world cell is occupied exactly
/// when the chunk holding it is loaded and the cell is non-empty.
#[derive(Debug, Default)]
pub struct ChunkMap {
    chunks: HashMap<ChunkCoord, Chunk>,
}

impl ChunkMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an empty chunk at the given coordinate. Loading an already
    /// loaded coordinate keeps the existing data.
    pub fn load_chunk(&mut self, coord: ChunkCoord) -> &mut Chunk {
        self.chunks
            .entry(coord)
            .or_insert_with(|| Chunk::new_empty(coord))
    }

    /// Insert generated chunk data, replacing whatever was loaded there.
    pub fn insert_chunk(&mut self, chunk: Chunk) -> Option<Chunk> {
        self.chunks.insert(chunk.coord, chunk)
    }

    /// Unload a chunk, handing back its data.
    pub fn unload_chunk(&mut self, coord: &ChunkCoord) -> Option<Chunk> {
        let chunk = self.chunks.remove(coord);
        if chunk.is_some() {
            log::debug!("Unloaded chunk {coord}");
        }
        chunk
    }

    /// Get a chunk by coordinate.
    pub fn get(&self, coord: &ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(coord)
    }

    /// Get a mutable chunk by coordinate.
    pub fn get_mut(&mut self, coord: &ChunkCoord) -> Option<&mut Chunk> {
        self.chunks.get_mut(coord)
    }

    pub fn contains(&self, coord: &ChunkCoord) -> bool {
        self.chunks.contains_key(coord)
    }

    /// Read a cell by chunk and local coordinate. Missing chunks and
    /// out-of-range local coordinates read as empty.
    pub fn get_voxel(&self, chunk: ChunkCoord, local: LocalCoord) -> Voxel {
        self.chunks
            .get(&chunk)
            .map_or(Voxel::EMPTY, |c| c.get(local))
    }

    /// Write a cell by chunk and local coordinate.
    ///
    /// The chunk is created on first reference, but only when the write puts
    /// material there; clearing a cell of an unloaded chunk is a no-op.
    pub fn set_voxel(&mut self, chunk: ChunkCoord, local: LocalCoord, voxel: Voxel) -> bool {
        if let Some(existing) = self.chunks.get_mut(&chunk) {
            return existing.set(local, voxel);
        }
        if voxel.is_empty() {
            return false;
        }
        let mut created = Chunk::new_empty(chunk);
        if !created.set(local, voxel) {
            return false;
        }
        self.chunks.insert(chunk, created);
        true
    }

    /// Read a cell by world coordinate.
    pub fn get_cell(&self, world: WorldCoord) -> Voxel {
        self.get_voxel(world_to_chunk(world), world_to_local(world))
    }

    /// Write a cell by world coordinate.
    pub fn set_cell(&mut self, world: WorldCoord, voxel: Voxel) -> bool {
        self.set_voxel(world_to_chunk(world), world_to_local(world), voxel)
    }

    /// Whether the world cell holds material.
    pub fn is_solid(&self, world: WorldCoord) -> bool {
        !self.get_cell(world).is_empty()
    }

    /// Non-empty cells in a chunk; 0 for chunks that are not loaded.
    pub fn non_empty_count(&self, coord: &ChunkCoord) -> u32 {
        self.chunks.get(coord).map_or(0, Chunk::non_empty_count)
    }

    /// Get the 6 face-adjacent neighbor coordinates for a chunk.
    pub fn face_neighbors(coord: &ChunkCoord) -> [ChunkCoord; 6] {
        [
            *coord + IVec3::new(-1, 0, 0),
            *coord + IVec3::new(1, 0, 0),
            *coord + IVec3::new(0, -1, 0),
            *coord + IVec3::new(0, 1, 0),
            *coord + IVec3::new(0, 0, -1),
            *coord + IVec3::new(0, 0, 1),
        ]
    }

    /// Get all 26 neighbor coordinates for a chunk.
    pub fn all_neighbors(coord: &ChunkCoord) -> Vec<ChunkCoord> {
        let mut neighbors = Vec::with_capacity(26);
        for dx in -1..=1i32 {
            for dy in -1..=1i32 {
                for dz in -1..=1i32 {
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    neighbors.push(*coord + IVec3::new(dx, dy, dz));
                }
            }
        }
        neighbors
    }

    /// Iterator over all loaded chunks.
    pub fn iter(&self) -> impl Iterator<Item = (&ChunkCoord, &Chunk)> {
        self.chunks.iter()
    }

    /// World coordinates of every non-empty cell in a chunk.
    pub fn solid_cells(&self, coord: &ChunkCoord) -> Vec<WorldCoord> {
        let Some(chunk) = self.chunks.get(coord) else {
            return Vec::new();
        };
        chunk
            .cells()
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(index, _)| {
                chunk_local_to_world(*coord, index_to_local(index))
            })
            .collect()
    }

    /// Number of loaded chunks.
    pub fn loaded_count(&self) -> u32 {
        self.chunks.len() as u32
    }

    /// Non-empty cells across every loaded chunk.
    pub fn total_non_empty(&self) -> u64 {
        self.chunks
            .values()
            .map(|c| u64::from(c.non_empty_count()))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_map_spatial_queries() {
        let mut map = ChunkMap::new();
        let coord = IVec3::new(1, 1, 1);
        map.load_chunk(coord);
        assert!(map.get(&coord).is_some());

        // Face neighbors
        let neighbors = ChunkMap::face_neighbors(&coord);
        assert_eq!(neighbors.len(), 6);
        assert!(neighbors.contains(&IVec3::new(0, 1, 1)));
        assert!(neighbors.contains(&IVec3::new(2, 1, 1)));

        // All 26 neighbors
        let all = ChunkMap::all_neighbors(&coord);
        assert_eq!(all.len(), 26);
        assert!(all.contains(&IVec3::new(0, 0, 0)));

        // Unload
        assert!(map.unload_chunk(&coord).is_some());
        assert!(map.get(&coord).is_none());
        assert!(map.unload_chunk(&coord).is_none());
    }

    #[test]
    fn test_load_chunk_idempotent() {
        let mut map = ChunkMap::new();
        let coord = IVec3::new(2, 1, 3);
        map.load_chunk(coord).set(IVec3::ZERO, Voxel::solid(1));
        map.load_chunk(coord);
        assert_eq!(
            map.get_voxel(coord, IVec3::ZERO),
            Voxel::solid(1),
            "loading same coord twice should keep its data"
        );
        // Should still only have one chunk loaded
        assert_eq!(map.loaded_count(), 1);
    }

    #[test]
    fn test_world_cell_access_across_chunks() {
        let mut map = ChunkMap::new();
        let a = IVec3::new(-1, 0, 0);
        let b = IVec3::new(16, 31, -17);
        assert!(map.set_cell(a, Voxel::solid(2)));
        assert!(map.set_cell(b, Voxel::solid(3)));
        assert_eq!(map.get_cell(a), Voxel::solid(2));
        assert_eq!(map.get_cell(b), Voxel::solid(3));
        assert!(map.contains(&IVec3::new(-1, 0, 0)));
        assert!(map.contains(&IVec3::new(1, 1, -2)));
        assert_eq!(map.total_non_empty(), 2);
    }

    #[test]
    fn test_missing_chunk_reads_empty_and_ignores_clears() {
        let mut map = ChunkMap::new();
        let far = IVec3::new(1000, -1000, 5);
        assert!(map.get_cell(far).is_empty());
        assert!(!map.set_cell(far, Voxel::EMPTY));
        assert_eq!(map.loaded_count(), 0, "clearing must not create chunks");
        assert_eq!(map.non_empty_count(&IVec3::new(62, -63, 0)), 0);
    }

    #[test]
    fn test_solid_cells_lists_world_coords() {
        let mut map = ChunkMap::new();
        map.set_cell(IVec3::new(17, 2, 3), Voxel::solid(1));
        map.set_cell(IVec3::new(18, 2, 3), Voxel::solid(1));
        let mut cells = map.solid_cells(&IVec3::new(1, 0, 0));
        cells.sort_by_key(|c| c.to_array());
        assert_eq!(cells, vec![IVec3::new(17, 2, 3), IVec3::new(18, 2, 3)]);
    }
}
