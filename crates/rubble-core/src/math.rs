use crate::constants::CHUNK_SIZE;
use crate::types::{ChunkCoord, LocalCoord, WorldCoord};
use glam::{IVec3, Vec3};

/// Convert a world-space cell coordinate to its containing chunk coordinate.
pub fn world_to_chunk(world: WorldCoord) -> ChunkCoord {
    let cs = CHUNK_SIZE as i32;
    IVec3::new(
        world.x.div_euclid(cs),
        world.y.div_euclid(cs),
        world.z.div_euclid(cs),
    )
}

/// Convert a world-space cell coordinate to its local offset within a chunk.
pub fn world_to_local(world: WorldCoord) -> LocalCoord {
    let cs = CHUNK_SIZE as i32;
    IVec3::new(
        world.x.rem_euclid(cs),
        world.y.rem_euclid(cs),
        world.z.rem_euclid(cs),
    )
}

/// Convert a chunk coordinate and local offset back to world-space.
pub fn chunk_local_to_world(chunk: ChunkCoord, local: LocalCoord) -> WorldCoord {
    let cs = CHUNK_SIZE as i32;
    IVec3::new(
        chunk.x * cs + local.x,
        chunk.y * cs + local.y,
        chunk.z * cs + local.z,
    )
}

/// Whether a local coordinate addresses a cell inside a chunk.
pub fn local_in_bounds(local: LocalCoord) -> bool {
    let cs = CHUNK_SIZE as i32;
    local.x >= 0 && local.x < cs && local.y >= 0 && local.y < cs && local.z >= 0 && local.z < cs
}

/// Whether a local coordinate lies on one of the six chunk faces.
pub fn local_on_boundary(local: LocalCoord) -> bool {
    let max = CHUNK_SIZE as i32 - 1;
    local.x == 0
        || local.y == 0
        || local.z == 0
        || local.x == max
        || local.y == max
        || local.z == max
}

/// Linear index of an in-bounds local coordinate (x fastest, then y, then z).
pub fn local_index(local: LocalCoord) -> usize {
    let cs = CHUNK_SIZE as i32;
    (local.x + local.y * cs + local.z * cs * cs) as usize
}

/// Inverse of `local_index`.
pub fn index_to_local(index: usize) -> LocalCoord {
    let cs = CHUNK_SIZE as usize;
    IVec3::new(
        (index % cs) as i32,
        ((index / cs) % cs) as i32,
        (index / (cs * cs)) as i32,
    )
}

/// Mapping between continuous world positions and cell coordinates.
///
/// Every component that turns a position into a cell goes through this type
/// so the same point always lands in the same cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSpace {
    cell_size: f32,
}

impl Default for CellSpace {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_CELL_SIZE)
    }
}

impl CellSpace {
    /// `cell_size` must be positive; non-positive values fall back to 1.0.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        Self { cell_size }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell containing a world position (floor division by the cell size).
    pub fn position_to_cell(&self, position: Vec3) -> WorldCoord {
        (position / self.cell_size).floor().as_ivec3()
    }

    /// World position of a cell's minimum corner.
    pub fn cell_min_corner(&self, cell: WorldCoord) -> Vec3 {
        cell.as_vec3() * self.cell_size
    }

    /// World position of a cell's center.
    pub fn cell_center(&self, cell: WorldCoord) -> Vec3 {
        (cell.as_vec3() + Vec3::splat(0.5)) * self.cell_size
    }
}
