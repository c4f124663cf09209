use std::cell::Cell;
use std::sync::Arc;

use rubble_core::constants::{CELLS_PER_CHUNK, CHUNK_SIZE};
use rubble_core::math::{local_in_bounds, local_index};
use rubble_core::types::{ChunkCoord, LocalCoord, Voxel};
use glam::IVec3;

/// Inclusive box of local coordinates that changed since the last regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRegion {
    pub min: LocalCoord,
    pub max: LocalCoord,
}

impl DirtyRegion {
    /// Region covering `local` and its immediate neighbours, clamped to the chunk.
    pub fn around(local: LocalCoord) -> Self {
        let max_local = IVec3::splat(CHUNK_SIZE as i32 - 1);
        Self {
            min: (local - IVec3::ONE).clamp(IVec3::ZERO, max_local),
            max: (local + IVec3::ONE).clamp(IVec3::ZERO, max_local),
        }
    }

    /// Grow this region to also cover `other`.
    pub fn include(&mut self, other: DirtyRegion) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn contains(&self, local: LocalCoord) -> bool {
        local.cmpge(self.min).all() && local.cmple(self.max).all()
    }

    /// Number of cells covered.
    pub fn volume(&self) -> u32 {
        let extent = self.max - self.min + IVec3::ONE;
        (extent.x * extent.y * extent.z) as u32
    }
}

/// One fixed-size block of cells.
///
/// All writes go through `set`, which keeps the dirty region and the
/// non-empty count in step with the cell data.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk coordinate in chunk-space.
    pub coord: ChunkCoord,
    cells: Box<[Voxel]>,
    dirty_region: Option<DirtyRegion>,
    /// Lazily counted, then adjusted on every write.
    non_empty: Cell<Option<u32>>,
}

impl Chunk {
    /// Create an all-empty chunk.
    pub fn new_empty(coord: ChunkCoord) -> Self {
        Self {
            coord,
            cells: vec![Voxel::EMPTY; CELLS_PER_CHUNK as usize].into_boxed_slice(),
            dirty_region: None,
            non_empty: Cell::new(Some(0)),
        }
    }

    /// Wrap existing cell data (e.g. from a world generator).
    /// Returns None if `cells` does not hold exactly one chunk.
    /// The whole chunk starts dirty.
    pub fn from_cells(coord: ChunkCoord, cells: Vec<Voxel>) -> Option<Self> {
        if cells.len() != CELLS_PER_CHUNK as usize {
            return None;
        }
        Some(Self {
            coord,
            cells: cells.into_boxed_slice(),
            dirty_region: Some(DirtyRegion {
                min: IVec3::ZERO,
                max: IVec3::splat(CHUNK_SIZE as i32 - 1),
            }),
            non_empty: Cell::new(None),
        })
    }

    /// Read a cell. Out-of-range coordinates read as empty.
    pub fn get(&self, local: LocalCoord) -> Voxel {
        if !local_in_bounds(local) {
            return Voxel::EMPTY;
        }
        self.cells[local_index(local)]
    }

    /// Write a cell. Returns false for out-of-range coordinates and for
    /// writes that would not change the cell.
    pub fn set(&mut self, local: LocalCoord, voxel: Voxel) -> bool {
        if !local_in_bounds(local) {
            return false;
        }
        let voxel = voxel.normalized();
        let slot = &mut self.cells[local_index(local)];
        let previous = *slot;
        if previous == voxel || (previous.is_empty() && voxel.is_empty()) {
            return false;
        }
        *slot = voxel;

        if let Some(count) = self.non_empty.get() {
            let adjusted = match (previous.is_empty(), voxel.is_empty()) {
                (true, false) => count + 1,
                (false, true) => count.saturating_sub(1),
                _ => count,
            };
            self.non_empty.set(Some(adjusted));
        }

        let touched = DirtyRegion::around(local);
        match self.dirty_region.as_mut() {
            Some(region) => region.include(touched),
            None => self.dirty_region = Some(touched),
        }
        true
    }

    /// Number of non-empty cells. Counted once, then maintained by `set`.
    pub fn non_empty_count(&self) -> u32 {
        if let Some(count) = self.non_empty.get() {
            return count;
        }
        let count = self.cells.iter().filter(|c| !c.is_empty()).count() as u32;
        self.non_empty.set(Some(count));
        count
    }

    /// Whether the chunk holds no material at all.
    pub fn is_empty(&self) -> bool {
        self.non_empty_count() == 0
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_region.is_some()
    }

    pub fn dirty_region(&self) -> Option<DirtyRegion> {
        self.dirty_region
    }

    /// Clear the dirty state, returning the region that was dirty.
    pub fn take_dirty_region(&mut self) -> Option<DirtyRegion> {
        self.dirty_region.take()
    }

    /// Raw cell data, indexed by `local_index`.
    pub fn cells(&self) -> &[Voxel] {
        &self.cells
    }

    /// Read-only copy of the cell data for collaborators.
    pub fn snapshot(&self) -> ChunkSnapshot {
        ChunkSnapshot {
            coord: self.coord,
            cells: Arc::from(&self.cells[..]),
            dirty_region: self.dirty_region,
        }
    }
}

/// Immutable copy of a chunk, safe to hand to other threads.
#[derive(Debug, Clone)]
pub struct ChunkSnapshot {
    pub coord: ChunkCoord,
    pub cells: Arc<[Voxel]>,
    /// Region that changed since the previous snapshot, if known.
    pub dirty_region: Option<DirtyRegion>,
}

impl ChunkSnapshot {
    pub fn get(&self, local: LocalCoord) -> Voxel {
        if !local_in_bounds(local) {
            return Voxel::EMPTY;
        }
        self.cells[local_index(local)]
    }

    /// Cell data as bytes (`CELL_BYTES` per cell), ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rubble_core::constants::BYTES_PER_CHUNK;

    #[test]
    fn test_out_of_range_reads_empty() {
        let chunk = Chunk::new_empty(IVec3::ZERO);
        assert_eq!(chunk.get(IVec3::new(-1, 0, 0)), Voxel::EMPTY);
        assert_eq!(chunk.get(IVec3::new(0, 16, 0)), Voxel::EMPTY);
    }

    #[test]
    fn test_out_of_range_write_fails_silently() {
        let mut chunk = Chunk::new_empty(IVec3::ZERO);
        assert!(!chunk.set(IVec3::new(16, 0, 0), Voxel::solid(1)));
        assert!(!chunk.is_dirty());
        assert_eq!(chunk.non_empty_count(), 0);
    }

    #[test]
    fn test_count_tracks_transitions() {
        let mut chunk = Chunk::new_empty(IVec3::ZERO);
        let a = IVec3::new(1, 2, 3);
        assert!(chunk.set(a, Voxel::solid(1)));
        assert_eq!(chunk.non_empty_count(), 1);
        // Material swap keeps the count
        assert!(chunk.set(a, Voxel::solid(2)));
        assert_eq!(chunk.non_empty_count(), 1);
        // Identical write is a no-op
        assert!(!chunk.set(a, Voxel::solid(2)));
        assert!(chunk.set(a, Voxel::EMPTY));
        assert_eq!(chunk.non_empty_count(), 0);
        assert!(!chunk.set(a, Voxel::EMPTY), "clearing an empty cell changes nothing");
    }

    #[test]
    fn test_empty_writes_ignore_hit_points() {
        let mut chunk = Chunk::new_empty(IVec3::ZERO);
        let a = IVec3::new(5, 5, 5);
        assert!(!chunk.set(a, Voxel::new(0, 7)));
        assert!(!chunk.is_dirty());

        assert!(chunk.set(a, Voxel::new(2, 30)));
        assert!(chunk.set(a, Voxel::new(0, 9)));
        assert_eq!(chunk.get(a), Voxel::EMPTY);
        assert_eq!(chunk.non_empty_count(), 0);

        // Raw data may carry hit points on empty cells
        let mut cells = vec![Voxel::EMPTY; CELLS_PER_CHUNK as usize];
        cells[0] = Voxel::new(0, 5);
        let mut loaded = Chunk::from_cells(IVec3::ZERO, cells).expect("one chunk of data");
        assert!(!loaded.set(IVec3::ZERO, Voxel::EMPTY));
        assert!(!loaded.is_dirty());
    }

    #[test]
    fn test_lazy_count_matches_data() {
        let mut cells = vec![Voxel::EMPTY; CELLS_PER_CHUNK as usize];
        for cell in cells.iter_mut().take(100) {
            *cell = Voxel::solid(3);
        }
        let mut chunk = Chunk::from_cells(IVec3::ONE, cells).expect("one chunk of data");
        assert_eq!(chunk.non_empty_count(), 100);
        chunk.set(IVec3::new(15, 15, 15), Voxel::solid(3));
        assert_eq!(chunk.non_empty_count(), 101);
        assert!(Chunk::from_cells(IVec3::ONE, vec![Voxel::EMPTY; 10]).is_none());
    }

    #[test]
    fn test_dirty_region_covers_neighbors() {
        let mut chunk = Chunk::new_empty(IVec3::ZERO);
        chunk.set(IVec3::new(5, 5, 5), Voxel::solid(1));
        let region = chunk.dirty_region().expect("dirty after write");
        assert_eq!(region.min, IVec3::new(4, 4, 4));
        assert_eq!(region.max, IVec3::new(6, 6, 6));

        chunk.set(IVec3::new(0, 9, 15), Voxel::solid(1));
        let region = chunk.dirty_region().expect("still dirty");
        assert_eq!(region.min, IVec3::new(0, 4, 4));
        assert_eq!(region.max, IVec3::new(6, 10, 15));
        assert!(region.contains(IVec3::new(1, 10, 14)));

        assert_eq!(chunk.take_dirty_region(), Some(region));
        assert!(!chunk.is_dirty());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut chunk = Chunk::new_empty(IVec3::ZERO);
        chunk.set(IVec3::ZERO, Voxel::new(4, 9));
        let snapshot = chunk.snapshot();
        chunk.set(IVec3::ZERO, Voxel::EMPTY);
        assert_eq!(snapshot.get(IVec3::ZERO), Voxel::new(4, 9));
        assert_eq!(snapshot.as_bytes().len() as u32, BYTES_PER_CHUNK);
    }
}
