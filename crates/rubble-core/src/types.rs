use bytemuck::{Pod, Zeroable};
use glam::IVec3;

use crate::constants::EMPTY_MATERIAL;

/// Newtype for material identifiers. 0 = empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Pod, Zeroable)]
#[repr(transparent)]
pub struct MaterialId(pub u16);

impl MaterialId {
    /// The empty material.
    pub const EMPTY: Self = Self(EMPTY_MATERIAL);

    pub fn is_empty(self) -> bool {
        self.0 == EMPTY_MATERIAL
    }
}

/// Chunk coordinate in chunk-space (each unit = CHUNK_SIZE cells).
pub type ChunkCoord = IVec3;

/// World coordinate in cell-space.
pub type WorldCoord = IVec3;

/// Local coordinate of a cell within its chunk (each axis in 0..CHUNK_SIZE).
pub type LocalCoord = IVec3;

/// A single voxel cell.
///
/// Layout (4 bytes, matches `CELL_BYTES`):
///   [0:1]  material id (u16)
///   [2:3]  hit points (u16), copied from the material table on creation
///
/// Emptiness is decided by the material id alone; hit points of an empty
/// cell carry no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Voxel {
    pub material: MaterialId,
    pub hit_points: u16,
}

impl Voxel {
    /// The empty cell.
    pub const EMPTY: Self = Self {
        material: MaterialId::EMPTY,
        hit_points: 0,
    };

    pub const fn new(material: u16, hit_points: u16) -> Self {
        Self {
            material: MaterialId(material),
            hit_points,
        }
    }

    /// A cell of the given material with no hit-point budget.
    pub const fn solid(material: u16) -> Self {
        Self::new(material, 0)
    }

    pub fn is_empty(self) -> bool {
        self.material.is_empty()
    }

    /// Empty cells collapse to `EMPTY` so stale hit points are never stored.
    pub fn normalized(self) -> Self {
        if self.is_empty() {
            Self::EMPTY
        } else {
            self
        }
    }
}

/// A single applied cell write, as reported to change listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellChange {
    pub coord: WorldCoord,
    pub voxel: Voxel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voxel_size() {
        assert_eq!(
            std::mem::size_of::<Voxel>() as u32,
            crate::constants::CELL_BYTES
        );
    }

    #[test]
    fn test_emptiness_is_material_only() {
        assert!(Voxel::EMPTY.is_empty());
        assert!(Voxel::new(0, 40).is_empty(), "hit points do not make a cell solid");
        assert!(!Voxel::solid(3).is_empty());
        assert!(Voxel::default().is_empty());
    }

    #[test]
    fn test_normalized_drops_empty_hit_points() {
        assert_eq!(Voxel::new(0, 7).normalized(), Voxel::EMPTY);
        assert_eq!(Voxel::new(2, 7).normalized(), Voxel::new(2, 7));
    }
}
