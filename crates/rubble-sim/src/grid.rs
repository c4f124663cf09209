use glam::{IVec3, UVec3};
use rubble_core::types::Voxel;

/// Small dense voxel grid owned by a separated object.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    dims: UVec3,
    cells: Vec<Voxel>,
    non_empty: u32,
}

impl VoxelGrid {
    /// All-empty grid. Zero-sized axes are bumped to 1.
    pub fn new(dims: UVec3) -> Self {
        let dims = dims.max(UVec3::ONE);
        Self {
            dims,
            cells: vec![Voxel::EMPTY; (dims.x * dims.y * dims.z) as usize],
            non_empty: 0,
        }
    }

    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    pub fn in_bounds(&self, local: IVec3) -> bool {
        local.cmpge(IVec3::ZERO).all() && local.as_uvec3().cmplt(self.dims).all()
    }

    fn index(&self, local: IVec3) -> usize {
        let l = local.as_uvec3();
        (l.x + l.y * self.dims.x + l.z * self.dims.x * self.dims.y) as usize
    }

    /// Out-of-range reads are empty.
    pub fn get(&self, local: IVec3) -> Voxel {
        if !self.in_bounds(local) {
            return Voxel::EMPTY;
        }
        self.cells[self.index(local)]
    }

    /// Returns false when out of range or unchanged.
    pub fn set(&mut self, local: IVec3, voxel: Voxel) -> bool {
        if !self.in_bounds(local) {
            return false;
        }
        let voxel = voxel.normalized();
        let index = self.index(local);
        let previous = self.cells[index];
        if previous == voxel || (previous.is_empty() && voxel.is_empty()) {
            return false;
        }
        self.cells[index] = voxel;
        match (previous.is_empty(), voxel.is_empty()) {
            (true, false) => self.non_empty += 1,
            (false, true) => self.non_empty -= 1,
            _ => {}
        }
        true
    }

    pub fn non_empty_count(&self) -> u32 {
        self.non_empty
    }

    pub fn is_empty(&self) -> bool {
        self.non_empty == 0
    }

    /// Every non-empty cell with its local coordinate.
    pub fn solid_cells(&self) -> impl Iterator<Item = (IVec3, Voxel)> + '_ {
        let dims = self.dims;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_empty())
            .map(move |(i, v)| {
                let i = i as u32;
                let local = UVec3::new(i % dims.x, (i / dims.x) % dims.y, i / (dims.x * dims.y));
                (local.as_ivec3(), *v)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_bounds_and_count() {
        let mut grid = VoxelGrid::new(UVec3::new(3, 2, 1));
        assert!(grid.set(IVec3::new(2, 1, 0), Voxel::solid(1)));
        assert!(!grid.set(IVec3::new(3, 0, 0), Voxel::solid(1)));
        assert!(!grid.set(IVec3::new(-1, 0, 0), Voxel::solid(1)));
        assert_eq!(grid.non_empty_count(), 1);
        assert_eq!(grid.get(IVec3::new(2, 1, 0)), Voxel::solid(1));
        assert!(grid.get(IVec3::new(0, 0, 5)).is_empty());
        assert!(grid.set(IVec3::new(2, 1, 0), Voxel::EMPTY));
        assert!(grid.is_empty());
    }

    #[test]
    fn test_solid_cells_reports_local_coords() {
        let mut grid = VoxelGrid::new(UVec3::new(2, 3, 4));
        grid.set(IVec3::new(1, 2, 3), Voxel::solid(5));
        grid.set(IVec3::new(0, 1, 0), Voxel::solid(6));
        let mut cells: Vec<_> = grid.solid_cells().collect();
        cells.sort_by_key(|(c, _)| c.to_array());
        assert_eq!(
            cells,
            vec![
                (IVec3::new(0, 1, 0), Voxel::solid(6)),
                (IVec3::new(1, 2, 3), Voxel::solid(5))
            ]
        );
    }

    #[test]
    fn test_empty_writes_ignore_hit_points() {
        let mut grid = VoxelGrid::new(UVec3::new(2, 2, 2));
        assert!(!grid.set(IVec3::ZERO, Voxel::new(0, 7)));
        assert!(grid.set(IVec3::ZERO, Voxel::new(3, 4)));
        assert!(grid.set(IVec3::ZERO, Voxel::new(0, 4)));
        assert_eq!(grid.get(IVec3::ZERO), Voxel::EMPTY);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_zero_dims_bumped() {
        assert_eq!(VoxelGrid::new(UVec3::ZERO).dims(), UVec3::ONE);
    }
}
