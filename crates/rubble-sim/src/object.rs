//! A separated object: cells split off from the world, now owned privately.

use glam::{IVec3, Vec3};
use rubble_core::config::ObjectConfig;
use rubble_core::math::CellSpace;
use rubble_core::types::{Voxel, WorldCoord};

use crate::grid::VoxelGrid;
use crate::shape::DestructionShape;

pub type ObjectId = u64;

/// Where an object is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectState {
    Alive,
    /// Count is at or below the low-count threshold; removal when the
    /// remaining time runs out.
    Expiring { remaining: f32 },
    /// No cells left, or the low-count timer ran out.
    Expired,
}

/// Independently owned voxel sub-grid positioned in world space.
///
/// Local cell `l` started out as world cell `origin + l`. The object's
/// `position` is the world position of local cell (0,0,0)'s min corner and
/// moves freely once the object is handed to physics.
#[derive(Debug, Clone)]
pub struct SeparatedObject {
    id: ObjectId,
    origin: WorldCoord,
    position: Vec3,
    space: CellSpace,
    grid: VoxelGrid,
    policy: ObjectConfig,
    state: ObjectState,
}

impl SeparatedObject {
    pub fn new(
        id: ObjectId,
        origin: WorldCoord,
        grid: VoxelGrid,
        space: CellSpace,
        policy: ObjectConfig,
    ) -> Self {
        let mut object = Self {
            id,
            origin,
            position: space.cell_min_corner(origin),
            space,
            grid,
            policy,
            state: ObjectState::Alive,
        };
        object.update_state();
        object
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// World cell the grid's local origin was extracted from.
    pub fn origin(&self) -> WorldCoord {
        self.origin
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn cell_count(&self) -> u32 {
        self.grid.non_empty_count()
    }

    pub fn state(&self) -> ObjectState {
        self.state
    }

    pub fn is_expired(&self) -> bool {
        self.state == ObjectState::Expired
    }

    /// World-space extent of the grid.
    pub fn size(&self) -> Vec3 {
        self.grid.dims().as_vec3() * self.space.cell_size()
    }

    /// World-space center of the grid.
    pub fn center(&self) -> Vec3 {
        self.position + self.size() * 0.5
    }

    pub fn get(&self, local: IVec3) -> Voxel {
        self.grid.get(local)
    }

    /// Write one local cell.
    pub fn set_cell(&mut self, local: IVec3, voxel: Voxel) -> bool {
        let changed = self.grid.set(local, voxel);
        if changed {
            self.update_state();
        }
        changed
    }

    /// Clear the listed local cells, returning how many were solid.
    pub fn destroy_cells(&mut self, locals: &[IVec3]) -> usize {
        let destroyed = locals
            .iter()
            .filter(|local| self.grid.set(**local, Voxel::EMPTY))
            .count();
        if destroyed > 0 {
            self.update_state();
        }
        destroyed
    }

    /// Clear the cells a world-space shape covers, using the object's
    /// current position as its frame. Volumes are tested against the
    /// object's own cells, so the work is bounded by the object's size.
    pub fn destroy_shape(&mut self, shape: &DestructionShape) -> usize {
        let local_shape = shape.translated(-self.position);
        let locals: Vec<IVec3> = match &local_shape {
            DestructionShape::Points(_) => local_shape.resolve(&self.space),
            _ => self
                .grid
                .solid_cells()
                .map(|(local, _)| local)
                .filter(|local| local_shape.covers(&self.space, *local))
                .collect(),
        };
        self.destroy_cells(&locals)
    }

    /// Re-derive the lifetime state from the cell count.
    ///
    /// The first drop to the low-count threshold arms the timer; later
    /// changes that stay low leave it running. Rising back above the
    /// threshold disarms it.
    fn update_state(&mut self) {
        if self.state == ObjectState::Expired {
            return;
        }
        let count = self.grid.non_empty_count();
        if count == 0 {
            self.state = ObjectState::Expired;
            return;
        }
        let low = count <= self.policy.low_count_threshold;
        self.state = match (self.state, low) {
            (ObjectState::Alive, true) => ObjectState::Expiring {
                remaining: self.policy.low_count_timeout_secs,
            },
            (ObjectState::Expiring { .. }, false) => ObjectState::Alive,
            (state, _) => state,
        };
    }

    /// Advance the low-count timer. Returns true once the object has expired.
    pub fn tick(&mut self, dt: f32) -> bool {
        if let ObjectState::Expiring { remaining } = self.state {
            let remaining = remaining - dt.max(0.0);
            self.state = if remaining <= 0.0 {
                ObjectState::Expired
            } else {
                ObjectState::Expiring { remaining }
            };
        }
        self.is_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec3;

    fn policy() -> ObjectConfig {
        ObjectConfig {
            low_count_threshold: 2,
            low_count_timeout_secs: 3.0,
        }
    }

    fn bar(len: u32) -> SeparatedObject {
        let mut grid = VoxelGrid::new(UVec3::new(len, 1, 1));
        for x in 0..len {
            grid.set(IVec3::new(x as i32, 0, 0), Voxel::solid(1));
        }
        SeparatedObject::new(1, IVec3::new(10, 5, 0), grid, CellSpace::new(1.0), policy())
    }

    #[test]
    fn test_position_starts_at_origin_corner() {
        let object = bar(4);
        assert_eq!(object.position(), Vec3::new(10.0, 5.0, 0.0));
        assert_eq!(object.center(), Vec3::new(12.0, 5.5, 0.5));
        assert_eq!(object.state(), ObjectState::Alive);
    }

    #[test]
    fn test_destroy_to_zero_expires_immediately() {
        let mut object = bar(3);
        let all: Vec<IVec3> = (0..3).map(|x| IVec3::new(x, 0, 0)).collect();
        assert_eq!(object.destroy_cells(&all), 3);
        assert!(object.is_expired());
        assert_eq!(object.destroy_cells(&all), 0);
    }

    #[test]
    fn test_shape_uses_current_position() {
        let mut object = bar(4);
        object.set_position(Vec3::new(100.0, 0.0, 0.0));
        // World point inside local cell (1,0,0) at the new position
        let hit = object.destroy_shape(&DestructionShape::point(Vec3::new(101.5, 0.5, 0.5)));
        assert_eq!(hit, 1);
        assert!(object.get(IVec3::new(1, 0, 0)).is_empty());
        // The old location no longer maps onto the object
        let miss = object.destroy_shape(&DestructionShape::point(Vec3::new(12.5, 5.5, 0.5)));
        assert_eq!(miss, 0);
    }

    #[test]
    fn test_huge_shape_clears_whole_object() {
        let mut object = bar(4);
        let blast = DestructionShape::sphere(object.center(), 1.0e9);
        assert_eq!(object.destroy_shape(&blast), 4);
        assert!(object.is_expired());
    }

    #[test]
    fn test_volume_shape_hits_only_covered_cells() {
        let mut object = bar(4);
        // Box over world cells x=11..=13 of the bar at (10,5,0)
        let shape = DestructionShape::cuboid(Vec3::new(12.0, 5.5, 0.5), Vec3::new(2.0, 1.0, 1.0));
        assert_eq!(object.destroy_shape(&shape), 3);
        assert!(object.get(IVec3::new(1, 0, 0)).is_empty());
        assert!(object.get(IVec3::new(3, 0, 0)).is_empty());
        assert!(!object.get(IVec3::new(0, 0, 0)).is_empty());
    }

    #[test]
    fn test_low_count_timer_first_cross_wins() {
        let mut object = bar(4);
        object.destroy_cells(&[IVec3::new(0, 0, 0), IVec3::new(1, 0, 0)]);
        assert_eq!(object.state(), ObjectState::Expiring { remaining: 3.0 });
        assert!(!object.tick(2.0));

        // Still low: the running timer is not re-armed
        object.destroy_cells(&[IVec3::new(2, 0, 0)]);
        assert_eq!(object.state(), ObjectState::Expiring { remaining: 1.0 });
        assert!(object.tick(1.0));
    }

    #[test]
    fn test_rising_count_disarms_timer() {
        let mut object = bar(3);
        object.destroy_cells(&[IVec3::new(0, 0, 0)]);
        assert!(matches!(object.state(), ObjectState::Expiring { .. }));
        object.set_cell(IVec3::new(0, 0, 0), Voxel::solid(2));
        assert_eq!(object.state(), ObjectState::Alive);
        assert!(!object.tick(10.0));
    }

    #[test]
    fn test_small_object_starts_expiring() {
        let object = bar(1);
        assert!(matches!(object.state(), ObjectState::Expiring { .. }));
    }
}
