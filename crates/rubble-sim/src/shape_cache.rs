use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::shape::{box_cells, point_cells, sphere_cells, DestructionShape, ShapeKind};
use glam::IVec3;
use rubble_core::math::CellSpace;
use rubble_core::types::WorldCoord;

/// Quantized shape parameters. Equal keys always resolve to equal cell sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CacheKey {
    Sphere { center: IVec3, radius: u32 },
    Box { center: IVec3, size: [u32; 3] },
}

impl CacheKey {
    fn kind(&self) -> ShapeKind {
        match self {
            CacheKey::Sphere { .. } => ShapeKind::Sphere,
            CacheKey::Box { .. } => ShapeKind::Box,
        }
    }
}

// Adding 0.0 folds -0.0 into 0.0 so both hash the same.
fn float_key(value: f32) -> u32 {
    (value + 0.0).to_bits()
}

/// Memoized shape resolution, bounded per shape kind.
///
/// Sphere and box resolutions are keyed by their center cell and extent.
/// Once a kind holds more than `capacity` entries the oldest is evicted.
/// Point lists are resolved directly and never cached.
pub struct ShapeCache {
    space: CellSpace,
    capacity: usize,
    entries: HashMap<CacheKey, Arc<[WorldCoord]>>,
    spheres: VecDeque<CacheKey>,
    boxes: VecDeque<CacheKey>,
    hits: u64,
    misses: u64,
}

impl ShapeCache {
    pub fn new(space: CellSpace, capacity: usize) -> Self {
        Self {
            space,
            capacity: capacity.max(1),
            entries: HashMap::new(),
            spheres: VecDeque::new(),
            boxes: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn cell_space(&self) -> &CellSpace {
        &self.space
    }

    /// Cells covered by `shape`.
    pub fn resolve(&mut self, shape: &DestructionShape) -> Arc<[WorldCoord]> {
        let key = match shape {
            DestructionShape::Points(points) => return point_cells(&self.space, points).into(),
            DestructionShape::Sphere { center, radius } => CacheKey::Sphere {
                center: self.space.position_to_cell(*center),
                radius: float_key(*radius),
            },
            DestructionShape::Box { center, size } => CacheKey::Box {
                center: self.space.position_to_cell(*center),
                size: [float_key(size.x), float_key(size.y), float_key(size.z)],
            },
        };

        if let Some(cells) = self.entries.get(&key) {
            self.hits += 1;
            return Arc::clone(cells);
        }
        self.misses += 1;

        let cells: Arc<[WorldCoord]> = match (key, shape) {
            (CacheKey::Sphere { center, .. }, DestructionShape::Sphere { radius, .. }) => {
                sphere_cells(&self.space, center, *radius).into()
            }
            (CacheKey::Box { center, .. }, DestructionShape::Box { size, .. }) => {
                box_cells(&self.space, center, *size).into()
            }
            _ => shape.resolve(&self.space).into(),
        };
        self.insert(key, Arc::clone(&cells));
        cells
    }

    fn insert(&mut self, key: CacheKey, cells: Arc<[WorldCoord]>) {
        let order = match key.kind() {
            ShapeKind::Box => &mut self.boxes,
            _ => &mut self.spheres,
        };
        order.push_back(key);
        self.entries.insert(key, cells);
        while order.len() > self.capacity {
            if let Some(oldest) = order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    /// Cached entries for one shape kind.
    pub fn len_of(&self, kind: ShapeKind) -> usize {
        match kind {
            ShapeKind::Sphere => self.spheres.len(),
            ShapeKind::Box => self.boxes.len(),
            ShapeKind::Points => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.spheres.clear();
        self.boxes.clear();
    }
}
