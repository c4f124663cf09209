//! Destruction shapes and their resolution to cell coordinates.

use glam::{IVec3, Vec3};
use rubble_core::math::CellSpace;
use rubble_core::types::WorldCoord;
use std::collections::HashSet;
use thiserror::Error;

/// Region a destruction request removes, in world units.
#[derive(Debug, Clone, PartialEq)]
pub enum DestructionShape {
    /// Explicit points; each removes the cell containing it.
    Points(Vec<Vec3>),
    /// Cells whose centers lie within `radius` of `center`.
    Sphere { center: Vec3, radius: f32 },
    /// Cells whose centers lie inside the axis-aligned box.
    Box { center: Vec3, size: Vec3 },
}

/// Which variant a shape is; the shape cache keeps one bucket per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Points,
    Sphere,
    Box,
}

#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("Shape contains a non-finite coordinate")]
    NonFinite,
    #[error("Sphere radius must not be negative, got {0}")]
    NegativeRadius(f32),
    #[error("Box size must not be negative, got {0}")]
    NegativeSize(Vec3),
    #[error("Shape extent {extent} exceeds the limit of {max}")]
    TooLarge { extent: f32, max: f32 },
}

fn finite(v: Vec3) -> bool {
    v.is_finite()
}

impl DestructionShape {
    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self::Sphere { center, radius }
    }

    pub fn cuboid(center: Vec3, size: Vec3) -> Self {
        Self::Box { center, size }
    }

    pub fn point(point: Vec3) -> Self {
        Self::Points(vec![point])
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Points(_) => ShapeKind::Points,
            Self::Sphere { .. } => ShapeKind::Sphere,
            Self::Box { .. } => ShapeKind::Box,
        }
    }

    /// Reject shapes that cannot be resolved. Empty point lists are valid.
    pub fn validate(&self) -> Result<(), ShapeError> {
        match self {
            Self::Points(points) => {
                if points.iter().all(|p| finite(*p)) {
                    Ok(())
                } else {
                    Err(ShapeError::NonFinite)
                }
            }
            Self::Sphere { center, radius } => {
                if !finite(*center) || !radius.is_finite() {
                    return Err(ShapeError::NonFinite);
                }
                if *radius < 0.0 {
                    return Err(ShapeError::NegativeRadius(*radius));
                }
                Ok(())
            }
            Self::Box { center, size } => {
                if !finite(*center) || !finite(*size) {
                    return Err(ShapeError::NonFinite);
                }
                if size.cmplt(Vec3::ZERO).any() {
                    return Err(ShapeError::NegativeSize(*size));
                }
                Ok(())
            }
        }
    }

    /// `validate`, plus a bound on the widest span of the shape.
    pub fn validate_within(&self, max_extent: f32) -> Result<(), ShapeError> {
        self.validate()?;
        let extent = self.extent();
        if extent > max_extent {
            return Err(ShapeError::TooLarge {
                extent,
                max: max_extent,
            });
        }
        Ok(())
    }

    /// Widest span along any axis, in world units. Points have none.
    pub fn extent(&self) -> f32 {
        match self {
            Self::Points(_) => 0.0,
            Self::Sphere { radius, .. } => radius.max(0.0) * 2.0,
            Self::Box { size, .. } => size.max_element().max(0.0),
        }
    }

    /// Whether `cell` is one `resolve` would produce.
    pub fn covers(&self, space: &CellSpace, cell: WorldCoord) -> bool {
        match self {
            Self::Points(points) => points.iter().any(|p| space.position_to_cell(*p) == cell),
            Self::Sphere { center, radius } => {
                let radius = radius.max(0.0);
                let origin = space.cell_center(space.position_to_cell(*center));
                space.cell_center(cell).distance_squared(origin) <= radius * radius
            }
            Self::Box { center, size } => {
                let half = size.max(Vec3::ZERO) * 0.5;
                let origin = space.cell_center(space.position_to_cell(*center));
                (space.cell_center(cell) - origin).abs().cmple(half).all()
            }
        }
    }

    /// Whether the shape can cover no cells at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Points(points) if points.is_empty())
    }

    /// Stable origin for effects: the first point, or the center.
    pub fn representative_point(&self) -> Option<Vec3> {
        match self {
            Self::Points(points) => points.first().copied(),
            Self::Sphere { center, .. } | Self::Box { center, .. } => Some(*center),
        }
    }

    /// Cell holding the representative point.
    pub fn representative_cell(&self, space: &CellSpace) -> Option<WorldCoord> {
        self.representative_point()
            .map(|p| space.position_to_cell(p))
    }

    /// The same shape moved by `offset`.
    pub fn translated(&self, offset: Vec3) -> Self {
        match self {
            Self::Points(points) => Self::Points(points.iter().map(|p| *p + offset).collect()),
            Self::Sphere { center, radius } => Self::Sphere {
                center: *center + offset,
                radius: *radius,
            },
            Self::Box { center, size } => Self::Box {
                center: *center + offset,
                size: *size,
            },
        }
    }

    /// Resolve to cell coordinates without caching. Work grows with the cube
    /// of the extent, so unbounded shapes should pass `validate_within` first.
    pub fn resolve(&self, space: &CellSpace) -> Vec<WorldCoord> {
        match self {
            Self::Points(points) => point_cells(space, points),
            Self::Sphere { center, radius } => {
                sphere_cells(space, space.position_to_cell(*center), *radius)
            }
            Self::Box { center, size } => box_cells(space, space.position_to_cell(*center), *size),
        }
    }
}

/// Cells containing each point, first occurrence order, no duplicates.
pub fn point_cells(space: &CellSpace, points: &[Vec3]) -> Vec<WorldCoord> {
    let mut seen = HashSet::with_capacity(points.len());
    points
        .iter()
        .map(|p| space.position_to_cell(*p))
        .filter(|cell| seen.insert(*cell))
        .collect()
}

/// Cells whose centers lie within `radius` of the center of `center_cell`.
///
/// Depends only on the quantized center and the radius, which is what lets
/// the cache key on them. The center cell is always included.
pub fn sphere_cells(space: &CellSpace, center_cell: IVec3, radius: f32) -> Vec<WorldCoord> {
    let radius = radius.max(0.0);
    let origin = space.cell_center(center_cell);
    let reach = (radius / space.cell_size()).ceil() as i32;
    let radius_sq = radius * radius;
    let mut cells = Vec::new();
    for dz in -reach..=reach {
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let cell = center_cell + IVec3::new(dx, dy, dz);
                if space.cell_center(cell).distance_squared(origin) <= radius_sq {
                    cells.push(cell);
                }
            }
        }
    }
    cells
}

/// Cells whose centers lie inside a box of `size` centered on `center_cell`.
pub fn box_cells(space: &CellSpace, center_cell: IVec3, size: Vec3) -> Vec<WorldCoord> {
    let half = size.max(Vec3::ZERO) * 0.5;
    let origin = space.cell_center(center_cell);
    let reach = (half / space.cell_size()).ceil().as_ivec3();
    let mut cells = Vec::new();
    for dz in -reach.z..=reach.z {
        for dy in -reach.y..=reach.y {
            for dx in -reach.x..=reach.x {
                let cell = center_cell + IVec3::new(dx, dy, dz);
                let offset = (space.cell_center(cell) - origin).abs();
                if offset.cmple(half).all() {
                    cells.push(cell);
                }
            }
        }
    }
    cells
}
