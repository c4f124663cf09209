use glam::{IVec3, Vec3};
use rubble_core::material::MaterialTable;
use rubble_core::types::Voxel;
use rubble_sim::shape::DestructionShape;
use rubble_world::ChunkMap;

/// Material ids from the base set.
const STONE: u16 = 1;
const WOOD: u16 = 3;
const BEDROCK: u16 = 6;

/// Attack power of every scripted strike; enough for all but bedrock.
pub const STRIKE_POWER: f32 = 10.0;

/// Layout of a benchmark scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneKind {
    /// Solid 3x3 column; the strike severs it near the base.
    Pillar { height: i32 },
    /// Two posts joined by a deck; the strike cuts one post.
    Bridge { span: i32 },
    /// Solid ground slab; the strike craters its middle.
    Slab { size: i32, depth: i32 },
    /// Hollow square tower; a box strike cuts all four walls.
    Tower { width: i32, height: i32 },
}

/// Configuration for a single benchmark scene.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub name: &'static str,
    pub kind: SceneKind,
}

/// Return the standard suite of destruction scenes.
pub fn standard_scenes() -> Vec<SceneConfig> {
    vec![
        SceneConfig {
            name: "pillar",
            kind: SceneKind::Pillar { height: 24 },
        },
        SceneConfig {
            name: "bridge",
            kind: SceneKind::Bridge { span: 40 },
        },
        SceneConfig {
            name: "slab",
            kind: SceneKind::Slab { size: 64, depth: 6 },
        },
        SceneConfig {
            name: "tower",
            kind: SceneKind::Tower {
                width: 10,
                height: 40,
            },
        },
    ]
}

fn fill(chunks: &mut ChunkMap, min: IVec3, max: IVec3, voxel: Voxel) -> u32 {
    let mut placed = 0;
    for z in min.z..=max.z {
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                if chunks.set_cell(IVec3::new(x, y, z), voxel) {
                    placed += 1;
                }
            }
        }
    }
    placed
}

/// Bedrock floor at y = 0 under the scene footprint.
fn floor(chunks: &mut ChunkMap, materials: &MaterialTable, min: IVec3, max: IVec3) -> u32 {
    fill(
        chunks,
        IVec3::new(min.x, 0, min.z),
        IVec3::new(max.x, 0, max.z),
        materials.voxel(BEDROCK),
    )
}

impl SceneConfig {
    /// Build the scene into `chunks`. Returns the number of cells placed.
    pub fn populate(&self, chunks: &mut ChunkMap, materials: &MaterialTable) -> u32 {
        let stone = materials.voxel(STONE);
        match self.kind {
            SceneKind::Pillar { height } => {
                floor(chunks, materials, IVec3::ZERO, IVec3::new(2, 0, 2))
                    + fill(chunks, IVec3::new(0, 1, 0), IVec3::new(2, height, 2), stone)
            }
            SceneKind::Bridge { span } => {
                let deck_y = 12;
                floor(chunks, materials, IVec3::ZERO, IVec3::new(span, 0, 2))
                    + fill(chunks, IVec3::new(0, 1, 0), IVec3::new(2, deck_y - 1, 2), stone)
                    + fill(
                        chunks,
                        IVec3::new(span - 2, 1, 0),
                        IVec3::new(span, deck_y - 1, 2),
                        stone,
                    )
                    + fill(
                        chunks,
                        IVec3::new(0, deck_y, 0),
                        IVec3::new(span, deck_y + 1, 2),
                        materials.voxel(WOOD),
                    )
            }
            SceneKind::Slab { size, depth } => {
                floor(chunks, materials, IVec3::ZERO, IVec3::new(size - 1, 0, size - 1))
                    + fill(
                        chunks,
                        IVec3::new(0, 1, 0),
                        IVec3::new(size - 1, depth, size - 1),
                        stone,
                    )
            }
            SceneKind::Tower { width, height } => {
                let last = width - 1;
                let mut placed = floor(chunks, materials, IVec3::ZERO, IVec3::new(last, 0, last));
                placed += fill(chunks, IVec3::new(0, 1, 0), IVec3::new(last, height, 0), stone);
                placed += fill(chunks, IVec3::new(0, 1, last), IVec3::new(last, height, last), stone);
                placed += fill(chunks, IVec3::new(0, 1, 1), IVec3::new(0, height, last - 1), stone);
                placed += fill(chunks, IVec3::new(last, 1, 1), IVec3::new(last, height, last - 1), stone);
                placed
            }
        }
    }

    /// Shapes fired at the scene once it is built.
    pub fn strikes(&self) -> Vec<DestructionShape> {
        match self.kind {
            SceneKind::Pillar { .. } => vec![DestructionShape::sphere(Vec3::new(1.5, 3.5, 1.5), 1.5)],
            SceneKind::Bridge { span } => vec![DestructionShape::cuboid(
                Vec3::new(span as f32 - 0.5, 5.5, 1.5),
                Vec3::new(3.0, 2.0, 3.0),
            )],
            SceneKind::Slab { size, depth } => {
                let middle = size as f32 * 0.5;
                vec![
                    DestructionShape::sphere(Vec3::new(middle, depth as f32, middle), 5.0),
                    DestructionShape::sphere(Vec3::new(middle * 0.5, depth as f32, middle), 3.0),
                ]
            }
            SceneKind::Tower { width, .. } => {
                let middle = width as f32 * 0.5;
                vec![DestructionShape::cuboid(
                    Vec3::new(middle, 3.5, middle),
                    Vec3::new(width as f32 + 2.0, 2.0, width as f32 + 2.0),
                )]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rubble_rules::default_materials;

    #[test]
    fn test_scenes_populate() {
        let materials = default_materials().expect("base materials");
        for scene in standard_scenes() {
            let mut chunks = ChunkMap::new();
            let placed = scene.populate(&mut chunks, &materials);
            assert!(placed > 0, "scene '{}' placed nothing", scene.name);
            assert_eq!(u64::from(placed), chunks.total_non_empty());
            assert!(!scene.strikes().is_empty());
        }
    }

    #[test]
    fn test_pillar_layout() {
        let materials = default_materials().expect("base materials");
        let scene = SceneConfig {
            name: "pillar",
            kind: SceneKind::Pillar { height: 10 },
        };
        let mut chunks = ChunkMap::new();
        assert_eq!(scene.populate(&mut chunks, &materials), 9 + 90);
        assert_eq!(chunks.get_cell(IVec3::new(1, 0, 1)).material.0, BEDROCK);
    }
}
