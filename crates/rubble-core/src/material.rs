use serde::{Deserialize, Serialize};

use crate::types::{MaterialId, Voxel};

/// A single material definition loaded from RON data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDef {
    /// Stable material ID. 0 = empty and must not be redefined.
    pub id: u16,
    /// Human-readable name for debug display.
    pub name: String,
    /// Minimum attack power needed to remove a cell of this material.
    #[serde(default)]
    pub hardness: f32,
    /// Hit-point budget stamped onto new cells of this material.
    #[serde(default = "default_hit_points")]
    pub hit_points: u16,
    /// Never removed by destruction requests, whatever the power.
    #[serde(default)]
    pub indestructible: bool,
    /// Cells of this material hold up whatever they touch (bedrock, foundations).
    #[serde(default)]
    pub anchors: bool,
}

fn default_hit_points() -> u16 {
    1
}

/// Material rule lookup used by the destruction pipeline.
pub trait Destructibility {
    /// Whether `power` is enough to remove a cell of `material`.
    fn can_destroy(&self, material: MaterialId, power: f32) -> bool;
}

/// Collection of material definitions indexed by ID.
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    pub materials: Vec<MaterialDef>,
}

impl MaterialTable {
    /// Look up a material by ID. Returns None if not found.
    pub fn get(&self, id: u16) -> Option<&MaterialDef> {
        self.materials.iter().find(|m| m.id == id)
    }

    /// Get the maximum material ID in the table.
    pub fn max_id(&self) -> u16 {
        self.materials.iter().map(|m| m.id).max().unwrap_or(0)
    }

    /// Number of materials.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Build a cell of the given material with its hit-point budget.
    /// Unknown materials get a budget of 1.
    pub fn voxel(&self, id: u16) -> Voxel {
        if id == 0 {
            return Voxel::EMPTY;
        }
        let hit_points = self.get(id).map_or_else(default_hit_points, |m| m.hit_points);
        Voxel::new(id, hit_points)
    }

    /// IDs of all materials flagged as anchors.
    pub fn anchor_ids(&self) -> Vec<u16> {
        self.materials
            .iter()
            .filter(|m| m.anchors && m.id != 0)
            .map(|m| m.id)
            .collect()
    }
}

impl Destructibility for MaterialTable {
    /// Unknown materials behave as hardness 0.
    fn can_destroy(&self, material: MaterialId, power: f32) -> bool {
        if material.is_empty() {
            return false;
        }
        match self.get(material.0) {
            Some(def) => !def.indestructible && def.hardness <= power,
            None => power >= 0.0,
        }
    }
}

/// Rule that removes any non-empty cell. Handy for tools and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDestructible;

impl Destructibility for AlwaysDestructible {
    fn can_destroy(&self, material: MaterialId, _power: f32) -> bool {
        !material.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(id: u16, name: &str, hardness: f32) -> MaterialDef {
        MaterialDef {
            id,
            name: name.into(),
            hardness,
            hit_points: 10,
            indestructible: false,
            anchors: false,
        }
    }

    fn sample_table() -> MaterialTable {
        let mut bedrock = def(9, "Bedrock", 0.0);
        bedrock.indestructible = true;
        bedrock.anchors = true;
        MaterialTable {
            materials: vec![def(1, "Stone", 5.0), def(2, "Dirt", 1.0), bedrock],
        }
    }

    #[test]
    fn test_material_table_get() {
        let table = sample_table();
        assert!(table.get(2).is_some());
        assert!(table.get(99).is_none());
        assert_eq!(table.max_id(), 9);
    }

    #[test]
    fn test_hardness_threshold() {
        let table = sample_table();
        assert!(!table.can_destroy(MaterialId(1), 4.9));
        assert!(table.can_destroy(MaterialId(1), 5.0), "threshold is inclusive");
        assert!(table.can_destroy(MaterialId(2), 1.0));
    }

    #[test]
    fn test_indestructible_and_empty() {
        let table = sample_table();
        assert!(!table.can_destroy(MaterialId(9), f32::MAX));
        assert!(!table.can_destroy(MaterialId::EMPTY, 100.0));
        assert!(table.can_destroy(MaterialId(77), 0.0), "unknown = hardness 0");
    }

    #[test]
    fn test_voxel_uses_hit_points() {
        let table = sample_table();
        assert_eq!(table.voxel(1), Voxel::new(1, 10));
        assert_eq!(table.voxel(0), Voxel::EMPTY);
        assert_eq!(table.voxel(50), Voxel::new(50, 1));
        assert_eq!(table.anchor_ids(), vec![9]);
    }
}
