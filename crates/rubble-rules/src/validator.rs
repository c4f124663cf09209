use rubble_core::constants::EMPTY_MATERIAL;
use rubble_core::material::MaterialTable;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate material ID {0}")]
    DuplicateMaterialId(u16),
    #[error("Material '{name}' redefines the empty material ID 0")]
    EmptyRedefined { name: String },
    #[error("Material '{name}' has negative or non-finite hardness {value}")]
    InvalidHardness { name: String, value: f32 },
    #[error("Material '{name}' has zero hit points")]
    ZeroHitPoints { name: String },
}

/// Validate a material table before it is handed to the world.
pub fn validate_materials(table: &MaterialTable) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen_ids = HashSet::new();
    for mat in &table.materials {
        if !seen_ids.insert(mat.id) {
            errors.push(ValidationError::DuplicateMaterialId(mat.id));
        }
    }

    for mat in &table.materials {
        if mat.id == EMPTY_MATERIAL {
            errors.push(ValidationError::EmptyRedefined {
                name: mat.name.clone(),
            });
            continue;
        }
        if !(mat.hardness.is_finite() && mat.hardness >= 0.0) {
            errors.push(ValidationError::InvalidHardness {
                name: mat.name.clone(),
                value: mat.hardness,
            });
        }
        if mat.hit_points == 0 {
            errors.push(ValidationError::ZeroHitPoints {
                name: mat.name.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        for error in &errors {
            log::warn!("{error}");
        }
        Err(errors)
    }
}
