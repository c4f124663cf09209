//! Built-in data shipped with the crate.

use rubble_core::config::WorldConfig;
use rubble_core::material::MaterialTable;

use crate::loader::{load_config_from_str, load_materials_from_str, LoadError};
use crate::validator::{validate_materials, ValidationError};

pub const BASE_MATERIALS_RON: &str = include_str!("../../../data/materials/base.ron");
pub const WORLD_CONFIG_RON: &str = include_str!("../../../data/config/world.ron");

/// The base material set, parsed and validated.
pub fn default_materials() -> Result<MaterialTable, DefaultsError> {
    let table = load_materials_from_str(BASE_MATERIALS_RON)?;
    validate_materials(&table).map_err(DefaultsError::Invalid)?;
    Ok(table)
}

/// The shipped world config.
pub fn default_config() -> Result<WorldConfig, LoadError> {
    load_config_from_str(WORLD_CONFIG_RON)
}

#[derive(Debug, thiserror::Error)]
pub enum DefaultsError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("{} material validation error(s)", .0.len())]
    Invalid(Vec<ValidationError>),
}
