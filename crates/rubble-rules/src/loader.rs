use rubble_core::config::WorldConfig;
use rubble_core::error::RubbleError;
use rubble_core::material::{MaterialDef, MaterialTable};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to parse materials RON: {0}")]
    MaterialParseError(String),
    #[error("Failed to parse world config RON: {0}")]
    ConfigParseError(String),
    #[error("World config rejected: {0}")]
    InvalidConfig(#[from] RubbleError),
}

/// Parse a single materials RON string into a MaterialTable.
pub fn load_materials_from_str(ron_str: &str) -> Result<MaterialTable, LoadError> {
    let options = ron::Options::default();
    let materials: Vec<MaterialDef> = options
        .from_str(ron_str)
        .map_err(|e| LoadError::MaterialParseError(e.to_string()))?;
    Ok(MaterialTable { materials })
}

/// Load and merge multiple material sources into a single MaterialTable.
/// Later sources may not redefine earlier ids; run the validator to catch that.
pub fn load_all_materials(sources: &[&str]) -> Result<MaterialTable, LoadError> {
    let mut all_materials = Vec::new();
    for source in sources {
        let table = load_materials_from_str(source)?;
        all_materials.extend(table.materials);
    }
    log::debug!(
        "Loaded {} material(s) from {} source(s)",
        all_materials.len(),
        sources.len()
    );
    Ok(MaterialTable {
        materials: all_materials,
    })
}

/// Parse a world config from RON. Missing fields take their defaults and
/// the result is validated before it is returned.
pub fn load_config_from_str(ron_str: &str) -> Result<WorldConfig, LoadError> {
    let options = ron::Options::default();
    let config: WorldConfig = options
        .from_str(ron_str)
        .map_err(|e| LoadError::ConfigParseError(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
