//! Shared types for the rubble destruction core: cells, coordinates,
//! directions, materials and configuration.

pub mod config;
pub mod constants;
pub mod direction;
pub mod error;
pub mod material;
pub mod math;
pub mod types;

pub use config::WorldConfig;
pub use error::RubbleError;
pub use material::{Destructibility, MaterialTable};
pub use types::{CellChange, ChunkCoord, LocalCoord, MaterialId, Voxel, WorldCoord};
