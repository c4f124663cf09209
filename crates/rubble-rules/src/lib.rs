pub mod defaults;
pub mod loader;
pub mod validator;

pub use defaults::{default_config, default_materials, DefaultsError};
pub use loader::LoadError;
pub use validator::ValidationError;
