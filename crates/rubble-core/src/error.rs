use thiserror::Error;

/// Errors raised while setting up a rubble world.
///
/// Runtime operations on the world never fail; they report zero effect
/// instead. These errors only come out of configuration checks.
#[derive(Debug, Error, PartialEq)]
pub enum RubbleError {
    #[error("Invalid configuration value `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}
