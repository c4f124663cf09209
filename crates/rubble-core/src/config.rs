//! Tunables for a destruction world, loadable from RON.
//!
//! Every struct uses `#[serde(default)]`, so a config file only needs to name
//! the values it changes.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::RubbleError;

/// Top-level configuration for a destruction world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World-space edge length of one cell.
    pub cell_size: f32,
    pub pipeline: PipelineConfig,
    pub batch: BatchConfig,
    pub separation: SeparationConfig,
    pub objects: ObjectConfig,
    pub shape_cache: ShapeCacheConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            pipeline: PipelineConfig::default(),
            batch: BatchConfig::default(),
            separation: SeparationConfig::default(),
            objects: ObjectConfig::default(),
            shape_cache: ShapeCacheConfig::default(),
        }
    }
}

/// Destruction request processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Chunk groups processed before the pipeline yields.
    pub chunks_per_step: u32,
    /// Request regeneration for chunks changed by destruction.
    pub regenerate: bool,
    /// Run separation detection on every completed request.
    pub detect_separation: bool,
    /// Widest sphere diameter or box edge accepted, in world units.
    pub max_shape_extent: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunks_per_step: DEFAULT_CHUNKS_PER_STEP,
            regenerate: true,
            detect_separation: true,
            max_shape_extent: DEFAULT_MAX_SHAPE_EXTENT,
        }
    }
}

/// Batch cell writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Chunk groups written before the coordinator yields.
    pub chunks_per_step: u32,
    /// Wait for regeneration of every affected chunk before completing.
    pub auto_regenerate: bool,
    /// Share of reported progress given to the write phase (0..=1).
    pub write_phase_weight: f32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunks_per_step: DEFAULT_BATCH_CHUNKS_PER_STEP,
            auto_regenerate: true,
            write_phase_weight: 0.5,
        }
    }
}

/// Separation detection limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparationConfig {
    /// Groups smaller than this are discarded as noise.
    pub min_group_size: u32,
    /// Fills visiting more cells than this are oversized.
    pub max_group_size: u32,
    /// Fills touching more distinct chunks than this are oversized.
    pub max_chunk_span: u32,
    /// Coarse groups larger than this are treated as part of the world mass.
    pub suspicious_threshold: u32,
    /// Skip chunks where destroyed/total falls below this ratio. None disables.
    pub destruction_rate_threshold: Option<f32>,
    /// Step budget for the size estimate used to order seeds.
    pub estimate_steps: u32,
    /// Cells at or below this world y are held by the ground. None disables.
    pub ground_level: Option<i32>,
    /// Materials whose cells hold up whatever they touch.
    pub anchor_materials: Vec<u16>,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            min_group_size: 1,
            max_group_size: DEFAULT_MAX_GROUP_SIZE,
            max_chunk_span: DEFAULT_MAX_CHUNK_SPAN,
            suspicious_threshold: DEFAULT_SUSPICIOUS_THRESHOLD,
            destruction_rate_threshold: Some(DEFAULT_DESTRUCTION_RATE_THRESHOLD),
            estimate_steps: DEFAULT_ESTIMATE_STEPS,
            ground_level: Some(0),
            anchor_materials: Vec::new(),
        }
    }
}

/// Separated object lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectConfig {
    /// Objects at or below this cell count schedule their own removal.
    pub low_count_threshold: u32,
    /// Seconds an object may stay at a low count before it is removed.
    pub low_count_timeout_secs: f32,
}

impl Default for ObjectConfig {
    fn default() -> Self {
        Self {
            low_count_threshold: DEFAULT_LOW_COUNT_THRESHOLD,
            low_count_timeout_secs: DEFAULT_LOW_COUNT_TIMEOUT_SECS,
        }
    }
}

/// Shape resolution cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeCacheConfig {
    /// Cached resolutions kept per shape kind.
    pub capacity_per_kind: usize,
}

impl Default for ShapeCacheConfig {
    fn default() -> Self {
        Self {
            capacity_per_kind: DEFAULT_SHAPE_CACHE_CAPACITY,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> RubbleError {
    RubbleError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}

impl WorldConfig {
    /// Reject values that would stall or break the world.
    pub fn validate(&self) -> Result<(), RubbleError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(invalid("cell_size", "must be a positive number"));
        }
        if self.pipeline.chunks_per_step == 0 {
            return Err(invalid("pipeline.chunks_per_step", "must be at least 1"));
        }
        let extent = self.pipeline.max_shape_extent;
        if !(extent.is_finite() && extent > 0.0) {
            return Err(invalid("pipeline.max_shape_extent", "must be a positive number"));
        }
        if self.batch.chunks_per_step == 0 {
            return Err(invalid("batch.chunks_per_step", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.batch.write_phase_weight) {
            return Err(invalid("batch.write_phase_weight", "must lie in 0..=1"));
        }
        let sep = &self.separation;
        if sep.max_group_size == 0 {
            return Err(invalid("separation.max_group_size", "must be at least 1"));
        }
        if sep.min_group_size > sep.max_group_size {
            return Err(invalid(
                "separation.min_group_size",
                format!("{} exceeds max_group_size {}", sep.min_group_size, sep.max_group_size),
            ));
        }
        if sep.max_chunk_span == 0 {
            return Err(invalid("separation.max_chunk_span", "must be at least 1"));
        }
        if let Some(rate) = sep.destruction_rate_threshold {
            if !(0.0..=1.0).contains(&rate) {
                return Err(invalid("separation.destruction_rate_threshold", "must lie in 0..=1"));
            }
        }
        let timeout = self.objects.low_count_timeout_secs;
        if timeout.is_nan() || timeout < 0.0 {
            return Err(invalid("objects.low_count_timeout_secs", "must not be negative"));
        }
        if self.shape_cache.capacity_per_kind == 0 {
            return Err(invalid("shape_cache.capacity_per_kind", "must be at least 1"));
        }
        Ok(())
    }
}
