//! Single source of truth for shared constants.
//! Tunables that callers may want to change live in `config` instead;
//! these values are fixed by the storage layout.

/// Side length of a chunk in cells.
pub const CHUNK_SIZE: u32 = 16;

/// Total cells per chunk (16^3).
pub const CELLS_PER_CHUNK: u32 = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;

/// Bytes per cell (material id + hit points, two u16 values).
pub const CELL_BYTES: u32 = 4;

/// Total bytes per chunk snapshot.
pub const BYTES_PER_CHUNK: u32 = CELLS_PER_CHUNK * CELL_BYTES;

/// Material ID that marks an empty cell.
pub const EMPTY_MATERIAL: u16 = 0;

/// Default world-space edge length of one cell.
pub const DEFAULT_CELL_SIZE: f32 = 1.0;

/// Default bound on cached resolutions per shape kind.
pub const DEFAULT_SHAPE_CACHE_CAPACITY: usize = 50;

/// Default widest destruction shape accepted by the pipeline, in world units.
pub const DEFAULT_MAX_SHAPE_EXTENT: f32 = 64.0;

/// Default number of chunk groups processed per pipeline step.
pub const DEFAULT_CHUNKS_PER_STEP: u32 = 4;

/// Default number of chunk groups written per batch step.
pub const DEFAULT_BATCH_CHUNKS_PER_STEP: u32 = 8;

/// Coarse groups larger than this are assumed to belong to the world mass.
pub const DEFAULT_SUSPICIOUS_THRESHOLD: u32 = 500;

/// Hard cap on the cells one flood fill may visit.
pub const DEFAULT_MAX_GROUP_SIZE: u32 = 4096;

/// Hard cap on the distinct chunks one flood fill may touch.
pub const DEFAULT_MAX_CHUNK_SPAN: u32 = 8;

/// Destroyed/total ratio below which a chunk's affected cells are skipped.
pub const DEFAULT_DESTRUCTION_RATE_THRESHOLD: f32 = 0.15;

/// Step budget for the seed size estimate used to order fills.
pub const DEFAULT_ESTIMATE_STEPS: u32 = 64;

/// Separated objects at or below this many cells schedule their own removal.
pub const DEFAULT_LOW_COUNT_THRESHOLD: u32 = 2;

/// Seconds a separated object may stay at a low cell count before removal.
pub const DEFAULT_LOW_COUNT_TIMEOUT_SECS: f32 = 3.0;
