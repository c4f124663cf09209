//! Destruction for rubble: shape resolution, the chunked destruction
//! pipeline, separation detection and the objects it splits off.

pub mod connectivity;
pub mod grid;
pub mod materializer;
pub mod object;
pub mod pipeline;
pub mod registry;
pub mod shape;
pub mod shape_cache;
pub mod world;

pub use connectivity::{ConnectivityDetector, DetectionStats, SeparationResult};
pub use object::{ObjectId, ObjectState, SeparatedObject};
pub use pipeline::{DestructionOutcome, DestructionPipeline, RequestId, RequestPhase};
pub use registry::{SeparatedObjectRef, SeparatedObjectRegistry, SeparationListener};
pub use shape::{DestructionShape, ShapeError, ShapeKind};
pub use shape_cache::ShapeCache;
pub use world::{DestructionWorld, WorldStats};
