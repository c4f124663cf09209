//! Chunked voxel storage for rubble: chunks, the chunk map, the tracked
//! write path, collaborator hooks and the batch mutation coordinator.

pub mod batch;
pub mod changes;
pub mod chunk;
pub mod chunk_map;
pub mod collaborators;

pub use batch::{BatchCoordinator, BatchId, BatchReport};
pub use changes::ChangeTracker;
pub use chunk::{Chunk, ChunkSnapshot, DirtyRegion};
pub use chunk_map::ChunkMap;
pub use collaborators::{CellChangeListener, ChunkRegenerator, RegenTicket};

/// Result of one bounded slice of work by a cooperative subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// More work remains; call `step` again on a later tick.
    Pending,
    /// Nothing queued.
    Idle,
}

impl StepStatus {
    pub fn is_pending(self) -> bool {
        self == StepStatus::Pending
    }

    /// Pending if either side is.
    pub fn merge(self, other: StepStatus) -> StepStatus {
        if self.is_pending() || other.is_pending() {
            StepStatus::Pending
        } else {
            StepStatus::Idle
        }
    }
}
