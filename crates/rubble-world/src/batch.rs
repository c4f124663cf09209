//! Budgeted bulk cell writes with change notification and regeneration.
//!
//! A batch moves through three phases: writing (a few chunk groups per
//! step), regenerating (waiting on every affected chunk's ticket) and done.
//! Batches run strictly one after another in submission order.

use std::collections::{HashMap, VecDeque};

use crate::changes::ChangeTracker;
use crate::chunk_map::ChunkMap;
use crate::collaborators::{
    notify_changes, request_regeneration, CellChangeListener, ChunkRegenerator, RegenTicket,
};
use crate::StepStatus;
use rubble_core::config::BatchConfig;
use rubble_core::constants::CELLS_PER_CHUNK;
use rubble_core::math::{chunk_local_to_world, index_to_local, world_to_chunk, world_to_local};
use rubble_core::types::{CellChange, ChunkCoord, LocalCoord, Voxel, WorldCoord};

/// Identifier handed out for every submitted batch.
pub type BatchId = u64;

/// Called with overall progress in 0..=1 as the batch advances.
pub type ProgressFn = Box<dyn FnMut(f32)>;

/// Called once when the batch has finished.
pub type BatchCompleteFn = Box<dyn FnOnce(&BatchReport)>;

/// Outcome of a finished batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub id: BatchId,
    /// Writes that changed a cell.
    pub applied: Vec<CellChange>,
    /// Chunks that received at least one write.
    pub dirty_chunks: Vec<ChunkCoord>,
    /// Dirty chunks plus neighbours of boundary writes.
    pub affected_chunks: Vec<ChunkCoord>,
    /// Regeneration requests issued for this batch.
    pub regenerated: usize,
}

impl BatchReport {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

#[derive(Debug)]
enum BatchPhase {
    Writing,
    Regenerating { tickets: Vec<RegenTicket>, total: usize },
    Done { regenerated: usize },
}

struct BatchJob {
    id: BatchId,
    groups: VecDeque<(ChunkCoord, Vec<(LocalCoord, Voxel)>)>,
    total_groups: usize,
    started: bool,
    tracker: ChangeTracker,
    phase: BatchPhase,
    progress: Option<ProgressFn>,
    on_complete: Option<BatchCompleteFn>,
}

impl BatchJob {
    fn write_fraction(&self) -> f32 {
        if self.total_groups == 0 {
            return 1.0;
        }
        (self.total_groups - self.groups.len()) as f32 / self.total_groups as f32
    }

    fn report_progress(&mut self, value: f32) {
        if let Some(progress) = self.progress.as_mut() {
            progress(value.clamp(0.0, 1.0));
        }
    }
}

/// Splits updates into per-chunk groups, keeping first-seen chunk order.
fn group_by_chunk(
    updates: impl IntoIterator<Item = (WorldCoord, Voxel)>,
) -> VecDeque<(ChunkCoord, Vec<(LocalCoord, Voxel)>)> {
    let mut index: HashMap<ChunkCoord, usize> = HashMap::new();
    let mut groups: Vec<(ChunkCoord, Vec<(LocalCoord, Voxel)>)> = Vec::new();
    for (world, voxel) in updates {
        let chunk = world_to_chunk(world);
        let slot = *index.entry(chunk).or_insert_with(|| {
            groups.push((chunk, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push((world_to_local(world), voxel));
    }
    groups.into()
}

/// Runs batches of cell writes a bounded number of chunks at a time.
pub struct BatchCoordinator {
    config: BatchConfig,
    queue: VecDeque<BatchJob>,
    next_id: BatchId,
}

impl BatchCoordinator {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Queue a batch of cell writes. Later updates to the same cell win.
    pub fn set_cells(
        &mut self,
        updates: Vec<(WorldCoord, Voxel)>,
        progress: Option<ProgressFn>,
        on_complete: Option<BatchCompleteFn>,
    ) -> BatchId {
        let id = self.next_id;
        self.next_id += 1;
        let update_count = updates.len();
        let groups = group_by_chunk(updates);
        log::debug!(
            "Batch {id} queued: {update_count} update(s) across {} chunk(s)",
            groups.len()
        );
        self.queue.push_back(BatchJob {
            id,
            total_groups: groups.len(),
            groups,
            started: false,
            tracker: ChangeTracker::new(),
            phase: BatchPhase::Writing,
            progress,
            on_complete,
        });
        id
    }

    /// Queue a batch that sets every cell of each listed chunk to `voxel`.
    pub fn fill_chunks(
        &mut self,
        coords: &[ChunkCoord],
        voxel: Voxel,
        progress: Option<ProgressFn>,
        on_complete: Option<BatchCompleteFn>,
    ) -> BatchId {
        let mut updates = Vec::with_capacity(coords.len() * CELLS_PER_CHUNK as usize);
        for coord in coords {
            for index in 0..CELLS_PER_CHUNK as usize {
                updates.push((chunk_local_to_world(*coord, index_to_local(index)), voxel));
            }
        }
        self.set_cells(updates, progress, on_complete)
    }

    /// Drop a batch that has not started writing. Its callbacks never run.
    pub fn cancel(&mut self, id: BatchId) -> bool {
        let Some(position) = self
            .queue
            .iter()
            .position(|job| job.id == id && !job.started)
        else {
            return false;
        };
        self.queue.remove(position);
        log::debug!("Batch {id} cancelled");
        true
    }

    /// Batches queued or in flight.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Advance the front batches by one bounded slice of work.
    pub fn step(
        &mut self,
        chunks: &mut ChunkMap,
        mut regenerator: Option<&mut (dyn ChunkRegenerator + '_)>,
        mut listener: Option<&mut (dyn CellChangeListener + '_)>,
    ) -> StepStatus {
        let mut budget = self.config.chunks_per_step.max(1);
        let write_weight = if self.config.auto_regenerate {
            self.config.write_phase_weight
        } else {
            1.0
        };

        loop {
            let Some(job) = self.queue.front_mut() else {
                return StepStatus::Idle;
            };

            match &mut job.phase {
                BatchPhase::Writing => {
                    if budget == 0 && !job.groups.is_empty() {
                        return StepStatus::Pending;
                    }
                    while budget > 0 {
                        let Some((chunk, writes)) = job.groups.pop_front() else {
                            break;
                        };
                        job.started = true;
                        for (local, voxel) in writes {
                            job.tracker.write(chunks, chunk, local, voxel);
                        }
                        budget -= 1;
                    }
                    let fraction = job.write_fraction();
                    job.report_progress(fraction * write_weight);
                    if !job.groups.is_empty() {
                        return StepStatus::Pending;
                    }

                    notify_changes(listener.as_deref_mut(), job.tracker.applied());
                    job.phase = if self.config.auto_regenerate && !job.tracker.is_empty() {
                        let tickets = request_regeneration(
                            chunks,
                            regenerator.as_deref_mut(),
                            job.tracker.affected_chunks(),
                        );
                        let total = tickets.len();
                        if total == 0 {
                            BatchPhase::Done { regenerated: 0 }
                        } else {
                            BatchPhase::Regenerating { tickets, total }
                        }
                    } else {
                        BatchPhase::Done { regenerated: 0 }
                    };
                }
                BatchPhase::Regenerating { tickets, total } => {
                    let total = *total;
                    match regenerator.as_deref_mut() {
                        Some(regen) => tickets.retain(|ticket| !regen.is_complete(*ticket)),
                        None => {
                            log::warn!(
                                "Batch {}: regenerator detached with {} request(s) in flight",
                                job.id,
                                tickets.len()
                            );
                            tickets.clear();
                        }
                    }
                    let finished = total - tickets.len();
                    let regen_fraction = if total == 0 {
                        1.0
                    } else {
                        finished as f32 / total as f32
                    };
                    if !tickets.is_empty() {
                        job.report_progress(write_weight + (1.0 - write_weight) * regen_fraction);
                        return StepStatus::Pending;
                    }
                    job.phase = BatchPhase::Done { regenerated: total };
                }
                BatchPhase::Done { regenerated } => {
                    let regenerated = *regenerated;
                    let Some(mut job) = self.queue.pop_front() else {
                        return StepStatus::Idle;
                    };
                    job.report_progress(1.0);
                    let report = BatchReport {
                        id: job.id,
                        applied: job.tracker.applied().to_vec(),
                        dirty_chunks: job.tracker.dirty_chunks().to_vec(),
                        affected_chunks: job.tracker.affected_chunks().to_vec(),
                        regenerated,
                    };
                    log::debug!(
                        "Batch {} complete: {} write(s) applied, {} chunk(s) regenerated",
                        report.id,
                        report.applied_count(),
                        regenerated
                    );
                    if let Some(on_complete) = job.on_complete.take() {
                        on_complete(&report);
                    }
                }
            }
        }
    }
}
