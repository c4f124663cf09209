//! Queued destruction requests, applied a bounded number of chunks per step.
//!
//! Request lifecycle:
//!   1. Queued         - accepted by `enqueue`, waiting for the worker
//!   2. GroupedByChunk - shape resolved, target cells split per chunk
//!   3. PerChunkApplied- every chunk group has been processed
//!   4. Completed      - handed back to the caller with its outcome
//!
//! Only one request is in flight at a time, so two requests never write the
//! same chunk concurrently. Once a request leaves the queue it always
//! completes, possibly with nothing destroyed.

use std::collections::{HashMap, VecDeque};

use crate::shape::{DestructionShape, ShapeError};
use crate::shape_cache::ShapeCache;
use glam::Vec3;
use rubble_core::config::PipelineConfig;
use rubble_core::material::Destructibility;
use rubble_core::math::{chunk_local_to_world, world_to_chunk, world_to_local};
use rubble_core::types::{CellChange, ChunkCoord, LocalCoord, Voxel, WorldCoord};
use rubble_world::{ChangeTracker, ChunkMap, StepStatus};

use crate::registry::SeparatedObjectRef;

pub type RequestId = u64;

/// Called once with the finished request's outcome.
pub type DestructionCompleteFn = Box<dyn FnOnce(&DestructionOutcome)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Queued,
    GroupedByChunk,
    PerChunkApplied,
    Completed,
}

/// What a destruction request actually did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DestructionOutcome {
    pub id: RequestId,
    /// Cells the shape resolved to.
    pub requested: usize,
    /// Cells that were non-empty, destructible, and are now empty.
    pub destroyed: Vec<WorldCoord>,
    /// Effect origin taken from the shape.
    pub origin: Option<Vec3>,
    pub direction: Option<Vec3>,
    /// Objects split off as a consequence of this request.
    pub separated: Vec<SeparatedObjectRef>,
}

impl DestructionOutcome {
    pub fn destroyed_count(&self) -> usize {
        self.destroyed.len()
    }
}

struct QueuedRequest {
    id: RequestId,
    shape: DestructionShape,
    power: f32,
    direction: Option<Vec3>,
    on_complete: Option<DestructionCompleteFn>,
}

struct ActiveRequest {
    request: QueuedRequest,
    phase: RequestPhase,
    requested: usize,
    groups: VecDeque<(ChunkCoord, Vec<LocalCoord>)>,
    tracker: ChangeTracker,
    destroyed: Vec<WorldCoord>,
}

/// A request that finished its writes. The caller runs follow-up work
/// (notification, separation) and then calls [`CompletedDestruction::finish`].
pub struct CompletedDestruction {
    pub outcome: DestructionOutcome,
    /// Writes applied, for change listeners.
    pub changes: Vec<CellChange>,
    /// Chunks needing regeneration.
    pub affected_chunks: Vec<ChunkCoord>,
    on_complete: Option<DestructionCompleteFn>,
}

impl CompletedDestruction {
    /// Hand the outcome to the request's callback.
    pub fn finish(mut self) -> DestructionOutcome {
        if let Some(callback) = self.on_complete.take() {
            callback(&self.outcome);
        }
        self.outcome
    }
}

/// Borrowed world state a pipeline step works on.
pub struct PipelineContext<'a> {
    pub chunks: &'a mut ChunkMap,
    pub rules: &'a dyn Destructibility,
    pub shapes: &'a mut ShapeCache,
}

fn group_by_chunk(cells: &[WorldCoord]) -> VecDeque<(ChunkCoord, Vec<LocalCoord>)> {
    let mut index: HashMap<ChunkCoord, usize> = HashMap::new();
    let mut groups: Vec<(ChunkCoord, Vec<LocalCoord>)> = Vec::new();
    for cell in cells {
        let chunk = world_to_chunk(*cell);
        let slot = *index.entry(chunk).or_insert_with(|| {
            groups.push((chunk, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(world_to_local(*cell));
    }
    groups.into()
}

/// Single-worker queue of destruction requests.
pub struct DestructionPipeline {
    config: PipelineConfig,
    queue: VecDeque<QueuedRequest>,
    active: Option<ActiveRequest>,
    next_id: RequestId,
}

impl DestructionPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            active: None,
            next_id: 1,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Queue a request. Invalid shapes are rejected here; a shape that can
    /// cover nothing completes on the spot with zero cells destroyed.
    pub fn enqueue(
        &mut self,
        shape: DestructionShape,
        power: f32,
        direction: Option<Vec3>,
        on_complete: Option<DestructionCompleteFn>,
    ) -> Result<RequestId, ShapeError> {
        shape.validate_within(self.config.max_shape_extent)?;
        let id = self.next_id;
        self.next_id += 1;

        if shape.is_empty() {
            log::debug!("Destruction {id}: empty shape, completing immediately");
            let outcome = DestructionOutcome {
                id,
                direction,
                ..DestructionOutcome::default()
            };
            if let Some(callback) = on_complete {
                callback(&outcome);
            }
            return Ok(id);
        }

        self.queue.push_back(QueuedRequest {
            id,
            shape,
            power,
            direction,
            on_complete,
        });
        Ok(id)
    }

    /// Drop a queued request that has not started. Its callback never runs.
    pub fn cancel(&mut self, id: RequestId) -> bool {
        let Some(position) = self.queue.iter().position(|r| r.id == id) else {
            return false;
        };
        self.queue.remove(position);
        log::debug!("Destruction {id} cancelled");
        true
    }

    /// Current phase of a request, None once it has been handed back.
    pub fn phase(&self, id: RequestId) -> Option<RequestPhase> {
        if let Some(active) = self.active.as_ref().filter(|a| a.request.id == id) {
            return Some(active.phase);
        }
        self.queue
            .iter()
            .any(|r| r.id == id)
            .then_some(RequestPhase::Queued)
    }

    /// Requests queued or in flight.
    pub fn pending(&self) -> usize {
        self.queue.len() + usize::from(self.active.is_some())
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.queue.is_empty()
    }

    fn start_next(&mut self, shapes: &mut ShapeCache) -> bool {
        let Some(request) = self.queue.pop_front() else {
            return false;
        };
        let cells = shapes.resolve(&request.shape);
        let groups = group_by_chunk(&cells);
        log::debug!(
            "Destruction {}: {} cell(s) across {} chunk(s) at power {}",
            request.id,
            cells.len(),
            groups.len(),
            request.power
        );
        self.active = Some(ActiveRequest {
            request,
            phase: RequestPhase::GroupedByChunk,
            requested: cells.len(),
            groups,
            tracker: ChangeTracker::new(),
            destroyed: Vec::new(),
        });
        true
    }

    /// Process up to `chunks_per_step` chunk groups. Finished requests are
    /// pushed onto `completed` in the order they were queued.
    pub fn step(
        &mut self,
        ctx: &mut PipelineContext<'_>,
        completed: &mut Vec<CompletedDestruction>,
    ) -> StepStatus {
        let mut budget = self.config.chunks_per_step.max(1);

        loop {
            if self.active.is_none() && !self.start_next(ctx.shapes) {
                return StepStatus::Idle;
            }
            let Some(active) = self.active.as_mut() else {
                return StepStatus::Idle;
            };

            while budget > 0 {
                let Some((chunk, locals)) = active.groups.pop_front() else {
                    break;
                };
                for local in locals {
                    let voxel = ctx.chunks.get_voxel(chunk, local);
                    if voxel.is_empty() || !ctx.rules.can_destroy(voxel.material, active.request.power) {
                        continue;
                    }
                    if active.tracker.write(ctx.chunks, chunk, local, Voxel::EMPTY) {
                        active.destroyed.push(chunk_local_to_world(chunk, local));
                    }
                }
                budget -= 1;
            }

            if !active.groups.is_empty() {
                return StepStatus::Pending;
            }
            active.phase = RequestPhase::PerChunkApplied;

            let Some(done) = self.active.take() else {
                return StepStatus::Idle;
            };
            log::debug!(
                "Destruction {} complete: {}/{} cell(s) destroyed",
                done.request.id,
                done.destroyed.len(),
                done.requested
            );
            completed.push(CompletedDestruction {
                outcome: DestructionOutcome {
                    id: done.request.id,
                    requested: done.requested,
                    destroyed: done.destroyed,
                    origin: done.request.shape.representative_point(),
                    direction: done.request.direction,
                    separated: Vec::new(),
                },
                changes: done.tracker.applied().to_vec(),
                affected_chunks: done.tracker.affected_chunks().to_vec(),
                on_complete: done.request.on_complete,
            });

            if budget == 0 && !self.queue.is_empty() {
                return StepStatus::Pending;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;
    use rubble_core::material::{AlwaysDestructible, MaterialDef, MaterialTable};
    use rubble_core::math::CellSpace;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn pipeline(chunks_per_step: u32) -> DestructionPipeline {
        DestructionPipeline::new(PipelineConfig {
            chunks_per_step,
            ..PipelineConfig::default()
        })
    }

    fn run(
        pipeline: &mut DestructionPipeline,
        chunks: &mut ChunkMap,
        rules: &dyn Destructibility,
    ) -> Vec<CompletedDestruction> {
        let mut shapes = ShapeCache::new(CellSpace::new(1.0), 50);
        let mut completed = Vec::new();
        let mut ctx = PipelineContext {
            chunks,
            rules,
            shapes: &mut shapes,
        };
        for _ in 0..1000 {
            if pipeline.step(&mut ctx, &mut completed) == StepStatus::Idle {
                break;
            }
        }
        completed
    }

    fn solid_block(chunks: &mut ChunkMap, min: IVec3, max: IVec3, material: u16) {
        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    chunks.set_cell(IVec3::new(x, y, z), Voxel::solid(material));
                }
            }
        }
    }

    #[test]
    fn test_destroys_only_non_empty_cells() {
        let mut chunks = ChunkMap::new();
        chunks.set_cell(IVec3::new(0, 0, 0), Voxel::solid(1));
        chunks.set_cell(IVec3::new(1, 0, 0), Voxel::solid(1));
        let mut p = pipeline(4);
        let shape = DestructionShape::cuboid(Vec3::new(1.0, 0.5, 0.5), Vec3::new(3.0, 1.0, 1.0));
        p.enqueue(shape, 1.0, None, None).expect("valid shape");

        let done = run(&mut p, &mut chunks, &AlwaysDestructible);
        assert_eq!(done.len(), 1);
        let outcome = &done[0].outcome;
        assert_eq!(outcome.requested, 3);
        assert_eq!(outcome.destroyed_count(), 2);
        assert!(outcome.destroyed_count() <= outcome.requested);
        assert_eq!(done[0].changes.len(), 2);
        assert!(chunks.get_cell(IVec3::ZERO).is_empty());
    }

    #[test]
    fn test_hardness_limits_destruction() {
        let mut chunks = ChunkMap::new();
        chunks.set_cell(IVec3::new(0, 0, 0), Voxel::solid(1));
        chunks.set_cell(IVec3::new(1, 0, 0), Voxel::solid(2));
        let rules = MaterialTable {
            materials: vec![
                MaterialDef {
                    id: 1,
                    name: "Soft".into(),
                    hardness: 1.0,
                    hit_points: 1,
                    indestructible: false,
                    anchors: false,
                },
                MaterialDef {
                    id: 2,
                    name: "Hard".into(),
                    hardness: 10.0,
                    hit_points: 1,
                    indestructible: false,
                    anchors: false,
                },
            ],
        };
        let mut p = pipeline(4);
        let shape = DestructionShape::Points(vec![Vec3::new(0.5, 0.5, 0.5), Vec3::new(1.5, 0.5, 0.5)]);
        p.enqueue(shape, 5.0, None, None).expect("valid shape");
        let done = run(&mut p, &mut chunks, &rules);
        assert_eq!(done[0].outcome.destroyed, vec![IVec3::ZERO]);
        assert!(chunks.is_solid(IVec3::new(1, 0, 0)), "hard cell survives");
    }

    #[test]
    fn test_already_empty_cells_change_nothing() {
        let mut chunks = ChunkMap::new();
        let mut p = pipeline(4);
        p.enqueue(DestructionShape::sphere(Vec3::splat(8.0), 3.0), 100.0, None, None)
            .expect("valid shape");
        let done = run(&mut p, &mut chunks, &AlwaysDestructible);
        assert_eq!(done[0].outcome.destroyed_count(), 0);
        assert!(done[0].changes.is_empty());
        assert!(done[0].affected_chunks.is_empty());
    }

    #[test]
    fn test_empty_shape_completes_immediately() {
        let mut p = pipeline(4);
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        p.enqueue(
            DestructionShape::Points(Vec::new()),
            1.0,
            None,
            Some(Box::new(move |outcome: &DestructionOutcome| {
                *sink.borrow_mut() = Some(outcome.destroyed_count())
            })),
        )
        .expect("empty point list is valid");
        assert_eq!(*seen.borrow(), Some(0));
        assert!(p.is_idle());
    }

    #[test]
    fn test_invalid_shape_rejected_before_queueing() {
        let mut p = pipeline(4);
        let result = p.enqueue(DestructionShape::sphere(Vec3::ZERO, -2.0), 1.0, None, None);
        assert!(result.is_err());
        assert!(p.is_idle());
    }

    #[test]
    fn test_oversized_shape_rejected() {
        let mut p = pipeline(4);
        let sphere = p.enqueue(DestructionShape::sphere(Vec3::ZERO, 1.0e9), 1.0, None, None);
        assert!(matches!(sphere, Err(ShapeError::TooLarge { .. })));
        let slab = DestructionShape::cuboid(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0e7));
        assert!(matches!(
            p.enqueue(slab, 1.0, None, None),
            Err(ShapeError::TooLarge { .. })
        ));
        assert!(p.is_idle());
        assert!(p
            .enqueue(DestructionShape::sphere(Vec3::ZERO, 32.0), 1.0, None, None)
            .is_ok());
    }

    #[test]
    fn test_chunk_budget_spreads_work() {
        let mut chunks = ChunkMap::new();
        // One cell in each of four chunks along x
        for i in 0..4 {
            chunks.set_cell(IVec3::new(i * 16 + 8, 8, 8), Voxel::solid(1));
        }
        let mut p = pipeline(1);
        let points = (0..4)
            .map(|i| Vec3::new(i as f32 * 16.0 + 8.5, 8.5, 8.5))
            .collect();
        let id = p.enqueue(DestructionShape::Points(points), 1.0, None, None).expect("valid");
        assert_eq!(p.phase(id), Some(RequestPhase::Queued));

        let mut shapes = ShapeCache::new(CellSpace::new(1.0), 50);
        let mut completed = Vec::new();
        let mut ctx = PipelineContext {
            chunks: &mut chunks,
            rules: &AlwaysDestructible,
            shapes: &mut shapes,
        };
        let mut statuses = Vec::new();
        for _ in 0..4 {
            statuses.push(p.step(&mut ctx, &mut completed));
            if completed.is_empty() {
                assert_eq!(p.phase(id), Some(RequestPhase::GroupedByChunk));
            }
        }
        assert_eq!(
            statuses,
            vec![
                StepStatus::Pending,
                StepStatus::Pending,
                StepStatus::Pending,
                StepStatus::Idle
            ]
        );
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].outcome.destroyed_count(), 4);
        assert_eq!(p.phase(id), None);
    }

    #[test]
    fn test_requests_complete_in_enqueue_order() {
        let mut chunks = ChunkMap::new();
        solid_block(&mut chunks, IVec3::ZERO, IVec3::splat(3), 1);
        let mut p = pipeline(8);
        let a = p
            .enqueue(DestructionShape::point(Vec3::splat(0.5)), 1.0, None, None)
            .expect("valid");
        let b = p
            .enqueue(DestructionShape::point(Vec3::splat(1.5)), 1.0, Some(Vec3::Y), None)
            .expect("valid");
        let done = run(&mut p, &mut chunks, &AlwaysDestructible);
        let ids: Vec<_> = done.iter().map(|d| d.outcome.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(done[1].outcome.direction, Some(Vec3::Y));
        assert_eq!(done[1].outcome.origin, Some(Vec3::splat(1.5)));
    }

    #[test]
    fn test_cancel_queued_request() {
        let mut chunks = ChunkMap::new();
        chunks.set_cell(IVec3::ZERO, Voxel::solid(1));
        let mut p = pipeline(4);
        let id = p
            .enqueue(DestructionShape::point(Vec3::splat(0.5)), 1.0, None, None)
            .expect("valid");
        assert!(p.cancel(id));
        assert!(!p.cancel(id));
        let done = run(&mut p, &mut chunks, &AlwaysDestructible);
        assert!(done.is_empty());
        assert!(chunks.is_solid(IVec3::ZERO));
    }

    #[test]
    fn test_finish_runs_callback_with_count() {
        let mut chunks = ChunkMap::new();
        solid_block(&mut chunks, IVec3::ZERO, IVec3::splat(2), 1);
        let mut p = pipeline(4);
        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);
        p.enqueue(
            DestructionShape::sphere(Vec3::splat(1.5), 1.0),
            1.0,
            None,
            Some(Box::new(move |o: &DestructionOutcome| {
                *sink.borrow_mut() = o.destroyed_count()
            })),
        )
        .expect("valid");
        let done = run(&mut p, &mut chunks, &AlwaysDestructible);
        for d in done {
            d.finish();
        }
        assert_eq!(*seen.borrow(), 7);
    }
}
