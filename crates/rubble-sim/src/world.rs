//! The destruction world: owns the chunk store and every subsystem, and
//! drives them from a single `tick` per host frame.

use glam::Vec3;
use rubble_core::config::WorldConfig;
use rubble_core::error::RubbleError;
use rubble_core::material::Destructibility;
use rubble_core::math::CellSpace;
use rubble_core::types::{ChunkCoord, Voxel, WorldCoord};
use rubble_world::batch::{BatchCompleteFn, ProgressFn};
use rubble_world::collaborators::{notify_changes, request_regeneration};
use rubble_world::{
    BatchCoordinator, BatchId, CellChangeListener, ChunkMap, ChunkRegenerator, StepStatus,
};

use crate::connectivity::{ConnectivityDetector, SeparationResult};
use crate::materializer::Materializer;
use crate::object::ObjectId;
use crate::pipeline::{
    CompletedDestruction, DestructionCompleteFn, DestructionPipeline, PipelineContext, RequestId,
};
use crate::registry::{SeparatedObjectRef, SeparatedObjectRegistry, SeparationListener};
use crate::shape::{DestructionShape, ShapeError};
use crate::shape_cache::ShapeCache;

/// Running totals for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub ticks: u64,
    pub requests_completed: u64,
    pub cells_destroyed: u64,
    pub objects_created: u64,
    pub objects_removed: u64,
    pub oversized_groups: u64,
    pub cells_separated: u64,
}

/// Explicit context for a destructible voxel world.
pub struct DestructionWorld {
    config: WorldConfig,
    space: CellSpace,
    chunks: ChunkMap,
    rules: Box<dyn Destructibility>,
    shapes: ShapeCache,
    pipeline: DestructionPipeline,
    batches: BatchCoordinator,
    detector: ConnectivityDetector,
    materializer: Materializer,
    registry: SeparatedObjectRegistry,
    regenerator: Option<Box<dyn ChunkRegenerator>>,
    change_listener: Option<Box<dyn CellChangeListener>>,
    separation_listener: Option<Box<dyn SeparationListener>>,
    stats: WorldStats,
}

impl DestructionWorld {
    /// Build a world with an empty chunk store.
    pub fn new(config: WorldConfig, rules: Box<dyn Destructibility>) -> Result<Self, RubbleError> {
        config.validate()?;
        let space = CellSpace::new(config.cell_size);
        log::info!(
            "Destruction world: cell size {}, {} chunk(s)/step, separation {}",
            space.cell_size(),
            config.pipeline.chunks_per_step,
            if config.pipeline.detect_separation { "on" } else { "off" }
        );
        Ok(Self {
            space,
            chunks: ChunkMap::new(),
            rules,
            shapes: ShapeCache::new(space, config.shape_cache.capacity_per_kind),
            pipeline: DestructionPipeline::new(config.pipeline.clone()),
            batches: BatchCoordinator::new(config.batch.clone()),
            detector: ConnectivityDetector::new(config.separation.clone()),
            materializer: Materializer::new(space, config.objects.clone()),
            registry: SeparatedObjectRegistry::new(),
            regenerator: None,
            change_listener: None,
            separation_listener: None,
            stats: WorldStats::default(),
            config,
        })
    }

    /// Treat these materials as anchors in addition to the configured ones.
    pub fn add_anchor_materials(&mut self, ids: impl IntoIterator<Item = u16>) {
        self.detector = self.detector.clone().with_anchor_materials(ids);
    }

    pub fn set_regenerator(&mut self, regenerator: Box<dyn ChunkRegenerator>) {
        self.regenerator = Some(regenerator);
    }

    pub fn set_change_listener(&mut self, listener: Box<dyn CellChangeListener>) {
        self.change_listener = Some(listener);
    }

    pub fn set_separation_listener(&mut self, listener: Box<dyn SeparationListener>) {
        self.separation_listener = Some(listener);
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn cell_space(&self) -> &CellSpace {
        &self.space
    }

    pub fn chunks(&self) -> &ChunkMap {
        &self.chunks
    }

    /// Direct store access, e.g. for loading generated chunks.
    pub fn chunks_mut(&mut self) -> &mut ChunkMap {
        &mut self.chunks
    }

    pub fn registry(&self) -> &SeparatedObjectRegistry {
        &self.registry
    }

    pub fn shape_cache(&self) -> &ShapeCache {
        &self.shapes
    }

    pub fn stats(&self) -> WorldStats {
        self.stats
    }

    /// Nothing queued in the pipeline or the batch coordinator.
    pub fn is_idle(&self) -> bool {
        self.pipeline.is_idle() && self.batches.is_idle()
    }

    pub fn enqueue_destruction(
        &mut self,
        shape: DestructionShape,
        power: f32,
        direction: Option<Vec3>,
        on_complete: Option<DestructionCompleteFn>,
    ) -> Result<RequestId, ShapeError> {
        let result = self.pipeline.enqueue(shape, power, direction, on_complete);
        if let Err(err) = &result {
            log::warn!("Rejected destruction request: {err}");
        }
        result
    }

    pub fn cancel_destruction(&mut self, id: RequestId) -> bool {
        self.pipeline.cancel(id)
    }

    pub fn set_cells(
        &mut self,
        updates: Vec<(WorldCoord, Voxel)>,
        progress: Option<ProgressFn>,
        on_complete: Option<BatchCompleteFn>,
    ) -> BatchId {
        self.batches.set_cells(updates, progress, on_complete)
    }

    pub fn fill_chunks(
        &mut self,
        coords: &[ChunkCoord],
        voxel: Voxel,
        progress: Option<ProgressFn>,
        on_complete: Option<BatchCompleteFn>,
    ) -> BatchId {
        self.batches.fill_chunks(coords, voxel, progress, on_complete)
    }

    pub fn cancel_batch(&mut self, id: BatchId) -> bool {
        self.batches.cancel(id)
    }

    pub fn query_objects_in_range(&self, center: Vec3, radius: f32) -> Vec<SeparatedObjectRef> {
        self.registry.query_in_range(center, radius)
    }

    /// Destroy part of a separated object. An object left with no cells is
    /// removed at once.
    pub fn destroy_in_object(&mut self, id: ObjectId, shape: &DestructionShape) -> usize {
        let Some(object) = self.registry.get_mut(id) else {
            log::debug!("Destroy on unknown object {id}");
            return 0;
        };
        let destroyed = object.destroy_shape(shape);
        if object.is_expired() {
            self.remove_object(id);
        }
        destroyed
    }

    /// Remove an object on request.
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        let removed = self
            .registry
            .remove(id, self.separation_listener.as_deref_mut())
            .is_some();
        if removed {
            self.stats.objects_removed += 1;
        }
        removed
    }

    /// Advance every subsystem by one bounded slice of work.
    pub fn tick(&mut self, dt: f32) -> StepStatus {
        self.stats.ticks += 1;

        let batch_status = self.batches.step(
            &mut self.chunks,
            self.regenerator.as_deref_mut(),
            self.change_listener.as_deref_mut(),
        );

        let mut completed = Vec::new();
        let pipeline_status = {
            let mut ctx = PipelineContext {
                chunks: &mut self.chunks,
                rules: self.rules.as_ref(),
                shapes: &mut self.shapes,
            };
            self.pipeline.step(&mut ctx, &mut completed)
        };
        for done in completed {
            self.finish_destruction(done);
        }

        let expired = self
            .registry
            .tick(dt, self.separation_listener.as_deref_mut());
        self.stats.objects_removed += expired.len() as u64;

        batch_status.merge(pipeline_status)
    }

    /// Tick until idle or `max_ticks` runs out. Returns the ticks used.
    pub fn run_until_idle(&mut self, dt: f32, max_ticks: usize) -> usize {
        for tick in 1..=max_ticks {
            if self.tick(dt) == StepStatus::Idle {
                return tick;
            }
        }
        log::warn!("World still busy after {max_ticks} tick(s)");
        max_ticks
    }

    fn finish_destruction(&mut self, mut done: CompletedDestruction) {
        notify_changes(self.change_listener.as_deref_mut(), &done.changes);
        if self.config.pipeline.regenerate {
            request_regeneration(
                &mut self.chunks,
                self.regenerator.as_deref_mut(),
                &done.affected_chunks,
            );
        }

        if self.config.pipeline.detect_separation && !done.outcome.destroyed.is_empty() {
            done.outcome.separated = self.separate(&done.outcome.destroyed);
        }

        self.stats.requests_completed += 1;
        self.stats.cells_destroyed += done.outcome.destroyed.len() as u64;
        done.finish();
    }

    /// Find groups cut off by the destruction of `destroyed` and split them
    /// into objects. Oversized groups stay in the store.
    pub fn separate(&mut self, destroyed: &[WorldCoord]) -> Vec<SeparatedObjectRef> {
        let result: SeparationResult = self.detector.detect(&self.chunks, destroyed);
        self.stats.oversized_groups += result.oversized.len() as u64;
        if !result.oversized.is_empty() {
            log::debug!(
                "{} oversized group(s) left in place",
                result.oversized.len()
            );
        }

        let mut created = Vec::with_capacity(result.valid.len());
        for group in &result.valid {
            let Some(object) = self.materializer.extract(
                &mut self.chunks,
                group,
                &mut self.registry,
                self.regenerator.as_deref_mut(),
                self.change_listener.as_deref_mut(),
            ) else {
                continue;
            };
            self.stats.cells_separated += u64::from(object.cell_count);
            created.push(object);
        }

        if !created.is_empty() {
            self.stats.objects_created += created.len() as u64;
            log::info!("Separated {} object(s)", created.len());
            match self.separation_listener.as_deref_mut() {
                Some(listener) => listener.objects_created(&created),
                None => log::warn!(
                    "{} object(s) separated with no separation listener attached",
                    created.len()
                ),
            }
        }
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;
    use rubble_core::config::SeparationConfig;
    use rubble_core::material::AlwaysDestructible;
    use rubble_world::collaborators::ImmediateRegenerator;
    use rubble_world::BatchReport;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::pipeline::DestructionOutcome;

    /// Change listener sharing its log with the test.
    struct SharedListener(Rc<RefCell<Vec<usize>>>);

    impl CellChangeListener for SharedListener {
        fn cells_changed(&mut self, changes: &[rubble_core::types::CellChange]) {
            self.0.borrow_mut().push(changes.len());
        }
    }

    struct SharedSeparation(Rc<RefCell<Vec<SeparatedObjectRef>>>);

    impl SeparationListener for SharedSeparation {
        fn objects_created(&mut self, objects: &[SeparatedObjectRef]) {
            self.0.borrow_mut().extend_from_slice(objects);
        }

        fn object_removed(&mut self, _id: ObjectId) {}
    }

    fn world() -> DestructionWorld {
        let config = WorldConfig {
            separation: SeparationConfig {
                destruction_rate_threshold: None,
                ground_level: Some(0),
                ..SeparationConfig::default()
            },
            ..WorldConfig::default()
        };
        let mut world =
            DestructionWorld::new(config, Box::new(AlwaysDestructible)).expect("valid config");
        world.set_regenerator(Box::new(ImmediateRegenerator::new()));
        world
    }

    fn fill_box(world: &mut DestructionWorld, min: IVec3, max: IVec3) {
        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    world.chunks_mut().set_cell(IVec3::new(x, y, z), Voxel::solid(1));
                }
            }
        }
    }

    fn capture() -> (Rc<RefCell<Option<DestructionOutcome>>>, Option<DestructionCompleteFn>) {
        let slot = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&slot);
        let callback: DestructionCompleteFn = Box::new(move |outcome: &DestructionOutcome| {
            *sink.borrow_mut() = Some(outcome.clone());
        });
        (slot, Some(callback))
    }

    #[test]
    fn test_bridge_scenario_end_to_end() {
        let mut world = world();
        let created = Rc::new(RefCell::new(Vec::new()));
        world.set_separation_listener(Box::new(SharedSeparation(Rc::clone(&created))));
        fill_box(&mut world, IVec3::ZERO, IVec3::splat(2));
        for x in 0..3 {
            for z in 0..3 {
                if (x, z) != (1, 1) {
                    world.chunks_mut().set_cell(IVec3::new(x, 1, z), Voxel::EMPTY);
                }
            }
        }

        let (outcome, on_complete) = capture();
        world
            .enqueue_destruction(DestructionShape::point(Vec3::splat(1.5)), 1.0, None, on_complete)
            .expect("valid shape");
        world.run_until_idle(0.016, 100);

        let outcome = outcome.borrow().clone().expect("request completed");
        assert_eq!(outcome.destroyed_count(), 1);
        assert_eq!(outcome.separated.len(), 1);
        assert_eq!(outcome.separated[0].cell_count, 9);
        assert_eq!(created.borrow().len(), 1);

        for x in 0..3 {
            for z in 0..3 {
                assert!(world.chunks().get_cell(IVec3::new(x, 2, z)).is_empty());
                assert!(world.chunks().is_solid(IVec3::new(x, 0, z)));
            }
        }
        let object = world
            .registry()
            .get(outcome.separated[0].id)
            .expect("object registered");
        assert_eq!(object.origin(), IVec3::new(0, 2, 0));
        assert_eq!(object.grid().dims(), glam::UVec3::new(3, 1, 3));
        assert_eq!(world.stats().objects_created, 1);
    }

    #[test]
    fn test_no_op_destruction_completes_without_event() {
        let mut world = world();
        let events = Rc::new(RefCell::new(Vec::new()));
        world.set_change_listener(Box::new(SharedListener(Rc::clone(&events))));
        let (outcome, on_complete) = capture();
        world
            .enqueue_destruction(DestructionShape::sphere(Vec3::splat(40.0), 2.0), 10.0, None, on_complete)
            .expect("valid shape");
        assert_eq!(world.tick(0.016), StepStatus::Idle);
        assert_eq!(outcome.borrow().as_ref().map(|o| o.destroyed_count()), Some(0));
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_destruction_reports_changes_once() {
        let mut world = world();
        let events = Rc::new(RefCell::new(Vec::new()));
        world.set_change_listener(Box::new(SharedListener(Rc::clone(&events))));
        fill_box(&mut world, IVec3::new(0, 0, 0), IVec3::new(4, 4, 4));
        world
            .enqueue_destruction(DestructionShape::sphere(Vec3::splat(2.5), 1.0), 1.0, None, None)
            .expect("valid shape");
        world.run_until_idle(0.016, 100);
        assert_eq!(*events.borrow(), vec![7]);
        assert_eq!(world.stats().cells_destroyed, 7);
    }

    #[test]
    fn test_batch_through_world() {
        let mut world = world();
        let report = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&report);
        world.set_cells(
            vec![(IVec3::new(0, 5, 0), Voxel::solid(3))],
            None,
            Some(Box::new(move |r: &BatchReport| *sink.borrow_mut() = Some(r.applied_count()))),
        );
        world.run_until_idle(0.016, 100);
        assert_eq!(*report.borrow(), Some(1));
        assert!(world.chunks().is_solid(IVec3::new(0, 5, 0)));
    }

    #[test]
    fn test_destroy_in_object_removes_empty_object() {
        let mut world = world();
        // Floating 2-cell bar held up by one cell
        world.chunks_mut().set_cell(IVec3::new(0, 5, 0), Voxel::solid(1));
        world.chunks_mut().set_cell(IVec3::new(1, 5, 0), Voxel::solid(1));
        let created = world.separate(&[IVec3::new(-1, 5, 0)]);
        assert_eq!(created.len(), 1);
        let id = created[0].id;
        assert_eq!(world.query_objects_in_range(Vec3::new(1.0, 5.5, 0.5), 0.5).len(), 1);

        let shape = DestructionShape::cuboid(Vec3::new(1.0, 5.5, 0.5), Vec3::new(2.0, 1.0, 1.0));
        assert_eq!(world.destroy_in_object(id, &shape), 2);
        assert!(world.registry().get(id).is_none());
        assert_eq!(world.stats().objects_removed, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = WorldConfig::default();
        config.cell_size = 0.0;
        assert!(DestructionWorld::new(config, Box::new(AlwaysDestructible)).is_err());
    }

    #[test]
    fn test_separation_can_be_disabled() {
        let mut config = WorldConfig::default();
        config.pipeline.detect_separation = false;
        config.separation.destruction_rate_threshold = None;
        let mut world = DestructionWorld::new(config, Box::new(AlwaysDestructible)).expect("valid");
        world.chunks_mut().set_cell(IVec3::new(0, 5, 0), Voxel::solid(1));
        world.chunks_mut().set_cell(IVec3::new(1, 5, 0), Voxel::solid(1));
        world
            .enqueue_destruction(DestructionShape::point(Vec3::new(1.5, 5.5, 0.5)), 1.0, None, None)
            .expect("valid");
        world.run_until_idle(0.016, 10);
        assert!(world.registry().is_empty());
        assert!(world.chunks().is_solid(IVec3::new(0, 5, 0)));
    }
}
