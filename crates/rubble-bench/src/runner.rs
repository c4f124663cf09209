use std::time::Instant;

use rubble_core::config::WorldConfig;
use rubble_core::material::MaterialTable;
use rubble_rules::{default_config, default_materials, DefaultsError, LoadError};
use rubble_sim::DestructionWorld;
use rubble_world::collaborators::ImmediateRegenerator;

use crate::scenes::{SceneConfig, STRIKE_POWER};

/// Ticks allowed for one round to drain before it is reported as stuck.
const MAX_TICKS_PER_ROUND: usize = 10_000;

/// Timing data for a single benchmark run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TimingSeries {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Result of a single scene benchmark.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BenchmarkResult {
    pub scene_name: String,
    pub solid_cells: u32,
    pub chunk_count: u32,
    pub rounds: u32,
    /// Per round; every round replays the same scene.
    pub cells_destroyed: u64,
    pub objects_created: u64,
    pub oversized_groups: u64,
    pub ticks: u64,
    pub timings: TimingSeries,
}

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("Failed to load materials: {0}")]
    Materials(#[from] DefaultsError),
    #[error("Failed to load world config: {0}")]
    Config(#[from] LoadError),
    #[error("World rejected config: {0}")]
    World(#[from] rubble_core::error::RubbleError),
}

/// Replays scripted destruction scenes and times each round.
pub struct BenchmarkRunner {
    materials: MaterialTable,
    config: WorldConfig,
    rounds: u32,
}

impl BenchmarkRunner {
    /// Load the shipped materials and config.
    pub fn new(rounds: u32) -> Result<Self, BenchError> {
        let materials = default_materials()?;
        let mut config = default_config()?;
        // Measure full detection on every strike
        config.separation.destruction_rate_threshold = None;
        config.separation.suspicious_threshold = config.separation.max_group_size;
        log::info!(
            "Benchmark: {} material(s), {} round(s) per scene",
            materials.len(),
            rounds
        );
        Ok(Self {
            materials,
            config,
            rounds: rounds.max(1),
        })
    }

    fn build_world(&self, scene: &SceneConfig) -> Result<(DestructionWorld, u32), BenchError> {
        let mut world = DestructionWorld::new(self.config.clone(), Box::new(self.materials.clone()))?;
        world.add_anchor_materials(self.materials.anchor_ids());
        world.set_regenerator(Box::new(ImmediateRegenerator::new()));
        let placed = scene.populate(world.chunks_mut(), &self.materials);
        Ok((world, placed))
    }

    /// Run a single benchmark scene and return timing results.
    pub fn run_scene(&self, scene: &SceneConfig) -> Result<BenchmarkResult, BenchError> {
        log::info!("Running scene '{}'...", scene.name);

        let mut round_times = Vec::with_capacity(self.rounds as usize);
        let mut last = None;

        for _ in 0..self.rounds {
            // Scene building is not timed
            let (mut world, placed) = self.build_world(scene)?;
            let chunk_count = world.chunks().loaded_count();

            let round_start = Instant::now();
            for shape in scene.strikes() {
                if let Err(err) = world.enqueue_destruction(shape, STRIKE_POWER, None, None) {
                    log::warn!("Scene '{}': strike rejected: {err}", scene.name);
                }
            }
            let ticks = world.run_until_idle(1.0 / 60.0, MAX_TICKS_PER_ROUND);
            round_times.push(round_start.elapsed().as_secs_f64() * 1000.0);

            last = Some((world.stats(), placed, chunk_count, ticks));
        }

        let timings = compute_timings(&round_times);
        let (stats, placed, chunk_count, ticks) = last.unwrap_or_default();
        log::info!(
            "  Done: {} destroyed, {} object(s), mean={:.3}ms, p95={:.3}ms",
            stats.cells_destroyed,
            stats.objects_created,
            timings.mean_ms,
            timings.p95_ms
        );

        Ok(BenchmarkResult {
            scene_name: scene.name.to_string(),
            solid_cells: placed,
            chunk_count,
            rounds: self.rounds,
            cells_destroyed: stats.cells_destroyed,
            objects_created: stats.objects_created,
            oversized_groups: stats.oversized_groups,
            ticks: ticks as u64,
            timings,
        })
    }
}

/// Compute timing statistics from a list of round times in milliseconds.
pub fn compute_timings(times: &[f64]) -> TimingSeries {
    if times.is_empty() {
        return TimingSeries {
            mean_ms: 0.0,
            median_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
        };
    }

    let mut sorted = times.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    let p95_idx = ((n as f64) * 0.95).ceil() as usize;
    let p99_idx = ((n as f64) * 0.99).ceil() as usize;

    TimingSeries {
        mean_ms: mean,
        median_ms: median,
        p95_ms: sorted[p95_idx.min(n - 1)],
        p99_ms: sorted[p99_idx.min(n - 1)],
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
    }
}
