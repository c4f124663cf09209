//! Separation detection via bounded CPU-side flood fills.
//!
//! When cells are destroyed, nearby solid cells may lose every path back to
//! the world mass. This module finds those cells and groups them so the
//! caller can split them off as separate objects.
//!
//! A cell counts as held by the world when it is an anchor (at or below the
//! ground level, or made of an anchor material) or when it can reach one.
//! Detection runs in two passes:
//!
//! 1. Coarse: 6-connected fills from each affected cell. A fill that meets an
//!    anchor, or grows past the suspicious threshold, is held. Small fills
//!    and fills cut off by the chunk-span cap become suspicious.
//! 2. Fine: 26-connected fills restricted to the suspicious cells. Fills
//!    that meet a held cell or an anchor are held; complete fills become
//!    separated groups.
//!
//! Every fill stops as soon as it visits more than `max_group_size` cells or
//! touches more than `max_chunk_span` chunks. Such fills are reported as
//! oversized and left in place.

use std::collections::{HashMap, HashSet, VecDeque};

use glam::IVec3;
use rubble_core::config::SeparationConfig;
use rubble_core::direction::Adjacency;
use rubble_core::math::world_to_chunk;
use rubble_core::types::{ChunkCoord, MaterialId, WorldCoord};
use rubble_world::ChunkMap;

/// Groups found by one detection run. Groups never share a coordinate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeparationResult {
    /// Disconnected groups within the configured size range.
    pub valid: Vec<Vec<WorldCoord>>,
    /// Fills that hit a cap. Their cells stay in the chunk store.
    pub oversized: Vec<Vec<WorldCoord>>,
    pub stats: DetectionStats,
}

impl SeparationResult {
    pub fn is_empty(&self) -> bool {
        self.valid.is_empty() && self.oversized.is_empty()
    }
}

/// Counters from one detection run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionStats {
    /// Solid neighbours of the destroyed cells.
    pub affected: usize,
    /// Affected cells skipped by the destruction-rate filter.
    pub filtered: usize,
    pub coarse_fills: usize,
    pub suspicious: usize,
    pub fine_fills: usize,
    /// Groups dropped for being below the minimum size.
    pub discarded: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FillEnd {
    /// Ran out of cells to visit.
    Complete,
    /// Reached an anchor or a cell already known to be held.
    Anchored,
    SizeCapped,
    SpanCapped,
}

struct Fill {
    cells: Vec<WorldCoord>,
    end: FillEnd,
}

/// Finds groups of cells cut off from the world by a destruction.
#[derive(Debug, Clone)]
pub struct ConnectivityDetector {
    config: SeparationConfig,
    anchors: HashSet<MaterialId>,
}

impl ConnectivityDetector {
    pub fn new(config: SeparationConfig) -> Self {
        let anchors = config
            .anchor_materials
            .iter()
            .map(|id| MaterialId(*id))
            .filter(|id| !id.is_empty())
            .collect();
        Self { config, anchors }
    }

    /// Add anchor materials (typically from `MaterialTable::anchor_ids`).
    pub fn with_anchor_materials(mut self, ids: impl IntoIterator<Item = u16>) -> Self {
        self.anchors.extend(
            ids.into_iter()
                .map(MaterialId)
                .filter(|id| !id.is_empty()),
        );
        self
    }

    pub fn config(&self) -> &SeparationConfig {
        &self.config
    }

    fn is_anchor(&self, chunks: &ChunkMap, cell: WorldCoord) -> bool {
        if self.config.ground_level.is_some_and(|ground| cell.y <= ground) {
            return true;
        }
        !self.anchors.is_empty() && self.anchors.contains(&chunks.get_cell(cell).material)
    }

    /// Run detection for a set of just-destroyed cells.
    ///
    /// Never fails: an empty or degenerate input yields an empty result.
    pub fn detect(&self, chunks: &ChunkMap, destroyed: &[WorldCoord]) -> SeparationResult {
        let mut result = SeparationResult::default();
        if destroyed.is_empty() {
            return result;
        }

        let affected = self.affected_cells(chunks, destroyed, &mut result.stats);
        if affected.is_empty() {
            return result;
        }

        let mut held: HashSet<WorldCoord> = HashSet::new();
        let suspicious = self.coarse_pass(chunks, &affected, &mut held, &mut result);
        result.stats.suspicious = suspicious.len();
        self.fine_pass(chunks, &suspicious, &mut held, &mut result);

        log::debug!(
            "Separation: {} affected, {} suspicious, {} valid, {} oversized",
            result.stats.affected,
            result.stats.suspicious,
            result.valid.len(),
            result.oversized.len()
        );
        result
    }

    /// Solid 26-neighbours of the destroyed cells, minus those in chunks the
    /// destruction barely touched. Sorted smallest estimated group first.
    fn affected_cells(
        &self,
        chunks: &ChunkMap,
        destroyed: &[WorldCoord],
        stats: &mut DetectionStats,
    ) -> Vec<WorldCoord> {
        let mut seen = HashSet::new();
        let mut affected = Vec::new();
        for cell in destroyed {
            for neighbor in Adjacency::Full.neighbors(*cell) {
                if chunks.is_solid(neighbor) && seen.insert(neighbor) {
                    affected.push(neighbor);
                }
            }
        }
        stats.affected = affected.len();

        if let Some(threshold) = self.config.destruction_rate_threshold {
            let skipped = low_rate_chunks(chunks, destroyed, threshold);
            if !skipped.is_empty() {
                affected.retain(|cell| !skipped.contains(&world_to_chunk(*cell)));
            }
        }
        stats.filtered = stats.affected - affected.len();

        let limit = self.config.estimate_steps.max(1) as usize;
        let mut keyed: Vec<(usize, WorldCoord)> = affected
            .into_iter()
            .map(|cell| (estimate_size(chunks, cell, limit), cell))
            .collect();
        keyed.sort_by_key(|(size, cell)| (*size, cell.to_array()));
        keyed.into_iter().map(|(_, cell)| cell).collect()
    }

    fn coarse_pass(
        &self,
        chunks: &ChunkMap,
        seeds: &[WorldCoord],
        held: &mut HashSet<WorldCoord>,
        result: &mut SeparationResult,
    ) -> Vec<WorldCoord> {
        let mut visited: HashSet<WorldCoord> = HashSet::new();
        let mut suspicious = Vec::new();

        for seed in seeds {
            if visited.contains(seed) || held.contains(seed) {
                continue;
            }
            let fill = self.flood(chunks, *seed, Adjacency::Face, held, None);
            result.stats.coarse_fills += 1;
            visited.extend(fill.cells.iter().copied());

            match fill.end {
                FillEnd::Anchored => held.extend(fill.cells),
                FillEnd::SizeCapped => {
                    held.extend(fill.cells.iter().copied());
                    result.oversized.push(fill.cells);
                }
                FillEnd::Complete
                    if fill.cells.len() > self.config.suspicious_threshold as usize =>
                {
                    held.extend(fill.cells)
                }
                FillEnd::Complete | FillEnd::SpanCapped => suspicious.extend(fill.cells),
            }
        }
        suspicious
    }

    fn fine_pass(
        &self,
        chunks: &ChunkMap,
        suspicious: &[WorldCoord],
        held: &mut HashSet<WorldCoord>,
        result: &mut SeparationResult,
    ) {
        let mut grouped: HashSet<WorldCoord> = HashSet::new();
        let allowed: HashSet<WorldCoord> = suspicious.iter().copied().collect();
        let min_size = self.config.min_group_size as usize;

        for seed in suspicious {
            if grouped.contains(seed) || held.contains(seed) {
                continue;
            }
            let fill = self.flood(chunks, *seed, Adjacency::Full, held, Some(&allowed));
            result.stats.fine_fills += 1;

            match fill.end {
                FillEnd::Anchored => held.extend(fill.cells),
                FillEnd::SizeCapped | FillEnd::SpanCapped => {
                    held.extend(fill.cells.iter().copied());
                    result.oversized.push(fill.cells);
                }
                FillEnd::Complete => {
                    grouped.extend(fill.cells.iter().copied());
                    if fill.cells.len() >= min_size {
                        result.valid.push(fill.cells);
                    } else {
                        result.stats.discarded += 1;
                    }
                }
            }
        }
    }

    /// Breadth-first fill over solid cells from `seed`, stopping early at
    /// anchors, held cells and either cap. With `allowed` set, cells outside
    /// it are walls.
    fn flood(
        &self,
        chunks: &ChunkMap,
        seed: WorldCoord,
        adjacency: Adjacency,
        held: &HashSet<WorldCoord>,
        allowed: Option<&HashSet<WorldCoord>>,
    ) -> Fill {
        let mut cells = vec![seed];
        if held.contains(&seed) || self.is_anchor(chunks, seed) {
            return Fill {
                cells,
                end: FillEnd::Anchored,
            };
        }

        let max_size = self.config.max_group_size as usize;
        let max_span = self.config.max_chunk_span as usize;
        let mut visited: HashSet<WorldCoord> = HashSet::from([seed]);
        let mut spanned: HashSet<ChunkCoord> = HashSet::from([world_to_chunk(seed)]);
        let mut queue = VecDeque::from([seed]);

        while let Some(current) = queue.pop_front() {
            for neighbor in adjacency.neighbors(current) {
                if visited.contains(&neighbor) || !chunks.is_solid(neighbor) {
                    continue;
                }
                if held.contains(&neighbor) || self.is_anchor(chunks, neighbor) {
                    return Fill {
                        cells,
                        end: FillEnd::Anchored,
                    };
                }
                if allowed.is_some_and(|set| !set.contains(&neighbor)) {
                    continue;
                }
                visited.insert(neighbor);
                cells.push(neighbor);
                if cells.len() > max_size {
                    return Fill {
                        cells,
                        end: FillEnd::SizeCapped,
                    };
                }
                spanned.insert(world_to_chunk(neighbor));
                if spanned.len() > max_span {
                    return Fill {
                        cells,
                        end: FillEnd::SpanCapped,
                    };
                }
                queue.push_back(neighbor);
            }
        }

        Fill {
            cells,
            end: FillEnd::Complete,
        }
    }
}

/// Chunks where destroyed / (remaining + destroyed) falls below `threshold`.
fn low_rate_chunks(
    chunks: &ChunkMap,
    destroyed: &[WorldCoord],
    threshold: f32,
) -> HashSet<ChunkCoord> {
    let mut per_chunk: HashMap<ChunkCoord, u32> = HashMap::new();
    for cell in destroyed {
        *per_chunk.entry(world_to_chunk(*cell)).or_default() += 1;
    }
    per_chunk
        .into_iter()
        .filter(|(chunk, removed)| {
            let total = chunks.non_empty_count(chunk) + removed;
            (*removed as f32 / total as f32) < threshold
        })
        .map(|(chunk, _)| chunk)
        .collect()
}

/// Face-connected cells reachable from `seed`, counting at most `limit`.
fn estimate_size(chunks: &ChunkMap, seed: IVec3, limit: usize) -> usize {
    let mut visited: HashSet<WorldCoord> = HashSet::from([seed]);
    let mut queue = VecDeque::from([seed]);
    while let Some(current) = queue.pop_front() {
        for neighbor in Adjacency::Face.neighbors(current) {
            if visited.len() >= limit {
                return limit;
            }
            if chunks.is_solid(neighbor) && visited.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }
    visited.len()
}
