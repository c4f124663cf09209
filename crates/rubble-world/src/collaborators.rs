//! Outbound hooks: surface/collider regeneration and change replication.
//!
//! The world never builds meshes or sends packets itself. It hands read-only
//! chunk snapshots to a [`ChunkRegenerator`] and reports applied writes to a
//! [`CellChangeListener`]. Either may be absent; the world then logs and
//! carries on.

use std::collections::{HashMap, HashSet};

use crate::chunk::ChunkSnapshot;
use crate::chunk_map::ChunkMap;
use rubble_core::types::{CellChange, ChunkCoord};

/// Handle for one outstanding regeneration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegenTicket(pub u64);

/// Rebuilds the visual/physical representation of a chunk.
pub trait ChunkRegenerator {
    /// Start rebuilding from `snapshot`. The snapshot is owned by the
    /// regenerator and may be moved to another thread.
    fn request_regeneration(&mut self, snapshot: ChunkSnapshot) -> RegenTicket;

    /// Whether the rebuild behind `ticket` has finished.
    fn is_complete(&mut self, ticket: RegenTicket) -> bool;
}

/// Receives every batch of applied cell writes (for replication).
pub trait CellChangeListener {
    fn cells_changed(&mut self, changes: &[CellChange]);
}

/// Request regeneration for each loaded chunk in `coords`, once per chunk.
///
/// Clears each chunk's dirty region as its snapshot is taken. Unloaded
/// chunks are skipped. With no regenerator nothing is requested.
pub fn request_regeneration(
    chunks: &mut ChunkMap,
    regenerator: Option<&mut (dyn ChunkRegenerator + '_)>,
    coords: &[ChunkCoord],
) -> Vec<RegenTicket> {
    let Some(regenerator) = regenerator else {
        if !coords.is_empty() {
            log::warn!(
                "No chunk regenerator attached; {} chunk(s) left stale",
                coords.len()
            );
        }
        return Vec::new();
    };

    let mut seen = HashSet::with_capacity(coords.len());
    let mut tickets = Vec::with_capacity(coords.len());
    for coord in coords {
        if !seen.insert(*coord) {
            continue;
        }
        let Some(chunk) = chunks.get_mut(coord) else {
            continue;
        };
        let snapshot = chunk.snapshot();
        chunk.take_dirty_region();
        tickets.push(regenerator.request_regeneration(snapshot));
    }
    log::debug!("Requested regeneration for {} chunk(s)", tickets.len());
    tickets
}

/// Forward applied writes to the listener, if there is one and there is
/// anything to report.
pub fn notify_changes(listener: Option<&mut (dyn CellChangeListener + '_)>, changes: &[CellChange]) {
    if changes.is_empty() {
        return;
    }
    match listener {
        Some(listener) => listener.cells_changed(changes),
        None => log::debug!("{} cell change(s) with no listener attached", changes.len()),
    }
}

/// Regenerator that finishes every request immediately.
///
/// Suits headless hosts with no meshes to build. Keeps the coordinates it
/// was asked to rebuild so callers can inspect them.
#[derive(Debug, Default)]
pub struct ImmediateRegenerator {
    next_ticket: u64,
    requested: Vec<ChunkCoord>,
}

impl ImmediateRegenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every chunk coordinate requested so far, in request order.
    pub fn requested(&self) -> &[ChunkCoord] {
        &self.requested
    }

    pub fn clear(&mut self) {
        self.requested.clear();
    }
}

impl ChunkRegenerator for ImmediateRegenerator {
    fn request_regeneration(&mut self, snapshot: ChunkSnapshot) -> RegenTicket {
        self.requested.push(snapshot.coord);
        let ticket = RegenTicket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    fn is_complete(&mut self, _ticket: RegenTicket) -> bool {
        true
    }
}

/// Regenerator whose requests stay pending until released by the host.
///
/// Models a mesher running elsewhere: `release_all` is the point at which
/// its results come back.
#[derive(Debug, Default)]
pub struct DeferredRegenerator {
    next_ticket: u64,
    pending: HashMap<RegenTicket, ChunkCoord>,
}

impl DeferredRegenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Finish every outstanding request, returning the chunks rebuilt.
    pub fn release_all(&mut self) -> Vec<ChunkCoord> {
        self.pending.drain().map(|(_, coord)| coord).collect()
    }
}

impl ChunkRegenerator for DeferredRegenerator {
    fn request_regeneration(&mut self, snapshot: ChunkSnapshot) -> RegenTicket {
        let ticket = RegenTicket(self.next_ticket);
        self.next_ticket += 1;
        self.pending.insert(ticket, snapshot.coord);
        ticket
    }

    fn is_complete(&mut self, ticket: RegenTicket) -> bool {
        !self.pending.contains_key(&ticket)
    }
}

/// Listener that keeps every change it is sent.
#[derive(Debug, Default)]
pub struct RecordingListener {
    pub events: Vec<Vec<CellChange>>,
}

impl CellChangeListener for RecordingListener {
    fn cells_changed(&mut self, changes: &[CellChange]) {
        self.events.push(changes.to_vec());
    }
}
