//! Per-tick diagnostics.
//!
//! Tick-level faults are never thrown: one malfunctioning machine must not
//! halt the simulation. Instead every anomaly a tick produces accumulates
//! into the [`TickReport`] the engine hands back to the host.

use crate::item::Item;
use crate::machine::MachineId;
use crate::num::Ticks;
use beltline_grid::Coord;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Something a tick needs to tell the host about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickEvent {
    /// Two machine outputs targeted the same cell. The first writer in
    /// machine iteration order wins; the loser's item is dropped here so
    /// nothing disappears without a trace.
    Conflict {
        cell: Coord,
        winner: MachineId,
        loser: MachineId,
        dropped: Item,
    },

    /// An output landed on a cell whose pre-tick item no machine consumed
    /// this tick, destroying it.
    Overwrite {
        cell: Coord,
        machine: MachineId,
        destroyed: Item,
    },

    /// Two or more machines consumed the same snapshot item, duplicating it.
    /// Legal under the simultaneity model, but hosts may want to know.
    SharedConsume { cell: Coord, machines: Vec<MachineId> },

    /// A processor returned an output sequence whose length differs from its
    /// declared output port count. The machine was treated as inactive;
    /// outputs are never silently truncated.
    ArityMismatch {
        machine: MachineId,
        expected: usize,
        got: usize,
    },

    /// A processor behavior failed (typically a wrong-shape item access).
    /// Isolated to that machine for this tick.
    BehaviorFault { machine: MachineId, error: String },
}

/// Discriminant tag for tick events, used for filtering and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickEventKind {
    Conflict,
    Overwrite,
    SharedConsume,
    ArityMismatch,
    BehaviorFault,
}

impl TickEvent {
    pub fn kind(&self) -> TickEventKind {
        match self {
            TickEvent::Conflict { .. } => TickEventKind::Conflict,
            TickEvent::Overwrite { .. } => TickEventKind::Overwrite,
            TickEvent::SharedConsume { .. } => TickEventKind::SharedConsume,
            TickEvent::ArityMismatch { .. } => TickEventKind::ArityMismatch,
            TickEvent::BehaviorFault { .. } => TickEventKind::BehaviorFault,
        }
    }
}

// ---------------------------------------------------------------------------
// TickReport
// ---------------------------------------------------------------------------

/// Everything one call to `Engine::step` wants the host to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// The tick this report describes (the counter value when it started).
    pub tick: Ticks,
    /// Accumulated events, in the order they were detected.
    pub events: Vec<TickEvent>,
    /// Machines evaluated this tick.
    pub machines_run: u32,
    /// Items accepted, pushed, or emitted this tick.
    pub items_moved: u32,
}

impl TickReport {
    pub(crate) fn new(tick: Ticks) -> Self {
        Self {
            tick,
            events: Vec::new(),
            machines_run: 0,
            items_moved: 0,
        }
    }

    pub(crate) fn record(&mut self, event: TickEvent) {
        self.events.push(event);
    }

    /// True when the tick produced no events at all.
    pub fn is_clean(&self) -> bool {
        self.events.is_empty()
    }

    pub fn count(&self, kind: TickEventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }

    /// Only the write-conflict events.
    pub fn conflicts(&self) -> impl Iterator<Item = &TickEvent> {
        self.events
            .iter()
            .filter(|e| e.kind() == TickEventKind::Conflict)
    }
}
