//! The simulation engine: owns the world and orchestrates the three-phase
//! tick pipeline.
//!
//! # Architecture
//!
//! The `Engine` owns:
//! - The machines ([`SlotMap`] keyed by [`MachineId`])
//! - A [`SpatialIndex`] claiming every tile each machine occupies
//! - The item layer ([`SparseGrid`]), the only state a tick rewrites
//! - The tick counter
//!
//! # Three-Phase Pipeline
//!
//! Each `step()` runs:
//! 1. **Snapshot** -- capture the item layer; all evaluation reads see the
//!    pre-tick state. Consumption is invisible until commit, so two machines
//!    reading one cell both see its item (deliberate simultaneity, not a
//!    race).
//! 2. **Evaluate** -- machines in ascending anchor order record intended
//!    clears and placements into a pending write-set.
//! 3. **Commit** -- the write-set resolves into absolute cell assignments and
//!    is applied. Conflicts resolve first-writer-wins and are reported in
//!    the returned [`TickReport`].
//!
//! A tick is atomic from the caller's perspective; nothing suspends or aborts
//! mid-tick. Faulting machines are isolated and reported, never fatal.

use crate::item::Item;
use crate::machine::{Action, Behavior, ConfigError, Machine, MachineId, MachineKind, Ports};
use crate::num::Ticks;
use crate::report::{TickEvent, TickReport};
use crate::sim::StateHash;
use beltline_grid::{Coord, GridError, SparseGrid, SpatialIndex};
use slotmap::SlotMap;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The world: machines, the item layer, and the tick counter.
#[derive(Debug, Default)]
pub struct Engine {
    machines: SlotMap<MachineId, Machine>,
    index: SpatialIndex<MachineId>,
    items: SparseGrid<Item>,
    tick: Ticks,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Machine registration
    // -----------------------------------------------------------------------

    /// Validate a machine and claim its tiles at `anchor`.
    ///
    /// Configuration problems (bad ports, empty footprint) and placement
    /// problems (overlap) are both fatal here; a machine that registered
    /// successfully can always be evaluated.
    pub fn place(&mut self, machine: Machine, anchor: Coord) -> Result<MachineId, ConfigError> {
        machine.validate()?;
        let footprint = machine.footprint();
        let id = self.machines.insert(machine);
        if let Err(err) = self.index.place(id, anchor, footprint) {
            self.machines.remove(id);
            return Err(ConfigError::Placement(err));
        }
        Ok(id)
    }

    /// Release a machine's tiles and hand the machine back.
    pub fn remove(&mut self, id: MachineId) -> Result<Machine, ConfigError> {
        self.index.remove(id)?;
        match self.machines.remove(id) {
            Some(machine) => Ok(machine),
            None => Err(GridError::NotPlaced.into()),
        }
    }

    // -----------------------------------------------------------------------
    // Item layer access
    // -----------------------------------------------------------------------

    /// Put an item onto the grid from outside the simulation. Returns the
    /// displaced item, if the cell was occupied.
    pub fn deposit(&mut self, coord: Coord, item: Item) -> Option<Item> {
        self.items.insert(coord, item)
    }

    /// Remove and return the item at a cell.
    pub fn clear_cell(&mut self, coord: Coord) -> Option<Item> {
        self.items.take(coord)
    }

    pub fn item_at(&self, coord: Coord) -> Option<&Item> {
        self.items.get(coord)
    }

    /// The whole item layer, for rendering and inspection collaborators.
    pub fn items(&self) -> &SparseGrid<Item> {
        &self.items
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn machine(&self, id: MachineId) -> Option<&Machine> {
        self.machines.get(id)
    }

    /// All machines, in slotmap order (use [`Engine::machine_at`] and the
    /// anchor index for spatial queries).
    pub fn machines(&self) -> impl Iterator<Item = (MachineId, &Machine)> {
        self.machines.iter()
    }

    /// The machine occupying a tile, if any.
    pub fn machine_at(&self, coord: Coord) -> Option<MachineId> {
        self.index.key_at(coord)
    }

    pub fn anchor_of(&self, id: MachineId) -> Option<Coord> {
        self.index.anchor_of(id)
    }

    /// The item held by a conveyor's internal slot.
    pub fn conveyor_slot(&self, id: MachineId) -> Option<&Item> {
        self.machines.get(id).and_then(Machine::held)
    }

    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    pub fn current_tick(&self) -> Ticks {
        self.tick
    }

    /// FNV-1a hash over the tick counter and the item layer, in grid order.
    /// Two engines fed identical inputs hash identically after every tick.
    pub fn state_hash(&self) -> u64 {
        let mut hash = StateHash::new();
        hash.write_u64(self.tick);
        for (coord, item) in self.items.iter() {
            hash.write_i32(coord.x);
            hash.write_i32(coord.y);
            hash.write_item(item);
        }
        hash.finish()
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the world by one tick.
    pub fn step(&mut self) -> TickReport {
        let mut report = TickReport::new(self.tick);

        // Phase 1: Snapshot. Every evaluate-phase read sees pre-tick state,
        // so a machine's emission is never consumed within the same tick.
        let snapshot = self.items.clone();

        // Phase 2: Evaluate machines in ascending anchor order, recording
        // intended effects into the pending write-set.
        let mut pending = WriteSet::default();
        let order: Vec<(Coord, MachineId)> = self.index.anchors().collect();
        for (anchor, id) in order {
            let Some(machine) = self.machines.get_mut(id) else {
                continue;
            };
            report.machines_run += 1;
            let Machine { ports, kind, .. } = machine;
            match kind {
                MachineKind::Conveyor { slot } => {
                    evaluate_conveyor(anchor, id, ports, slot, &snapshot, &mut pending, &mut report);
                }
                MachineKind::Processor { behavior } => {
                    evaluate_processor(
                        anchor,
                        id,
                        ports,
                        behavior.as_mut(),
                        &snapshot,
                        &mut pending,
                        &mut report,
                    );
                }
            }
        }

        // Phase 3: Commit. Resolve to absolute assignments, then apply.
        let resolved = resolve(pending, &self.items, &mut report);
        apply(&mut self.items, &resolved);

        self.tick += 1;
        report
    }
}

// ---------------------------------------------------------------------------
// Pending write-set
// ---------------------------------------------------------------------------

/// Intended effects of one tick, recorded during evaluation and applied at
/// commit. Placements per cell keep evaluation order, so the conflict
/// winner is always the first writer.
#[derive(Debug, Default)]
struct WriteSet {
    /// Cells whose pre-tick item was consumed, with every consumer.
    consumes: BTreeMap<Coord, Vec<MachineId>>,
    /// Cells targeted by outputs, with each writer in evaluation order.
    placements: BTreeMap<Coord, Vec<(MachineId, Item)>>,
}

impl WriteSet {
    fn consume(&mut self, cell: Coord, by: MachineId) {
        self.consumes.entry(cell).or_default().push(by);
    }

    fn place(&mut self, cell: Coord, by: MachineId, item: Item) {
        self.placements.entry(cell).or_default().push((by, item));
    }

    /// True when an earlier writer already targeted this cell.
    fn claims(&self, cell: Coord) -> bool {
        self.placements.contains_key(&cell)
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// One conveyor action per tick: push the held item to the first available
/// output target, or accept from the first input port offering an item.
fn evaluate_conveyor(
    anchor: Coord,
    id: MachineId,
    ports: &Ports,
    slot: &mut Option<Item>,
    snapshot: &SparseGrid<Item>,
    pending: &mut WriteSet,
    report: &mut TickReport,
) {
    if let Some(item) = slot.take() {
        // Holding: push in declared output order. A target is available when
        // it was empty pre-tick and no earlier machine wrote to it this tick.
        let target = ports
            .outputs()
            .iter()
            .map(|&offset| anchor.offset(offset))
            .find(|&cell| snapshot.get(cell).is_none() && !pending.claims(cell));
        match target {
            Some(cell) => {
                pending.place(cell, id, item);
                report.items_moved += 1;
            }
            // Every target blocked: keep holding.
            None => *slot = Some(item),
        }
    } else {
        // Empty: accept from the first declared input port with an item.
        for &offset in ports.inputs() {
            let cell = anchor.offset(offset);
            if let Some(item) = snapshot.get(cell) {
                pending.consume(cell, id);
                *slot = Some(item.clone());
                report.items_moved += 1;
                break;
            }
        }
    }
}

/// Gather one optional item per input port, run the behavior, and record its
/// effects. Faults and arity mismatches degrade this machine to inactive for
/// the tick and are reported; other machines are unaffected.
fn evaluate_processor(
    anchor: Coord,
    id: MachineId,
    ports: &Ports,
    behavior: &mut dyn Behavior,
    snapshot: &SparseGrid<Item>,
    pending: &mut WriteSet,
    report: &mut TickReport,
) {
    let inputs: Vec<Option<Item>> = ports
        .inputs()
        .iter()
        .map(|&offset| snapshot.get(anchor.offset(offset)).cloned())
        .collect();

    match behavior.run(&inputs) {
        Ok(Action::Idle) => {}
        Ok(Action::Emit(outputs)) => {
            if outputs.len() != ports.outputs().len() {
                report.record(TickEvent::ArityMismatch {
                    machine: id,
                    expected: ports.outputs().len(),
                    got: outputs.len(),
                });
                return;
            }
            // Emitting consumes every offered input atomically.
            for (&offset, input) in ports.inputs().iter().zip(&inputs) {
                if input.is_some() {
                    pending.consume(anchor.offset(offset), id);
                }
            }
            for (&offset, output) in ports.outputs().iter().zip(outputs) {
                if let Some(item) = output {
                    pending.place(anchor.offset(offset), id, item);
                    report.items_moved += 1;
                }
            }
        }
        Err(err) => {
            report.record(TickEvent::BehaviorFault {
                machine: id,
                error: err.to_string(),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// Resolve the pending write-set into absolute cell assignments.
///
/// A recorded clear only means "the pre-tick occupant was consumed", so a
/// placement on the same cell wins regardless of recording order. Among
/// placements the first writer wins; losers are dropped with a report.
fn resolve(
    writes: WriteSet,
    before: &SparseGrid<Item>,
    report: &mut TickReport,
) -> BTreeMap<Coord, Option<Item>> {
    let WriteSet {
        consumes,
        placements,
    } = writes;

    for (&cell, machines) in &consumes {
        if machines.len() > 1 {
            report.record(TickEvent::SharedConsume {
                cell,
                machines: machines.clone(),
            });
        }
    }

    let mut resolved: BTreeMap<Coord, Option<Item>> =
        consumes.keys().map(|&cell| (cell, None)).collect();

    for (cell, writers) in placements {
        let mut writers = writers.into_iter();
        let Some((winner, item)) = writers.next() else {
            continue;
        };

        if let Some(existing) = before.get(cell) {
            if !consumes.contains_key(&cell) {
                report.record(TickEvent::Overwrite {
                    cell,
                    machine: winner,
                    destroyed: existing.clone(),
                });
            }
        }
        for (loser, dropped) in writers {
            report.record(TickEvent::Conflict {
                cell,
                winner,
                loser,
                dropped,
            });
        }
        resolved.insert(cell, Some(item));
    }

    resolved
}

/// Apply resolved assignments. Absolute writes, not deltas: applying the
/// same resolution twice leaves the grid unchanged.
fn apply(items: &mut SparseGrid<Item>, resolved: &BTreeMap<Coord, Option<Item>>) {
    for (&cell, value) in resolved {
        items.set(cell, value.clone());
    }
}
