//! Beltline Core -- the tick engine for grid-based data factories.
//!
//! This crate advances a sparse 2D world of machines and data-carrying items
//! by one discrete tick at a time. Machines are either passive conveyors that
//! transport items between adjacent cells, or processors that consume items
//! at input ports and emit items at output ports via an arbitrary behavior
//! function. Items are a closed algebra of five shapes (void, number, text,
//! product, sum) with structural equality.
//!
//! # Three-Phase Tick Pipeline
//!
//! Each call to [`engine::Engine::step`] advances the world through:
//!
//! 1. **Snapshot** -- Capture the item layer; every read this tick sees the
//!    pre-tick state, so one machine's emission is never another's input in
//!    the same tick.
//! 2. **Evaluate** -- Visit machines in ascending anchor order; conveyors
//!    accept or push one item, processors run their behavior. All effects go
//!    into a pending write-set, never applied directly.
//! 3. **Commit** -- Resolve the write-set into absolute cell assignments and
//!    apply it. Colliding outputs resolve first-writer-wins and are reported,
//!    never dropped silently.
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- World state and pipeline orchestrator.
//! - [`item::Item`] -- The closed, structurally-recursive item algebra.
//! - [`machine::Machine`] -- Conveyor / processor variants with port lists.
//! - [`machine::Behavior`] -- The pure per-tick processor contract.
//! - [`report::TickReport`] -- Per-tick diagnostics returned to the host;
//!   one malfunctioning machine never halts the simulation.
//! - [`sim::StateHash`] -- FNV-1a state hashing for desync detection.

pub mod engine;
pub mod item;
pub mod machine;
pub mod num;
pub mod report;
pub mod sim;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use beltline_grid::{Coord, Footprint, SparseGrid};
