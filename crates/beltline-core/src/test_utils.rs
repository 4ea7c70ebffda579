//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature). The concrete behaviors here stand in for the game's
//! machine library, which lives outside the engine.

use crate::engine::Engine;
use crate::item::Item;
use crate::machine::{Action, Behavior, FnBehavior, Machine, MachineId, Ports};
use crate::num::num;
use beltline_grid::Coord;

// ===========================================================================
// Item shorthands
// ===========================================================================

pub fn number(v: f64) -> Item {
    Item::number(num(v))
}

pub fn text(s: &str) -> Item {
    Item::text(s)
}

// ===========================================================================
// Behaviors
// ===========================================================================

/// Identity: emits every input unchanged, port-for-port. Idle when no input
/// port offers anything.
pub fn passthrough(arity: usize) -> Box<dyn Behavior> {
    FnBehavior::boxed("passthrough", move |inputs| {
        debug_assert_eq!(inputs.len(), arity);
        if inputs.iter().all(Option::is_none) {
            return Ok(Action::Idle);
        }
        Ok(Action::Emit(inputs.to_vec()))
    })
}

/// One-in one-out: doubles a number.
pub fn double() -> Box<dyn Behavior> {
    FnBehavior::boxed("double", |inputs| match inputs.first() {
        Some(Some(item)) => {
            let n = item.as_number()?;
            Ok(Action::Emit(vec![Some(Item::number(n + n))]))
        }
        _ => Ok(Action::Idle),
    })
}

/// Two-in one-out: waits until both numbers are present, then emits the sum.
pub fn adder() -> Box<dyn Behavior> {
    FnBehavior::boxed("adder", |inputs| match inputs {
        [Some(a), Some(b)] => {
            let sum = a.as_number()? + b.as_number()?;
            Ok(Action::Emit(vec![Some(Item::number(sum))]))
        }
        _ => Ok(Action::Idle),
    })
}

/// One-in one-out: swaps the halves of a product.
pub fn swap_pair() -> Box<dyn Behavior> {
    FnBehavior::boxed("swap-pair", |inputs| match inputs.first() {
        Some(Some(item)) => {
            let (fst, snd) = item.as_pair()?;
            Ok(Action::Emit(vec![Some(Item::pair(snd.clone(), fst.clone()))]))
        }
        _ => Ok(Action::Idle),
    })
}

/// Zero-in one-out: emits the same item every tick.
pub fn constant(item: Item) -> Box<dyn Behavior> {
    FnBehavior::boxed("constant", move |_| {
        Ok(Action::Emit(vec![Some(item.clone())]))
    })
}

// ===========================================================================
// Machines and world builders
// ===========================================================================

/// A conveyor that accepts from its own cell and delivers one cell east.
pub fn east_belt() -> Machine {
    Machine::conveyor(Ports::new(vec![Coord::new(0, 0)], vec![Coord::new(1, 0)]))
}

/// A straight run of `len` east-facing conveyors starting at `start`.
pub fn belt_line(engine: &mut Engine, start: Coord, len: i32) -> Vec<MachineId> {
    (0..len)
        .map(|i| {
            engine
                .place(east_belt(), Coord::new(start.x + i, start.y))
                .expect("belt line placement should not overlap")
        })
        .collect()
}

/// Every item in the world: grid cells plus conveyor slots, as a sorted
/// multiset for conservation checks.
pub fn item_multiset(engine: &Engine) -> Vec<Item> {
    let mut all: Vec<Item> = engine.items().iter().map(|(_, item)| item.clone()).collect();
    all.extend(engine.machines().filter_map(|(_, m)| m.held().cloned()));
    all.sort_by_key(|item| {
        let mut hash = crate::sim::StateHash::new();
        hash.write_item(item);
        hash.finish()
    });
    all
}
