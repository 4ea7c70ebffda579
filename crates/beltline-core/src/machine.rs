//! The machine abstraction: conveyors and processors.
//!
//! The variant set is closed, so dispatch is an enum match rather than
//! virtual calls. The one open seam is [`Behavior`]: the processor's
//! per-tick transformation is host-supplied behind a `Box<dyn Behavior>`,
//! the arbitrary-pure-function contract the engine is generic over.

use crate::item::{Item, ShapeError};
use beltline_grid::{Coord, Footprint, GridError};
use serde::{Deserialize, Serialize};
use std::fmt;

slotmap::new_key_type! {
    /// Identifies a placed machine in the engine.
    pub struct MachineId;
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// A machine's input and output port offsets, relative to its anchor.
///
/// The lists are fixed for the machine's lifetime; declared order is the
/// machine's fixed priority order, and for a processor the list lengths are
/// exactly the arity its behavior receives and must produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ports {
    inputs: Vec<Coord>,
    outputs: Vec<Coord>,
}

impl Ports {
    pub fn new(inputs: Vec<Coord>, outputs: Vec<Coord>) -> Self {
        Self { inputs, outputs }
    }

    pub fn inputs(&self) -> &[Coord] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Coord] {
        &self.outputs
    }
}

// ---------------------------------------------------------------------------
// Behavior
// ---------------------------------------------------------------------------

/// What a processor decided to do this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No action this tick. Inputs are left untouched on the grid.
    Idle,
    /// Consume every offered input and deliver one optional item per
    /// declared output port, in port order.
    Emit(Vec<Option<Item>>),
}

/// A fault raised by a processor behavior. Isolated to that machine for that
/// tick; the engine records it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BehaviorError {
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("behavior failed: {0}")]
    Failed(String),
}

/// The pure per-tick transformation of a processor.
///
/// `inputs` carries exactly one entry per declared input port, in port
/// order; `None` means that port's source cell was empty. The call must be
/// a pure function of its inputs for a single invocation. Hidden internal
/// state across ticks (an accumulator, say) is fine; observable side
/// effects beyond the return value are not.
pub trait Behavior: fmt::Debug + Send {
    fn run(&mut self, inputs: &[Option<Item>]) -> Result<Action, BehaviorError>;
}

/// Adapter so a named closure can serve as a [`Behavior`] without a
/// dedicated struct.
pub struct FnBehavior {
    name: &'static str,
    func: Box<dyn FnMut(&[Option<Item>]) -> Result<Action, BehaviorError> + Send>,
}

impl FnBehavior {
    pub fn boxed(
        name: &'static str,
        func: impl FnMut(&[Option<Item>]) -> Result<Action, BehaviorError> + Send + 'static,
    ) -> Box<dyn Behavior> {
        Box::new(Self {
            name,
            func: Box::new(func),
        })
    }
}

impl fmt::Debug for FnBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FnBehavior").field(&self.name).finish()
    }
}

impl Behavior for FnBehavior {
    fn run(&mut self, inputs: &[Option<Item>]) -> Result<Action, BehaviorError> {
        (self.func)(inputs)
    }
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

/// The two machine variants.
#[derive(Debug)]
pub enum MachineKind {
    /// Passive 1x1 transport. Holds at most one item in its internal slot.
    Conveyor { slot: Option<Item> },
    /// Active transformer with an arbitrary rectangular footprint.
    Processor { behavior: Box<dyn Behavior> },
}

/// A placed factory machine: footprint, ports, and variant payload.
#[derive(Debug)]
pub struct Machine {
    pub(crate) footprint: Footprint,
    pub(crate) ports: Ports,
    pub(crate) kind: MachineKind,
}

impl Machine {
    /// A conveyor with an empty slot. Footprint is always 1x1.
    pub fn conveyor(ports: Ports) -> Self {
        Self {
            footprint: Footprint::single(),
            ports,
            kind: MachineKind::Conveyor { slot: None },
        }
    }

    /// A conveyor preloaded with an item in its slot.
    pub fn conveyor_holding(ports: Ports, item: Item) -> Self {
        Self {
            footprint: Footprint::single(),
            ports,
            kind: MachineKind::Conveyor { slot: Some(item) },
        }
    }

    /// A processor with the given footprint, ports, and behavior.
    pub fn processor(footprint: Footprint, ports: Ports, behavior: Box<dyn Behavior>) -> Self {
        Self {
            footprint,
            ports,
            kind: MachineKind::Processor { behavior },
        }
    }

    pub fn footprint(&self) -> Footprint {
        self.footprint
    }

    pub fn ports(&self) -> &Ports {
        &self.ports
    }

    pub fn is_conveyor(&self) -> bool {
        matches!(self.kind, MachineKind::Conveyor { .. })
    }

    /// The item in a conveyor's slot. Always `None` for processors.
    pub fn held(&self) -> Option<&Item> {
        match &self.kind {
            MachineKind::Conveyor { slot } => slot.as_ref(),
            MachineKind::Processor { .. } => None,
        }
    }

    /// Registration-time configuration checks. Everything here is a fatal
    /// config error: the machine can never act sensibly, so it is rejected
    /// before it touches the grid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.footprint.width == 0 || self.footprint.height == 0 {
            return Err(ConfigError::EmptyFootprint);
        }
        for &port in self.ports.inputs().iter().chain(self.ports.outputs()) {
            if !self.footprint.touches(port) {
                return Err(ConfigError::PortOutOfRange { port });
            }
        }
        // A port serving as both input and output would make the machine
        // consume its own emission.
        for &port in self.ports.inputs() {
            if self.ports.outputs().contains(&port) {
                return Err(ConfigError::SelfReferentialPort { port });
            }
        }
        if self.is_conveyor() && (self.ports.inputs().is_empty() || self.ports.outputs().is_empty())
        {
            return Err(ConfigError::NoPorts);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Fatal machine-configuration errors, raised at registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("machine footprint must be at least 1x1")]
    EmptyFootprint,
    #[error("port offset ({}, {}) can never resolve to a cell on or next to the footprint", port.x, port.y)]
    PortOutOfRange { port: Coord },
    #[error("offset ({}, {}) is declared as both an input and an output port", port.x, port.y)]
    SelfReferentialPort { port: Coord },
    #[error("a conveyor needs at least one input and one output port")]
    NoPorts,
    #[error("placement failed: {0}")]
    Placement(#[from] GridError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::num;

    fn east_ports() -> Ports {
        Ports::new(vec![Coord::new(0, 0)], vec![Coord::new(1, 0)])
    }

    #[test]
    fn conveyor_is_1x1_and_empty() {
        let belt = Machine::conveyor(east_ports());
        assert_eq!(belt.footprint(), Footprint::single());
        assert!(belt.is_conveyor());
        assert!(belt.held().is_none());
        assert!(belt.validate().is_ok());
    }

    #[test]
    fn conveyor_holding_starts_loaded() {
        let belt = Machine::conveyor_holding(east_ports(), Item::number(num(5.0)));
        assert_eq!(belt.held(), Some(&Item::number(num(5.0))));
    }

    #[test]
    fn conveyor_without_ports_rejected() {
        let no_inputs = Machine::conveyor(Ports::new(vec![], vec![Coord::new(1, 0)]));
        assert_eq!(no_inputs.validate(), Err(ConfigError::NoPorts));

        let no_outputs = Machine::conveyor(Ports::new(vec![Coord::new(0, 0)], vec![]));
        assert_eq!(no_outputs.validate(), Err(ConfigError::NoPorts));
    }

    #[test]
    fn port_out_of_range_rejected() {
        let belt = Machine::conveyor(Ports::new(vec![Coord::new(0, 0)], vec![Coord::new(2, 0)]));
        assert_eq!(
            belt.validate(),
            Err(ConfigError::PortOutOfRange {
                port: Coord::new(2, 0)
            })
        );
    }

    #[test]
    fn interior_ports_are_allowed() {
        // Ports inside the footprint are valid: a 2x2 processor reading its
        // own top-left tile and writing its bottom-right tile.
        let machine = Machine::processor(
            Footprint::new(2, 2),
            Ports::new(vec![Coord::new(0, 0)], vec![Coord::new(1, 1)]),
            FnBehavior::boxed("noop", |_| Ok(Action::Idle)),
        );
        assert!(machine.validate().is_ok());
    }

    #[test]
    fn shared_input_output_offset_rejected() {
        let machine = Machine::processor(
            Footprint::single(),
            Ports::new(vec![Coord::new(0, 0)], vec![Coord::new(0, 0)]),
            FnBehavior::boxed("noop", |_| Ok(Action::Idle)),
        );
        assert_eq!(
            machine.validate(),
            Err(ConfigError::SelfReferentialPort {
                port: Coord::new(0, 0)
            })
        );
    }

    #[test]
    fn empty_footprint_rejected() {
        let machine = Machine::processor(
            Footprint::new(0, 3),
            Ports::new(vec![], vec![]),
            FnBehavior::boxed("noop", |_| Ok(Action::Idle)),
        );
        assert_eq!(machine.validate(), Err(ConfigError::EmptyFootprint));
    }

    #[test]
    fn processor_may_have_no_inputs() {
        // A source machine: emits from nothing.
        let source = Machine::processor(
            Footprint::single(),
            Ports::new(vec![], vec![Coord::new(1, 0)]),
            FnBehavior::boxed("source", |_| {
                Ok(Action::Emit(vec![Some(Item::number(num(1.0)))]))
            }),
        );
        assert!(source.validate().is_ok());
    }

    #[test]
    fn fn_behavior_runs_and_keeps_state() {
        let mut counter = 0u32;
        let mut behavior = FnBehavior::boxed("counting", move |_| {
            counter += 1;
            Ok(Action::Emit(vec![Some(Item::number(num(counter as f64)))]))
        });

        let first = behavior.run(&[]).unwrap();
        let second = behavior.run(&[]).unwrap();
        assert_eq!(first, Action::Emit(vec![Some(Item::number(num(1.0)))]));
        assert_eq!(second, Action::Emit(vec![Some(Item::number(num(2.0)))]));
    }

    #[test]
    fn behavior_error_from_shape_error() {
        let err: BehaviorError = Item::Void.as_number().unwrap_err().into();
        assert!(matches!(err, BehaviorError::Shape(_)));
        assert_eq!(err.to_string(), "expected a number item, found a void item");
    }
}
