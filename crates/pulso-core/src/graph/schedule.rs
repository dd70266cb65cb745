//! Compiled schedule types.
//!
//! A [`CompiledSchedule`] is the immutable snapshot produced by
//! [`UnitGraph::compile()`](super::UnitGraph::compile): a flat list of
//! [`Step`] instructions the block executor walks once per audio block,
//! plus the buffer wiring resolved for every step. The schedule is shared
//! with the execution context via `Arc`, so the executor never observes a
//! half-updated wiring.

use crate::unit::MAX_SIGNAL_PORTS;

use super::node::UnitId;
use super::pool::BufferId;

/// Buffer bindings for one side (inlets or outlets) of a scheduled unit.
///
/// Fixed-size so a [`Step`] is entirely stack-allocated; the bound is
/// [`MAX_SIGNAL_PORTS`], enforced when units are added to the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortBindings {
    ids: [BufferId; MAX_SIGNAL_PORTS],
    len: usize,
}

impl PortBindings {
    pub(crate) fn new() -> Self {
        Self {
            ids: [BufferId::ZERO; MAX_SIGNAL_PORTS],
            len: 0,
        }
    }

    pub(crate) fn push(&mut self, id: BufferId) {
        debug_assert!(self.len < MAX_SIGNAL_PORTS);
        self.ids[self.len] = id;
        self.len += 1;
    }

    /// Number of bound ports.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no ports are bound.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The buffer bound to port `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn get(&self, index: usize) -> BufferId {
        assert!(index < self.len);
        self.ids[index]
    }

    /// Iterates over the bound buffers in port order.
    pub fn iter(&self) -> impl Iterator<Item = BufferId> + '_ {
        self.ids[..self.len].iter().copied()
    }
}

impl Default for PortBindings {
    fn default() -> Self {
        Self::new()
    }
}

/// One instruction in the compiled schedule.
///
/// Executed sequentially by the block executor. Synthesized summing units
/// appear as [`Step::ImplicitAdd`]; they exist only in the schedule, never
/// in the externally visible graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Run a unit's block processing over its bound buffers.
    Unit {
        /// The unit to execute.
        unit: UnitId,
        /// Buffer feeding each signal inlet (zero buffer when unconnected).
        inlets: PortBindings,
        /// Buffer written by each signal outlet.
        outlets: PortBindings,
    },

    /// Element-wise sum of two buffers into a third, synthesized where
    /// more than one signal converges on a single inlet.
    ImplicitAdd {
        /// Left operand.
        lhs: BufferId,
        /// Right operand.
        rhs: BufferId,
        /// Destination buffer.
        out: BufferId,
    },
}

/// Immutable compiled snapshot of the unit graph.
///
/// Shared with the execution context via `Arc` and never mutated after
/// creation. Holds the instruction list, the arena size it was compiled
/// against, and the outlet bindings of the designated terminal units for
/// host readback.
pub struct CompiledSchedule {
    pub(crate) steps: Vec<Step>,
    pub(crate) buffer_count: usize,
    pub(crate) outputs: Vec<(UnitId, PortBindings)>,
}

impl CompiledSchedule {
    /// The instruction list, in execution order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of instructions.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Number of arena slots the schedule is wired against, including the
    /// zero buffer.
    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    /// Number of synthesized summing steps.
    pub fn implicit_add_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, Step::ImplicitAdd { .. }))
            .count()
    }

    /// The buffer bound to `inlet` of `unit`, if the unit was scheduled.
    pub fn inlet_binding(&self, unit: UnitId, inlet: usize) -> Option<BufferId> {
        self.steps.iter().find_map(|s| match s {
            Step::Unit { unit: u, inlets, .. } if *u == unit && inlet < inlets.len() => {
                Some(inlets.get(inlet))
            }
            _ => None,
        })
    }

    /// The buffer bound to `outlet` of `unit`, if the unit was scheduled.
    pub fn outlet_binding(&self, unit: UnitId, outlet: usize) -> Option<BufferId> {
        self.steps.iter().find_map(|s| match s {
            Step::Unit { unit: u, outlets, .. } if *u == unit && outlet < outlets.len() => {
                Some(outlets.get(outlet))
            }
            _ => None,
        })
    }

    /// Outlet bindings of a designated terminal unit.
    pub fn terminal_bindings(&self, unit: UnitId) -> Option<&PortBindings> {
        self.outputs
            .iter()
            .find(|(u, _)| *u == unit)
            .map(|(_, b)| b)
    }

    /// Renders the schedule as a human-readable listing, one step per line.
    pub fn describe(&self) -> String {
        use core::fmt::Write;
        let mut out = String::new();
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                Step::Unit {
                    unit,
                    inlets,
                    outlets,
                } => {
                    let ins: Vec<String> = inlets.iter().map(|b| b.to_string()).collect();
                    let outs: Vec<String> = outlets.iter().map(|b| b.to_string()).collect();
                    let _ = writeln!(
                        out,
                        "step[{i}]: unit[{}] in[{}] → out[{}]",
                        unit.index(),
                        ins.join(", "),
                        outs.join(", ")
                    );
                }
                Step::ImplicitAdd { lhs, rhs, out: dst } => {
                    let _ = writeln!(out, "step[{i}]: implicit-add {lhs} + {rhs} → {dst}");
                }
            }
        }
        out
    }
}
