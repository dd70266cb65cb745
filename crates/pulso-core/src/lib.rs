//! Pulso Core — graph scheduler and buffer engine for a block-synchronous
//! signal runtime.
//!
//! This crate is the scheduling and memory-lifetime core of an embeddable
//! real-time signal processor: it models a mixed message/signal dataflow
//! graph of [`Unit`]s, compiles a deterministic per-block execution order,
//! synthesizes implicit summing steps where multiple signals converge on
//! one inlet, manages a shared pool of reference-counted audio buffers so
//! signal connections are zero-copy wherever possible, and executes each
//! block while interleaving time-stamped control messages at sub-block
//! granularity.
//!
//! # Core Abstractions
//!
//! - [`Unit`] — a node with fixed message and signal ports: block
//!   processing over sub-block ranges, message application, and a
//!   connection-change hook
//! - [`UnitGraph`] — topology mutations, schedule compilation, block
//!   execution, message delivery
//! - [`CompiledSchedule`] — immutable `Arc`-published instruction list
//! - [`BufferPool`] — reference-counted arena of block-sized buffers with
//!   a shared read-only zero buffer
//! - [`Message`] / [`MessageOutbox`] — timestamped control events and the
//!   channel units post responses through
//!
//! # Example
//!
//! ```rust
//! use pulso_core::{ProcessContext, SignalIo, Unit, UnitGraph};
//!
//! /// 1 kHz-ish ramp for the sake of the example.
//! struct Ramp {
//!     value: f32,
//! }
//!
//! impl Unit for Ramp {
//!     fn signal_outlets(&self) -> usize { 1 }
//!     fn process(&mut self, _ctx: &mut ProcessContext, io: &mut SignalIo,
//!                range: core::ops::Range<usize>) {
//!         let out = io.outlet(0);
//!         for i in range {
//!             out[i] = self.value;
//!             self.value = (self.value + 0.01) % 1.0;
//!         }
//!     }
//! }
//!
//! let mut graph = UnitGraph::new(48_000.0, 64);
//! let ramp = graph.add_unit(Box::new(Ramp { value: 0.0 })).unwrap();
//! graph.mark_terminal(ramp).unwrap();
//! graph.compile().unwrap();
//!
//! graph.process_block();
//! let block = graph.terminal_output(ramp, 0).unwrap();
//! assert_eq!(block.len(), 64);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe execution**: buffer allocation and reference
//!   counting happen at compile time only; the per-block path is
//!   allocation-free
//! - **Atomic schedule publication**: the executor sees a complete
//!   schedule or the previous one, never a half-wired state
//! - **Explicit memoization**: schedule compilation walks an explicit
//!   stack with an external visited set — no recursion, no per-unit flags
//!   to reset
//!
//! Concrete unit implementations live in `pulso-units`; this crate only
//! defines the contracts they implement.

pub mod graph;
pub mod message;
pub mod unit;

// Re-export main types at crate root
pub use graph::{
    BufferId, BufferPool, CompiledSchedule, EdgeId, GraphError, MessageError, PortBindings,
    PortKind, Step, UnitGraph, UnitId,
};
pub use message::{Message, MessageOutbox, PendingMessage};
pub use unit::{MAX_SIGNAL_PORTS, ProcessContext, SignalIo, Unit};
