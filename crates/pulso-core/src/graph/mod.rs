//! Dataflow graph engine: connection bookkeeping, schedule compilation,
//! buffer management, and block execution.
//!
//! The module implements the edit-compile-execute split:
//!
//! - [`UnitGraph`] — owned by the control context. Holds topology (units,
//!   edges, terminals), performs mutations, runs
//!   [`compile()`](UnitGraph::compile), drives
//!   [`process_block()`](UnitGraph::process_block).
//! - [`CompiledSchedule`] — immutable snapshot: a flat [`Step`] list with
//!   all buffer wiring resolved, shared via `Arc` so a newly compiled
//!   schedule is published in a single pointer swap.
//! - [`BufferPool`] — reference-counted arena of block-sized buffers.
//!   Counts are a compile-time ledger; the per-block path neither
//!   allocates nor counts.
//!
//! # Buffer efficiency
//!
//! Wherever exactly one signal feeds an inlet, the inlet aliases the
//! source's outlet buffer (zero-copy). Released holds recycle slots down
//! the schedule, so a long linear chain ping-pongs between two slots.
//! Fan-in synthesizes [`Step::ImplicitAdd`] summing steps at compile time,
//! folding sources pairwise in connection order; the adders exist only in
//! the schedule, never in the visible graph.
//!
//! # Hybrid scheduling
//!
//! Control messages carry fractional block-relative timestamps. The
//! executor splits a unit's block at each pending timestamp, applying the
//! message between segments, so parameter changes land on the nearest
//! sample without per-sample parameter checks.

pub mod edge;
pub mod node;
pub mod pool;
mod processing;
pub mod schedule;

pub use edge::{EdgeId, PortKind};
pub use node::UnitId;
pub use pool::{BufferId, BufferPool};
pub use processing::{GraphError, MessageError, UnitGraph};
pub use schedule::{CompiledSchedule, PortBindings, Step};
