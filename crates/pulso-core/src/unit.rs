//! The core [`Unit`] trait and the per-block views handed to it.
//!
//! A unit is a node in the processing graph: it declares fixed message and
//! signal port counts at construction, processes signal blocks over
//! sub-block ranges, applies control messages between those ranges, and is
//! notified when the wiring at one of its inlets changes.
//!
//! ## Design Decisions
//!
//! - **Object-safe**: units are stored as `Box<dyn Unit + Send>` in the
//!   graph, so all methods avoid generics.
//!
//! - **Sub-block ranges**: `process` receives a `Range<usize>` rather than
//!   a whole block. The executor splits a block at message timestamps, so a
//!   parameter change takes effect at the sample nearest its stamp without
//!   the unit re-checking parameters every sample.
//!
//! - **No allocations**: the signal views are fixed-capacity; nothing in
//!   `process` needs the heap.

use core::ops::Range;

use crate::graph::PortKind;
use crate::message::{Message, MessageOutbox};

/// Maximum number of signal inlets or outlets a single unit may declare.
///
/// A fixed bound keeps the compiled schedule's per-step port bindings
/// stack-allocated. Units with more signal ports are rejected when added
/// to the graph.
pub const MAX_SIGNAL_PORTS: usize = 8;

/// Information available during block processing.
///
/// Passed to every [`Unit::process`] call alongside the signal views.
pub struct ProcessContext<'a> {
    /// Sample rate of the graph in Hz.
    pub sample_rate: f32,
    /// Number of samples per block.
    pub block_size: usize,
    pub(crate) outbox: &'a mut MessageOutbox,
}

impl ProcessContext<'_> {
    /// Current position within the block, in fractional samples.
    ///
    /// During normal processing this is the start of the current segment;
    /// while a message is being applied it is the message's timestamp.
    pub fn now(&self) -> f32 {
        self.outbox.now
    }

    /// Posts a message to one of this unit's message outlets.
    ///
    /// The message is stamped with [`now()`](Self::now) and routed along
    /// the graph's message edges after this unit's turn completes.
    pub fn post(&mut self, outlet: usize, message: Message) {
        self.outbox.post(outlet, message);
    }
}

/// Signal inlet and outlet buffers for one unit's turn.
///
/// Inlet slices borrow the pool arena directly (zero-copy: a slice may be
/// another unit's outlet buffer, or the shared zero buffer). Outlet buffers
/// are checked out of the arena for the duration of the turn, which is what
/// lets a unit hold inlet and outlet borrows at the same time.
pub struct SignalIo<'pool> {
    pub(crate) inlets: [&'pool [f32]; MAX_SIGNAL_PORTS],
    pub(crate) num_inlets: usize,
    pub(crate) outlets: [Option<Box<[f32]>>; MAX_SIGNAL_PORTS],
    pub(crate) num_outlets: usize,
}

impl<'pool> SignalIo<'pool> {
    pub(crate) fn new() -> Self {
        Self {
            inlets: [&[]; MAX_SIGNAL_PORTS],
            num_inlets: 0,
            outlets: core::array::from_fn(|_| None),
            num_outlets: 0,
        }
    }

    /// Number of signal inlets wired for this turn.
    pub fn num_inlets(&self) -> usize {
        self.num_inlets
    }

    /// Number of signal outlets wired for this turn.
    pub fn num_outlets(&self) -> usize {
        self.num_outlets
    }

    /// The signal buffer feeding inlet `index`.
    ///
    /// An inlet with no incoming connection reads the shared zero buffer.
    /// The returned slice outlives `self`, so it can be held across a call
    /// to [`outlet`](Self::outlet).
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a wired inlet.
    pub fn inlet(&self, index: usize) -> &'pool [f32] {
        assert!(index < self.num_inlets, "signal inlet {index} out of range");
        self.inlets[index]
    }

    /// The output buffer for outlet `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a wired outlet.
    pub fn outlet(&mut self, index: usize) -> &mut [f32] {
        assert!(index < self.num_outlets, "signal outlet {index} out of range");
        self.outlets[index]
            .as_deref_mut()
            .expect("outlet buffer checked out")
    }
}

/// Core trait for all processing units.
///
/// Units declare their port counts once; the graph sizes its connection
/// bookkeeping from them and they must not change over the unit's lifetime.
///
/// # Example
///
/// ```rust
/// use core::ops::Range;
/// use pulso_core::{Message, MessageOutbox, ProcessContext, SignalIo, Unit};
///
/// /// Multiplies its signal inlet by a message-settable factor.
/// struct Scale {
///     factor: f32,
/// }
///
/// impl Unit for Scale {
///     fn signal_inlets(&self) -> usize { 1 }
///     fn signal_outlets(&self) -> usize { 1 }
///     fn message_inlets(&self) -> usize { 1 }
///
///     fn process(&mut self, _ctx: &mut ProcessContext, io: &mut SignalIo, range: Range<usize>) {
///         let input = io.inlet(0);
///         let output = io.outlet(0);
///         for i in range {
///             output[i] = input[i] * self.factor;
///         }
///     }
///
///     fn apply_message(&mut self, _inlet: usize, message: &Message, _outbox: &mut MessageOutbox) {
///         if let Some(v) = message.as_float() {
///             self.factor = v;
///         }
///     }
/// }
/// ```
pub trait Unit: Send {
    /// Number of signal inlets. Must not exceed [`MAX_SIGNAL_PORTS`].
    fn signal_inlets(&self) -> usize {
        0
    }

    /// Number of signal outlets. Must not exceed [`MAX_SIGNAL_PORTS`].
    fn signal_outlets(&self) -> usize {
        0
    }

    /// Number of message inlets.
    fn message_inlets(&self) -> usize {
        0
    }

    /// Number of message outlets.
    fn message_outlets(&self) -> usize {
        0
    }

    /// Whether this unit performs signal computation.
    ///
    /// Units that return `false` participate in schedule ordering only:
    /// they are excluded from buffer wiring and never appear in the
    /// compiled schedule, and their messages are applied immediately on
    /// delivery instead of being queued. The default — any signal port
    /// present — is correct for every ordinary unit; do not override it to
    /// `false` while declaring signal ports.
    fn is_signal_unit(&self) -> bool {
        self.signal_inlets() > 0 || self.signal_outlets() > 0
    }

    /// Processes the samples in `range` (a sub-range of `[0, block_size)`).
    ///
    /// Called once per block when no messages are pending, or once per
    /// segment between message timestamps otherwise. Implementations must
    /// read and write only within `range` and must not allocate.
    fn process(&mut self, ctx: &mut ProcessContext, io: &mut SignalIo, range: Range<usize>) {
        let _ = (ctx, io, range);
    }

    /// Applies a control message received on `inlet`.
    ///
    /// For signal units this runs between processing segments, so state
    /// changed here takes effect from the next segment's first sample.
    /// Responses may be posted to `outbox`.
    fn apply_message(&mut self, inlet: usize, message: &Message, outbox: &mut MessageOutbox) {
        let _ = (inlet, message, outbox);
    }

    /// Notification that the connections arriving at `inlet` changed.
    ///
    /// Fired synchronously from `connect`/`disconnect` with the new number
    /// of incoming edges of the given kind, independent of schedule
    /// recompilation. Units whose behavior depends on whether an inlet is
    /// signal-driven (scalar vs. signal code paths) update their mode here.
    fn inlet_connections_changed(&mut self, inlet: usize, kind: PortKind, count: usize) {
        let _ = (inlet, kind, count);
    }

    /// Updates the sample rate. Called when the graph's rate changes.
    fn set_sample_rate(&mut self, sample_rate: f32) {
        let _ = sample_rate;
    }

    /// Clears internal state (phase, history) without changing parameters.
    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Passthrough;

    impl Unit for Passthrough {
        fn signal_inlets(&self) -> usize {
            1
        }
        fn signal_outlets(&self) -> usize {
            1
        }
        fn process(&mut self, _ctx: &mut ProcessContext, io: &mut SignalIo, range: Range<usize>) {
            let input = io.inlet(0);
            let output = io.outlet(0);
            for i in range {
                output[i] = input[i];
            }
        }
    }

    struct RelayOnly;

    impl Unit for RelayOnly {
        fn message_inlets(&self) -> usize {
            1
        }
        fn message_outlets(&self) -> usize {
            1
        }
    }

    #[test]
    fn test_signal_unit_default() {
        assert!(Passthrough.is_signal_unit());
        assert!(!RelayOnly.is_signal_unit());
    }

    #[test]
    fn test_io_inlet_outlives_outlet_borrow() {
        let backing = [1.0f32, 2.0, 3.0, 4.0];
        let mut io = SignalIo::new();
        io.inlets[0] = &backing;
        io.num_inlets = 1;
        io.outlets[0] = Some(vec![0.0; 4].into_boxed_slice());
        io.num_outlets = 1;

        let input = io.inlet(0);
        let output = io.outlet(0);
        output[0] = input[0] * 2.0;
        assert_eq!(io.outlet(0)[0], 2.0);
    }
}
