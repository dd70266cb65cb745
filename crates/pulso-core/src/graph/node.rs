//! Per-unit bookkeeping inside the connection graph.
//!
//! Each unit added to a [`UnitGraph`](super::UnitGraph) gets a [`UnitId`]
//! and a `UnitState` record bundling the boxed [`Unit`](crate::Unit) with
//! its per-inlet incoming and per-outlet outgoing edge lists (kept
//! separately for message and signal ports) and its pending-message queue.

use crate::message::PendingMessage;
use crate::unit::Unit;

use super::edge::EdgeId;

/// Unique identifier for a unit in the graph.
///
/// Unit IDs are assigned sequentially and never reused within a graph
/// instance. They remain stable across graph mutations and schedule
/// compilations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UnitId(pub(crate) u32);

impl UnitId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for UnitId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "UnitId({})", self.0)
    }
}

/// Internal bookkeeping for a unit in the graph.
pub(crate) struct UnitState {
    pub id: UnitId,
    pub unit: Box<dyn Unit + Send>,
    /// Incoming signal edges, one list per signal inlet.
    pub sig_in: Vec<Vec<EdgeId>>,
    /// Outgoing signal edges, one list per signal outlet.
    pub sig_out: Vec<Vec<EdgeId>>,
    /// Incoming message edges, one list per message inlet.
    pub msg_in: Vec<Vec<EdgeId>>,
    /// Outgoing message edges, one list per message outlet.
    pub msg_out: Vec<Vec<EdgeId>>,
    /// Messages awaiting this unit's next block execution, sorted by
    /// timestamp (stable for equal stamps).
    pub pending: Vec<PendingMessage>,
}

impl UnitState {
    /// Creates bookkeeping for a freshly added unit, sizing the edge lists
    /// from the unit's declared port counts.
    pub fn new(id: UnitId, unit: Box<dyn Unit + Send>) -> Self {
        let sig_in = (0..unit.signal_inlets()).map(|_| Vec::new()).collect();
        let sig_out = (0..unit.signal_outlets()).map(|_| Vec::new()).collect();
        let msg_in = (0..unit.message_inlets()).map(|_| Vec::new()).collect();
        let msg_out = (0..unit.message_outlets()).map(|_| Vec::new()).collect();
        Self {
            id,
            unit,
            sig_in,
            sig_out,
            msg_in,
            msg_out,
            pending: Vec::new(),
        }
    }

    /// Inserts a pending message, keeping the queue sorted by timestamp.
    ///
    /// Equal timestamps preserve arrival order.
    pub fn queue_pending(&mut self, message: PendingMessage) {
        let pos = self.pending.partition_point(|p| p.time <= message.time);
        self.pending.insert(pos, message);
    }

    /// All edge IDs touching this unit, incoming and outgoing, both kinds.
    pub fn all_edges(&self) -> Vec<EdgeId> {
        self.sig_in
            .iter()
            .chain(self.sig_out.iter())
            .chain(self.msg_in.iter())
            .chain(self.msg_out.iter())
            .flatten()
            .copied()
            .collect()
    }
}
