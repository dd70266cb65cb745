//! Edge types for the connection graph.
//!
//! An `Edge` connects a specific outlet of one unit to a specific inlet of
//! another, and is tagged with the kind of ports it joins. Signal edges get
//! their buffer bindings during schedule compilation; the edge itself stores
//! only topology.

/// The kind of a port (and of the edges that join ports).
///
/// Signal outlets may only connect to signal inlets and message outlets to
/// message inlets; the graph rejects mixed connections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// Event-rate, time-stamped connections.
    Message,
    /// Block-rate audio connections.
    Signal,
}

impl core::fmt::Display for PortKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PortKind::Message => write!(f, "message"),
            PortKind::Signal => write!(f, "signal"),
        }
    }
}

/// Unique identifier for an edge in the connection graph.
///
/// Edge IDs are assigned sequentially and never reused within a graph
/// instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EdgeId(pub(crate) u32);

impl EdgeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

/// A directed connection between two units' ports.
pub(crate) struct Edge {
    /// Source unit.
    pub from: super::node::UnitId,
    /// Outlet index on the source unit, within `kind`'s outlet space.
    pub from_outlet: usize,
    /// Destination unit.
    pub to: super::node::UnitId,
    /// Inlet index on the destination unit, within `kind`'s inlet space.
    pub to_inlet: usize,
    /// Whether this is a message or a signal connection.
    pub kind: PortKind,
}
