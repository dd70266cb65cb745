//! Unit graph — mutation API, schedule compilation, and block execution.
//!
//! [`UnitGraph`] is the main entry point for the runtime core. It owns the
//! graph topology (units and message/signal edges), provides mutation
//! methods (add, remove, connect, disconnect), compiles the graph into a
//! [`CompiledSchedule`], and executes that schedule once per audio block,
//! interleaving time-stamped control messages at sub-block granularity.
//!
//! The graph is mutated and compiled on a control context and executed on
//! the context driving the block cadence; the compiled schedule is an
//! immutable `Arc` snapshot, so publication is a single pointer swap and
//! the executor never observes half-updated wiring. A failed compilation
//! (cycle, missing terminal) leaves the previously published schedule in
//! force.

use std::sync::Arc;

use crate::message::{Message, MessageOutbox, OutboxEntry, PendingMessage};
use crate::unit::{MAX_SIGNAL_PORTS, ProcessContext, SignalIo, Unit};

use super::edge::{Edge, EdgeId, PortKind};
use super::node::{UnitId, UnitState};
use super::pool::{BufferId, BufferPool};
use super::schedule::{CompiledSchedule, PortBindings, Step};

/// Errors from graph mutation and schedule compilation.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The specified unit was not found in the graph.
    #[error("unit {0} not found")]
    UnitNotFound(UnitId),

    /// The specified edge was not found in the graph.
    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),

    /// The outlet index is outside the source unit's port space for the
    /// requested kind (this is also how a message-to-signal kind mismatch
    /// surfaces: the index is invalid in the other kind's space).
    #[error("invalid {kind} outlet {outlet} on {unit} ({count} available)")]
    InvalidOutlet {
        /// Source unit.
        unit: UnitId,
        /// Requested connection kind.
        kind: PortKind,
        /// Offending outlet index.
        outlet: usize,
        /// Number of outlets of that kind on the unit.
        count: usize,
    },

    /// The inlet index is outside the destination unit's port space for
    /// the requested kind.
    #[error("invalid {kind} inlet {inlet} on {unit} ({count} available)")]
    InvalidInlet {
        /// Destination unit.
        unit: UnitId,
        /// Requested connection kind.
        kind: PortKind,
        /// Offending inlet index.
        inlet: usize,
        /// Number of inlets of that kind on the unit.
        count: usize,
    },

    /// An identical edge already exists.
    #[error("edge from {0} to {1} already exists")]
    DuplicateEdge(UnitId, UnitId),

    /// The graph contains a cycle; feedback must go through an explicit
    /// delay unit.
    #[error("graph contains a cycle")]
    CycleDetected,

    /// A designated terminal no longer exists.
    #[error("terminal unit {0} not found")]
    TerminalNotFound(UnitId),

    /// The graph has no units to schedule.
    #[error("graph has no units to schedule")]
    EmptyGraph,

    /// A unit declares more signal ports than the schedule supports.
    #[error("unit declares {declared} signal {direction}s (maximum {max})")]
    TooManySignalPorts {
        /// Declared port count.
        declared: usize,
        /// `"inlet"` or `"outlet"`.
        direction: &'static str,
        /// The supported maximum, [`MAX_SIGNAL_PORTS`].
        max: usize,
    },
}

/// Errors from message delivery. All are non-fatal: the message is dropped
/// and the graph is unchanged.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The graph is inactive; messages are not queued while not running.
    #[error("message dropped: graph is inactive")]
    Inactive,

    /// The destination unit was not found.
    #[error("message dropped: unit {0} not found")]
    UnitNotFound(UnitId),

    /// The destination inlet does not exist.
    #[error("message dropped: inlet {inlet} out of range on {unit} ({count} message inlets)")]
    InvalidInlet {
        /// Destination unit.
        unit: UnitId,
        /// Offending inlet index.
        inlet: usize,
        /// Number of message inlets on the unit.
        count: usize,
    },

    /// The timestamp is outside the current block window.
    #[error("message dropped: timestamp {time} outside [0, {block_size})")]
    BadTimestamp {
        /// Offending timestamp.
        time: f32,
        /// The block size defining the valid window.
        block_size: usize,
    },
}

/// Compile-time visit state for one unit.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Idle,
    Active,
    Done,
}

/// Explicit DFS stack frame: visit a unit's dependencies, then finalize it.
enum Frame {
    Enter(usize),
    Exit(usize),
}

/// Mixed message/signal dataflow graph with a compiled per-block schedule.
///
/// # Usage
///
/// 1. Create a graph with [`new()`](Self::new)
/// 2. Add units: [`add_unit()`](Self::add_unit)
/// 3. Wire them: [`connect()`](Self::connect) with [`PortKind`]
/// 4. Designate outputs: [`mark_terminal()`](Self::mark_terminal)
/// 5. Compile: [`compile()`](Self::compile)
/// 6. Per block: deliver messages with [`send_message()`](Self::send_message),
///    run [`process_block()`](Self::process_block), read results with
///    [`terminal_output()`](Self::terminal_output)
pub struct UnitGraph {
    units: Vec<Option<UnitState>>,
    edges: Vec<Option<Edge>>,
    terminals: Vec<UnitId>,
    compiled: Option<Arc<CompiledSchedule>>,
    pool: BufferPool,
    sample_rate: f32,
    block_size: usize,
    /// Topology changed since the last successful compile.
    dirty: bool,
    active: bool,
    outbox: MessageOutbox,
    /// Reused routing work queue; capacity persists across blocks.
    route_scratch: Vec<(UnitId, OutboxEntry)>,
    drain_scratch: Vec<OutboxEntry>,
    next_unit_slot: u32,
    next_edge_slot: u32,
}

impl UnitGraph {
    /// Creates an empty graph.
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Sample rate in Hz (e.g., 48000.0)
    /// * `block_size` - Number of samples per processing block (e.g., 64)
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        Self {
            units: Vec::new(),
            edges: Vec::new(),
            terminals: Vec::new(),
            compiled: None,
            pool: BufferPool::new(block_size),
            sample_rate,
            block_size,
            dirty: false,
            active: true,
            outbox: MessageOutbox::new(),
            route_scratch: Vec::new(),
            drain_scratch: Vec::new(),
            next_unit_slot: 0,
            next_edge_slot: 0,
        }
    }

    // --- Mutations ---

    /// Adds a unit to the graph. Returns the new unit's ID.
    ///
    /// The unit's sample rate is set to the graph's sample rate.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::TooManySignalPorts`] if the unit declares more
    /// than [`MAX_SIGNAL_PORTS`] signal inlets or outlets.
    pub fn add_unit(&mut self, mut unit: Box<dyn Unit + Send>) -> Result<UnitId, GraphError> {
        if unit.signal_inlets() > MAX_SIGNAL_PORTS {
            return Err(GraphError::TooManySignalPorts {
                declared: unit.signal_inlets(),
                direction: "inlet",
                max: MAX_SIGNAL_PORTS,
            });
        }
        if unit.signal_outlets() > MAX_SIGNAL_PORTS {
            return Err(GraphError::TooManySignalPorts {
                declared: unit.signal_outlets(),
                direction: "outlet",
                max: MAX_SIGNAL_PORTS,
            });
        }

        unit.set_sample_rate(self.sample_rate);

        let id = UnitId(self.next_unit_slot);
        self.next_unit_slot += 1;
        let idx = id.0 as usize;
        if idx >= self.units.len() {
            self.units.resize_with(idx + 1, || None);
        }
        self.units[idx] = Some(UnitState::new(id, unit));
        self.dirty = true;
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_add: unit {id}");
        Ok(id)
    }

    /// Removes a unit and every edge touching it.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit doesn't exist.
    pub fn remove_unit(&mut self, id: UnitId) -> Result<(), GraphError> {
        let edge_ids = self.get_state(id)?.all_edges();
        for edge_id in edge_ids {
            self.disconnect_internal(edge_id);
        }
        self.units[id.0 as usize] = None;
        self.terminals.retain(|t| *t != id);
        self.dirty = true;
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_remove: unit {id}");
        Ok(())
    }

    /// Connects an outlet of `from` to an inlet of `to`.
    ///
    /// `kind` selects which port space the indices address: a signal outlet
    /// may only reach a signal inlet and a message outlet only a message
    /// inlet. The destination unit's
    /// [`inlet_connections_changed`](Unit::inlet_connections_changed) hook
    /// fires with the inlet's new incoming count before this returns,
    /// independent of schedule recompilation.
    ///
    /// # Errors
    ///
    /// Rejected with the graph unchanged if either unit is missing, an
    /// index is outside the kind's port space, or an identical edge
    /// already exists. Cycles are not checked here; they surface as
    /// [`GraphError::CycleDetected`] at [`compile()`](Self::compile).
    pub fn connect(
        &mut self,
        from: UnitId,
        from_outlet: usize,
        to: UnitId,
        to_inlet: usize,
        kind: PortKind,
    ) -> Result<EdgeId, GraphError> {
        {
            let from_state = self.get_state(from)?;
            let outlet_count = match kind {
                PortKind::Signal => from_state.unit.signal_outlets(),
                PortKind::Message => from_state.unit.message_outlets(),
            };
            if from_outlet >= outlet_count {
                return Err(GraphError::InvalidOutlet {
                    unit: from,
                    kind,
                    outlet: from_outlet,
                    count: outlet_count,
                });
            }
            let to_state = self.get_state(to)?;
            let inlet_count = match kind {
                PortKind::Signal => to_state.unit.signal_inlets(),
                PortKind::Message => to_state.unit.message_inlets(),
            };
            if to_inlet >= inlet_count {
                return Err(GraphError::InvalidInlet {
                    unit: to,
                    kind,
                    inlet: to_inlet,
                    count: inlet_count,
                });
            }
        }

        if self.find_edge(from, from_outlet, to, to_inlet, kind).is_some() {
            return Err(GraphError::DuplicateEdge(from, to));
        }

        let id = EdgeId(self.next_edge_slot);
        self.next_edge_slot += 1;
        let idx = id.0 as usize;
        if idx >= self.edges.len() {
            self.edges.resize_with(idx + 1, || None);
        }
        self.edges[idx] = Some(Edge {
            from,
            from_outlet,
            to,
            to_inlet,
            kind,
        });

        let src = self.units[from.0 as usize].as_mut().expect("validated");
        match kind {
            PortKind::Signal => src.sig_out[from_outlet].push(id),
            PortKind::Message => src.msg_out[from_outlet].push(id),
        }
        let dst = self.units[to.0 as usize].as_mut().expect("validated");
        let count = match kind {
            PortKind::Signal => {
                dst.sig_in[to_inlet].push(id);
                dst.sig_in[to_inlet].len()
            }
            PortKind::Message => {
                dst.msg_in[to_inlet].push(id);
                dst.msg_in[to_inlet].len()
            }
        };
        dst.unit.inlet_connections_changed(to_inlet, kind, count);

        self.dirty = true;
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_connect: {from}:{from_outlet} → {to}:{to_inlet} ({kind})");
        Ok(id)
    }

    /// Disconnects an edge.
    ///
    /// The destination's connection-change hook fires with the reduced
    /// count.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge doesn't exist.
    pub fn disconnect(&mut self, id: EdgeId) -> Result<(), GraphError> {
        if self
            .edges
            .get(id.0 as usize)
            .and_then(|e| e.as_ref())
            .is_none()
        {
            return Err(GraphError::EdgeNotFound(id));
        }
        self.disconnect_internal(id);
        self.dirty = true;
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_disconnect: edge {id}");
        Ok(())
    }

    /// Finds the edge joining the given ports, if one exists.
    pub fn find_edge(
        &self,
        from: UnitId,
        from_outlet: usize,
        to: UnitId,
        to_inlet: usize,
        kind: PortKind,
    ) -> Option<EdgeId> {
        let src = self.units.get(from.0 as usize)?.as_ref()?;
        let list = match kind {
            PortKind::Signal => src.sig_out.get(from_outlet)?,
            PortKind::Message => src.msg_out.get(from_outlet)?,
        };
        list.iter()
            .find(|&&eid| {
                self.edges[eid.0 as usize]
                    .as_ref()
                    .is_some_and(|e| e.to == to && e.to_inlet == to_inlet)
            })
            .copied()
    }

    /// Designates a unit as a graph output.
    ///
    /// Terminal units are the roots of schedule compilation, and their
    /// outlet buffers stay readable through
    /// [`terminal_output()`](Self::terminal_output) after each block. If no
    /// terminal is designated, compilation falls back to the leaf units
    /// (no outgoing edges of either kind).
    ///
    /// # Errors
    ///
    /// Returns an error if the unit doesn't exist.
    pub fn mark_terminal(&mut self, id: UnitId) -> Result<(), GraphError> {
        self.get_state(id)?;
        if !self.terminals.contains(&id) {
            self.terminals.push(id);
            self.dirty = true;
        }
        Ok(())
    }

    // --- Accessors ---

    /// Returns a mutable reference to a unit's implementation.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut (dyn Unit + Send)> {
        Some(self.units.get_mut(id.0 as usize)?.as_mut()?.unit.as_mut())
    }

    /// Returns a reference to a unit's implementation.
    pub fn unit_ref(&self, id: UnitId) -> Option<&(dyn Unit + Send)> {
        Some(self.units.get(id.0 as usize)?.as_ref()?.unit.as_ref())
    }

    /// Number of active units.
    pub fn unit_count(&self) -> usize {
        self.units.iter().filter(|u| u.is_some()).count()
    }

    /// Number of active edges.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_some()).count()
    }

    /// The sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// The block size in samples.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// The currently published schedule, if any.
    pub fn compiled(&self) -> Option<&Arc<CompiledSchedule>> {
        self.compiled.as_ref()
    }

    /// Read access to the buffer pool (diagnostics and tests).
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Whether the graph is running (accepting messages and processing).
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Starts or stops the graph.
    ///
    /// While inactive, [`process_block()`](Self::process_block) is a no-op
    /// and delivered messages are dropped rather than queued, so queues
    /// cannot grow while nothing is draining them.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    // --- Control methods ---

    /// Sets the sample rate for the graph and every unit.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for state in self.units.iter_mut().flatten() {
            state.unit.set_sample_rate(sample_rate);
        }
    }

    /// Sets the block size.
    ///
    /// Rebuilds the buffer pool and unpublishes the current schedule;
    /// [`compile()`](Self::compile) must run before the next block.
    pub fn set_block_size(&mut self, block_size: usize) {
        self.block_size = block_size;
        self.pool = BufferPool::new(block_size);
        self.compiled = None;
        self.dirty = true;
    }

    /// Resets every unit's internal state and clears pending messages.
    pub fn reset(&mut self) {
        for state in self.units.iter_mut().flatten() {
            state.unit.reset();
            state.pending.clear();
        }
    }

    // --- Compilation ---

    /// Compiles the graph into a [`CompiledSchedule`] and publishes it.
    ///
    /// Walks the graph depth-first from the terminal set with an explicit
    /// stack, memoized so shared ancestors are scheduled exactly once:
    /// message-inlet sources order first, then signal-inlet sources; each
    /// inlet with more than one incoming signal is folded pairwise through
    /// synthesized [`Step::ImplicitAdd`] steps (in connection order, left
    /// to right); outlet buffers are acquired from the pool with one
    /// reference per consumer, and single-source inlets alias their
    /// source's buffer directly (zero-copy).
    ///
    /// Compilation is skipped entirely when the topology is unchanged —
    /// the published `Arc` is returned as-is.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the previously published schedule in
    /// force, if the graph is empty, a designated terminal no longer
    /// exists, or a cycle is reachable from a terminal.
    pub fn compile(&mut self) -> Result<Arc<CompiledSchedule>, GraphError> {
        if !self.dirty
            && let Some(schedule) = &self.compiled
        {
            return Ok(Arc::clone(schedule));
        }

        if self.unit_count() == 0 {
            return Err(GraphError::EmptyGraph);
        }

        let roots = self.resolve_terminals()?;
        let mut is_terminal = vec![false; self.units.len()];
        for &slot in &roots {
            is_terminal[slot] = true;
        }

        // The visited set lives here, not on the units, so independent
        // compilations cannot interfere and re-running is side-effect free.
        let mut marks = vec![Mark::Idle; self.units.len()];
        let mut steps: Vec<Step> = Vec::new();
        let mut outlet_bufs: Vec<Option<PortBindings>> = vec![None; self.units.len()];

        self.pool.reset();

        let mut stack: Vec<Frame> = Vec::new();
        for &slot in roots.iter().rev() {
            stack.push(Frame::Enter(slot));
        }

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(slot) => match marks[slot] {
                    Mark::Done => {}
                    Mark::Active => return Err(GraphError::CycleDetected),
                    Mark::Idle => {
                        marks[slot] = Mark::Active;
                        stack.push(Frame::Exit(slot));
                        let state = self.units[slot].as_ref().expect("edges target live units");
                        // LIFO stack: push signal sources first so message
                        // sources are visited first.
                        for list in state.sig_in.iter().rev() {
                            for &eid in list.iter().rev() {
                                let edge = self.edges[eid.0 as usize].as_ref().expect("live edge");
                                stack.push(Frame::Enter(edge.from.0 as usize));
                            }
                        }
                        for list in state.msg_in.iter().rev() {
                            for &eid in list.iter().rev() {
                                let edge = self.edges[eid.0 as usize].as_ref().expect("live edge");
                                stack.push(Frame::Enter(edge.from.0 as usize));
                            }
                        }
                    }
                },
                Frame::Exit(slot) => {
                    Self::finalize_unit(
                        &self.units,
                        &self.edges,
                        &mut self.pool,
                        &mut steps,
                        &mut outlet_bufs,
                        slot,
                        is_terminal[slot],
                    );
                    marks[slot] = Mark::Done;
                }
            }
        }

        let outputs = roots
            .iter()
            .map(|&slot| {
                let id = self.units[slot].as_ref().expect("terminal exists").id;
                (id, outlet_bufs[slot].unwrap_or_default())
            })
            .collect();

        let schedule = Arc::new(CompiledSchedule {
            steps,
            buffer_count: self.pool.slot_count(),
            outputs,
        });

        #[cfg(feature = "tracing")]
        {
            tracing::debug!(
                "graph_compile: {} steps ({} implicit adds), {} buffer slots",
                schedule.step_count(),
                schedule.implicit_add_count(),
                schedule.buffer_count()
            );
            for line in schedule.describe().lines() {
                tracing::debug!("  {line}");
            }
        }

        self.compiled = Some(Arc::clone(&schedule));
        self.dirty = false;
        Ok(schedule)
    }

    /// Resolves the terminal set: designated terminals, or the leaf units
    /// (no outgoing edges of either kind) when none are designated.
    fn resolve_terminals(&self) -> Result<Vec<usize>, GraphError> {
        if self.terminals.is_empty() {
            return Ok(self
                .units
                .iter()
                .enumerate()
                .filter_map(|(slot, s)| s.as_ref().map(|state| (slot, state)))
                .filter(|(_, state)| {
                    state.sig_out.iter().all(|l| l.is_empty())
                        && state.msg_out.iter().all(|l| l.is_empty())
                })
                .map(|(slot, _)| slot)
                .collect());
        }
        let mut roots = Vec::with_capacity(self.terminals.len());
        for &t in &self.terminals {
            if self
                .units
                .get(t.0 as usize)
                .and_then(|s| s.as_ref())
                .is_none()
            {
                return Err(GraphError::TerminalNotFound(t));
            }
            roots.push(t.0 as usize);
        }
        Ok(roots)
    }

    /// Resolves one unit's buffer wiring and appends it to the schedule.
    ///
    /// Associated function so the caller can hold disjoint borrows of the
    /// graph's fields. Every `acquire` happens before the `release` of the
    /// holds it supersedes, so a unit's outlet slots never alias a slot it
    /// still reads; releasing only *after* binding is what lets a chain of
    /// units ping-pong between two arena slots.
    fn finalize_unit(
        units: &[Option<UnitState>],
        edges: &[Option<Edge>],
        pool: &mut BufferPool,
        steps: &mut Vec<Step>,
        outlet_bufs: &mut [Option<PortBindings>],
        slot: usize,
        host_hold: bool,
    ) {
        let state = units[slot].as_ref().expect("scheduled unit exists");
        if !state.unit.is_signal_unit() {
            // Pure message units participate in ordering only.
            return;
        }

        let mut deferred: Vec<BufferId> = Vec::new();
        let mut inlets = PortBindings::new();

        for list in &state.sig_in {
            let bound = match list.len() {
                0 => BufferId::ZERO,
                1 => {
                    let src = Self::source_binding(edges, outlet_bufs, list[0]);
                    deferred.push(src);
                    src
                }
                _ => {
                    let sources: Vec<BufferId> = list
                        .iter()
                        .map(|&eid| Self::source_binding(edges, outlet_bufs, eid))
                        .collect();
                    let mut sum = sources[0];
                    for &src in &sources[1..] {
                        let out = pool.acquire(1);
                        steps.push(Step::ImplicitAdd { lhs: sum, rhs: src, out });
                        pool.release(sum);
                        pool.release(src);
                        sum = out;
                    }
                    deferred.push(sum);
                    sum
                }
            };
            inlets.push(bound);
        }

        let mut outlets = PortBindings::new();
        for list in &state.sig_out {
            let consumers = list.len() as u32 + u32::from(host_hold);
            let id = pool.acquire(consumers.max(1));
            if consumers == 0 {
                // Side-effect-only outlet with no readers: drop the hold
                // once wiring completes so the slot recycles downstream.
                deferred.push(id);
            }
            outlets.push(id);
        }

        outlet_bufs[slot] = Some(outlets);
        steps.push(Step::Unit {
            unit: state.id,
            inlets,
            outlets,
        });

        for id in deferred {
            pool.release(id);
        }
    }

    /// The buffer bound to the source outlet of a signal edge.
    fn source_binding(
        edges: &[Option<Edge>],
        outlet_bufs: &[Option<PortBindings>],
        eid: EdgeId,
    ) -> BufferId {
        let edge = edges[eid.0 as usize].as_ref().expect("live edge");
        outlet_bufs[edge.from.0 as usize]
            .as_ref()
            .expect("source scheduled before consumer")
            .get(edge.from_outlet)
    }

    // --- Block execution ---

    /// Executes one audio block against the published schedule.
    ///
    /// Walks the compiled steps in order. Units with pending messages run
    /// segmented: for each message in timestamp order, the unit processes
    /// `[cursor, ceil(time))` with pre-message state, the message is
    /// applied, and the cursor advances; after the last message the unit
    /// processes the remainder of the block. The pending queue is cleared
    /// once fully consumed.
    ///
    /// No-op while the graph is inactive. The per-block path performs no
    /// buffer allocation; everything was wired at compile time.
    ///
    /// # Panics
    ///
    /// Panics if [`compile()`](Self::compile) has never succeeded.
    pub fn process_block(&mut self) {
        if !self.active {
            return;
        }
        let schedule = Arc::clone(
            self.compiled
                .as_ref()
                .expect("process_block called before compile()"),
        );

        for step in schedule.steps() {
            match *step {
                Step::ImplicitAdd { lhs, rhs, out } => {
                    let mut buf = self.pool.take(out);
                    {
                        let a = self.pool.slice(lhs);
                        let b = self.pool.slice(rhs);
                        for ((dst, &x), &y) in buf.iter_mut().zip(a.iter()).zip(b.iter()) {
                            *dst = x + y;
                        }
                    }
                    self.pool.restore(out, buf);
                }
                Step::Unit {
                    unit,
                    inlets,
                    outlets,
                } => {
                    self.run_unit(unit, inlets, outlets);
                }
            }
        }
    }

    /// Runs one scheduled unit's turn: check out outlet buffers, process
    /// (segmented around pending messages), restore, route posted messages.
    fn run_unit(&mut self, unit: UnitId, inlets: PortBindings, outlets: PortBindings) {
        let slot = unit.0 as usize;
        // A stale schedule may reference a unit removed since compile.
        if !matches!(self.units.get(slot), Some(Some(_))) {
            return;
        }

        let mut io = SignalIo::new();
        for id in outlets.iter() {
            io.outlets[io.num_outlets] = Some(self.pool.take(id));
            io.num_outlets += 1;
        }
        for id in inlets.iter() {
            io.inlets[io.num_inlets] = self.pool.slice(id);
            io.num_inlets += 1;
        }

        let state = self.units[slot].as_mut().expect("checked above");
        let mut ctx = ProcessContext {
            sample_rate: self.sample_rate,
            block_size: self.block_size,
            outbox: &mut self.outbox,
        };
        let block_size = ctx.block_size;

        if state.pending.is_empty() {
            ctx.outbox.now = 0.0;
            state.unit.process(&mut ctx, &mut io, 0..block_size);
        } else {
            let mut pending = core::mem::take(&mut state.pending);
            let mut cursor = 0usize;
            for m in &pending {
                let boundary = (m.time.ceil() as usize).min(block_size);
                if boundary > cursor {
                    ctx.outbox.now = cursor as f32;
                    state.unit.process(&mut ctx, &mut io, cursor..boundary);
                    cursor = boundary;
                }
                ctx.outbox.now = m.time;
                state.unit.apply_message(m.inlet, &m.payload, ctx.outbox);
            }
            if cursor < block_size {
                ctx.outbox.now = cursor as f32;
                state.unit.process(&mut ctx, &mut io, cursor..block_size);
            }
            // Queue storage is kept for reuse; the unit reverts to the
            // single-segment path next block.
            pending.clear();
            state.pending = pending;
        }

        // Return outlet storage to the arena before routing, which needs
        // the units again.
        let mut boxes = io.outlets;
        for (i, id) in outlets.iter().enumerate() {
            if let Some(buf) = boxes[i].take() {
                self.pool.restore(id, buf);
            }
        }

        if !self.outbox.is_empty() {
            self.route_messages(unit);
        }
    }

    /// Routes everything in the outbox along message edges.
    ///
    /// Signal-unit destinations get the message queued (they execute later
    /// in the same schedule, or next block if already past); message-only
    /// destinations apply it immediately, and their own posts cascade
    /// through the same work queue. The graph is acyclic, so the cascade
    /// terminates.
    fn route_messages(&mut self, from: UnitId) {
        let mut work = core::mem::take(&mut self.route_scratch);
        let mut drained = core::mem::take(&mut self.drain_scratch);

        self.outbox.drain_into(&mut drained);
        work.extend(drained.drain(..).map(|e| (from, e)));

        while let Some((src, entry)) = work.pop() {
            let targets: Vec<(UnitId, usize)> = {
                let Some(Some(src_state)) = self.units.get(src.0 as usize) else {
                    continue;
                };
                let Some(list) = src_state.msg_out.get(entry.outlet) else {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("message dropped: {src} has no message outlet {}", entry.outlet);
                    continue;
                };
                list.iter()
                    .filter_map(|&eid| {
                        self.edges[eid.0 as usize]
                            .as_ref()
                            .map(|e| (e.to, e.to_inlet))
                    })
                    .collect()
            };

            for (to, to_inlet) in targets {
                let Some(Some(dst)) = self.units.get_mut(to.0 as usize) else {
                    continue;
                };
                if dst.unit.is_signal_unit() {
                    dst.queue_pending(PendingMessage {
                        inlet: to_inlet,
                        time: entry.time,
                        payload: entry.message.clone(),
                    });
                } else {
                    self.outbox.now = entry.time;
                    dst.unit
                        .apply_message(to_inlet, &entry.message, &mut self.outbox);
                    self.outbox.drain_into(&mut drained);
                    work.extend(drained.drain(..).map(|e| (to, e)));
                }
            }
        }

        self.route_scratch = work;
        self.drain_scratch = drained;
    }

    // --- Message delivery ---

    /// Delivers a message to a unit's message inlet.
    ///
    /// `time` is a fractional sample offset within the *next* block,
    /// `[0.0, block_size)`. Signal units queue the message for sub-block
    /// application during their next execution; message-only units apply
    /// it immediately and any responses cascade along message edges.
    ///
    /// Delivery must happen on the context that drives
    /// [`process_block()`](Self::process_block), strictly between blocks.
    ///
    /// # Errors
    ///
    /// The message is dropped (never partially applied) if the graph is
    /// inactive, the unit or inlet doesn't exist, or the timestamp is
    /// outside the block window.
    pub fn send_message(
        &mut self,
        to: UnitId,
        inlet: usize,
        message: Message,
        time: f32,
    ) -> Result<(), MessageError> {
        if !self.active {
            #[cfg(feature = "tracing")]
            tracing::debug!("message dropped: graph inactive ({to}:{inlet})");
            return Err(MessageError::Inactive);
        }
        let block_size = self.block_size;
        let Some(Some(state)) = self.units.get_mut(to.0 as usize) else {
            return Err(MessageError::UnitNotFound(to));
        };
        let inlet_count = state.unit.message_inlets();
        if inlet >= inlet_count {
            return Err(MessageError::InvalidInlet {
                unit: to,
                inlet,
                count: inlet_count,
            });
        }
        if !time.is_finite() || time < 0.0 || time >= block_size as f32 {
            #[cfg(feature = "tracing")]
            tracing::warn!("message dropped: timestamp {time} outside block ({to}:{inlet})");
            return Err(MessageError::BadTimestamp { time, block_size });
        }

        if state.unit.is_signal_unit() {
            state.queue_pending(PendingMessage {
                inlet,
                time,
                payload: message,
            });
        } else {
            self.outbox.now = time;
            state.unit.apply_message(inlet, &message, &mut self.outbox);
            if !self.outbox.is_empty() {
                self.route_messages(to);
            }
        }
        Ok(())
    }

    /// Reads a terminal unit's outlet buffer after a block.
    ///
    /// Valid until the next [`compile()`](Self::compile). Returns `None`
    /// if nothing is compiled, the unit isn't a terminal, or the outlet
    /// doesn't exist.
    pub fn terminal_output(&self, unit: UnitId, outlet: usize) -> Option<&[f32]> {
        let schedule = self.compiled.as_ref()?;
        let bindings = schedule.terminal_bindings(unit)?;
        if outlet >= bindings.len() {
            return None;
        }
        Some(self.pool.slice(bindings.get(outlet)))
    }

    // --- Internal helpers ---

    fn get_state(&self, id: UnitId) -> Result<&UnitState, GraphError> {
        self.units
            .get(id.0 as usize)
            .and_then(|u| u.as_ref())
            .ok_or(GraphError::UnitNotFound(id))
    }

    fn disconnect_internal(&mut self, id: EdgeId) {
        let Some(edge) = self.edges[id.0 as usize].take() else {
            return;
        };
        if let Some(Some(src)) = self.units.get_mut(edge.from.0 as usize) {
            let list = match edge.kind {
                PortKind::Signal => &mut src.sig_out,
                PortKind::Message => &mut src.msg_out,
            };
            if let Some(l) = list.get_mut(edge.from_outlet) {
                l.retain(|e| *e != id);
            }
        }
        if let Some(Some(dst)) = self.units.get_mut(edge.to.0 as usize) {
            let count = {
                let list = match edge.kind {
                    PortKind::Signal => &mut dst.sig_in,
                    PortKind::Message => &mut dst.msg_in,
                };
                match list.get_mut(edge.to_inlet) {
                    Some(l) => {
                        l.retain(|e| *e != id);
                        Some(l.len())
                    }
                    None => None,
                }
            };
            if let Some(count) = count {
                dst.unit
                    .inlet_connections_changed(edge.to_inlet, edge.kind, count);
            }
        }
    }
}
