//! Signal adder.

use core::ops::Range;

use pulso_core::{Message, MessageOutbox, PortKind, ProcessContext, SignalIo, Unit};

/// Adds two signals, or a signal and a message-set constant.
///
/// Ports:
/// - signal inlets 0 and 1 — operands
/// - signal outlet 0 — the sum
/// - message inlet 0 — float sets the constant addend
///
/// When inlet 1 has at least one signal connection the unit runs the
/// signal+signal path and the constant is ignored; the switch happens in
/// the connection-change hook.
pub struct Add {
    constant: f32,
    right_connected: bool,
}

impl Add {
    /// Creates an adder with the given constant addend.
    pub fn new(constant: f32) -> Self {
        Self {
            constant,
            right_connected: false,
        }
    }
}

impl Default for Add {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Unit for Add {
    fn signal_inlets(&self) -> usize {
        2
    }

    fn signal_outlets(&self) -> usize {
        1
    }

    fn message_inlets(&self) -> usize {
        1
    }

    fn process(&mut self, _ctx: &mut ProcessContext, io: &mut SignalIo, range: Range<usize>) {
        let lhs = io.inlet(0);
        let rhs = io.inlet(1);
        let out = io.outlet(0);
        if self.right_connected {
            for i in range {
                out[i] = lhs[i] + rhs[i];
            }
        } else {
            let constant = self.constant;
            for i in range {
                out[i] = lhs[i] + constant;
            }
        }
    }

    fn apply_message(&mut self, _inlet: usize, message: &Message, _outbox: &mut MessageOutbox) {
        if let Some(v) = message.as_float() {
            self.constant = v;
        }
    }

    fn inlet_connections_changed(&mut self, inlet: usize, kind: PortKind, count: usize) {
        if inlet == 1 && kind == PortKind::Signal {
            self.right_connected = count > 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sig;
    use pulso_core::UnitGraph;

    #[test]
    fn test_scalar_path_adds_constant() {
        let mut graph = UnitGraph::new(48000.0, 16);
        let src = graph.add_unit(Box::new(Sig::new(0.5))).unwrap();
        let add = graph.add_unit(Box::new(Add::new(0.25))).unwrap();
        graph.connect(src, 0, add, 0, PortKind::Signal).unwrap();
        graph.mark_terminal(add).unwrap();
        graph.compile().unwrap();
        graph.process_block();
        assert!(graph
            .terminal_output(add, 0)
            .unwrap()
            .iter()
            .all(|&s| (s - 0.75).abs() < 1e-6));
    }

    #[test]
    fn test_signal_path_ignores_constant() {
        let mut graph = UnitGraph::new(48000.0, 16);
        let lhs = graph.add_unit(Box::new(Sig::new(0.5))).unwrap();
        let rhs = graph.add_unit(Box::new(Sig::new(-0.125))).unwrap();
        let add = graph.add_unit(Box::new(Add::new(100.0))).unwrap();
        graph.connect(lhs, 0, add, 0, PortKind::Signal).unwrap();
        graph.connect(rhs, 0, add, 1, PortKind::Signal).unwrap();
        graph.mark_terminal(add).unwrap();
        graph.compile().unwrap();
        graph.process_block();
        assert!(graph
            .terminal_output(add, 0)
            .unwrap()
            .iter()
            .all(|&s| (s - 0.375).abs() < 1e-6));
    }

    #[test]
    fn test_disconnect_reverts_to_scalar_path() {
        let mut graph = UnitGraph::new(48000.0, 16);
        let lhs = graph.add_unit(Box::new(Sig::new(1.0))).unwrap();
        let rhs = graph.add_unit(Box::new(Sig::new(2.0))).unwrap();
        let add = graph.add_unit(Box::new(Add::new(0.5))).unwrap();
        graph.connect(lhs, 0, add, 0, PortKind::Signal).unwrap();
        let edge = graph.connect(rhs, 0, add, 1, PortKind::Signal).unwrap();
        graph.mark_terminal(add).unwrap();
        graph.compile().unwrap();
        graph.process_block();
        assert!(graph
            .terminal_output(add, 0)
            .unwrap()
            .iter()
            .all(|&s| (s - 3.0).abs() < 1e-6));

        graph.disconnect(edge).unwrap();
        graph.compile().unwrap();
        graph.process_block();
        assert!(graph
            .terminal_output(add, 0)
            .unwrap()
            .iter()
            .all(|&s| (s - 1.5).abs() < 1e-6));
    }
}
