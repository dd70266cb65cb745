//! Signal scaler.

use core::ops::Range;

use pulso_core::{Message, MessageOutbox, ProcessContext, SignalIo, Unit};

/// Multiplies its signal inlet by a message-settable factor.
///
/// Factor changes land at their message timestamp; the executor splits the
/// block there, so no per-sample smoothing happens here.
pub struct Gain {
    factor: f32,
}

impl Gain {
    /// Creates a gain stage with the given linear factor.
    pub fn new(factor: f32) -> Self {
        Self { factor }
    }

    /// The current linear factor.
    pub fn factor(&self) -> f32 {
        self.factor
    }
}

impl Unit for Gain {
    fn signal_inlets(&self) -> usize {
        1
    }

    fn signal_outlets(&self) -> usize {
        1
    }

    fn message_inlets(&self) -> usize {
        1
    }

    fn process(&mut self, _ctx: &mut ProcessContext, io: &mut SignalIo, range: Range<usize>) {
        let input = io.inlet(0);
        let out = io.outlet(0);
        let factor = self.factor;
        for i in range {
            out[i] = input[i] * factor;
        }
    }

    fn apply_message(&mut self, _inlet: usize, message: &Message, _outbox: &mut MessageOutbox) {
        if let Some(v) = message.as_float() {
            self.factor = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sig;
    use pulso_core::{PortKind, UnitGraph};

    #[test]
    fn test_scales_input() {
        let mut graph = UnitGraph::new(48000.0, 16);
        let src = graph.add_unit(Box::new(Sig::new(0.5))).unwrap();
        let gain = graph.add_unit(Box::new(Gain::new(-2.0))).unwrap();
        graph.connect(src, 0, gain, 0, PortKind::Signal).unwrap();
        graph.mark_terminal(gain).unwrap();
        graph.compile().unwrap();
        graph.process_block();
        assert!(graph
            .terminal_output(gain, 0)
            .unwrap()
            .iter()
            .all(|&s| (s + 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_factor_change_is_sample_accurate() {
        let mut graph = UnitGraph::new(48000.0, 32);
        let src = graph.add_unit(Box::new(Sig::new(1.0))).unwrap();
        let gain = graph.add_unit(Box::new(Gain::new(1.0))).unwrap();
        graph.connect(src, 0, gain, 0, PortKind::Signal).unwrap();
        graph.mark_terminal(gain).unwrap();
        graph.compile().unwrap();

        graph
            .send_message(gain, 0, Message::Float(0.5), 12.2)
            .unwrap();
        graph.process_block();
        let out = graph.terminal_output(gain, 0).unwrap();
        // ceil(12.2) = 13.
        assert!(out[..13].iter().all(|&s| s == 1.0));
        assert!(out[13..].iter().all(|&s| s == 0.5));
    }
}
