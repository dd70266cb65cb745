//! Terminal output sink.

use core::ops::Range;

use pulso_core::{ProcessContext, SignalIo, Unit};

/// N-channel output sink.
///
/// Copies each signal inlet to the matching outlet; mark it as a terminal
/// and the host reads the channel buffers back with
/// [`UnitGraph::terminal_output`](pulso_core::UnitGraph::terminal_output)
/// after each block. Unconnected channels read the zero buffer and so
/// emit silence.
pub struct Dac {
    channels: usize,
}

impl Dac {
    /// Creates a sink with the given channel count.
    ///
    /// # Panics
    ///
    /// Panics if `channels` is 0.
    pub fn new(channels: usize) -> Self {
        assert!(channels > 0, "a sink needs at least one channel");
        Self { channels }
    }

    /// Stereo convenience constructor.
    pub fn stereo() -> Self {
        Self::new(2)
    }

    /// The channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }
}

impl Unit for Dac {
    fn signal_inlets(&self) -> usize {
        self.channels
    }

    fn signal_outlets(&self) -> usize {
        self.channels
    }

    fn process(&mut self, _ctx: &mut ProcessContext, io: &mut SignalIo, range: Range<usize>) {
        for ch in 0..self.channels {
            let input = io.inlet(ch);
            let out = io.outlet(ch);
            out[range.clone()].copy_from_slice(&input[range.clone()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sig;
    use pulso_core::{PortKind, UnitGraph};

    #[test]
    fn test_channels_are_independent() {
        let mut graph = UnitGraph::new(48000.0, 16);
        let left = graph.add_unit(Box::new(Sig::new(0.25))).unwrap();
        let right = graph.add_unit(Box::new(Sig::new(-0.5))).unwrap();
        let dac = graph.add_unit(Box::new(Dac::stereo())).unwrap();
        graph.connect(left, 0, dac, 0, PortKind::Signal).unwrap();
        graph.connect(right, 0, dac, 1, PortKind::Signal).unwrap();
        graph.mark_terminal(dac).unwrap();
        graph.compile().unwrap();
        graph.process_block();

        assert!(graph
            .terminal_output(dac, 0)
            .unwrap()
            .iter()
            .all(|&s| s == 0.25));
        assert!(graph
            .terminal_output(dac, 1)
            .unwrap()
            .iter()
            .all(|&s| s == -0.5));
    }

    #[test]
    fn test_unconnected_channel_is_silent() {
        let mut graph = UnitGraph::new(48000.0, 16);
        let left = graph.add_unit(Box::new(Sig::new(1.0))).unwrap();
        let dac = graph.add_unit(Box::new(Dac::stereo())).unwrap();
        graph.connect(left, 0, dac, 0, PortKind::Signal).unwrap();
        graph.mark_terminal(dac).unwrap();
        graph.compile().unwrap();
        graph.process_block();

        assert!(graph
            .terminal_output(dac, 1)
            .unwrap()
            .iter()
            .all(|&s| s == 0.0));
    }

    #[test]
    fn test_fan_in_mixes_on_one_channel() {
        let mut graph = UnitGraph::new(48000.0, 16);
        let dac = graph.add_unit(Box::new(Dac::new(1))).unwrap();
        for value in [0.125, 0.25, 0.5] {
            let src = graph.add_unit(Box::new(Sig::new(value))).unwrap();
            graph.connect(src, 0, dac, 0, PortKind::Signal).unwrap();
        }
        graph.mark_terminal(dac).unwrap();
        let schedule = graph.compile().unwrap();
        assert_eq!(schedule.implicit_add_count(), 2);

        graph.process_block();
        assert!(graph
            .terminal_output(dac, 0)
            .unwrap()
            .iter()
            .all(|&s| (s - 0.875).abs() < 1e-6));
    }
}
