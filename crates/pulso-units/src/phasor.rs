//! Ramp oscillator.

use core::ops::Range;

use pulso_core::{Message, MessageOutbox, PortKind, ProcessContext, SignalIo, Unit};

/// Which code path drives the oscillator frequency.
#[derive(Clone, Copy, PartialEq, Eq)]
enum FreqSource {
    /// Frequency from the stored scalar (message-settable).
    Scalar,
    /// Frequency read per-sample from signal inlet 0.
    Signal,
}

/// Sawtooth ramp from 0 to 1 at the given frequency.
///
/// Ports:
/// - signal inlet 0 — frequency modulation; when connected, frequency is
///   read per sample and the scalar is ignored
/// - signal outlet 0 — the ramp
/// - message inlet 0 — float sets the scalar frequency in Hz
/// - message inlet 1 — float resets the phase (0..1)
///
/// The scalar/signal switch happens in the connection-change hook, not per
/// block, so the processing loop stays branch-free over samples.
pub struct Phasor {
    frequency: f32,
    phase: f32,
    sample_rate: f32,
    source: FreqSource,
}

impl Phasor {
    /// Creates a ramp oscillator at `frequency` Hz.
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            phase: 0.0,
            sample_rate: 48000.0,
            source: FreqSource::Scalar,
        }
    }

    /// Current phase in `[0, 1)`.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    #[inline]
    fn advance(&mut self, frequency: f32) -> f32 {
        let out = self.phase;
        self.phase += frequency / self.sample_rate;
        self.phase -= self.phase.floor();
        out
    }
}

impl Unit for Phasor {
    fn signal_inlets(&self) -> usize {
        1
    }

    fn signal_outlets(&self) -> usize {
        1
    }

    fn message_inlets(&self) -> usize {
        2
    }

    fn process(&mut self, _ctx: &mut ProcessContext, io: &mut SignalIo, range: Range<usize>) {
        let freq_in = io.inlet(0);
        let out = io.outlet(0);
        match self.source {
            FreqSource::Scalar => {
                let frequency = self.frequency;
                for i in range {
                    out[i] = self.advance(frequency);
                }
            }
            FreqSource::Signal => {
                for i in range {
                    out[i] = self.advance(freq_in[i]);
                }
            }
        }
    }

    fn apply_message(&mut self, inlet: usize, message: &Message, _outbox: &mut MessageOutbox) {
        if let Some(v) = message.as_float() {
            match inlet {
                0 => self.frequency = v,
                1 => self.phase = v - v.floor(),
                _ => {}
            }
        }
    }

    fn inlet_connections_changed(&mut self, inlet: usize, kind: PortKind, count: usize) {
        if inlet == 0 && kind == PortKind::Signal {
            self.source = if count > 0 {
                FreqSource::Signal
            } else {
                FreqSource::Scalar
            };
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulso_core::UnitGraph;

    #[test]
    fn test_ramp_slope_matches_frequency() {
        let mut graph = UnitGraph::new(1000.0, 8);
        // 125 Hz at 1 kHz: phase step of 0.125 per sample.
        let phasor = graph.add_unit(Box::new(Phasor::new(125.0))).unwrap();
        graph.mark_terminal(phasor).unwrap();
        graph.compile().unwrap();
        graph.process_block();

        let out = graph.terminal_output(phasor, 0).unwrap();
        for (i, &s) in out.iter().enumerate() {
            let expected = (i as f32 * 0.125) % 1.0;
            assert!((s - expected).abs() < 1e-6, "sample {i}: {s} vs {expected}");
        }
    }

    #[test]
    fn test_signal_rate_frequency_when_connected() {
        use crate::Sig;

        let mut graph = UnitGraph::new(1000.0, 8);
        let freq = graph.add_unit(Box::new(Sig::new(250.0))).unwrap();
        // Scalar frequency would be 0; the connected signal must win.
        let phasor = graph.add_unit(Box::new(Phasor::new(0.0))).unwrap();
        graph.connect(freq, 0, phasor, 0, PortKind::Signal).unwrap();
        graph.mark_terminal(phasor).unwrap();
        graph.compile().unwrap();
        graph.process_block();

        let out = graph.terminal_output(phasor, 0).unwrap();
        for (i, &s) in out.iter().enumerate() {
            let expected = (i as f32 * 0.25) % 1.0;
            assert!((s - expected).abs() < 1e-6, "sample {i}: {s} vs {expected}");
        }
    }

    #[test]
    fn test_phase_reset_message() {
        let mut phasor = Phasor::new(100.0);
        let mut outbox = MessageOutbox::new();
        phasor.apply_message(1, &Message::Float(0.25), &mut outbox);
        assert_eq!(phasor.phase(), 0.25);
        phasor.apply_message(1, &Message::Float(1.75), &mut outbox);
        assert_eq!(phasor.phase(), 0.75);
        phasor.reset();
        assert_eq!(phasor.phase(), 0.0);
    }
}
