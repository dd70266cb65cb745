//! Cosine oscillator.

use core::f32::consts::TAU;
use core::ops::Range;

use pulso_core::{Message, MessageOutbox, PortKind, ProcessContext, SignalIo, Unit};

/// Cosine oscillator.
///
/// Same inlet discipline as [`Phasor`](crate::Phasor): signal inlet 0 takes
/// over the frequency when connected, message inlet 0 sets the scalar
/// frequency, message inlet 1 resets the phase.
pub struct Osc {
    frequency: f32,
    phase: f32,
    sample_rate: f32,
    signal_driven: bool,
}

impl Osc {
    /// Creates a cosine oscillator at `frequency` Hz.
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency,
            phase: 0.0,
            sample_rate: 48000.0,
            signal_driven: false,
        }
    }

    #[inline]
    fn advance(&mut self, frequency: f32) -> f32 {
        let out = (self.phase * TAU).cos();
        self.phase += frequency / self.sample_rate;
        self.phase -= self.phase.floor();
        out
    }
}

impl Unit for Osc {
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
        if self.signal_driven {
            for i in range {
                out[i] = self.advance(freq_in[i]);
            }
        } else {
            let frequency = self.frequency;
            for i in range {
                out[i] = self.advance(frequency);
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
            self.signal_driven = count > 0;
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}
