//! Constant signal source.

use core::ops::Range;

use pulso_core::{Message, MessageOutbox, ProcessContext, SignalIo, Unit};

/// Emits a constant signal; the level is set by a float message on inlet 0.
///
/// Level changes land at their message timestamp, so a mid-block update
/// produces a clean step at the nearest sample.
pub struct Sig {
    value: f32,
}

impl Sig {
    /// Creates a source emitting `value`.
    pub fn new(value: f32) -> Self {
        Self { value }
    }

    /// The current level.
    pub fn value(&self) -> f32 {
        self.value
    }
}

impl Unit for Sig {
    fn signal_outlets(&self) -> usize {
        1
    }

    fn message_inlets(&self) -> usize {
        1
    }

    fn process(&mut self, _ctx: &mut ProcessContext, io: &mut SignalIo, range: Range<usize>) {
        let out = io.outlet(0);
        for i in range {
            out[i] = self.value;
        }
    }

    fn apply_message(&mut self, _inlet: usize, message: &Message, _outbox: &mut MessageOutbox) {
        if let Some(v) = message.as_float() {
            self.value = v;
        }
    }
}
