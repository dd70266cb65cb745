//! Message-rate square root.

use pulso_core::{Message, MessageOutbox, Unit};

/// Message-only relay: square root of incoming floats.
///
/// Performs no signal computation, so the scheduler orders it but gives it
/// no buffers; messages apply immediately on delivery and the result is
/// posted to outlet 0. Negative inputs produce 0.
pub struct Sqrt;

impl Unit for Sqrt {
    fn message_inlets(&self) -> usize {
        1
    }

    fn message_outlets(&self) -> usize {
        1
    }

    fn apply_message(&mut self, _inlet: usize, message: &Message, outbox: &mut MessageOutbox) {
        if let Some(v) = message.as_float() {
            let root = if v > 0.0 { v.sqrt() } else { 0.0 };
            outbox.post(0, Message::Float(root));
        }
    }
}
