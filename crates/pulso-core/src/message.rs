//! Control messages and their per-unit queues.
//!
//! Messages are the event-rate half of the hybrid scheduler: time-stamped
//! payloads delivered to a unit's message inlets, applied between the signal
//! segments of a block (see the executor in [`graph::processing`](crate::graph)).
//! Timestamps are fractional sample offsets relative to the start of the
//! current block, in `[0.0, block_size)`.

/// A control message payload.
///
/// The atom set mirrors what patch-level control languages send around:
/// a bare trigger, a number, a name, or a short list of numbers.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// A bare trigger with no payload.
    Bang,
    /// A single number.
    Float(f32),
    /// A symbolic name.
    Symbol(String),
    /// A short list of numbers.
    List(Vec<f32>),
}

impl Message {
    /// Returns the numeric payload if this is a [`Message::Float`].
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Message::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// A message queued on a unit, awaiting its next block execution.
///
/// Queues are kept sorted by `time`, stable for equal stamps, so the
/// executor consumes them in timestamp order without sorting on the
/// audio thread.
#[derive(Clone, Debug)]
pub struct PendingMessage {
    /// Destination message inlet on the owning unit.
    pub inlet: usize,
    /// Fractional sample offset within the current block, `[0.0, block_size)`.
    pub time: f32,
    /// The message payload.
    pub payload: Message,
}

/// A message posted by a unit to one of its message outlets.
#[derive(Clone, Debug)]
pub(crate) struct OutboxEntry {
    /// Source message outlet.
    pub outlet: usize,
    /// Timestamp inherited from the posting context.
    pub time: f32,
    /// The message payload.
    pub message: Message,
}

/// Collects messages a unit posts to its outlets during processing or
/// message application.
///
/// The executor drains the outbox after each unit's turn and routes the
/// entries along the graph's message edges. Entries are stamped with the
/// outbox clock, which the executor keeps at the current segment cursor
/// (or at the triggering message's timestamp during application), so
/// downstream units see the posting time, not the block start.
///
/// The backing storage is reused across blocks; pushes only allocate past
/// the high-water mark.
#[derive(Debug, Default)]
pub struct MessageOutbox {
    pub(crate) now: f32,
    entries: Vec<OutboxEntry>,
}

impl MessageOutbox {
    /// Creates an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts a message to the given message outlet.
    ///
    /// The entry is stamped with the current clock value; delivery happens
    /// after the posting unit's turn completes.
    pub fn post(&mut self, outlet: usize, message: Message) {
        self.entries.push(OutboxEntry {
            outlet,
            time: self.now,
            message,
        });
    }

    /// Returns true if no messages are waiting to be routed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Moves all queued entries into `sink`, leaving the outbox empty.
    ///
    /// Keeps the outbox's capacity for reuse.
    pub(crate) fn drain_into(&mut self, sink: &mut Vec<OutboxEntry>) {
        sink.append(&mut self.entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_float() {
        assert_eq!(Message::Float(1.5).as_float(), Some(1.5));
        assert_eq!(Message::Bang.as_float(), None);
        assert_eq!(Message::Symbol("stop".into()).as_float(), None);
    }

    #[test]
    fn test_outbox_stamps_clock() {
        let mut outbox = MessageOutbox::new();
        outbox.now = 12.5;
        outbox.post(0, Message::Bang);
        outbox.now = 40.0;
        outbox.post(1, Message::Float(3.0));

        let mut sink = Vec::new();
        outbox.drain_into(&mut sink);
        assert!(outbox.is_empty());
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].time, 12.5);
        assert_eq!(sink[0].outlet, 0);
        assert_eq!(sink[1].time, 40.0);
    }
}
