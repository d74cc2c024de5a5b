//! Client-side input buffer (C5): records the state a sample was predicted from, carries the
//! "receipt" `sendInput` assigns it, and tracks whether the server has acked that receipt.
//! Grounded on `original_source/Client/Client.cpp`'s `sendInput`/`checkAckReceipt` and
//! `core::RingBuffer`'s `iter_rev` (built specifically for this walk).

use netphys_core::{InputWire, PhysicsState, RingBuffer};

/// One entry of the playout-order input history (spec.md §4.5's `inputBuffer`).
#[derive(Debug, Clone, Copy)]
pub struct PendingInput {
    /// Local clock value (client's own `now_ms`) the sample was captured at; doubles as the
    /// `ClientInput` entry's `time_offset_ms` once `playout_delay_ms` is folded in by the caller.
    pub time_ms: u64,
    /// Physics state immediately before this sample was applied, replayed from during
    /// reconciliation.
    pub pre_state: PhysicsState,
    pub input: InputWire,
    /// The outgoing packet sequence this entry was last attached to (spec.md §4.5's "receipt";
    /// this codebase has no standalone `ACK_RECEIPT` message, so the packet sequence number
    /// fills that role — see DESIGN.md).
    pub send_sequence: Option<u32>,
    pub acked: bool,
}

pub struct InputBuffer {
    entries: RingBuffer<PendingInput>,
}

impl InputBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { entries: RingBuffer::new(capacity) }
    }

    pub fn push(&mut self, time_ms: u64, pre_state: PhysicsState, input: InputWire) {
        self.entries.push(PendingInput {
            time_ms,
            pre_state,
            input,
            send_sequence: None,
            acked: false,
        });
    }

    /// Walks newest-first, stamping every not-yet-assigned entry with `sequence` (spec.md
    /// §4.5's `sendInput`: every sample captured since the last send rides the next outgoing
    /// packet). Stops at the first already-assigned entry, since everything older than that
    /// was handled by an earlier call.
    pub fn assign_send_sequence(&mut self, sequence: u32) {
        for i in (0..self.entries.len()).rev() {
            let Some(entry) = self.entries.get_mut(i) else { break };
            if entry.send_sequence.is_some() {
                break;
            }
            entry.send_sequence = Some(sequence);
        }
    }

    /// Marks every entry whose receipt is in `acked_sequences` as acked, per the packet
    /// header's `(ack, ack_bitfield)` decoded by the caller's `AckTracker`.
    pub fn mark_acked(&mut self, acked_sequences: &[u32]) {
        for i in 0..self.entries.len() {
            let Some(entry) = self.entries.get_mut(i) else { continue };
            if let Some(seq) = entry.send_sequence {
                if acked_sequences.contains(&seq) {
                    entry.acked = true;
                }
            }
        }
    }

    /// Oldest-first, not-yet-acked entries to attach to the next `ClientInput` message,
    /// capped at `max` (spec.md §4.5's `maxInputsPerMessage`).
    pub fn unacked(&self, max: usize) -> Vec<PendingInput> {
        self.entries.iter().filter(|e| !e.acked).take(max).copied().collect()
    }

    /// Entries at or after `from_time_ms`, oldest first — the replay range for
    /// `applyServerUpdate` (spec.md §4.5 step 3).
    pub fn since(&self, from_time_ms: u64) -> Vec<PendingInput> {
        self.entries.iter().filter(|e| e.time_ms >= from_time_ms).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn newest(&self) -> Option<&PendingInput> {
        self.entries.newest()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn state() -> PhysicsState {
        PhysicsState {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }

    #[test]
    fn assign_send_sequence_stamps_only_unassigned_entries() {
        let mut buf = InputBuffer::new(8);
        buf.push(10, state(), InputWire::default());
        buf.push(20, state(), InputWire::default());
        buf.assign_send_sequence(1);

        buf.push(30, state(), InputWire::default());
        buf.assign_send_sequence(2);

        assert_eq!(buf.since(0)[0].send_sequence, Some(1));
        assert_eq!(buf.since(0)[1].send_sequence, Some(1));
        assert_eq!(buf.since(0)[2].send_sequence, Some(2));
    }

    #[test]
    fn mark_acked_flags_matching_receipts() {
        let mut buf = InputBuffer::new(8);
        buf.push(10, state(), InputWire::default());
        buf.assign_send_sequence(5);
        buf.mark_acked(&[5]);

        assert!(buf.unacked(16).is_empty());
    }

    #[test]
    fn unacked_is_oldest_first_and_capped() {
        let mut buf = InputBuffer::new(8);
        for t in [10, 20, 30] {
            buf.push(t, state(), InputWire::default());
        }

        let batch = buf.unacked(2);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].time_ms, 10);
        assert_eq!(batch[1].time_ms, 20);
    }

    #[test]
    fn since_drops_entries_older_than_the_cutoff() {
        let mut buf = InputBuffer::new(8);
        for t in [10, 20, 30] {
            buf.push(t, state(), InputWire::default());
        }

        let replay = buf.since(20);
        assert_eq!(replay.len(), 2);
        assert_eq!(replay[0].time_ms, 20);
    }
}
