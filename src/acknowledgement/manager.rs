use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

use super::packet::PendingSend;
use crate::{packet::WirePacket, sequence::SequenceNumber};

/// The unacknowledged sends of a single peer, ordered by sequence number
#[derive(Default)]
pub(crate) struct PendingSends {
    packets_waiting_on_ack: BTreeMap<SequenceNumber, PendingSend>,
}

impl PendingSends {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stores a packet that was just sent. A number can only be waiting once
    pub(crate) fn insert(&mut self, packet: &WirePacket, sent: Instant) {
        self.packets_waiting_on_ack
            .insert(packet.number, PendingSend::new(packet, sent));
    }

    /// Stops resending `number`. Returns false when nothing was waiting on that number
    pub(crate) fn acknowledge(&mut self, number: SequenceNumber) -> bool {
        self.packets_waiting_on_ack.remove(&number).is_some()
    }

    /// Every send that has not been (re)sent within `timeout`, oldest number first
    pub(crate) fn expired(
        &mut self,
        now: Instant,
        timeout: Duration,
    ) -> impl Iterator<Item = (&SequenceNumber, &mut PendingSend)> {
        self.packets_waiting_on_ack
            .iter_mut()
            .filter(move |(_, pending)| now.saturating_duration_since(pending.last_sent) >= timeout)
    }

    pub(crate) fn len(&self) -> usize {
        self.packets_waiting_on_ack.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.packets_waiting_on_ack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::pad;

    fn packet(number: i32) -> WirePacket {
        WirePacket::new(SequenceNumber::new(number), pad(b"data", 8))
    }

    #[test]
    fn test_acknowledge_removes_once() {
        let mut pending = PendingSends::new();
        let now = Instant::now();
        pending.insert(&packet(0), now);
        pending.insert(&packet(1), now);

        assert!(pending.acknowledge(SequenceNumber::new(0)));
        assert!(!pending.acknowledge(SequenceNumber::new(0)));
        assert!(!pending.acknowledge(SequenceNumber::new(5)));
        assert_eq!(pending.len(), 1);
        assert!(pending.acknowledge(SequenceNumber::new(1)));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_expired_respects_timeout() {
        let mut pending = PendingSends::new();
        let start = Instant::now();
        pending.insert(&packet(0), start);
        pending.insert(&packet(1), start + Duration::from_millis(50));

        let timeout = Duration::from_millis(100);
        assert_eq!(pending.expired(start, timeout).count(), 0);

        let later = start + Duration::from_millis(120);
        let expired: Vec<_> = pending
            .expired(later, timeout)
            .map(|(number, _)| *number)
            .collect();
        assert_eq!(expired, vec![SequenceNumber::new(0)]);
    }
}
