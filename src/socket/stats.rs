use std::sync::atomic::{AtomicU64, Ordering};

/// Counts of what a [reliable socket](super::ReliableSocket) has done so far
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct SocketStats {
    /// Every datagram handed to the network, retransmissions and acks included
    pub datagrams_sent: u64,
    pub retransmissions: u64,
    pub acks_sent: u64,
    pub acks_received: u64,
    /// Acks that matched no pending send
    pub unknown_acks: u64,
    /// Data packets handed to the sink
    pub delivered: u64,
    /// Data packets that had already been delivered
    pub duplicates: u64,
    /// Data packets that arrived ahead of the expected number and were dropped
    pub gaps: u64,
    pub probes_received: u64,
    pub peers_evicted: u64,
}

#[derive(Default)]
pub(crate) struct StatCounters {
    pub datagrams_sent: AtomicU64,
    pub retransmissions: AtomicU64,
    pub acks_sent: AtomicU64,
    pub acks_received: AtomicU64,
    pub unknown_acks: AtomicU64,
    pub delivered: AtomicU64,
    pub duplicates: AtomicU64,
    pub gaps: AtomicU64,
    pub probes_received: AtomicU64,
    pub peers_evicted: AtomicU64,
}

impl StatCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        Self::add(counter, 1);
    }

    pub(crate) fn add(counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SocketStats {
        let read = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        SocketStats {
            datagrams_sent: read(&self.datagrams_sent),
            retransmissions: read(&self.retransmissions),
            acks_sent: read(&self.acks_sent),
            acks_received: read(&self.acks_received),
            unknown_acks: read(&self.unknown_acks),
            delivered: read(&self.delivered),
            duplicates: read(&self.duplicates),
            gaps: read(&self.gaps),
            probes_received: read(&self.probes_received),
            peers_evicted: read(&self.peers_evicted),
        }
    }
}
