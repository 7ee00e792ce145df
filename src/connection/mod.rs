use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use crate::{acknowledgement::manager::PendingSends, address::Address, sequence::SequenceNumber};

/// Transport state of one peer, created the first time we send to it or hear from it
pub struct Connection {
    pub address: Address,
    /// The number the last data packet to this peer was sent with
    pub next_send_number: SequenceNumber,
    /// The number the next accepted data packet from this peer must carry
    pub expected_receive_number: SequenceNumber,
    pub(crate) pending_sends: PendingSends,
    /// Last time anything was sent to or received from the peer
    pub(crate) last_activity: Instant,
}

impl Connection {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            next_send_number: SequenceNumber::PROBE,
            expected_receive_number: SequenceNumber::FIRST,
            pending_sends: PendingSends::new(),
            last_activity: Instant::now(),
        }
    }

    /// Moves the send counter on and returns the number to send with
    pub(crate) fn advance_send_number(&mut self) -> SequenceNumber {
        self.next_send_number += SequenceNumber::new(1);
        self.next_send_number
    }

    /// Amount of sends still waiting on an acknowledgement
    pub fn pending_count(&self) -> usize {
        self.pending_sends.len()
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }
}

/// The sequence counters of a freed peer. The peer keeps numbering its packets where it left
/// off, so they have to outlive the connection
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct RetiredCounters {
    next_send_number: SequenceNumber,
    expected_receive_number: SequenceNumber,
}

/// Every peer the socket has ever talked to, keyed by [address](Address). Holds no lock itself,
/// the [socket](crate::socket::ReliableSocket) keeps it behind one mutex
#[derive(Default)]
pub struct ConnectionTable {
    connections: HashMap<Address, Connection>,
    retired: HashMap<Address, RetiredCounters>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the connection of `address`, establishing a fresh one if we have never seen it.
    /// A peer freed by [evict_idle](Self::evict_idle) comes back with its old counters
    pub fn get_or_create(&mut self, address: &Address) -> &mut Connection {
        let retired = &mut self.retired;
        self.connections
            .entry(address.clone())
            .or_insert_with(|| {
                let mut connection = Connection::new(address.clone());
                match retired.remove(address) {
                    Some(counters) => {
                        log::debug!("Restoring connection with {address}");
                        connection.next_send_number = counters.next_send_number;
                        connection.expected_receive_number = counters.expected_receive_number;
                    }
                    None => log::debug!("Establishing connection with {address}"),
                }

                connection
            })
    }

    pub fn get(&self, address: &Address) -> Option<&Connection> {
        self.connections.get(address)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Connection> {
        self.connections.values_mut()
    }

    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.connections.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Frees every peer that has been quiet for `idle` and has nothing left to resend.
    /// Only its two sequence counters are kept, so numbering carries on if it comes back
    pub fn evict_idle(&mut self, now: Instant, idle: Duration) -> Vec<Address> {
        let mut evicted = Vec::new();
        let retired = &mut self.retired;
        self.connections.retain(|address, connection| {
            let keep = !connection.pending_sends.is_empty()
                || now.saturating_duration_since(connection.last_activity) < idle;
            if !keep {
                retired.insert(
                    address.clone(),
                    RetiredCounters {
                        next_send_number: connection.next_send_number,
                        expected_receive_number: connection.expected_receive_number,
                    },
                );
                evicted.push(address.clone());
            }
            keep
        });

        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{pad, WirePacket};

    #[test]
    fn test_get_or_create_starts_fresh_once() {
        let mut table = ConnectionTable::new();
        let address = Address::new("127.0.0.1", 9000);

        let connection = table.get_or_create(&address);
        assert_eq!(connection.next_send_number, SequenceNumber::PROBE);
        assert_eq!(connection.expected_receive_number, SequenceNumber::FIRST);
        assert_eq!(connection.pending_count(), 0);
        assert_eq!(connection.advance_send_number(), SequenceNumber::FIRST);

        let connection = table.get_or_create(&address);
        assert_eq!(connection.next_send_number, SequenceNumber::FIRST);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_peers_are_independent() {
        let mut table = ConnectionTable::new();
        let a = Address::new("127.0.0.1", 9000);
        let b = Address::new("127.0.0.1", 9001);

        table.get_or_create(&a).advance_send_number();
        table.get_or_create(&a).advance_send_number();
        table.get_or_create(&b).advance_send_number();

        assert_eq!(table.get(&a).unwrap().next_send_number.raw(), 1);
        assert_eq!(table.get(&b).unwrap().next_send_number.raw(), 0);
        assert_eq!(table.addresses(), vec![a, b]);
    }

    #[test]
    fn test_evict_idle_keeps_pending_peers() {
        let mut table = ConnectionTable::new();
        let quiet = Address::new("127.0.0.1", 9000);
        let waiting = Address::new("127.0.0.1", 9001);
        let start = Instant::now();

        table.get_or_create(&quiet).touch(start);
        let connection = table.get_or_create(&waiting);
        connection.touch(start);
        let number = connection.advance_send_number();
        connection
            .pending_sends
            .insert(&WirePacket::new(number, pad(b"x", 8)), start);

        let evicted = table.evict_idle(start + Duration::from_secs(10), Duration::from_secs(5));
        assert_eq!(evicted, vec![quiet.clone()]);
        assert!(table.get(&quiet).is_none());
        assert!(table.get(&waiting).is_some());
    }

    #[test]
    fn test_evicted_peer_keeps_its_counters() {
        let mut table = ConnectionTable::new();
        let address = Address::new("127.0.0.1", 9000);
        let start = Instant::now();

        let connection = table.get_or_create(&address);
        connection.touch(start);
        connection.advance_send_number();
        connection.advance_send_number();
        connection.expected_receive_number = SequenceNumber::new(3);

        let evicted = table.evict_idle(start + Duration::from_secs(10), Duration::from_secs(5));
        assert_eq!(evicted, vec![address.clone()]);
        assert!(table.is_empty());

        let connection = table.get_or_create(&address);
        assert_eq!(connection.next_send_number.raw(), 1);
        assert_eq!(connection.expected_receive_number.raw(), 3);
        assert_eq!(connection.pending_count(), 0);
        assert_eq!(connection.advance_send_number().raw(), 2);
    }
}
