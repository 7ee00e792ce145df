use std::time::Instant;

use crate::packet::WirePacket;

/// A data packet awaiting acknowledgement
pub(crate) struct PendingSend {
    /// The encoded datagram, resent byte for byte
    pub bytes: Vec<u8>,
    /// The last time the datagram went out
    pub last_sent: Instant,
}

impl PendingSend {
    /// Creates a new packet awaiting acknowledgement
    pub fn new(packet: &WirePacket, sent: Instant) -> Self {
        Self {
            bytes: packet.encode(),
            last_sent: sent,
        }
    }
}
