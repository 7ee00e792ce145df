use byteorder::{ByteOrder, NativeEndian};

use crate::{error::SocketError, sequence::SequenceNumber};

/// The offset in the datagram of the sequence number
pub const SEQ_NUM_OFFSET: usize = 0;
/// The amount of space in each datagram for the sequence number
pub const SEQ_NUM_BUF: usize = 4;
/// The offset in the datagram of the payload
pub const PAYLOAD_OFFSET: usize = SEQ_NUM_OFFSET + SEQ_NUM_BUF;

/// Payload of an acknowledgement, the sequence number field carries the acknowledged number
pub const ACK_SENTINEL: &[u8] = b"!ACK";
/// Payload of a punch-through probe
pub const PUNCH_SENTINEL: &[u8] = b"!PUNCH";

/// The only shape a datagram takes on the wire: a sequence number followed by a fixed size
/// payload
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct WirePacket {
    pub number: SequenceNumber,
    pub payload: Vec<u8>,
}

/// What a [wire packet](WirePacket) means, decided purely by its payload
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PacketKind {
    Data,
    Ack,
    Probe,
}

impl WirePacket {
    pub fn new(number: SequenceNumber, payload: Vec<u8>) -> Self {
        Self { number, payload }
    }

    /// An acknowledgement of `number`, padded to `package_size`
    pub fn ack(number: SequenceNumber, package_size: usize) -> Self {
        Self::new(number, pad(ACK_SENTINEL, package_size))
    }

    /// The punch-through probe, padded to `package_size`
    pub fn probe(package_size: usize) -> Self {
        Self::new(SequenceNumber::PROBE, pad(PUNCH_SENTINEL, package_size))
    }

    pub fn kind(&self) -> PacketKind {
        match until_nul(&self.payload) {
            text if text == PUNCH_SENTINEL => PacketKind::Probe,
            text if text == ACK_SENTINEL => PacketKind::Ack,
            _ => PacketKind::Data,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        encode(self.number, &self.payload)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, SocketError> {
        let (number, payload) = decode(buf)?;
        Ok(Self::new(number, payload))
    }
}

/// Writes the sequence number in native byte order followed by the payload
pub fn encode(number: SequenceNumber, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0; PAYLOAD_OFFSET + payload.len()];
    NativeEndian::write_i32(
        &mut buf[SEQ_NUM_OFFSET..SEQ_NUM_OFFSET + SEQ_NUM_BUF],
        number.raw(),
    );
    buf[PAYLOAD_OFFSET..].copy_from_slice(payload);

    buf
}

/// Splits a datagram back into its sequence number and the remaining payload bytes
pub fn decode(buf: &[u8]) -> Result<(SequenceNumber, Vec<u8>), SocketError> {
    if buf.len() < PAYLOAD_OFFSET {
        return Err(SocketError::Decode { length: buf.len() });
    }

    let number = NativeEndian::read_i32(&buf[SEQ_NUM_OFFSET..SEQ_NUM_OFFSET + SEQ_NUM_BUF]);
    Ok((SequenceNumber::new(number), buf[PAYLOAD_OFFSET..].to_vec()))
}

/// Copies `message` into a zero filled buffer of `package_size` bytes. The caller checks the
/// length beforehand
pub fn pad(message: &[u8], package_size: usize) -> Vec<u8> {
    let mut buf = vec![0; package_size.max(message.len())];
    buf[..message.len()].copy_from_slice(message);
    buf
}

/// The payload up to its first zero byte, which is how padded text messages are read back
pub fn until_nul(payload: &[u8]) -> &[u8] {
    let end = payload
        .iter()
        .position(|byte| *byte == 0)
        .unwrap_or(payload.len());
    &payload[..end]
}

/// Reads a padded payload as text, replacing invalid utf-8
pub fn payload_text(payload: &[u8]) -> String {
    String::from_utf8_lossy(until_nul(payload)).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_number_then_payload() {
        let bytes = encode(SequenceNumber::new(7), b"hi\0\0");
        assert_eq!(bytes.len(), SEQ_NUM_BUF + 4);
        assert_eq!(&bytes[..4], &7i32.to_ne_bytes());
        assert_eq!(&bytes[4..], b"hi\0\0");

        let packet = WirePacket::decode(&bytes).unwrap();
        assert_eq!(packet.number, SequenceNumber::new(7));
        assert_eq!(packet.payload, b"hi\0\0");
    }

    #[test]
    fn test_decode_short_buffer() {
        assert!(matches!(
            decode(&[1, 2, 3]),
            Err(SocketError::Decode { length: 3 })
        ));

        let (number, payload) = decode(&(-1i32).to_ne_bytes()).unwrap();
        assert_eq!(number, SequenceNumber::PROBE);
        assert!(payload.is_empty());
    }

    #[test]
    fn test_kind_by_payload() {
        assert_eq!(WirePacket::ack(SequenceNumber::new(3), 16).kind(), PacketKind::Ack);
        assert_eq!(WirePacket::probe(16).kind(), PacketKind::Probe);
        assert_eq!(
            WirePacket::new(SequenceNumber::FIRST, pad(b"!ACKNOWLEDGE", 16)).kind(),
            PacketKind::Data
        );
        assert_eq!(
            WirePacket::new(SequenceNumber::FIRST, pad(b"say hi", 16)).kind(),
            PacketKind::Data
        );
        assert_eq!(WirePacket::new(SequenceNumber::FIRST, vec![]).kind(), PacketKind::Data);
    }

    #[test]
    fn test_padding_round_trip() {
        let padded = pad(b"login Sasha", 32);
        assert_eq!(padded.len(), 32);
        assert_eq!(until_nul(&padded), b"login Sasha");
        assert_eq!(payload_text(&padded), "login Sasha");
        assert_eq!(payload_text(b"full"), "full");
    }
}
