/// Spray wire formats — explicit byte-level codecs for the radio substrate
///
/// Layout (multi-byte integers little-endian, no in-memory struct tricks):
///
/// Header (1 byte):
///   bits 0-2  protocol version
///   bits 3-4  packet type
///   bits 5-7  entry count (0-5)
///
/// MessageId (5 bytes): destination address (2) + source address (2) + seq (1)
/// SummaryVector: header + count * MessageId
/// Message record (17 bytes):
///   timestamp (LE u32) + copies (1) + payload length (1) + MessageId (5)
///   + reserved (1) + payload (5, fixed width, zero padded)
/// MessageVector: header + count * record

use super::{SprayError, SPRAY_VERSION};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum entries in a summary or message vector. The 3-bit count field
/// makes this a hard wire constraint; the message store shares it.
pub const MAX_VECTOR_ENTRIES: usize = 5;

/// Maximum message payload carried on the wire (fixed-width field)
pub const MAX_PAYLOAD: usize = 5;

/// A two-byte radio address, printed `hi.lo` like the substrate does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAddress(pub [u8; 2]);

impl NodeAddress {
    pub const WIRE_LEN: usize = 2;

    pub fn new(hi: u8, lo: u8) -> Self {
        Self([hi, lo])
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0[0], self.0[1])
    }
}

impl FromStr for NodeAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hi, lo) = s
            .split_once('.')
            .ok_or_else(|| format!("invalid address '{s}': expected hi.lo"))?;
        let hi = hi.parse::<u8>().map_err(|e| format!("invalid address '{s}': {e}"))?;
        let lo = lo.parse::<u8>().map_err(|e| format!("invalid address '{s}': {e}"))?;
        Ok(Self([hi, lo]))
    }
}

/// Uniquely identifies a message instance: source, destination, sequence.
/// Equality on this triple is the sole identity comparison in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId {
    pub src: NodeAddress,
    pub dest: NodeAddress,
    pub seq: u8,
}

impl MessageId {
    pub const WIRE_LEN: usize = 2 * NodeAddress::WIRE_LEN + 1;

    pub fn new(src: NodeAddress, dest: NodeAddress, seq: u8) -> Self {
        Self { src, dest, seq }
    }

    // Wire order is destination first, then source, then sequence.
    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.dest.0);
        buf.extend_from_slice(&self.src.0);
        buf.push(self.seq);
    }

    fn read_from(data: &[u8]) -> Self {
        Self {
            dest: NodeAddress([data[0], data[1]]),
            src: NodeAddress([data[2], data[3]]),
            seq: data[4],
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}#{}", self.src, self.dest, self.seq)
    }
}

/// Packet type enumeration (2-bit wire field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// Reserved (0)
    Reserved = 0,
    /// Summary vector advertisement, broadcast (1)
    SummaryVector = 1,
    /// Message vector push, unicast (2)
    Message = 2,
    /// Delivery notice (3)
    DeliveryNotice = 3,
}

impl PacketType {
    /// Convert a 2-bit field value to a PacketType
    pub fn from_u8(value: u8) -> Result<Self, SprayError> {
        match value {
            0 => Ok(PacketType::Reserved),
            1 => Ok(PacketType::SummaryVector),
            2 => Ok(PacketType::Message),
            3 => Ok(PacketType::DeliveryNotice),
            other => Err(SprayError::UnexpectedPacketType(other)),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/// The packed one-byte packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub packet_type: PacketType,
    pub count: u8,
}

impl Header {
    pub const WIRE_LEN: usize = 1;

    pub fn new(packet_type: PacketType, count: u8) -> Self {
        Self {
            version: SPRAY_VERSION,
            packet_type,
            count,
        }
    }

    pub fn encode(&self) -> u8 {
        (self.version & 0x07) | ((self.packet_type.as_u8() & 0x03) << 3) | ((self.count & 0x07) << 5)
    }

    /// Decode and validate a header byte.
    ///
    /// Returns error if:
    /// - Version does not match SPRAY_VERSION
    /// - Entry count exceeds MAX_VECTOR_ENTRIES
    pub fn decode(byte: u8) -> Result<Self, SprayError> {
        let version = byte & 0x07;
        if version != SPRAY_VERSION {
            return Err(SprayError::InvalidVersion(version));
        }
        let packet_type = PacketType::from_u8((byte >> 3) & 0x03)?;
        let count = (byte >> 5) & 0x07;
        if count as usize > MAX_VECTOR_ENTRIES {
            return Err(SprayError::EntryCountTooLarge(count));
        }
        Ok(Self {
            version,
            packet_type,
            count,
        })
    }
}

/// A cached message: identity, spray budget, and bounded payload.
///
/// `copies` is the forwarding budget. It starts at the configured initial
/// value, is halved (floor, clamped at 1) on each acknowledged forward, and
/// never reaches 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprayMessage {
    pub id: MessageId,
    /// Unix timestamp (seconds) when the message was created at its source
    pub timestamp: u32,
    /// Spray budget: remaining forwardable copies, always >= 1
    pub copies: u8,
    payload: [u8; MAX_PAYLOAD],
    len: u8,
}

impl SprayMessage {
    /// Fixed record size on the wire: 4 + 1 + 1 + 5 + 1 + 5
    pub const WIRE_LEN: usize = 17;

    /// Create a message. Copies are clamped to at least 1.
    ///
    /// Returns `Err(PayloadTooLarge)` if the payload exceeds MAX_PAYLOAD.
    pub fn new(
        id: MessageId,
        timestamp: u32,
        copies: u8,
        payload: &[u8],
    ) -> Result<Self, SprayError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(SprayError::PayloadTooLarge(payload.len()));
        }
        let mut buf = [0u8; MAX_PAYLOAD];
        buf[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            id,
            timestamp,
            copies: copies.max(1),
            payload: buf,
            len: payload.len() as u8,
        })
    }

    /// The used portion of the payload
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.len as usize]
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.push(self.copies);
        buf.push(self.len);
        self.id.write_to(buf);
        buf.push(0); // reserved
        buf.extend_from_slice(&self.payload);
    }

    fn read_from(data: &[u8]) -> Self {
        let timestamp = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let copies = data[4].max(1);
        let len = data[5].min(MAX_PAYLOAD as u8);
        let id = MessageId::read_from(&data[6..11]);
        // data[11] is reserved
        let mut payload = [0u8; MAX_PAYLOAD];
        payload.copy_from_slice(&data[12..12 + MAX_PAYLOAD]);
        Self {
            id,
            timestamp,
            copies,
            payload,
            len,
        }
    }
}

/// A compact advertisement of cached message identities. Lossy snapshot:
/// identities only, no payloads, no copy counts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SummaryVector {
    ids: Vec<MessageId>,
}

impl SummaryVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from identities, truncating to MAX_VECTOR_ENTRIES
    pub fn from_ids(mut ids: Vec<MessageId>) -> Self {
        ids.truncate(MAX_VECTOR_ENTRIES);
        Self { ids }
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> &[MessageId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn encode(&self) -> Vec<u8> {
        let count = self.ids.len().min(MAX_VECTOR_ENTRIES);
        let mut buf = Vec::with_capacity(Header::WIRE_LEN + count * MessageId::WIRE_LEN);
        buf.push(Header::new(PacketType::SummaryVector, count as u8).encode());
        for id in self.ids.iter().take(count) {
            id.write_to(&mut buf);
        }
        buf
    }

    /// Decode a summary vector packet.
    ///
    /// Returns error if the header is invalid, the packet type is not
    /// SummaryVector, or the buffer length does not match the entry count.
    pub fn decode(data: &[u8]) -> Result<Self, SprayError> {
        let header = decode_header(data)?;
        if header.packet_type != PacketType::SummaryVector {
            return Err(SprayError::UnexpectedPacketType(header.packet_type.as_u8()));
        }
        let expected = Header::WIRE_LEN + header.count as usize * MessageId::WIRE_LEN;
        if data.len() != expected {
            return Err(SprayError::LengthMismatch {
                expected,
                got: data.len(),
            });
        }
        let mut ids = Vec::with_capacity(header.count as usize);
        let mut offset = Header::WIRE_LEN;
        for _ in 0..header.count {
            ids.push(MessageId::read_from(&data[offset..offset + MessageId::WIRE_LEN]));
            offset += MessageId::WIRE_LEN;
        }
        Ok(Self { ids })
    }
}

/// A batch of full message records pushed over acknowledged unicast
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageVector {
    messages: Vec<SprayMessage>,
}

impl MessageVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records, truncating to MAX_VECTOR_ENTRIES
    pub fn from_messages(mut messages: Vec<SprayMessage>) -> Self {
        messages.truncate(MAX_VECTOR_ENTRIES);
        Self { messages }
    }

    pub fn messages(&self) -> &[SprayMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<SprayMessage> {
        self.messages
    }

    /// Identities of the batched records, in batch order
    pub fn ids(&self) -> Vec<MessageId> {
        self.messages.iter().map(|m| m.id).collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn encode(&self) -> Vec<u8> {
        let count = self.messages.len().min(MAX_VECTOR_ENTRIES);
        let mut buf = Vec::with_capacity(Header::WIRE_LEN + count * SprayMessage::WIRE_LEN);
        buf.push(Header::new(PacketType::Message, count as u8).encode());
        for msg in self.messages.iter().take(count) {
            msg.write_to(&mut buf);
        }
        buf
    }

    /// Decode a message vector packet.
    ///
    /// Returns error if the header is invalid, the packet type is not
    /// Message, or the buffer length does not match the entry count.
    pub fn decode(data: &[u8]) -> Result<Self, SprayError> {
        let header = decode_header(data)?;
        if header.packet_type != PacketType::Message {
            return Err(SprayError::UnexpectedPacketType(header.packet_type.as_u8()));
        }
        let expected = Header::WIRE_LEN + header.count as usize * SprayMessage::WIRE_LEN;
        if data.len() != expected {
            return Err(SprayError::LengthMismatch {
                expected,
                got: data.len(),
            });
        }
        let mut messages = Vec::with_capacity(header.count as usize);
        let mut offset = Header::WIRE_LEN;
        for _ in 0..header.count {
            messages.push(SprayMessage::read_from(
                &data[offset..offset + SprayMessage::WIRE_LEN],
            ));
            offset += SprayMessage::WIRE_LEN;
        }
        Ok(Self { messages })
    }
}

/// A decoded inbound packet, dispatched on the header type field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Summary(SummaryVector),
    Messages(MessageVector),
    /// Types the node does not process (reserved, delivery notices)
    Unhandled(PacketType),
}

impl Packet {
    /// Decode any spray packet from raw radio bytes
    pub fn decode(data: &[u8]) -> Result<Self, SprayError> {
        let header = decode_header(data)?;
        match header.packet_type {
            PacketType::SummaryVector => SummaryVector::decode(data).map(Packet::Summary),
            PacketType::Message => MessageVector::decode(data).map(Packet::Messages),
            other => Ok(Packet::Unhandled(other)),
        }
    }
}

fn decode_header(data: &[u8]) -> Result<Header, SprayError> {
    if data.is_empty() {
        return Err(SprayError::BufferTooShort {
            need: Header::WIRE_LEN,
            got: 0,
        });
    }
    Header::decode(data[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(lo: u8) -> NodeAddress {
        NodeAddress::new(128, lo)
    }

    fn make_id(src: u8, dest: u8, seq: u8) -> MessageId {
        MessageId::new(addr(src), addr(dest), seq)
    }

    fn make_message(src: u8, dest: u8, seq: u8, copies: u8) -> SprayMessage {
        SprayMessage::new(make_id(src, dest, seq), 1_700_000_000, copies, b"hi").unwrap()
    }

    #[test]
    fn test_address_display_and_parse() {
        let a = NodeAddress::new(128, 9);
        assert_eq!(a.to_string(), "128.9");
        assert_eq!("128.9".parse::<NodeAddress>().unwrap(), a);
        assert!("128".parse::<NodeAddress>().is_err());
        assert!("128.999".parse::<NodeAddress>().is_err());
    }

    #[test]
    fn test_header_bit_layout() {
        let header = Header::new(PacketType::Message, 3);
        let byte = header.encode();

        // version 1 in bits 0-2, type 2 in bits 3-4, count 3 in bits 5-7
        assert_eq!(byte & 0x07, 0x01);
        assert_eq!((byte >> 3) & 0x03, 0x02);
        assert_eq!((byte >> 5) & 0x07, 0x03);

        let restored = Header::decode(byte).unwrap();
        assert_eq!(restored, header);
    }

    #[test]
    fn test_header_rejects_wrong_version() {
        let byte = 0x05; // version 5
        assert!(matches!(
            Header::decode(byte),
            Err(SprayError::InvalidVersion(5))
        ));
    }

    #[test]
    fn test_header_rejects_oversized_count() {
        // count 6 with valid version and type
        let byte = Header::new(PacketType::SummaryVector, 0).encode() | (6 << 5);
        assert!(matches!(
            Header::decode(byte),
            Err(SprayError::EntryCountTooLarge(6))
        ));
    }

    #[test]
    fn test_message_id_wire_order_destination_first() {
        let id = make_id(2, 9, 42);
        let mut buf = Vec::new();
        id.write_to(&mut buf);

        assert_eq!(buf, vec![128, 9, 128, 2, 42]);
        assert_eq!(MessageId::read_from(&buf), id);
    }

    #[test]
    fn test_summary_vector_roundtrip() {
        let sv = SummaryVector::from_ids(vec![make_id(1, 2, 7), make_id(3, 4, 8)]);
        let bytes = sv.encode();

        assert_eq!(bytes.len(), 1 + 2 * MessageId::WIRE_LEN);

        let restored = SummaryVector::decode(&bytes).unwrap();
        assert_eq!(restored, sv);
    }

    #[test]
    fn test_summary_vector_empty_roundtrip() {
        let sv = SummaryVector::new();
        let bytes = sv.encode();
        assert_eq!(bytes.len(), 1);

        let restored = SummaryVector::decode(&bytes).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_summary_vector_truncates_to_capacity() {
        let ids: Vec<_> = (0..8).map(|i| make_id(1, 2, i)).collect();
        let sv = SummaryVector::from_ids(ids);
        assert_eq!(sv.len(), MAX_VECTOR_ENTRIES);
    }

    #[test]
    fn test_summary_vector_length_mismatch() {
        let sv = SummaryVector::from_ids(vec![make_id(1, 2, 7)]);
        let mut bytes = sv.encode();
        bytes.push(0); // trailing junk

        assert!(matches!(
            SummaryVector::decode(&bytes),
            Err(SprayError::LengthMismatch { .. })
        ));

        bytes.truncate(bytes.len() - 2); // now short of the advertised count
        assert!(matches!(
            SummaryVector::decode(&bytes),
            Err(SprayError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_summary_vector_rejects_wrong_type() {
        let mv = MessageVector::from_messages(vec![make_message(1, 2, 7, 4)]);
        let bytes = mv.encode();
        assert!(matches!(
            SummaryVector::decode(&bytes),
            Err(SprayError::UnexpectedPacketType(2))
        ));
    }

    #[test]
    fn test_message_record_layout() {
        let msg = SprayMessage::new(make_id(2, 9, 42), 0x12345678, 4, b"ab").unwrap();
        let mv = MessageVector::from_messages(vec![msg]);
        let bytes = mv.encode();

        assert_eq!(bytes.len(), 1 + SprayMessage::WIRE_LEN);

        // timestamp is little-endian right after the header
        assert_eq!(&bytes[1..5], &[0x78, 0x56, 0x34, 0x12]);
        // copies, then payload length
        assert_eq!(bytes[5], 4);
        assert_eq!(bytes[6], 2);
        // identity: dest first
        assert_eq!(&bytes[7..12], &[128, 9, 128, 2, 42]);
        // reserved byte
        assert_eq!(bytes[12], 0);
        // fixed-width payload, zero padded
        assert_eq!(&bytes[13..18], b"ab\0\0\0");
    }

    #[test]
    fn test_message_vector_roundtrip() {
        let mv = MessageVector::from_messages(vec![
            make_message(1, 9, 1, 8),
            make_message(2, 9, 2, 4),
            make_message(3, 9, 3, 1),
        ]);
        let bytes = mv.encode();

        let restored = MessageVector::decode(&bytes).unwrap();
        assert_eq!(restored, mv);
        assert_eq!(restored.messages()[0].payload(), b"hi");
    }

    #[test]
    fn test_message_vector_length_mismatch() {
        let mv = MessageVector::from_messages(vec![make_message(1, 9, 1, 8)]);
        let mut bytes = mv.encode();
        bytes.truncate(bytes.len() - 1);

        assert!(matches!(
            MessageVector::decode(&bytes),
            Err(SprayError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_payload_too_large() {
        let result = SprayMessage::new(make_id(1, 2, 3), 0, 4, b"toolong");
        assert!(matches!(result, Err(SprayError::PayloadTooLarge(7))));
    }

    #[test]
    fn test_copies_clamped_at_one() {
        let msg = SprayMessage::new(make_id(1, 2, 3), 0, 0, b"x").unwrap();
        assert_eq!(msg.copies, 1);
    }

    #[test]
    fn test_packet_dispatch() {
        let sv = SummaryVector::from_ids(vec![make_id(1, 2, 7)]);
        match Packet::decode(&sv.encode()).unwrap() {
            Packet::Summary(s) => assert_eq!(s, sv),
            other => panic!("expected summary, got {:?}", other),
        }

        let mv = MessageVector::from_messages(vec![make_message(1, 2, 7, 4)]);
        match Packet::decode(&mv.encode()).unwrap() {
            Packet::Messages(m) => assert_eq!(m, mv),
            other => panic!("expected messages, got {:?}", other),
        }

        // delivery notices decode but are not processed
        let byte = Header::new(PacketType::DeliveryNotice, 0).encode();
        match Packet::decode(&[byte]).unwrap() {
            Packet::Unhandled(PacketType::DeliveryNotice) => {}
            other => panic!("expected unhandled, got {:?}", other),
        }
    }

    #[test]
    fn test_packet_empty_buffer() {
        assert!(matches!(
            Packet::decode(&[]),
            Err(SprayError::BufferTooShort { need: 1, got: 0 })
        ));
    }
}
