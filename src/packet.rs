use byteorder::{ByteOrder, LittleEndian};
use log::trace;

use crate::error::SourceQueryError;

/// Payload of every A2S_INFO request.
pub const INFO_PAYLOAD: &[u8] = b"Source Engine Query\0";

/// Challenge value sent while the server has not issued one yet.
pub const NO_CHALLENGE: i32 = -1;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PacketHeader {
    Single,
    Split,
}

/// Convert an i32 into a [PacketHeader].
impl TryFrom<i32> for PacketHeader {
    type Error = SourceQueryError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(PacketHeader::Single),
            -2 => Ok(PacketHeader::Split),
            n => Err(SourceQueryError::UnknownPacketHeader(n)),
        }
    }
}

/// For packing a [PacketHeader] into a packet in [RequestPacket::pack].
impl PacketHeader {
    pub fn to_le_bytes(self) -> [u8; 4] {
        let header_value: i32 = match self {
            PacketHeader::Single => -1,
            PacketHeader::Split => -2,
        };
        header_value.to_le_bytes()
    }
}

/// Queries a client can send.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RequestType {
    /// A2S_INFO -- https://developer.valvesoftware.com/wiki/Server_queries#A2S_INFO
    Info,
    /// A2S_PLAYER -- https://developer.valvesoftware.com/wiki/Server_queries#A2S_PLAYER
    Player,
    /// A2S_RULES -- https://developer.valvesoftware.com/wiki/Server_queries#A2S_RULES
    Rules,
}

impl RequestType {
    pub fn to_byte(self) -> u8 {
        match self {
            RequestType::Info => 0x54,   // 'T'
            RequestType::Player => 0x55, // 'U'
            RequestType::Rules => 0x56,  // 'V'
        }
    }

    /// A2S_PLAYER and A2S_RULES carry the challenge right after the type byte.
    fn challenge_first(self) -> bool {
        matches!(self, RequestType::Player | RequestType::Rules)
    }
}

/// Response types a client can expect.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ResponseType {
    /// S2C_CHALLENGE
    ///
    /// The server may reply with a challenge ('A' or 0x41). In that case the
    /// client repeats the request with the challenge number included.
    Challenge,
    /// A2S_INFO response from a Source server, parsed by [crate::info::ServerInfo::from_source].
    SourceInfo,
    /// Obsolete A2S_INFO response from a GoldSource server, parsed by
    /// [crate::info::ServerInfo::from_goldsource].
    GoldSourceInfo,
    /// A2S_PLAYER response.
    Player,
    /// A2S_RULES response.
    Rules,
}

impl ResponseType {
    pub fn to_byte(self) -> u8 {
        match self {
            ResponseType::Challenge => 0x41,      // 'A'
            ResponseType::SourceInfo => 0x49,     // 'I'
            ResponseType::GoldSourceInfo => 0x6D, // 'm'
            ResponseType::Player => 0x44,         // 'D'
            ResponseType::Rules => 0x45,          // 'E'
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct RequestPacket {
    packet_type: RequestType,
    payload: Vec<u8>,
    challenge: Option<i32>,
}

impl RequestPacket {
    pub fn new(packet_type: RequestType, payload: Vec<u8>, challenge: Option<i32>) -> Self {
        RequestPacket {
            packet_type,
            payload,
            challenge,
        }
    }

    /// A2S_INFO request, with the challenge appended if one is known.
    pub fn info(challenge: Option<i32>) -> Self {
        Self::new(RequestType::Info, INFO_PAYLOAD.to_vec(), challenge)
    }

    /// Request a fresh challenge for A2S_PLAYER or A2S_RULES.
    ///
    /// The challenge slot is filled with 0xFFFFFFFF no matter what the client
    /// has cached, which servers always answer with S2C_CHALLENGE.
    pub fn challenge_request(packet_type: RequestType) -> Self {
        Self::new(packet_type, Vec::new(), None)
    }

    /// Serializes a request packet into an array of bytes.
    pub fn pack(&self) -> Vec<u8> {
        // packet structure: header, type, [challenge], payload, [challenge]
        let mut packet: Vec<u8> = Vec::with_capacity(4 + 1 + 4 + self.payload.len() + 4);
        packet.extend_from_slice(&PacketHeader::Single.to_le_bytes());
        packet.push(self.packet_type.to_byte());

        if self.packet_type.challenge_first() {
            let challenge = self.challenge.unwrap_or(NO_CHALLENGE);
            packet.extend_from_slice(&challenge.to_le_bytes());
        }

        packet.extend_from_slice(&self.payload);

        // A2S_INFO only carries a challenge once the server has handed one out
        if self.packet_type == RequestType::Info {
            if let Some(challenge) = self.challenge {
                packet.extend_from_slice(&challenge.to_le_bytes());
            }
        }

        packet
    }

    pub fn packet_type(&self) -> RequestType {
        self.packet_type
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ResponsePacket {
    packet_header: PacketHeader,
    id: Option<i32>,
    total: Option<u8>,
    number: Option<u8>,
    packet_type: u8,
    body: Vec<u8>,
}

impl ResponsePacket {
    const HEADER_LEN: usize = 4;

    const SPLIT_MIN_LEN: usize = 9;
    const SPLIT_ID_LEN: usize = 4;
    const SPLIT_TOTAL_OFFSET: usize = 4;
    const SPLIT_NUMBER_OFFSET: usize = 5;
    // id, total and number, then an optional 2-byte size field
    const SPLIT_PAYLOAD_OFFSET: usize = 6;
    const SPLIT_SIZE_LEN: usize = 2;

    /// Deserializes an incoming datagram, splitting it up into headers and body.
    ///
    /// Only the framing of a single datagram is handled: a split packet has
    /// its fragment header skipped and is otherwise decoded like a single
    /// packet. Fragments are not collected across datagrams.
    pub fn unpack(incoming: &[u8]) -> Result<Self, SourceQueryError> {
        if incoming.len() < Self::HEADER_LEN {
            return Err(SourceQueryError::ShortResponse);
        }

        let raw_header = LittleEndian::read_i32(&incoming[..Self::HEADER_LEN]);
        let packet_header = PacketHeader::try_from(raw_header)?;
        let data = &incoming[Self::HEADER_LEN..];

        match packet_header {
            PacketHeader::Single => Self::unpack_single(packet_header, data),
            PacketHeader::Split => Self::unpack_split(data),
        }
    }

    fn unpack_single(packet_header: PacketHeader, data: &[u8]) -> Result<Self, SourceQueryError> {
        let (&packet_type, body) = data.split_first().ok_or(SourceQueryError::ShortResponse)?;

        Ok(ResponsePacket {
            packet_header,
            id: None,
            total: None,
            number: None,
            packet_type,
            body: body.to_vec(),
        })
    }

    fn unpack_split(data: &[u8]) -> Result<Self, SourceQueryError> {
        if data.len() < Self::SPLIT_MIN_LEN {
            return Err(SourceQueryError::ShortResponse);
        }

        let mut payload_start = Self::SPLIT_PAYLOAD_OFFSET;
        if data.len() > 8 {
            payload_start += Self::SPLIT_SIZE_LEN;
        }
        if payload_start >= data.len() {
            return Err(SourceQueryError::InvalidResponse);
        }

        let id = LittleEndian::read_i32(&data[..Self::SPLIT_ID_LEN]);
        let total = data[Self::SPLIT_TOTAL_OFFSET];
        let number = data[Self::SPLIT_NUMBER_OFFSET];
        trace!("split packet id {:#X}, fragment {} of {}", id, number, total);

        let packet = Self::unpack_single(PacketHeader::Split, &data[payload_start..])?;
        Ok(ResponsePacket {
            id: Some(id),
            total: Some(total),
            number: Some(number),
            ..packet
        })
    }

    /// Hand over the body if the packet is of the `expected` type.
    ///
    /// An S2C_CHALLENGE packet is never a payload: it yields
    /// [SourceQueryError::ChallengeRequired] carrying the challenge number.
    pub fn into_payload(self, expected: ResponseType) -> Result<Vec<u8>, SourceQueryError> {
        if self.packet_type == ResponseType::Challenge.to_byte() {
            if self.body.len() < 4 {
                return Err(SourceQueryError::ShortResponse);
            }
            let challenge = LittleEndian::read_i32(&self.body[..4]);
            return Err(SourceQueryError::ChallengeRequired(challenge));
        }

        if self.packet_type != expected.to_byte() {
            return Err(SourceQueryError::ProtocolMismatch {
                expected: expected.to_byte(),
                actual: self.packet_type,
            });
        }

        Ok(self.body)
    }

    pub fn packet_header(&self) -> PacketHeader {
        self.packet_header
    }

    pub fn packet_type(&self) -> u8 {
        self.packet_type
    }

    /// Split packet id, fragment count and fragment number, if this was a split packet.
    pub fn split_info(&self) -> Option<(i32, u8, u8)> {
        match (self.id, self.total, self.number) {
            (Some(id), Some(total), Some(number)) => Some((id, total, number)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHALLENGE: i32 = 0x4A3B_2C1D;

    fn single(packet_type: u8, body: &[u8]) -> Vec<u8> {
        let mut data = vec![0xFF, 0xFF, 0xFF, 0xFF, packet_type];
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn test_pack_info_without_challenge() {
        let packed = RequestPacket::info(None).pack();

        assert_eq!(&packed[..5], &[0xFF, 0xFF, 0xFF, 0xFF, 0x54]);
        assert_eq!(&packed[5..], INFO_PAYLOAD);
    }

    #[test]
    fn test_pack_info_appends_challenge() {
        let packed = RequestPacket::info(Some(CHALLENGE)).pack();

        assert_eq!(packed.len(), 5 + INFO_PAYLOAD.len() + 4);
        assert_eq!(&packed[5..5 + INFO_PAYLOAD.len()], INFO_PAYLOAD);
        assert_eq!(&packed[packed.len() - 4..], &CHALLENGE.to_le_bytes());
    }

    #[test]
    fn test_pack_player_places_challenge_after_type() {
        let packed = RequestPacket::new(RequestType::Player, Vec::new(), Some(CHALLENGE)).pack();

        assert_eq!(packed, [0xFF, 0xFF, 0xFF, 0xFF, 0x55, 0x1D, 0x2C, 0x3B, 0x4A]);
        // what a server reads back at offset 5
        assert_eq!(LittleEndian::read_i32(&packed[5..9]), CHALLENGE);
    }

    #[test]
    fn test_pack_rules_challenge_precedes_payload() {
        let packed = RequestPacket::new(RequestType::Rules, vec![1, 2], Some(-7)).pack();

        assert_eq!(packed[4], 0x56);
        assert_eq!(&packed[5..9], &(-7i32).to_le_bytes());
        assert_eq!(&packed[9..], &[1u8, 2]);
    }

    #[test]
    fn test_pack_challenge_request() {
        let packed = RequestPacket::challenge_request(RequestType::Rules).pack();

        assert_eq!(packed, [0xFF, 0xFF, 0xFF, 0xFF, 0x56, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_unpack_single() {
        let packet = ResponsePacket::unpack(&single(0x45, &[1, 0])).unwrap();

        assert_eq!(packet.packet_header(), PacketHeader::Single);
        assert_eq!(packet.packet_type(), 0x45);
        assert_eq!(packet.split_info(), None);
        assert_eq!(packet.into_payload(ResponseType::Rules).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_challenge_is_never_a_payload() {
        let data = single(0x41, &CHALLENGE.to_le_bytes());

        for expected in [ResponseType::Challenge, ResponseType::SourceInfo, ResponseType::Player] {
            let packet = ResponsePacket::unpack(&data).unwrap();
            match packet.into_payload(expected) {
                Err(SourceQueryError::ChallengeRequired(c)) => assert_eq!(c, CHALLENGE),
                other => panic!("expected challenge, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_truncated_challenge() {
        let packet = ResponsePacket::unpack(&single(0x41, &[1, 2, 3])).unwrap();

        assert!(matches!(
            packet.into_payload(ResponseType::Player),
            Err(SourceQueryError::ShortResponse)
        ));
    }

    #[test]
    fn test_protocol_mismatch() {
        let packet = ResponsePacket::unpack(&single(0x6D, &[0])).unwrap();

        match packet.into_payload(ResponseType::SourceInfo) {
            Err(SourceQueryError::ProtocolMismatch { expected, actual }) => {
                assert_eq!(expected, 0x49);
                assert_eq!(actual, 0x6D);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_header() {
        for packet_type in [0x00, 0x41, 0x49, 0xFF] {
            let data = [0xFD, 0xFF, 0xFF, 0xFF, packet_type, 0, 0, 0, 0];
            assert!(matches!(
                ResponsePacket::unpack(&data),
                Err(SourceQueryError::UnknownPacketHeader(-3))
            ));
        }
    }

    #[test]
    fn test_short_packets() {
        assert!(matches!(
            ResponsePacket::unpack(&[0xFF, 0xFF, 0xFF]),
            Err(SourceQueryError::ShortResponse)
        ));
        assert!(matches!(
            ResponsePacket::unpack(&[0xFF, 0xFF, 0xFF, 0xFF]),
            Err(SourceQueryError::ShortResponse)
        ));
    }

    #[test]
    fn test_unpack_split_skips_fragment_header() {
        let mut data = vec![0xFE, 0xFF, 0xFF, 0xFF];
        data.extend_from_slice(&0x10i32.to_le_bytes()); // id
        data.extend_from_slice(&[2, 0]); // total, number
        data.extend_from_slice(&[0xE0, 0x04]); // size
        data.extend_from_slice(&[0x45, 0x01, 0x00]);

        let packet = ResponsePacket::unpack(&data).unwrap();

        assert_eq!(packet.packet_header(), PacketHeader::Split);
        assert_eq!(packet.split_info(), Some((0x10, 2, 0)));
        assert_eq!(packet.into_payload(ResponseType::Rules).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_split_too_short() {
        let data = [0xFE, 0xFF, 0xFF, 0xFF, 1, 0, 0, 0, 2, 0, 0, 0];

        assert!(matches!(
            ResponsePacket::unpack(&data),
            Err(SourceQueryError::ShortResponse)
        ));
    }
}
