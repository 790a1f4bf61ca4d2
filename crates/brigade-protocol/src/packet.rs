/// The one-byte tag every datagram opens with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    HandshakeSyn = 0,
    HandshakeSynAck = 1,
    HandshakeAck = 2,
    Reliable = 3,
    Unreliable = 4,
    Ack = 5,
    KeepAlive = 6,
    Disconnect = 7,
}

impl PacketType {
    pub const ALL: [PacketType; 8] = [
        PacketType::HandshakeSyn,
        PacketType::HandshakeSynAck,
        PacketType::HandshakeAck,
        PacketType::Reliable,
        PacketType::Unreliable,
        PacketType::Ack,
        PacketType::KeepAlive,
        PacketType::Disconnect,
    ];
}

impl TryFrom<u8> for PacketType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        PacketType::ALL.into_iter().find(|t| *t as u8 == value).ok_or(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_round_trips_through_its_byte() {
        for kind in PacketType::ALL {
            assert_eq!(PacketType::try_from(kind as u8), Ok(kind));
        }
    }

    #[test]
    fn out_of_range_byte_is_rejected() {
        assert_eq!(PacketType::try_from(200), Err(200));
    }
}
