use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed packet")]
    MalformedPacket,
    #[error("unknown message tag {0}")]
    UnknownMessageTag(u8),
    #[error("message body ended before every field was read")]
    BodyUnderrun,
    #[error("message body has unconsumed trailing bytes")]
    BodyOverrun,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
