//! Reliable-over-UDP transport and the message catalogue carried over it.
//! One [`Connection`] models a single peer's handshake state, sequenced
//! reliable channel, and best-effort unreliable channel; [`Socket`] is the
//! non-blocking datagram I/O underneath it.

pub mod connection;
pub mod error;
pub mod message;
pub mod packet;
pub mod socket;
mod state;

pub use connection::{Connection, ConnectionStats};
pub use error::ProtocolError;
pub use message::{
    decode_message, encode_message, encoded_len, ClientMessage, ResourceManifestEntry,
    ServerMessage,
};
pub use packet::PacketType;
pub use socket::Socket;
pub use state::ConnectionState;
