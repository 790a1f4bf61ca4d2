/// Per-connection handshake/lifecycle state. Distinct from `brigade_types`
/// enums: this one drives protocol behavior rather than game data, so it
/// stays local to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Handshaking,
    Connected,
    Disconnecting,
    Disconnected,
}
