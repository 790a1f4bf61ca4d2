use thiserror::Error;

/// Reasons a `JoinRequest` is rejected. Each variant maps straight to a
/// disconnect reason string sent back to the client — never unwrapped or
/// propagated past the call site that produced it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinError {
    #[error("version mismatch: server runs {server}, client sent {client}")]
    VersionMismatch { server: u32, client: u32 },
    #[error("wrong password")]
    WrongPassword,
    #[error("map hash mismatch")]
    MapHashMismatch,
    #[error("server full")]
    ServerFull,
    #[error("too many connections from this address")]
    TooManyFromIp,
    #[error("banned: {0}")]
    Banned(String),
}
