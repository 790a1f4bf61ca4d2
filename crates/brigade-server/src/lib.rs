//! The UDP-facing half of the core: join flow, per-tick socket service,
//! `WorldEvent`-to-wire translation, bans, and rcon. `brigade-world` owns
//! the simulation this crate drives; `brigade-protocol` owns the wire
//! format and transport it talks over.

pub mod client;
pub mod config;
pub mod error;
pub mod server;
