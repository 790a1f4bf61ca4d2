//! Tick-driven world simulation: entity registries, tile/collision-map
//! movement, weapon and damage rules, and delta-compressible per-client
//! snapshots built on top of `brigade-codec`'s `Delta` trait.

pub mod collision;
pub mod entities;
pub mod registry;
pub mod snapshot;
pub mod world;

pub use collision::{CollisionMap, EntityRef, Map};
pub use entities::{
    Ammopack, BlastJumpState, Explosion, Flag, GenericEntity, Medkit, PayloadCart, Player,
    Projectile, SentryGun,
};
pub use registry::{EntityId, EntityRegistry};
pub use snapshot::{
    build_update, decode_delta, decode_full, encode_delta, encode_full, AmmopackView,
    ExplosionView, FlagView, GenericEntityView, MedkitView, PayloadCartView, PlayerView,
    ProjectileView, SelfPlayerView, Snapshot, SnapshotRing, SentryGunView, SNAPSHOT_RING_CAPACITY,
};
pub use world::{MessageScope, RoundState, SoundScope, World, WorldEvent};
