//! Wire-level scalar and closed-enum data model shared by the protocol and
//! world crates: ids, `Vec2`, `Direction`, team/class/weapon/projectile/hat/
//! sound enumerations, and the solid-flags collision bitmask.

mod class;
mod direction;
mod hat;
mod ids;
mod projectile;
mod solid;
mod sound;
mod team;
mod vec2;
mod weapon;

pub use class::PlayerClass;
pub use direction::Direction;
pub use hat::Hat;
pub use ids::{
    AmmopackId, ExplosionId, FlagId, GenericEntityId, MedkitId, PayloadCartId, PlayerId,
    ProjectileId, SentryGunId,
};
pub use projectile::ProjectileType;
pub use solid::SolidFlags;
pub use sound::SoundId;
pub use team::Team;
pub use vec2::Vec2;
pub use weapon::Weapon;

use brigade_codec::{ByteSink, Decode, Delta, Encode, InputStream};

/// These types have no internal structure worth diffing (single-byte enums,
/// 32-bit ids, a coordinate pair): a changed value is always written in
/// full, the same fallback the original gives any type with no `tie()`.
macro_rules! impl_delta_as_full_value {
    ($($t:ty),+ $(,)?) => {
        $(
            impl Delta for $t {
                fn delta_encode<S: ByteSink>(&self, _old: &Self, out: &mut S) {
                    self.encode(out);
                }

                fn delta_decode(input: &mut InputStream, _old: &Self) -> Option<Self> {
                    Self::decode(input)
                }
            }
        )+
    };
}

impl_delta_as_full_value!(
    Team,
    PlayerClass,
    Weapon,
    ProjectileType,
    Hat,
    SoundId,
    SolidFlags,
    Vec2,
    Direction,
    PlayerId,
    ProjectileId,
    ExplosionId,
    SentryGunId,
    MedkitId,
    AmmopackId,
    GenericEntityId,
    FlagId,
    PayloadCartId,
);
