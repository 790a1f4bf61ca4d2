use brigade_codec::{ByteSink, Decode, Encode, InputStream};

/// Closed weapon enumeration. Per-weapon stats (ammo cost, clip size,
/// damage, timers, projectile type, sounds) live in `brigade-data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum Weapon {
    #[default]
    None = 0,
    Scattergun = 1,
    RocketLauncher = 2,
    FlameThrower = 3,
    StickybombLauncher = 4,
    Minigun = 5,
    Shotgun = 6,
    SyringeGun = 7,
    SniperRifle = 8,
    Knife = 9,
    BuildTool = 10,
    MediGun = 11,
    DisguiseKit = 12,
    SentryGun = 13,
    StickyDetonator = 14,
}

impl Weapon {
    pub const ALL: [Weapon; 15] = [
        Weapon::None,
        Weapon::Scattergun,
        Weapon::RocketLauncher,
        Weapon::FlameThrower,
        Weapon::StickybombLauncher,
        Weapon::Minigun,
        Weapon::Shotgun,
        Weapon::SyringeGun,
        Weapon::SniperRifle,
        Weapon::Knife,
        Weapon::BuildTool,
        Weapon::MediGun,
        Weapon::DisguiseKit,
        Weapon::SentryGun,
        Weapon::StickyDetonator,
    ];
}

impl TryFrom<u8> for Weapon {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Weapon::ALL.into_iter().find(|w| *w as u8 == value).ok_or(value)
    }
}

impl Encode for Weapon {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        (*self as u8).encode(out);
    }
}

impl Decode for Weapon {
    fn decode(input: &mut InputStream) -> Option<Self> {
        let raw = u8::decode(input)?;
        match Weapon::try_from(raw) {
            Ok(weapon) => Some(weapon),
            Err(_) => {
                input.invalidate();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brigade_codec::OutputStream;

    #[test]
    fn roundtrip_all_variants() {
        for weapon in Weapon::ALL {
            let mut out = OutputStream::new();
            weapon.encode(&mut out);
            let mut input = InputStream::new(out.as_bytes());
            assert_eq!(Weapon::decode(&mut input), Some(weapon));
        }
    }

    #[test]
    fn out_of_range_invalidates() {
        let mut input = InputStream::new(&[99]);
        assert_eq!(Weapon::decode(&mut input), None);
        assert!(!input.valid());
    }
}
