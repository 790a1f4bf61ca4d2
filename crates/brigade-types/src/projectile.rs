use brigade_codec::{ByteSink, Decode, Encode, InputStream};

/// Closed projectile-kind enumeration. Per-kind stats (move interval,
/// disappear time, display char) live in `brigade-data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum ProjectileType {
    #[default]
    None = 0,
    Bullet = 1,
    Rocket = 2,
    Sticky = 3,
    Flame = 4,
    HealBeam = 5,
    Syringe = 6,
    SniperTrail = 7,
}

impl ProjectileType {
    pub const ALL: [ProjectileType; 8] = [
        ProjectileType::None,
        ProjectileType::Bullet,
        ProjectileType::Rocket,
        ProjectileType::Sticky,
        ProjectileType::Flame,
        ProjectileType::HealBeam,
        ProjectileType::Syringe,
        ProjectileType::SniperTrail,
    ];

    /// Rockets convert to an `Explosion` on disappear-timer expiry; every
    /// other kind is simply removed.
    pub fn explodes_on_expiry(self) -> bool {
        matches!(self, ProjectileType::Rocket)
    }

    /// Stickies persist past their disappear timer until detonated.
    pub fn persists_until_detonated(self) -> bool {
        matches!(self, ProjectileType::Sticky)
    }
}

impl TryFrom<u8> for ProjectileType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ProjectileType::ALL.into_iter().find(|p| *p as u8 == value).ok_or(value)
    }
}

impl Encode for ProjectileType {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        (*self as u8).encode(out);
    }
}

impl Decode for ProjectileType {
    fn decode(input: &mut InputStream) -> Option<Self> {
        let raw = u8::decode(input)?;
        match ProjectileType::try_from(raw) {
            Ok(kind) => Some(kind),
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
        for kind in ProjectileType::ALL {
            let mut out = OutputStream::new();
            kind.encode(&mut out);
            let mut input = InputStream::new(out.as_bytes());
            assert_eq!(ProjectileType::decode(&mut input), Some(kind));
        }
    }

    #[test]
    fn only_rocket_explodes_on_expiry() {
        assert!(ProjectileType::Rocket.explodes_on_expiry());
        assert!(!ProjectileType::Bullet.explodes_on_expiry());
    }
}
