use brigade_codec::{ByteSink, Decode, Encode, InputStream};

/// Closed sound-event enumeration broadcast to clients for local playback.
/// Per-weapon shoot/hurt/reload sound assignments live in `brigade-data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum SoundId {
    #[default]
    None = 0,
    ShootHitscan = 1,
    ShootRocket = 2,
    ShootFlame = 3,
    ShootSticky = 4,
    ShootSyringe = 5,
    Reload = 6,
    Explosion = 7,
    Hurt = 8,
    Death = 9,
    SpyKill = 10,
    BuildSentry = 11,
    SentryFire = 12,
    HealTick = 13,
    FlagPickup = 14,
    FlagCapture = 15,
    FlagReturn = 16,
    RoundStart = 17,
    RoundEnd = 18,
}

impl SoundId {
    pub const ALL: [SoundId; 19] = [
        SoundId::None,
        SoundId::ShootHitscan,
        SoundId::ShootRocket,
        SoundId::ShootFlame,
        SoundId::ShootSticky,
        SoundId::ShootSyringe,
        SoundId::Reload,
        SoundId::Explosion,
        SoundId::Hurt,
        SoundId::Death,
        SoundId::SpyKill,
        SoundId::BuildSentry,
        SoundId::SentryFire,
        SoundId::HealTick,
        SoundId::FlagPickup,
        SoundId::FlagCapture,
        SoundId::FlagReturn,
        SoundId::RoundStart,
        SoundId::RoundEnd,
    ];
}

impl TryFrom<u8> for SoundId {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        SoundId::ALL.into_iter().find(|s| *s as u8 == value).ok_or(value)
    }
}

impl Encode for SoundId {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        (*self as u8).encode(out);
    }
}

impl Decode for SoundId {
    fn decode(input: &mut InputStream) -> Option<Self> {
        let raw = u8::decode(input)?;
        match SoundId::try_from(raw) {
            Ok(sound) => Some(sound),
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
        for sound in SoundId::ALL {
            let mut out = OutputStream::new();
            sound.encode(&mut out);
            let mut input = InputStream::new(out.as_bytes());
            assert_eq!(SoundId::decode(&mut input), Some(sound));
        }
    }

    #[test]
    fn out_of_range_invalidates() {
        let mut input = InputStream::new(&[250]);
        assert_eq!(SoundId::decode(&mut input), None);
        assert!(!input.valid());
    }
}
