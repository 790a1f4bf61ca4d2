use brigade_codec::{ByteSink, Decode, Encode, InputStream};

/// Closed player-class enumeration. Per-class stats (max health, move
/// interval, loadout, player-count limit) live in `brigade-data`, derived
/// from a build-time table rather than hardcoded here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum PlayerClass {
    #[default]
    None = 0,
    Scout = 1,
    Soldier = 2,
    Pyro = 3,
    Demoman = 4,
    Heavy = 5,
    Engineer = 6,
    Medic = 7,
    Sniper = 8,
    Spy = 9,
    Spectator = 10,
}

impl PlayerClass {
    pub const ALL: [PlayerClass; 11] = [
        PlayerClass::None,
        PlayerClass::Scout,
        PlayerClass::Soldier,
        PlayerClass::Pyro,
        PlayerClass::Demoman,
        PlayerClass::Heavy,
        PlayerClass::Engineer,
        PlayerClass::Medic,
        PlayerClass::Sniper,
        PlayerClass::Spy,
        PlayerClass::Spectator,
    ];

    /// Blast jumps are only granted to classes that carry an explosive
    /// primary/secondary.
    pub fn can_blast_jump(self) -> bool {
        matches!(self, PlayerClass::Soldier | PlayerClass::Demoman)
    }
}

impl TryFrom<u8> for PlayerClass {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        PlayerClass::ALL
            .into_iter()
            .find(|class| *class as u8 == value)
            .ok_or(value)
    }
}

impl Encode for PlayerClass {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        (*self as u8).encode(out);
    }
}

impl Decode for PlayerClass {
    fn decode(input: &mut InputStream) -> Option<Self> {
        let raw = u8::decode(input)?;
        match PlayerClass::try_from(raw) {
            Ok(class) => Some(class),
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
        for class in PlayerClass::ALL {
            let mut out = OutputStream::new();
            class.encode(&mut out);
            let mut input = InputStream::new(out.as_bytes());
            assert_eq!(PlayerClass::decode(&mut input), Some(class));
        }
    }

    #[test]
    fn out_of_range_invalidates() {
        let mut input = InputStream::new(&[250]);
        assert_eq!(PlayerClass::decode(&mut input), None);
        assert!(!input.valid());
    }

    #[test]
    fn only_soldier_and_demoman_blast_jump() {
        assert!(PlayerClass::Soldier.can_blast_jump());
        assert!(PlayerClass::Demoman.can_blast_jump());
        assert!(!PlayerClass::Scout.can_blast_jump());
    }
}
