use brigade_codec::{ByteSink, Decode, Encode, InputStream};

/// Closed team enumeration. Wire: one byte; values outside the range
/// invalidate the stream rather than panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum Team {
    #[default]
    None = 0,
    Red = 1,
    Blue = 2,
    Spectators = 3,
}

impl Team {
    pub const ALL: [Team; 4] = [Team::None, Team::Red, Team::Blue, Team::Spectators];

    pub fn name(self) -> &'static str {
        match self {
            Team::None => "",
            Team::Red => "RED",
            Team::Blue => "BLU",
            Team::Spectators => "Spectators",
        }
    }

    pub fn opposite(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
            Team::None | Team::Spectators => Team::Spectators,
        }
    }
}

impl TryFrom<u8> for Team {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Team::None),
            1 => Ok(Team::Red),
            2 => Ok(Team::Blue),
            3 => Ok(Team::Spectators),
            other => Err(other),
        }
    }
}

impl Encode for Team {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        (*self as u8).encode(out);
    }
}

impl Decode for Team {
    fn decode(input: &mut InputStream) -> Option<Self> {
        let raw = u8::decode(input)?;
        match Team::try_from(raw) {
            Ok(team) => Some(team),
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
        for team in Team::ALL {
            let mut out = OutputStream::new();
            team.encode(&mut out);
            let mut input = InputStream::new(out.as_bytes());
            assert_eq!(Team::decode(&mut input), Some(team));
        }
    }

    #[test]
    fn out_of_range_invalidates() {
        let mut input = InputStream::new(&[200]);
        assert_eq!(Team::decode(&mut input), None);
        assert!(!input.valid());
    }

    #[test]
    fn opposite_is_involution_for_red_blue() {
        assert_eq!(Team::Red.opposite(), Team::Blue);
        assert_eq!(Team::Blue.opposite(), Team::Red);
    }
}
