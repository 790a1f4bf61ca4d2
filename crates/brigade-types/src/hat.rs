use brigade_codec::{ByteSink, Decode, Encode, InputStream};

/// Closed cosmetic-hat enumeration. Purely visual; the core only needs to
/// round-trip the value through snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(u8)]
pub enum Hat {
    #[default]
    None = 0,
    PartyHat = 1,
    Fedora = 2,
    Helmet = 3,
    Beanie = 4,
}

impl Hat {
    pub const ALL: [Hat; 5] = [Hat::None, Hat::PartyHat, Hat::Fedora, Hat::Helmet, Hat::Beanie];
}

impl TryFrom<u8> for Hat {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Hat::ALL.into_iter().find(|h| *h as u8 == value).ok_or(value)
    }
}

impl Encode for Hat {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        (*self as u8).encode(out);
    }
}

impl Decode for Hat {
    fn decode(input: &mut InputStream) -> Option<Self> {
        let raw = u8::decode(input)?;
        match Hat::try_from(raw) {
            Ok(hat) => Some(hat),
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
        for hat in Hat::ALL {
            let mut out = OutputStream::new();
            hat.encode(&mut out);
            let mut input = InputStream::new(out.as_bytes());
            assert_eq!(Hat::decode(&mut input), Some(hat));
        }
    }
}
