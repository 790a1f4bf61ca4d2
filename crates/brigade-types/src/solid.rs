use brigade_codec::{ByteSink, Decode, Encode, InputStream};

/// 32-bit collision-class bitmask. Unlike the closed enums, any bit pattern
/// is a valid value, so decoding never invalidates the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct SolidFlags(pub u32);

impl SolidFlags {
    pub const NONE: SolidFlags = SolidFlags(0);
    pub const WORLD: SolidFlags = SolidFlags(1 << 0);
    pub const RED_PLAYERS: SolidFlags = SolidFlags(1 << 1);
    pub const BLUE_PLAYERS: SolidFlags = SolidFlags(1 << 2);
    pub const RED_PROJECTILES: SolidFlags = SolidFlags(1 << 3);
    pub const BLUE_PROJECTILES: SolidFlags = SolidFlags(1 << 4);
    pub const RED_EXPLOSIONS: SolidFlags = SolidFlags(1 << 5);
    pub const BLUE_EXPLOSIONS: SolidFlags = SolidFlags(1 << 6);
    pub const RED_SENTRIES: SolidFlags = SolidFlags(1 << 7);
    pub const BLUE_SENTRIES: SolidFlags = SolidFlags(1 << 8);
    pub const MEDKITS: SolidFlags = SolidFlags(1 << 9);
    pub const AMMOPACKS: SolidFlags = SolidFlags(1 << 10);
    pub const RED_FLAGS: SolidFlags = SolidFlags(1 << 11);
    pub const BLUE_FLAGS: SolidFlags = SolidFlags(1 << 12);
    pub const RED_CARTS: SolidFlags = SolidFlags(1 << 13);
    pub const BLUE_CARTS: SolidFlags = SolidFlags(1 << 14);
    pub const GENERIC: SolidFlags = SolidFlags(1 << 15);

    pub const RED_ALL: SolidFlags = SolidFlags(
        Self::RED_PLAYERS.0
            | Self::RED_PROJECTILES.0
            | Self::RED_EXPLOSIONS.0
            | Self::RED_SENTRIES.0
            | Self::RED_FLAGS.0
            | Self::RED_CARTS.0,
    );
    pub const BLUE_ALL: SolidFlags = SolidFlags(
        Self::BLUE_PLAYERS.0
            | Self::BLUE_PROJECTILES.0
            | Self::BLUE_EXPLOSIONS.0
            | Self::BLUE_SENTRIES.0
            | Self::BLUE_FLAGS.0
            | Self::BLUE_CARTS.0,
    );
    pub const ALL: SolidFlags = SolidFlags(
        Self::WORLD.0
            | Self::RED_ALL.0
            | Self::BLUE_ALL.0
            | Self::MEDKITS.0
            | Self::AMMOPACKS.0
            | Self::GENERIC.0,
    );

    pub fn contains(self, other: SolidFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: SolidFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn with(self, other: SolidFlags) -> SolidFlags {
        SolidFlags(self.0 | other.0)
    }

    pub fn without(self, other: SolidFlags) -> SolidFlags {
        SolidFlags(self.0 & !other.0)
    }
}

impl std::ops::BitOr for SolidFlags {
    type Output = SolidFlags;

    fn bitor(self, rhs: SolidFlags) -> SolidFlags {
        SolidFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for SolidFlags {
    fn bitor_assign(&mut self, rhs: SolidFlags) {
        self.0 |= rhs.0;
    }
}

impl Encode for SolidFlags {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        self.0.encode(out);
    }
}

impl Decode for SolidFlags {
    fn decode(input: &mut InputStream) -> Option<Self> {
        u32::decode(input).map(SolidFlags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brigade_codec::OutputStream;

    #[test]
    fn roundtrip() {
        let flags = SolidFlags::RED_ALL.with(SolidFlags::WORLD);
        let mut out = OutputStream::new();
        flags.encode(&mut out);
        let mut input = InputStream::new(out.as_bytes());
        assert_eq!(SolidFlags::decode(&mut input), Some(flags));
    }

    #[test]
    fn red_all_does_not_intersect_blue_all() {
        assert!(!SolidFlags::RED_ALL.intersects(SolidFlags::BLUE_ALL));
    }

    #[test]
    fn all_contains_every_named_class() {
        assert!(SolidFlags::ALL.contains(SolidFlags::RED_PLAYERS));
        assert!(SolidFlags::ALL.contains(SolidFlags::MEDKITS));
        assert!(SolidFlags::ALL.contains(SolidFlags::GENERIC));
    }

    #[test]
    fn without_clears_only_requested_bits() {
        let both = SolidFlags::RED_PLAYERS.with(SolidFlags::BLUE_PLAYERS);
        let red_only = both.without(SolidFlags::BLUE_PLAYERS);
        assert!(red_only.contains(SolidFlags::RED_PLAYERS));
        assert!(!red_only.intersects(SolidFlags::BLUE_PLAYERS));
    }
}
