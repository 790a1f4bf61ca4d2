use crate::Vec2;
use brigade_codec::{ByteSink, Decode, Encode, InputStream};

/// Ratio beyond which a diagonal input is also considered to move along the
/// other axis; `sqrt(2) - 1`.
const DIAGONAL_RATIO: f32 = 0.414_213_57;

/// An 8-bit movement/aim bitfield. Opposing bits may be set simultaneously;
/// that is interpreted as neutral on that axis by movement code, not as an
/// encoding error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Direction(u8);

impl Direction {
    pub const NONE: Self = Self(0);
    pub const LEFT: Self = Self(1 << 0);
    pub const RIGHT: Self = Self(1 << 1);
    pub const UP: Self = Self(1 << 2);
    pub const DOWN: Self = Self(1 << 3);

    const ALL_BITS: u8 = Self::LEFT.0 | Self::RIGHT.0 | Self::UP.0 | Self::DOWN.0;

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL_BITS == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn left(self) -> bool {
        self.contains(Self::LEFT)
    }

    pub fn right(self) -> bool {
        self.contains(Self::RIGHT)
    }

    pub fn up(self) -> bool {
        self.contains(Self::UP)
    }

    pub fn down(self) -> bool {
        self.contains(Self::DOWN)
    }

    /// Horizontal step this direction implies: -1, 0, or 1.
    pub fn dx(self) -> i16 {
        match (self.left(), self.right()) {
            (true, false) => -1,
            (false, true) => 1,
            _ => 0,
        }
    }

    /// Vertical step this direction implies: -1, 0, or 1.
    pub fn dy(self) -> i16 {
        match (self.up(), self.down()) {
            (true, false) => -1,
            (false, true) => 1,
            _ => 0,
        }
    }

    pub fn to_step(self) -> Vec2 {
        Vec2::new(self.dx(), self.dy())
    }

    pub fn opposite(self) -> Self {
        let mut out = Self::NONE;
        if self.left() {
            out |= Self::RIGHT;
        }
        if self.right() {
            out |= Self::LEFT;
        }
        if self.up() {
            out |= Self::DOWN;
        }
        if self.down() {
            out |= Self::UP;
        }
        out
    }

    /// Derives a direction bitfield from a continuous offset the way an aim
    /// vector or a facing difference would: cardinal components set when
    /// they dominate by more than the diagonal ratio.
    pub fn from_offset(diff_x: f32, diff_y: f32) -> Self {
        let mut out = Self::NONE;
        if diff_y != 0.0 && (diff_x / diff_y).abs() > DIAGONAL_RATIO {
            out |= if diff_x < 0.0 { Self::LEFT } else { Self::RIGHT };
        }
        if diff_x != 0.0 && (diff_y / diff_x).abs() > DIAGONAL_RATIO {
            out |= if diff_y < 0.0 { Self::UP } else { Self::DOWN };
        }
        if diff_x == 0.0 && diff_y == 0.0 {
            return out;
        }
        if diff_x == 0.0 {
            out |= if diff_y < 0.0 { Self::UP } else { Self::DOWN };
        }
        if diff_y == 0.0 {
            out |= if diff_x < 0.0 { Self::LEFT } else { Self::RIGHT };
        }
        out
    }
}

impl std::ops::BitOr for Direction {
    type Output = Direction;

    fn bitor(self, rhs: Direction) -> Direction {
        Direction(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Direction {
    fn bitor_assign(&mut self, rhs: Direction) {
        self.0 |= rhs.0;
    }
}

impl Encode for Direction {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        self.0.encode(out);
    }
}

impl Decode for Direction {
    fn decode(input: &mut InputStream) -> Option<Self> {
        let bits = u8::decode(input)?;
        match Self::from_bits(bits) {
            Some(dir) => Some(dir),
            None => {
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
    fn roundtrip() {
        let dir = Direction::LEFT | Direction::UP;
        let mut out = OutputStream::new();
        dir.encode(&mut out);
        let mut input = InputStream::new(out.as_bytes());
        assert_eq!(Direction::decode(&mut input), Some(dir));
    }

    #[test]
    fn invalid_bits_invalidate_stream() {
        let mut input = InputStream::new(&[0b1111_0000]);
        assert_eq!(Direction::decode(&mut input), None);
        assert!(!input.valid());
    }

    #[test]
    fn opposing_bits_both_set_is_allowed() {
        let dir = Direction::LEFT | Direction::RIGHT;
        assert!(dir.left() && dir.right());
        assert_eq!(dir.dx(), 0);
    }

    #[test]
    fn to_step_matches_single_bit() {
        assert_eq!(Direction::RIGHT.to_step(), Vec2::new(1, 0));
        assert_eq!(Direction::DOWN.to_step(), Vec2::new(0, 1));
    }
}
