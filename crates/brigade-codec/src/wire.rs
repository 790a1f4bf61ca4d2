use crate::stream::{ByteSink, InputStream};

/// Maximum element count a length-prefixed sequence can declare; writers
/// truncate to this rather than overflow the 16-bit length prefix.
pub const MAX_SEQUENCE_LEN: usize = u16::MAX as usize;

/// Encodes a value onto any [`ByteSink`] — a real [`crate::OutputStream`] or
/// a size-only [`crate::CountStream`].
pub trait Encode {
    fn encode<S: ByteSink>(&self, out: &mut S);
}

/// Decodes a value from an [`InputStream`]. Returns `None` and leaves the
/// stream invalidated on any short read or out-of-range value; callers check
/// `input.valid()` once after decoding a whole message.
pub trait Decode: Sized {
    fn decode(input: &mut InputStream) -> Option<Self>;
}

macro_rules! impl_int {
    ($($t:ty),+ $(,)?) => {
        $(
            impl Encode for $t {
                fn encode<S: ByteSink>(&self, out: &mut S) {
                    out.write_bytes(&self.to_be_bytes());
                }
            }

            impl Decode for $t {
                fn decode(input: &mut InputStream) -> Option<Self> {
                    const N: usize = std::mem::size_of::<$t>();
                    let bytes = input.read_bytes(N)?;
                    let mut buf = [0u8; N];
                    buf.copy_from_slice(bytes);
                    Some(<$t>::from_be_bytes(buf))
                }
            }
        )+
    };
}

impl_int!(u8, u16, u32, u64, i8, i16, i32, i64);

impl Encode for f32 {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        out.write_bytes(&self.to_be_bytes());
    }
}

impl Decode for f32 {
    fn decode(input: &mut InputStream) -> Option<Self> {
        let bytes = input.read_bytes(4)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        Some(f32::from_be_bytes(buf))
    }
}

impl Encode for f64 {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        out.write_bytes(&self.to_be_bytes());
    }
}

impl Decode for f64 {
    fn decode(input: &mut InputStream) -> Option<Self> {
        let bytes = input.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Some(f64::from_be_bytes(buf))
    }
}

impl Encode for bool {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        out.write_u8(if *self { 1 } else { 0 });
    }
}

impl Decode for bool {
    fn decode(input: &mut InputStream) -> Option<Self> {
        match input.read_u8()? {
            0 => Some(false),
            1 => Some(true),
            _ => {
                input.invalidate();
                None
            }
        }
    }
}

fn truncated_len(len: usize) -> u16 {
    len.min(MAX_SEQUENCE_LEN) as u16
}

impl Encode for String {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        let len = truncated_len(self.len());
        len.encode(out);
        out.write_bytes(&self.as_bytes()[..len as usize]);
    }
}

impl Decode for String {
    fn decode(input: &mut InputStream) -> Option<Self> {
        let len = u16::decode(input)? as usize;
        let bytes = input.read_bytes(len)?;
        match std::str::from_utf8(bytes) {
            Ok(s) => Some(s.to_owned()),
            Err(_) => {
                input.invalidate();
                None
            }
        }
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        match self {
            Some(value) => {
                true.encode(out);
                value.encode(out);
            }
            None => false.encode(out),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(input: &mut InputStream) -> Option<Self> {
        if bool::decode(input)? {
            Some(T::decode(input).map(Some)?)
        } else {
            Some(None)
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        let len = truncated_len(self.len());
        len.encode(out);
        for item in self.iter().take(len as usize) {
            item.encode(out);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(input: &mut InputStream) -> Option<Self> {
        let len = u16::decode(input)? as usize;
        let mut items = Vec::with_capacity(len.min(4096));
        for _ in 0..len {
            items.push(T::decode(input)?);
        }
        Some(items)
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode<S: ByteSink>(&self, out: &mut S) {
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: Decode, const N: usize> Decode for [T; N] {
    fn decode(input: &mut InputStream) -> Option<Self> {
        // No `MaybeUninit` dance: N is always small (tile matrices, fixed
        // arrays in message bodies), so a Vec round-trip is cheap and safe.
        let mut items = Vec::with_capacity(N);
        for _ in 0..N {
            items.push(T::decode(input)?);
        }
        items.try_into().ok().or_else(|| {
            input.invalidate();
            None
        })
    }
}

macro_rules! impl_tuple {
    ($($name:ident),+) => {
        impl<$($name: Encode),+> Encode for ($($name,)+) {
            #[allow(non_snake_case)]
            fn encode<S: ByteSink>(&self, out: &mut S) {
                let ($($name,)+) = self;
                $($name.encode(out);)+
            }
        }

        impl<$($name: Decode),+> Decode for ($($name,)+) {
            fn decode(input: &mut InputStream) -> Option<Self> {
                Some(($($name::decode(input)?,)+))
            }
        }
    };
}

impl_tuple!(A);
impl_tuple!(A, B);
impl_tuple!(A, B, C);
impl_tuple!(A, B, C, D);
impl_tuple!(A, B, C, D, E);
impl_tuple!(A, B, C, D, E, F);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OutputStream;

    fn roundtrip<T: Encode + Decode + PartialEq + std::fmt::Debug>(value: T) {
        let mut out = OutputStream::new();
        value.encode(&mut out);
        let mut input = InputStream::new(out.as_bytes());
        let decoded = T::decode(&mut input).expect("decode");
        assert!(input.valid());
        assert_eq!(value, decoded);
    }

    #[test]
    fn integers_roundtrip() {
        roundtrip(0u8);
        roundtrip(255u8);
        roundtrip(12345u16);
        roundtrip(-1i32);
        roundtrip(u32::MAX);
        roundtrip(i64::MIN);
    }

    #[test]
    fn floats_roundtrip() {
        roundtrip(1.5f32);
        roundtrip(-2.25f64);
    }

    #[test]
    fn string_roundtrip() {
        roundtrip("hello world".to_owned());
        roundtrip(String::new());
    }

    #[test]
    fn option_roundtrip() {
        roundtrip(Some(42u32));
        roundtrip(None::<u32>);
    }

    #[test]
    fn vec_roundtrip() {
        roundtrip(vec![1i32, 2, 3, -4]);
        roundtrip(Vec::<u8>::new());
    }

    #[test]
    fn fixed_array_roundtrip() {
        roundtrip([1u8, 2, 3, 4]);
    }

    #[test]
    fn tuple_roundtrip() {
        roundtrip((1u8, "x".to_owned(), -5i32));
    }

    #[test]
    fn short_read_invalidates_stream() {
        let mut input = InputStream::new(&[0, 1]);
        let decoded = u32::decode(&mut input);
        assert!(decoded.is_none());
        assert!(!input.valid());
    }

    #[test]
    fn bytes_written_into_fresh_and_reused_buffer_are_identical() {
        let value = (7u16, "abc".to_owned(), vec![1u8, 2, 3]);
        let mut fresh = OutputStream::new();
        value.encode(&mut fresh);

        let mut reused = OutputStream::with_capacity(64);
        value.encode(&mut reused);

        assert_eq!(fresh.as_bytes(), reused.as_bytes());
    }

    #[test]
    fn count_stream_matches_output_stream_len() {
        let value = (7u16, "abcdef".to_owned(), vec![1u8, 2, 3, 4]);
        let mut out = OutputStream::new();
        value.encode(&mut out);

        let mut count = crate::CountStream::new();
        value.encode(&mut count);

        assert_eq!(out.len(), count.size());
    }

    #[test]
    fn long_sequence_truncated_on_write() {
        let long: Vec<u8> = (0..100_000u32).map(|i| i as u8).collect();
        let mut out = OutputStream::new();
        long.encode(&mut out);
        let mut input = InputStream::new(out.as_bytes());
        let decoded: Vec<u8> = Decode::decode(&mut input).unwrap();
        assert_eq!(decoded.len(), MAX_SEQUENCE_LEN);
    }
}
