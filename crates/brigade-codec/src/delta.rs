use crate::stream::{ByteSink, InputStream};
use crate::wire::{Decode, Encode, MAX_SEQUENCE_LEN};

/// A value that can be serialized either as a full write or as a diff
/// against a previous value of the same type. Types with no finer
/// granularity (primitives, closed enums, ids) fall back to a full write on
/// every change; structs that want field-level diffing implement this
/// directly over their fields in a fixed, shared order — the same role the
/// original's per-struct `tie()` projection plays for its delta compressor.
pub trait Delta: Sized {
    fn delta_encode<S: ByteSink>(&self, old: &Self, out: &mut S);
    fn delta_decode(input: &mut InputStream, old: &Self) -> Option<Self>;
}

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

impl_delta_as_full_value!(bool, u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, String);

impl<T: Delta + Encode + Decode> Delta for Option<T> {
    fn delta_encode<S: ByteSink>(&self, _old: &Self, out: &mut S) {
        // Presence can flip either way between two values, so there is no
        // meaningful partial diff here; write it the same way a fresh value
        // would be written.
        self.encode(out);
    }

    fn delta_decode(input: &mut InputStream, _old: &Self) -> Option<Self> {
        Self::decode(input)
    }
}

fn truncated_len(len: usize) -> u16 {
    len.min(MAX_SEQUENCE_LEN) as u16
}

/// Delta-encodes a sequence element-by-element against the element at the
/// same index in `old`, in 8-element chunks each prefixed by a one-byte
/// "changed" mask — mirroring the original's `std::vector` delta, but
/// computed in one pass since both full vectors are already in memory (no
/// backpatch needed).
impl<T: Encode + Decode + Delta + PartialEq + Clone> Delta for Vec<T> {
    fn delta_encode<S: ByteSink>(&self, old: &Self, out: &mut S) {
        let len = truncated_len(self.len());
        len.encode(out);
        let n = len as usize;
        let mut i = 0;
        while i < n {
            let chunk_end = (i + 8).min(n);
            let mut mask: u8 = 0;
            for (bit, j) in (i..chunk_end).enumerate() {
                let changed = match old.get(j) {
                    Some(o) => self[j] != *o,
                    None => true,
                };
                if changed {
                    mask |= 1 << bit;
                }
            }
            mask.encode(out);
            for (bit, j) in (i..chunk_end).enumerate() {
                if mask & (1 << bit) != 0 {
                    match old.get(j) {
                        Some(o) => self[j].delta_encode(o, out),
                        None => self[j].encode(out),
                    }
                }
            }
            i = chunk_end;
        }
    }

    fn delta_decode(input: &mut InputStream, old: &Self) -> Option<Self> {
        let len = u16::decode(input)? as usize;
        let mut result: Vec<T> = Vec::with_capacity(len.min(4096));
        let mut i = 0;
        while i < len {
            let chunk_end = (i + 8).min(len);
            let mask = u8::decode(input)?;
            for (bit, j) in (i..chunk_end).enumerate() {
                if mask & (1 << bit) != 0 {
                    if j < old.len() {
                        result.push(T::delta_decode(input, &old[j])?);
                    } else {
                        result.push(T::decode(input)?);
                    }
                } else if j < old.len() {
                    result.push(old[j].clone());
                } else {
                    input.invalidate();
                    return None;
                }
            }
            i = chunk_end;
        }
        Some(result)
    }
}

/// Delta-encodes `new` against `old`, field by field in declaration order,
/// prefixed by a changed-field bitmask. For use on any type implementing
/// [`Delta`] via the [`delta_struct`](crate::delta_struct) macro.
pub fn encode_full<T: Encode, S: ByteSink>(value: &T, out: &mut S) {
    value.encode(out);
}

/// Declares a field-by-field [`Delta`] impl for a struct, in the style of
/// the original's `tie()`-projected delta: a changed-field bitmask followed
/// by one [`Delta::delta_encode`] per changed field, in the order listed.
/// The struct must derive `Clone` and `PartialEq`.
#[macro_export]
macro_rules! delta_struct {
    ($t:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::Delta for $t {
            fn delta_encode<S: $crate::ByteSink>(&self, old: &Self, out: &mut S) {
                let mut mask: u32 = 0;
                let mut bit = 0u32;
                $(
                    if self.$field != old.$field {
                        mask |= 1 << bit;
                    }
                    bit += 1;
                )+
                $crate::Encode::encode(&mask, out);
                let mut bit = 0u32;
                $(
                    if mask & (1 << bit) != 0 {
                        $crate::Delta::delta_encode(&self.$field, &old.$field, out);
                    }
                    bit += 1;
                )+
            }

            fn delta_decode(input: &mut $crate::InputStream, old: &Self) -> Option<Self> {
                let mask = <u32 as $crate::Decode>::decode(input)?;
                let mut result = old.clone();
                let mut bit = 0u32;
                $(
                    if mask & (1 << bit) != 0 {
                        result.$field = $crate::Delta::delta_decode(input, &old.$field)?;
                    }
                    bit += 1;
                )+
                Some(result)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CountStream, OutputStream};

    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl Encode for Point {
        fn encode<S: ByteSink>(&self, out: &mut S) {
            self.x.encode(out);
            self.y.encode(out);
        }
    }

    impl Decode for Point {
        fn decode(input: &mut InputStream) -> Option<Self> {
            Some(Point { x: i32::decode(input)?, y: i32::decode(input)? })
        }
    }

    delta_struct!(Point { x, y });

    fn delta_roundtrip<T: Delta + Clone + PartialEq + std::fmt::Debug>(old: &T, new: &T) -> T {
        let mut out = OutputStream::new();
        new.delta_encode(old, &mut out);
        let mut input = InputStream::new(out.as_bytes());
        let decoded = T::delta_decode(&mut input, old).expect("delta decode");
        assert!(input.eof());
        decoded
    }

    #[test]
    fn identical_struct_emits_zero_mask_and_round_trips() {
        let a = Point { x: 1, y: 2 };
        assert_eq!(delta_roundtrip(&a, &a), a);
    }

    #[test]
    fn only_changed_field_is_written() {
        let old = Point { x: 1, y: 2 };
        let new = Point { x: 1, y: 99 };
        assert_eq!(delta_roundtrip(&old, &new), new);

        let mut full = OutputStream::new();
        new.encode(&mut full);
        let mut delta = OutputStream::new();
        new.delta_encode(&old, &mut delta);
        assert!(delta.len() < full.len());
    }

    #[test]
    fn vec_delta_tracks_growth_and_per_element_changes() {
        let old = vec![Point { x: 0, y: 0 }, Point { x: 1, y: 1 }];
        let new = vec![Point { x: 0, y: 0 }, Point { x: 1, y: 5 }, Point { x: 9, y: 9 }];
        assert_eq!(delta_roundtrip(&old, &new), new);
    }

    #[test]
    fn vec_delta_tracks_shrinkage() {
        let old = vec![Point { x: 0, y: 0 }, Point { x: 1, y: 1 }, Point { x: 2, y: 2 }];
        let new = vec![Point { x: 0, y: 0 }];
        assert_eq!(delta_roundtrip(&old, &new), new);
    }

    #[test]
    fn zero_delta_is_cheaper_than_full_encode_for_large_unchanged_vec() {
        let v: Vec<Point> = (0..40).map(|i| Point { x: i, y: i }).collect();
        let mut full = CountStream::new();
        v.encode(&mut full);
        let mut delta = CountStream::new();
        v.delta_encode(&v, &mut delta);
        assert!(delta.size() < full.size());
    }
}
