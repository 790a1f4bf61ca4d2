use bytes::BytesMut;

/// Anything that can receive raw bytes during encoding. Implemented by
/// [`OutputStream`] (materializes bytes) and [`CountStream`] (only tallies
/// how many bytes would be written), so a single `Encode` impl serves both.
pub trait ByteSink {
    fn write_u8(&mut self, byte: u8);
    fn write_bytes(&mut self, bytes: &[u8]);
}

/// Append-only byte buffer with index-based replace, used to backpatch a
/// length or bitmask prefix once the body that follows it is known.
#[derive(Debug, Default, Clone)]
pub struct OutputStream {
    data: BytesMut,
}

impl OutputStream {
    pub fn new() -> Self {
        Self { data: BytesMut::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: BytesMut::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data.to_vec()
    }

    /// Overwrite `bytes.len()` bytes starting at `index`. Used to backpatch a
    /// reserved length/mask prefix after the rest of the value has been
    /// written.
    pub fn replace(&mut self, index: usize, bytes: &[u8]) {
        debug_assert!(index + bytes.len() <= self.data.len());
        self.data[index..index + bytes.len()].copy_from_slice(bytes);
    }
}

impl ByteSink for OutputStream {
    fn write_u8(&mut self, byte: u8) {
        self.data.extend_from_slice(&[byte]);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }
}

/// Measures the number of bytes a serialization would produce without
/// materializing them, for pre-sizing a send buffer.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountStream {
    size: usize,
}

impl CountStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl ByteSink for CountStream {
    fn write_u8(&mut self, _byte: u8) {
        self.size += 1;
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.size += bytes.len();
    }
}

/// Sequential reader over a borrowed byte slice with a sticky validity flag:
/// once a read fails, every subsequent read is a no-op and `valid()` stays
/// false. Callers check `valid()` once after decoding a whole message rather
/// than threading a `Result` through every field read.
pub struct InputStream<'a> {
    data: &'a [u8],
    pos: usize,
    valid: bool,
}

impl<'a> InputStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, valid: true }
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True once every byte has been consumed (independent of validity).
    pub fn eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn read_bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        if !self.valid || n > self.remaining() {
            self.invalidate();
            return None;
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Some(slice)
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        self.read_bytes(1).map(|b| b[0])
    }
}
