//! Binary wire codec: big-endian primitive encoding plus the stream family
//! (`OutputStream`, `InputStream`, `CountStream`) every wire type is encoded
//! through.

pub mod delta;
mod stream;
mod wire;

pub use delta::Delta;
pub use stream::{ByteSink, CountStream, InputStream, OutputStream};
pub use wire::{Decode, Encode};
