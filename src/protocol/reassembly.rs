//! Read reassembly across transport boundaries
//!
//! A transport read can end anywhere: in the middle of a request header,
//! inside an ANNOUNCE body, or halfway through an interleaved frame. The
//! reassembler keeps whatever the previous dispatch left undigested and
//! glues it in front of the next chunk. It makes no framing decisions.

use bytes::BytesMut;

/// Per-connection remainder buffer
///
/// Owned by the connection's read loop; never shared.
#[derive(Debug, Default)]
pub struct Reassembler {
    remainder: BytesMut,
}

impl Reassembler {
    /// Create an empty reassembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Combine the remainder with freshly read bytes
    ///
    /// The remainder is consumed: after this call it is empty until the
    /// dispatcher hands a tail back through [`Reassembler::keep`].
    pub fn feed(&mut self, chunk: &[u8]) -> BytesMut {
        let mut usable = std::mem::take(&mut self.remainder);
        usable.extend_from_slice(chunk);
        usable
    }

    /// Retain an undigested tail for the next read
    pub fn keep(&mut self, rest: BytesMut) {
        self.remainder = rest;
    }

    /// Number of bytes waiting for the next read
    pub fn pending(&self) -> usize {
        self.remainder.len()
    }

    /// Check if nothing is retained
    pub fn is_empty(&self) -> bool {
        self.remainder.is_empty()
    }
}
