//! Interleaved binary frame demultiplexer
//!
//! Once a pusher has completed RECORD, everything it sends is a sequence of
//! interleaved frames:
//!
//! ```text
//! +--------+---------+----------------+-------------------+
//! | marker | channel | length (i16 BE)| payload (length)  |
//! +--------+---------+----------------+-------------------+
//!    1 B      1 B          2 B             0..=20000 B
//! ```
//!
//! The demultiplexer works on the reassembled buffer in place: complete
//! frames are split off the front, an incomplete tail stays behind as the
//! remainder, and a length outside `0..=20000` throws the rest of the
//! buffer away so the stream can resync on a later read.

use bytes::{BufMut, Bytes, BytesMut};

use super::constants::{CONTROL_FRAME_TYPES, FRAME_HEADER_LEN, MAX_FRAME_PAYLOAD};

/// Marker byte written in front of interleaved frames
pub const FRAME_MARKER: u8 = b'$';

/// Result of one demultiplexing pass
#[derive(Debug, Default)]
pub struct Demuxed {
    /// Complete frames, back to back, ready to relay as one unit
    pub relay: Option<Bytes>,
    /// Number of complete frames in `relay`
    pub frames: usize,
    /// Number of those frames carrying a control type (200..=207)
    pub control_frames: usize,
    /// Bytes dropped because a frame length was out of bounds
    pub discarded: usize,
}

/// Split complete frames off the front of `buf`
///
/// On return `buf` holds only the bytes that must be retained for the next
/// read (possibly none).
pub fn demux(buf: &mut BytesMut) -> Demuxed {
    let mut result = Demuxed::default();
    let mut offset = 0;

    loop {
        let rest = &buf[offset..];
        if rest.len() < FRAME_HEADER_LEN {
            break;
        }

        let length = i16::from_be_bytes([rest[2], rest[3]]);
        if !(0..=MAX_FRAME_PAYLOAD).contains(&length) {
            result.discarded = rest.len();
            tracing::debug!(
                length = length,
                discarded = result.discarded,
                "Corrupt frame length, discarding buffer"
            );
            break;
        }

        let total = FRAME_HEADER_LEN + length as usize;
        if total > rest.len() {
            break;
        }

        let channel = rest[1];
        if CONTROL_FRAME_TYPES.contains(&channel) {
            result.control_frames += 1;
            tracing::debug!(channel = channel, length = length, "Control frame");
        }

        result.frames += 1;
        offset += total;
    }

    if offset > 0 {
        result.relay = Some(buf.split_to(offset).freeze());
    }
    if result.discarded > 0 {
        buf.clear();
    }

    result
}

/// Build a single interleaved frame
///
/// `payload` must fit the length field (at most 20000 bytes).
pub fn encode_frame(channel: u8, payload: &[u8]) -> Bytes {
    debug_assert!(
        payload.len() <= MAX_FRAME_PAYLOAD as usize,
        "interleaved payload of {} bytes exceeds {}",
        payload.len(),
        MAX_FRAME_PAYLOAD
    );

    let mut frame = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.put_u8(FRAME_MARKER);
    frame.put_u8(channel);
    frame.put_i16(payload.len() as i16);
    frame.put_slice(payload);
    frame.freeze()
}
