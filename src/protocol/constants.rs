//! Protocol constants

use std::ops::RangeInclusive;

/// Protocol version used in every status line
pub const RTSP_VERSION: &str = "RTSP/1.0";

/// URI scheme accepted in request lines
pub const RTSP_SCHEME: &str = "rtsp://";

// Verbs (request line prefix, case-sensitive)
pub const METHOD_OPTIONS: &str = "OPTIONS";
pub const METHOD_ANNOUNCE: &str = "ANNOUNCE";
pub const METHOD_SETUP: &str = "SETUP";
pub const METHOD_RECORD: &str = "RECORD";
pub const METHOD_DESCRIBE: &str = "DESCRIBE";
pub const METHOD_PLAY: &str = "PLAY";

/// Capability list returned by OPTIONS
pub const PUBLIC_METHODS: &str = "DESCRIBE, SETUP, TEARDOWN, PLAY, PAUSE, OPTIONS, ANNOUNCE, RECORD";

// Header names
pub const HEADER_CSEQ: &str = "CSeq";
pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";
pub const HEADER_TRANSPORT: &str = "Transport";

/// Interleaved frame header: marker, channel/type, 16-bit signed length
pub const FRAME_HEADER_LEN: usize = 4;

/// Largest payload accepted in a single interleaved frame
pub const MAX_FRAME_PAYLOAD: i16 = 20000;

/// Channel/type byte values carrying session-quality control reports
pub const CONTROL_FRAME_TYPES: RangeInclusive<u8> = 200..=207;

/// Length of the random session token handed out at accept
pub const SESSION_ID_LEN: usize = 9;

/// Default listener port
pub const DEFAULT_PORT: u16 = 8554;

/// Default trailing cache capacity (frames)
pub const DEFAULT_FRAME_BUFFER: usize = 60;

/// Capacity of a pusher's outgoing relay queue
pub const RELAY_QUEUE_CAPACITY: usize = 1000;

/// Size of a single transport read
pub const READ_BUFFER_SIZE: usize = 2048;

/// Largest incomplete text request kept across reads
pub const MAX_REQUEST_SIZE: usize = 64 * 1024;

/// Configuration file read by the binary when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "rtsp.json";
