//! Wire protocol
//!
//! - Text requests (OPTIONS, ANNOUNCE, SETUP, RECORD, DESCRIBE, PLAY) and
//!   their fixed response templates
//! - Interleaved binary frames sent by a pusher after RECORD
//! - Reassembly of both across arbitrary read boundaries

pub mod constants;
pub mod interleaved;
pub mod reassembly;
pub mod request;
pub mod response;

pub use interleaved::{demux, encode_frame, Demuxed};
pub use reassembly::Reassembler;
pub use request::{parse, Command, Method, ParseOutcome};
pub use response::Response;
