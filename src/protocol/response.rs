//! Response templates
//!
//! Every verb answers with a fixed template using `\n` line separators.
//! Header order differs between verbs and is kept as clients have seen it.

use bytes::{BufMut, Bytes, BytesMut};

use super::constants::{PUBLIC_METHODS, RTSP_VERSION};

/// A response to a successfully handled command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Options { cseq: String },
    Announce { cseq: String },
    Setup { cseq: String, transport: String },
    Record { cseq: String },
    Describe { cseq: String, description: Bytes },
    Play { cseq: String },
}

impl Response {
    /// Encode the response for the given session token
    pub fn encode(&self, session: &str) -> Bytes {
        let head = match self {
            Response::Options { cseq } => format!(
                "{RTSP_VERSION} 200 OK\nCSeq: {cseq}\nSession: {session}\nPublic: {PUBLIC_METHODS}\n\n"
            ),
            Response::Announce { cseq } => {
                format!("{RTSP_VERSION} 200 OK\nCSeq: {cseq}\nSession: {session}\n\n")
            }
            Response::Setup { cseq, transport } => format!(
                "{RTSP_VERSION} 200 OK\nCSeq: {cseq}\nSession: {session}\nTransport: {transport}\n\n"
            ),
            Response::Record { cseq } => {
                format!("{RTSP_VERSION} 200 OK\nSession: {session}\nCSeq: {cseq}\n\n")
            }
            Response::Describe { cseq, description } => format!(
                "{RTSP_VERSION} 200 OK\nSession: {session}\nContent-Length: {}\nCSeq: {cseq}\n\n",
                description.len()
            ),
            Response::Play { cseq } => format!(
                "{RTSP_VERSION} 200 OK\nSession: {session}\nRange: npt=0.000-\nCSeq: {cseq}\n\n"
            ),
        };

        match self {
            Response::Describe { description, .. } => {
                let mut buf = BytesMut::with_capacity(head.len() + description.len());
                buf.put_slice(head.as_bytes());
                buf.put_slice(description);
                buf.freeze()
            }
            _ => Bytes::from(head),
        }
    }
}
