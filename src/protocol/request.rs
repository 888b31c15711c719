//! Text request parsing
//!
//! Requests are tokenized line by line: a request line
//! (`VERB URI RTSP/x.y`), `Name: value` headers in any order, a blank line,
//! and an optional body sized by `Content-Length`. Each verb then validates
//! the fields it needs and yields a typed [`Command`]. Anything that does
//! not validate is reported as malformed so the caller can drop it without
//! answering.

use bytes::Bytes;

use super::constants::*;
use crate::error::ProtocolError;

/// Supported request verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Options,
    Announce,
    Setup,
    Record,
    Describe,
    Play,
}

impl Method {
    /// All verbs, in prefix-match order
    pub const ALL: [Method; 6] = [
        Method::Options,
        Method::Announce,
        Method::Setup,
        Method::Record,
        Method::Describe,
        Method::Play,
    ];

    /// Wire name of the verb
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Options => METHOD_OPTIONS,
            Method::Announce => METHOD_ANNOUNCE,
            Method::Setup => METHOD_SETUP,
            Method::Record => METHOD_RECORD,
            Method::Describe => METHOD_DESCRIBE,
            Method::Play => METHOD_PLAY,
        }
    }

    /// Match the start of a buffer against the known verbs
    pub fn from_prefix(buf: &[u8]) -> Option<Method> {
        Self::ALL
            .into_iter()
            .find(|method| buf.starts_with(method.as_str().as_bytes()))
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Capability query; names the channel the client is interested in
    Options { channel: String, cseq: String },
    /// Pusher publishes its media description
    Announce {
        channel: Option<String>,
        cseq: String,
        description: Bytes,
    },
    /// Transport negotiation, echoed back verbatim
    Setup { cseq: String, transport: String },
    /// Pusher is about to start sending frames
    Record { cseq: String },
    /// Player asks for a channel's media description
    Describe { channel: String, cseq: String },
    /// Player is ready to receive frames
    Play { channel: Option<String>, cseq: String },
}

impl Command {
    /// Verb of this command
    pub fn method(&self) -> Method {
        match self {
            Command::Options { .. } => Method::Options,
            Command::Announce { .. } => Method::Announce,
            Command::Setup { .. } => Method::Setup,
            Command::Record { .. } => Method::Record,
            Command::Describe { .. } => Method::Describe,
            Command::Play { .. } => Method::Play,
        }
    }

    /// Sequence number echoed in the response
    pub fn cseq(&self) -> &str {
        match self {
            Command::Options { cseq, .. }
            | Command::Announce { cseq, .. }
            | Command::Setup { cseq, .. }
            | Command::Record { cseq }
            | Command::Describe { cseq, .. }
            | Command::Play { cseq, .. } => cseq,
        }
    }
}

/// Outcome of parsing the front of a buffer
#[derive(Debug)]
pub enum ParseOutcome {
    /// A complete, valid command occupying `consumed` bytes
    Command { command: Command, consumed: usize },
    /// The buffer starts with a verb but the request is not complete yet
    Incomplete,
    /// A complete request occupying `consumed` bytes that failed validation
    Malformed {
        consumed: usize,
        error: ProtocolError,
    },
    /// The buffer does not start with a known verb
    Unrecognized,
}

/// Parse one request from the front of `buf`
pub fn parse(buf: &[u8]) -> ParseOutcome {
    let Some(method) = Method::from_prefix(buf) else {
        // A read boundary can fall inside the verb itself
        let partial_verb = Method::ALL
            .iter()
            .any(|method| method.as_str().as_bytes().starts_with(buf));
        return if partial_verb {
            ParseOutcome::Incomplete
        } else {
            ParseOutcome::Unrecognized
        };
    };

    let Some(head_len) = find_head_end(buf) else {
        return ParseOutcome::Incomplete;
    };

    let head = match std::str::from_utf8(&buf[..head_len]) {
        Ok(head) => head,
        Err(_) => {
            return ParseOutcome::Malformed {
                consumed: head_len,
                error: ProtocolError::InvalidUtf8,
            }
        }
    };

    let request = match RequestHead::parse(method, head) {
        Ok(request) => request,
        Err(error) => {
            return ParseOutcome::Malformed {
                consumed: head_len,
                error,
            }
        }
    };

    let body_len = match request.content_length() {
        Ok(len) => len.unwrap_or(0),
        Err(error) => {
            return ParseOutcome::Malformed {
                consumed: head_len,
                error,
            }
        }
    };

    let Some(consumed) = head_len.checked_add(body_len) else {
        return ParseOutcome::Malformed {
            consumed: head_len,
            error: ProtocolError::InvalidHeader {
                name: HEADER_CONTENT_LENGTH,
                value: body_len.to_string(),
            },
        };
    };
    if buf.len() < consumed {
        return ParseOutcome::Incomplete;
    }

    match request.into_command(&buf[head_len..consumed]) {
        Ok(command) => ParseOutcome::Command { command, consumed },
        Err(error) => ParseOutcome::Malformed { consumed, error },
    }
}

/// Extract the channel name from a request URI
///
/// Accepts `rtsp://host[:port]/<channel>` and bare `/<channel>`; the channel
/// is the path after the host, without surrounding separators.
pub fn channel_from_uri(uri: &str) -> Option<String> {
    let path = match uri.strip_prefix(RTSP_SCHEME) {
        Some(rest) => &rest[rest.find('/')?..],
        None if uri.starts_with('/') => uri,
        None => return None,
    };

    let channel = path.trim_matches('/');
    if channel.is_empty() {
        None
    } else {
        Some(channel.to_string())
    }
}

/// Offset just past the blank line ending the request head
fn find_head_end(buf: &[u8]) -> Option<usize> {
    let mut line_start = 0;

    for (i, &byte) in buf.iter().enumerate() {
        if byte != b'\n' {
            continue;
        }

        let line = &buf[line_start..i];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() && line_start > 0 {
            return Some(i + 1);
        }
        line_start = i + 1;
    }

    None
}

/// Tokenized request line and headers
#[derive(Debug)]
struct RequestHead<'a> {
    method: Method,
    uri: &'a str,
    headers: Vec<(&'a str, &'a str)>,
}

impl<'a> RequestHead<'a> {
    fn parse(method: Method, head: &'a str) -> Result<Self, ProtocolError> {
        let mut lines = head.lines();

        let request_line = lines.next().unwrap_or_default();
        let mut parts = request_line.split_whitespace();
        let (verb, uri, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(verb), Some(uri), Some(version), None) => (verb, uri, version),
            _ => return Err(ProtocolError::InvalidRequestLine(request_line.to_string())),
        };

        if verb != method.as_str() || !version.starts_with("RTSP/") {
            return Err(ProtocolError::InvalidRequestLine(request_line.to_string()));
        }

        // Lines without a colon are tolerated and skipped
        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim(), value.trim()))
            .collect();

        Ok(Self {
            method,
            uri,
            headers,
        })
    }

    fn header(&self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
    }

    fn required(&self, name: &'static str) -> Result<&'a str, ProtocolError> {
        self.header(name)
            .filter(|value| !value.is_empty())
            .ok_or(ProtocolError::MissingHeader(name))
    }

    fn cseq(&self) -> Result<String, ProtocolError> {
        let value = self.required(HEADER_CSEQ)?;
        if !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProtocolError::InvalidHeader {
                name: HEADER_CSEQ,
                value: value.to_string(),
            });
        }
        Ok(value.to_string())
    }

    fn content_length(&self) -> Result<Option<usize>, ProtocolError> {
        match self.header(HEADER_CONTENT_LENGTH) {
            None => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| ProtocolError::InvalidHeader {
                    name: HEADER_CONTENT_LENGTH,
                    value: value.to_string(),
                }),
        }
    }

    fn channel(&self) -> Result<String, ProtocolError> {
        channel_from_uri(self.uri).ok_or_else(|| ProtocolError::MissingChannel(self.uri.to_string()))
    }

    fn into_command(self, body: &[u8]) -> Result<Command, ProtocolError> {
        let command = match self.method {
            Method::Options => Command::Options {
                channel: self.channel()?,
                cseq: self.cseq()?,
            },
            Method::Announce => {
                // The body is only meaningful with an explicit length
                self.required(HEADER_CONTENT_LENGTH)?;
                Command::Announce {
                    channel: channel_from_uri(self.uri),
                    cseq: self.cseq()?,
                    description: Bytes::copy_from_slice(body),
                }
            }
            Method::Setup => Command::Setup {
                cseq: self.cseq()?,
                transport: self.required(HEADER_TRANSPORT)?.to_string(),
            },
            Method::Record => Command::Record { cseq: self.cseq()? },
            Method::Describe => Command::Describe {
                channel: self.channel()?,
                cseq: self.cseq()?,
            },
            Method::Play => Command::Play {
                channel: channel_from_uri(self.uri),
                cseq: self.cseq()?,
            },
        };

        Ok(command)
    }
}
