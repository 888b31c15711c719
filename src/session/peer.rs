//! Shared connection writer
//!
//! A player's socket is written by two tasks: its own connection task
//! (responses) and the relay task of the pusher it is attached to (frames).
//! Each write takes the lock for the whole unit, so responses and frames
//! never interleave mid-message.

use std::io;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

type BoxedWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// Cloneable handle to the write half of a connection
#[derive(Clone)]
pub struct PeerWriter {
    inner: Arc<Mutex<BoxedWriter>>,
}

impl PeerWriter {
    /// Wrap a writer
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Box::pin(writer))),
        }
    }

    /// Write a whole unit and flush it
    ///
    /// No timeout is applied: a peer with a full receive window stalls the
    /// caller until it drains or the connection fails.
    pub async fn send(&self, data: &[u8]) -> io::Result<()> {
        let mut writer = self.inner.lock().await;
        writer.write_all(data).await?;
        writer.flush().await
    }

    /// Shut down the write direction
    pub async fn shutdown(&self) -> io::Result<()> {
        self.inner.lock().await.shutdown().await
    }
}

impl std::fmt::Debug for PeerWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerWriter").finish_non_exhaustive()
    }
}
