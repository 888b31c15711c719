//! Per-connection handler
//!
//! Manages the lifecycle of a single connection:
//! 1. Read loop with reassembly across reads
//! 2. Text requests until the handshake completes
//! 3. Interleaved frames (pushers after RECORD) fed to the relay queue
//! 4. Close cascade: registry and player-set cleanup

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{ProtocolError, Result};
use crate::protocol::interleaved;
use crate::protocol::request::{self, Command, ParseOutcome};
use crate::protocol::Response;
use crate::registry::{ChannelEntry, ChannelRegistry, Player};
use crate::relay::{Relay, RelayCommand, RelayStats};
use crate::server::config::ServerConfig;
use crate::session::{PeerWriter, Role, SessionState};

/// Pusher-only state held by the owning connection
struct Publishing {
    entry: Arc<ChannelEntry>,
    /// Taken when the relay task starts, so it starts at most once
    relay_rx: Option<mpsc::Receiver<RelayCommand>>,
    relay: Option<JoinHandle<RelayStats>>,
}

/// Per-connection handler
pub struct Connection<R> {
    /// Session state
    state: SessionState,

    /// Read half of the transport
    reader: R,

    /// Write half, shared with relay tasks once this is a player
    writer: PeerWriter,

    /// Server configuration
    config: ServerConfig,

    /// Channel registry
    registry: Arc<ChannelRegistry>,

    /// Set once an ANNOUNCE is accepted
    publishing: Option<Publishing>,
}

impl Connection<OwnedReadHalf> {
    /// Create a handler for an accepted TCP connection
    pub fn from_socket(
        socket: TcpStream,
        peer_addr: SocketAddr,
        config: ServerConfig,
        registry: Arc<ChannelRegistry>,
    ) -> Self {
        let (read_half, write_half) = socket.into_split();

        Self::new(
            SessionState::new(peer_addr.to_string()),
            read_half,
            PeerWriter::new(write_half),
            config,
            registry,
        )
    }
}

impl<R: AsyncRead + Unpin> Connection<R> {
    /// Create a handler over an arbitrary transport
    pub fn new(
        state: SessionState,
        reader: R,
        writer: PeerWriter,
        config: ServerConfig,
        registry: Arc<ChannelRegistry>,
    ) -> Self {
        Self {
            state,
            reader,
            writer,
            config,
            registry,
            publishing: None,
        }
    }

    /// Get the session state
    pub fn session(&self) -> &SessionState {
        &self.state
    }

    /// Run the connection until the peer disconnects or a transport error
    ///
    /// The close cascade runs on every exit path.
    pub async fn run(&mut self) -> Result<()> {
        let result = self.read_loop().await;
        self.close().await;
        result
    }

    async fn read_loop(&mut self) -> Result<()> {
        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];

        loop {
            let n = self.reader.read(&mut buf).await?;
            if n == 0 {
                return Ok(()); // Connection closed
            }

            self.state.add_bytes_received(n);
            let input = self.state.input.feed(&buf[..n]);
            self.dispatch(input).await?;
        }
    }

    /// Handle reassembled input
    ///
    /// Returns an error only when a response cannot be written.
    async fn dispatch(&mut self, mut input: BytesMut) -> Result<()> {
        while !input.is_empty() {
            if self.state.accepts_media() {
                self.ingest_media(input).await;
                return Ok(());
            }

            match request::parse(&input) {
                ParseOutcome::Command { command, consumed } => {
                    input.advance(consumed);
                    self.handle_command(command).await?;
                }
                ParseOutcome::Incomplete => {
                    if input.len() > self.config.max_request_size {
                        tracing::debug!(
                            session = %self.state.id,
                            error = %ProtocolError::RequestTooLarge(self.config.max_request_size),
                            "Dropping request"
                        );
                    } else {
                        self.state.input.keep(input);
                    }
                    return Ok(());
                }
                ParseOutcome::Malformed { consumed, error } => {
                    tracing::debug!(session = %self.state.id, error = %error, "Dropping malformed request");
                    input.advance(consumed);
                }
                ParseOutcome::Unrecognized => {
                    tracing::debug!(
                        session = %self.state.id,
                        bytes = input.len(),
                        "Dropping unrecognized input"
                    );
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    /// Split complete frames off the input and queue them for relay
    async fn ingest_media(&mut self, mut input: BytesMut) {
        let demuxed = interleaved::demux(&mut input);
        self.state.input.keep(input);

        let (Some(unit), Some(publishing)) = (demuxed.relay, &self.publishing) else {
            return;
        };

        // Waits while the queue is full; the relay task is the only consumer
        if !publishing.entry.enqueue(unit).await {
            tracing::debug!(session = %self.state.id, "Relay queue closed, dropping frames");
        }
    }

    async fn handle_command(&mut self, command: Command) -> Result<()> {
        tracing::debug!(
            session = %self.state.id,
            peer = %self.state.peer_addr,
            method = %command.method(),
            cseq = %command.cseq(),
            "Request"
        );
        self.state.on_command();

        let response = match command {
            Command::Options { channel, cseq } => {
                self.state.set_channel(channel);
                Some(Response::Options { cseq })
            }
            Command::Announce {
                channel,
                cseq,
                description,
            } => self.on_announce(channel, cseq, description).await,
            Command::Setup { cseq, transport } => Some(Response::Setup { cseq, transport }),
            Command::Record { cseq } => {
                self.on_record();
                Some(Response::Record { cseq })
            }
            Command::Describe { channel, cseq } => self.on_describe(channel, cseq).await,
            Command::Play { channel, cseq } => return self.on_play(channel, cseq).await,
        };

        match response {
            Some(response) => self.send(response).await,
            None => Ok(()),
        }
    }

    async fn on_announce(
        &mut self,
        channel: Option<String>,
        cseq: String,
        description: Bytes,
    ) -> Option<Response> {
        if self.state.role != Role::Unset {
            tracing::debug!(session = %self.state.id, role = ?self.state.role, "ANNOUNCE ignored, role already set");
            return None;
        }

        let Some(channel) = channel.or_else(|| self.state.channel.clone()) else {
            tracing::debug!(session = %self.state.id, "ANNOUNCE ignored, no channel");
            return None;
        };

        let (entry, relay_rx) = ChannelEntry::new(
            &channel,
            &self.state.id,
            &self.state.peer_addr,
            description,
            self.config.queue_capacity,
        );
        let entry = Arc::new(entry);

        // A rejected ANNOUNCE gets no response at all
        if let Err(e) = self.registry.register(Arc::clone(&entry)).await {
            tracing::debug!(session = %self.state.id, error = %e, "ANNOUNCE ignored");
            return None;
        }

        self.state.set_channel(channel);
        self.state.assign_role(Role::Pusher);
        self.publishing = Some(Publishing {
            entry,
            relay_rx: Some(relay_rx),
            relay: None,
        });

        // RECORD already arrived: frames may follow right behind this request
        if self.state.is_ready() {
            self.start_relay();
        }

        Some(Response::Announce { cseq })
    }

    fn on_record(&mut self) {
        self.state.mark_ready();
        self.start_relay();
    }

    /// Spawn the relay task once both ANNOUNCE and RECORD have been handled
    ///
    /// Only this connection's task calls it, so the start needs no lock.
    fn start_relay(&mut self) {
        let Some(publishing) = self.publishing.as_mut() else {
            return;
        };
        let Some(relay_rx) = publishing.relay_rx.take() else {
            return;
        };

        let relay = Relay::new(Arc::clone(&publishing.entry), relay_rx, self.config.frame_buffer);
        publishing.relay = Some(relay.spawn());

        tracing::info!(
            session = %self.state.id,
            peer = %self.state.peer_addr,
            channel = %publishing.entry.channel,
            "Start push"
        );
    }

    async fn on_describe(&mut self, channel: String, cseq: String) -> Option<Response> {
        let entry = self.registry.get(&channel).await;

        if self.state.assign_role(Role::Player) {
            self.state.set_channel(channel);
        }

        // No pusher, no response
        let entry = entry?;

        Some(Response::Describe {
            cseq,
            description: entry.description().clone(),
        })
    }

    /// Answer PLAY, then attach to the pusher
    ///
    /// The response goes out before the player joins the fan-out, so no
    /// frame can reach the client ahead of it.
    async fn on_play(&mut self, channel: Option<String>, cseq: String) -> Result<()> {
        if !self.state.assign_role(Role::Player) {
            tracing::debug!(session = %self.state.id, "PLAY ignored, connection is a pusher");
            return Ok(());
        }

        self.state.mark_ready();
        if self.state.channel.is_none() {
            self.state.channel = channel;
        }

        self.send(Response::Play { cseq }).await?;

        if let Some(channel) = self.state.channel.as_deref() {
            let player = Player::new(&self.state.id, &self.state.peer_addr, self.writer.clone());
            match self.registry.attach_player(channel, player).await {
                Ok(()) => tracing::info!(
                    session = %self.state.id,
                    peer = %self.state.peer_addr,
                    channel = %channel,
                    "Start pull"
                ),
                Err(e) => tracing::debug!(session = %self.state.id, error = %e, "Player not attached"),
            }
        }

        Ok(())
    }

    async fn send(&mut self, response: Response) -> Result<()> {
        let data = response.encode(&self.state.id);
        self.writer.send(&data).await?;
        Ok(())
    }

    /// Tear down registry state owned by this connection
    async fn close(&mut self) {
        if !self.state.close() {
            return;
        }

        let _ = self.writer.shutdown().await;

        match self.state.role {
            Role::Player => {
                self.registry.detach_player(&self.state.peer_addr).await;
                tracing::info!(
                    session = %self.state.id,
                    peer = %self.state.peer_addr,
                    channel = ?self.state.channel,
                    "Stop pull"
                );
            }
            Role::Pusher => {
                if let Some(publishing) = self.publishing.take() {
                    if publishing.relay.is_some() {
                        publishing.entry.shutdown().await;
                    }
                    self.registry
                        .unregister(&publishing.entry.channel, &self.state.id)
                        .await;
                    tracing::info!(
                        session = %self.state.id,
                        peer = %self.state.peer_addr,
                        channel = %publishing.entry.channel,
                        "Stop push"
                    );
                }
            }
            Role::Unset => {}
        }

        tracing::debug!(
            session = %self.state.id,
            bytes_received = self.state.bytes_received,
            duration_ms = self.state.duration().as_millis() as u64,
            "Session closed"
        );
    }
}
