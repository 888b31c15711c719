//! End-to-end push/play over real TCP connections

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use rtsp_relay::protocol::encode_frame;
use rtsp_relay::{RelayServer, ServerConfig};

struct TestServer {
    server: Arc<RelayServer>,
    addr: std::net::SocketAddr,
    task: JoinHandle<rtsp_relay::Result<()>>,
}

impl TestServer {
    async fn start(config: ServerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(RelayServer::new(config));

        let task = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.serve(listener).await })
        };

        Self { server, addr, task }
    }

    async fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).await.unwrap();
        stream.set_nodelay(true).unwrap();
        stream
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn read_response(stream: &mut TcpStream) -> String {
    let mut head = Vec::new();
    while !head.ends_with(b"\n\n") {
        head.push(stream.read_u8().await.unwrap());
    }

    let head = String::from_utf8(head).unwrap();
    let body_len = head
        .lines()
        .find_map(|line| line.strip_prefix("Content-Length: "))
        .map(|len| len.parse::<usize>().unwrap())
        .unwrap_or(0);

    let mut body = vec![0u8; body_len];
    stream.read_exact(&mut body).await.unwrap();
    head + &String::from_utf8(body).unwrap()
}

async fn request(stream: &mut TcpStream, text: &str) -> String {
    stream.write_all(text.as_bytes()).await.unwrap();
    read_response(stream).await
}

async fn push(server: &TestServer, channel: &str, sdp: &str) -> TcpStream {
    let mut pusher = server.connect().await;
    let uri = format!("rtsp://127.0.0.1/{}", channel);

    request(&mut pusher, &format!("OPTIONS {} RTSP/1.0\r\nCSeq: 1\r\n\r\n", uri)).await;
    let announce = request(
        &mut pusher,
        &format!(
            "ANNOUNCE {} RTSP/1.0\r\nCSeq: 2\r\nContent-Type: application/sdp\r\nContent-Length: {}\r\n\r\n{}",
            uri,
            sdp.len(),
            sdp
        ),
    )
    .await;
    assert!(announce.starts_with("RTSP/1.0 200 OK\nCSeq: 2\n"));

    let setup = request(
        &mut pusher,
        &format!(
            "SETUP {}/streamid=0 RTSP/1.0\r\nTransport: RTP/AVP/TCP;unicast;interleaved=0-1;mode=record\r\nCSeq: 3\r\n\r\n",
            uri
        ),
    )
    .await;
    assert!(setup.contains("Transport: RTP/AVP/TCP;unicast;interleaved=0-1;mode=record\n"));

    let record = request(&mut pusher, &format!("RECORD {} RTSP/1.0\r\nCSeq: 4\r\n\r\n", uri)).await;
    assert!(record.starts_with("RTSP/1.0 200 OK\nSession: "));

    pusher
}

async fn play(server: &TestServer, channel: &str) -> TcpStream {
    let mut player = server.connect().await;
    let uri = format!("rtsp://127.0.0.1/{}", channel);

    request(&mut player, &format!("OPTIONS {} RTSP/1.0\r\nCSeq: 1\r\n\r\n", uri)).await;
    request(&mut player, &format!("DESCRIBE {} RTSP/1.0\r\nCSeq: 2\r\n\r\n", uri)).await;
    request(
        &mut player,
        &format!(
            "SETUP {}/streamid=0 RTSP/1.0\r\nTransport: RTP/AVP/TCP;unicast;interleaved=0-1\r\nCSeq: 3\r\n\r\n",
            uri
        ),
    )
    .await;
    let registry = Arc::clone(server.server.registry());
    let attached = registry.player_count(channel).await.unwrap_or(0) + 1;

    let play = request(&mut player, &format!("PLAY {} RTSP/1.0\r\nCSeq: 4\r\n\r\n", uri)).await;
    assert!(play.contains("Range: npt=0.000-\n"));

    // The player joins the fan-out after its PLAY response
    wait_until(|| {
        let registry = Arc::clone(&registry);
        async move { registry.player_count(channel).await == Some(attached) }
    })
    .await;

    player
}

async fn send_frames(pusher: &mut TcpStream, range: std::ops::RangeInclusive<u8>) {
    for n in range {
        pusher.write_all(&encode_frame(0, &[n; 4])).await.unwrap();
    }
}

/// Read `count` 8-byte frames and return their payload tags
async fn read_frames(player: &mut TcpStream, count: usize) -> Vec<u8> {
    let mut buf = vec![0u8; count * 8];
    tokio::time::timeout(Duration::from_secs(5), player.read_exact(&mut buf))
        .await
        .expect("timed out waiting for frames")
        .unwrap();

    assert!(buf.chunks(8).all(|frame| frame[..4] == [b'$', 0, 0, 4]));
    buf.chunks(8).map(|frame| frame[4]).collect()
}

async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached");
}

#[tokio::test]
async fn test_describe_returns_announced_description() {
    let server = TestServer::start(ServerConfig::default()).await;
    let _pusher = push(&server, "cam1", "0123456789").await;

    let mut player = server.connect().await;
    let describe = request(
        &mut player,
        "DESCRIBE rtsp://127.0.0.1/cam1 RTSP/1.0\r\nCSeq: 2\r\nAccept: application/sdp\r\n\r\n",
    )
    .await;

    assert!(describe.contains("Content-Length: 10\n"));
    assert!(describe.ends_with("\n\n0123456789"));
}

#[tokio::test]
async fn test_frames_fan_out_to_all_players_in_order() {
    let server = TestServer::start(ServerConfig::default()).await;
    let mut pusher = push(&server, "cam1", "v=0").await;

    let mut p1 = play(&server, "cam1").await;
    let mut p2 = play(&server, "cam1").await;
    assert_eq!(server.server.registry().player_count("cam1").await, Some(2));

    send_frames(&mut pusher, 1..=5).await;

    assert_eq!(read_frames(&mut p1, 5).await, vec![1, 2, 3, 4, 5]);
    assert_eq!(read_frames(&mut p2, 5).await, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_late_joiner_after_backlog_flush_gets_live_frames_only() {
    let server = TestServer::start(ServerConfig::default()).await;
    let mut pusher = push(&server, "cam1", "v=0").await;
    let mut early = play(&server, "cam1").await;

    send_frames(&mut pusher, 1..=3).await;
    assert_eq!(read_frames(&mut early, 3).await, vec![1, 2, 3]);

    let mut late = play(&server, "cam1").await;
    send_frames(&mut pusher, 4..=5).await;

    assert_eq!(read_frames(&mut late, 2).await, vec![4, 5]);
    assert_eq!(read_frames(&mut early, 2).await, vec![4, 5]);
}

#[tokio::test]
async fn test_first_player_receives_cached_frames() {
    let server = TestServer::start(ServerConfig::default().frame_buffer(2)).await;
    let mut pusher = push(&server, "cam1", "v=0").await;

    // Relayed to nobody, only cached. Paced so each frame is its own unit.
    for n in 1..=3 {
        send_frames(&mut pusher, n..=n).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let mut player = play(&server, "cam1").await;
    send_frames(&mut pusher, 4..=4).await;

    assert_eq!(read_frames(&mut player, 3).await, vec![2, 3, 4]);
}

#[tokio::test]
async fn test_second_announce_for_same_channel_is_ignored() {
    let server = TestServer::start(ServerConfig::default()).await;
    let _owner = push(&server, "cam1", "first").await;

    let mut intruder = server.connect().await;
    intruder
        .write_all(b"ANNOUNCE rtsp://127.0.0.1/cam1 RTSP/1.0\r\nCSeq: 2\r\nContent-Length: 6\r\n\r\nsecond")
        .await
        .unwrap();

    let mut byte = [0u8; 1];
    let read = tokio::time::timeout(Duration::from_millis(200), intruder.read(&mut byte)).await;
    assert!(read.is_err(), "rejected ANNOUNCE must get no response");

    drop(intruder);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let entry = server.server.registry().get("cam1").await.unwrap();
    assert_eq!(&entry.description()[..], b"first");
}

#[tokio::test]
async fn test_pusher_disconnect_frees_channel() {
    let server = TestServer::start(ServerConfig::default()).await;
    let registry = Arc::clone(server.server.registry());

    let pusher = push(&server, "cam1", "v=0").await;
    assert!(registry.contains("cam1").await);

    drop(pusher);
    wait_until(|| {
        let registry = Arc::clone(&registry);
        async move { !registry.contains("cam1").await }
    })
    .await;

    let _next = push(&server, "cam1", "v=1").await;
    let entry = registry.get("cam1").await.unwrap();
    assert_eq!(&entry.description()[..], b"v=1");
}

#[tokio::test]
async fn test_player_disconnect_detaches() {
    let server = TestServer::start(ServerConfig::default()).await;
    let registry = Arc::clone(server.server.registry());

    let mut pusher = push(&server, "cam1", "v=0").await;
    let player = play(&server, "cam1").await;
    let mut staying = play(&server, "cam1").await;
    assert_eq!(registry.player_count("cam1").await, Some(2));

    drop(player);
    wait_until(|| {
        let registry = Arc::clone(&registry);
        async move { registry.player_count("cam1").await == Some(1) }
    })
    .await;

    send_frames(&mut pusher, 1..=2).await;
    assert_eq!(read_frames(&mut staying, 2).await, vec![1, 2]);
}
