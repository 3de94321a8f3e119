// One shared server per test binary, plus small WebSocket helpers.
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use futures::{SinkExt, StreamExt};
use starfall_server::config::ServerConfig;
use starfall_server::protocol::ServerMessage;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

pub type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

static SERVER_ADDR: OnceLock<String> = OnceLock::new();

/// Start the server once and return its `host:port`.
pub fn ensure_server() -> &'static str {
    SERVER_ADDR.get_or_init(|| {
        let published = Arc::new(OnceLock::<String>::new());
        let published_thread = Arc::clone(&published);
        // The server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_thread.set(addr.to_string());

                let config = ServerConfig {
                    tick_rate: 50,
                    seed: Some(7),
                    ..ServerConfig::default()
                };
                let game = starfall_server::build_game(&config).expect("build game");
                starfall_server::run(listener, config, game)
                    .await
                    .expect("server failed");
            });
        });
        wait_for_readiness(&published)
    })
}

fn wait_for_readiness(published: &OnceLock<String>) -> String {
    let addr = loop {
        if let Some(addr) = published.get() {
            break addr.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };
    for _ in 0..100 {
        if std::net::TcpStream::connect(&addr).is_ok() {
            return addr;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("server did not become ready in time");
}

/// Open a WebSocket as `client_id`.
pub async fn connect(client_id: &str) -> Ws {
    let url = format!("ws://{}/ws?clientId={client_id}", ensure_server());
    let (ws, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("websocket connect");
    ws
}

/// Send raw text.
pub async fn send_text(ws: &mut Ws, text: &str) {
    ws.send(Message::text(text)).await.expect("send");
}

/// Next protocol message, skipping control frames.
pub async fn next_message(ws: &mut Ws) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("server message json");
        }
    }
}

/// Read messages until one matches, discarding the rest.
pub async fn wait_for<T>(ws: &mut Ws, mut pick: impl FnMut(ServerMessage) -> Option<T>) -> T {
    for _ in 0..500 {
        if let Some(found) = pick(next_message(ws).await) {
            return found;
        }
    }
    panic!("expected message never arrived");
}
