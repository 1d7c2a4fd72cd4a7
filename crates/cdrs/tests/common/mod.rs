use cdrs::config::ServerConfig;
use cdrs::credentials::CredentialStore;
use cdrs::datagram::run_datagram_loop;
use cdrs::registry::Registry;
use cdrs::server::ServerState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};

pub fn test_config(listen: SocketAddr, datagram: SocketAddr) -> ServerConfig {
    ServerConfig {
        listen,
        datagram,
        metrics_addr: "127.0.0.1:0".parse().unwrap(),
        max_sessions: 40,
        stale_after: 60,
        sweep_interval: 10,
        queue_depth: 256,
    }
}

pub fn test_credentials() -> CredentialStore {
    CredentialStore::from_entries(&[
        ("LAHORE", "CS", "secretX"),
        ("KARACHI", "CS", "KHI_CS_123"),
        ("CHINIOT", "CS", "CH_CS_123"),
    ])
}

/// Addresses of a running test server.
pub struct TestServer {
    pub tcp: SocketAddr,
    pub udp: SocketAddr,
    #[allow(dead_code)]
    pub state: Arc<ServerState>,
}

async fn spawn_server(config_of: impl FnOnce(SocketAddr, SocketAddr) -> ServerConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let tcp = listener.local_addr().unwrap();
    let udp_socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
    let udp = udp_socket.local_addr().unwrap();

    let config = config_of(tcp, udp);
    let state = Arc::new(ServerState {
        registry: Registry::new(config.max_sessions),
        credentials: test_credentials(),
        config,
    });

    let datagram_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = run_datagram_loop(udp_socket, datagram_state).await {
            eprintln!("datagram loop error in test: {e}");
        }
    });

    let server_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = cdrs::run(listener, server_state).await {
            eprintln!("server error in test: {e}");
        }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer { tcp, udp, state }
}

pub async fn start_server() -> TestServer {
    spawn_server(test_config).await
}

#[allow(dead_code)]
pub async fn start_server_with_params(
    max_sessions: usize,
    stale_after: u64,
    sweep_interval: u64,
) -> TestServer {
    spawn_server(move |tcp, udp| {
        let mut config = test_config(tcp, udp);
        config.max_sessions = max_sessions;
        config.stale_after = stale_after;
        config.sweep_interval = sweep_interval;
        config
    })
    .await
}

/// Stream-side test endpoint speaking the raw text protocol. Each
/// send is one logical message; each recv is one read.
pub struct TestClient {
    stream: TcpStream,
}

impl TestClient {
    pub async fn connect(addr: &SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self { stream }
    }

    /// Connects and authenticates, asserting `AUTH_OK`.
    #[allow(dead_code)]
    pub async fn connect_authed(addr: &SocketAddr, campus: &str, dept: &str, pass: &str) -> Self {
        let mut client = Self::connect(addr).await;
        let reply = client
            .request(&format!("CAMPUS:{campus};DEPT:{dept};PASS:{pass}"))
            .await;
        assert_eq!(reply, "AUTH_OK\n", "auth failed for {campus}-{dept}");
        client
    }

    pub async fn send(&mut self, text: &str) {
        self.stream.write_all(text.as_bytes()).await.unwrap();
    }

    pub async fn recv(&mut self) -> String {
        self.recv_timeout(Duration::from_secs(5))
            .await
            .expect("timeout waiting for reply")
    }

    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<String> {
        let mut buf = vec![0u8; 2048];
        let n = tokio::time::timeout(timeout, self.stream.read(&mut buf))
            .await
            .ok()?
            .unwrap();
        (n > 0).then(|| String::from_utf8_lossy(&buf[..n]).into_owned())
    }

    pub async fn request(&mut self, text: &str) -> String {
        self.send(text).await;
        self.recv().await
    }
}

/// Datagram-side test endpoint, used both as a heartbeating client
/// socket and as the admin tool.
pub struct UdpClient {
    socket: UdpSocket,
    server: SocketAddr,
}

impl UdpClient {
    pub async fn bind(server: SocketAddr) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        Self { socket, server }
    }

    /// Local port, for declaring in heartbeats.
    #[allow(dead_code)]
    pub fn port(&self) -> u16 {
        self.socket.local_addr().unwrap().port()
    }

    pub async fn send(&self, text: &str) {
        self.socket
            .send_to(text.as_bytes(), self.server)
            .await
            .unwrap();
    }

    pub async fn recv(&self) -> String {
        self.recv_timeout(Duration::from_secs(5))
            .await
            .expect("timeout waiting for datagram")
    }

    pub async fn recv_timeout(&self, timeout: Duration) -> Option<String> {
        let mut buf = vec![0u8; 4096];
        let (n, _) = tokio::time::timeout(timeout, self.socket.recv_from(&mut buf))
            .await
            .ok()?
            .unwrap();
        Some(String::from_utf8_lossy(&buf[..n]).into_owned())
    }

    pub async fn request(&self, text: &str) -> String {
        self.send(text).await;
        self.recv().await
    }
}
