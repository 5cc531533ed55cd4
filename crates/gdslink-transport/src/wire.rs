use std::fmt;
use std::io::{ErrorKind, Read, Write};
#[cfg(unix)]
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::tcp::{self, TcpServer};
use crate::traits::{Adapter, WireStream};
#[cfg(unix)]
use crate::uds::UnixDomainSocket;

/// Default bound on a single blocking read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);
/// Default read chunk size.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

/// Where the flight peer lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Connect to a listening flight peer over TCP.
    TcpConnect(String),
    /// Listen on TCP and accept one flight connection.
    TcpListen(String),
    /// Connect to a Unix domain socket.
    #[cfg(unix)]
    UnixConnect(PathBuf),
    /// Listen on a Unix domain socket and accept one flight connection.
    #[cfg(unix)]
    UnixListen(PathBuf),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::TcpConnect(addr) => write!(f, "tcp://{addr}"),
            Endpoint::TcpListen(addr) => write!(f, "tcp-listen://{addr}"),
            #[cfg(unix)]
            Endpoint::UnixConnect(path) => write!(f, "unix://{}", path.display()),
            #[cfg(unix)]
            Endpoint::UnixListen(path) => write!(f, "unix-listen://{}", path.display()),
        }
    }
}

/// Configuration for a [`WireAdapter`].
#[derive(Debug, Clone)]
pub struct WireConfig {
    /// Upper bound on one `read()` call. Must be non-zero.
    pub read_timeout: Duration,
    /// Upper bound on one `write()` attempt.
    pub write_timeout: Option<Duration>,
    /// Maximum number of bytes returned by one `read()`.
    pub read_chunk_size: usize,
    /// Timeout for outbound connects.
    pub connect_timeout: Duration,
    /// How long `open()` waits for the flight peer in listen modes. `None` waits forever.
    pub accept_timeout: Option<Duration>,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: Some(Duration::from_secs(1)),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            connect_timeout: Duration::from_secs(5),
            accept_timeout: None,
        }
    }
}

/// Listening sockets kept alive while the link is open.
#[allow(dead_code)]
enum Listener {
    Tcp(TcpServer),
    #[cfg(unix)]
    Unix(UnixDomainSocket),
}

/// [`Adapter`] over a stream socket to the flight peer.
///
/// Reads and writes go through a shared `Arc<WireStream>`, so the downlink
/// thread can sit in a read while the uplink thread writes. `close()` shuts
/// the stream down, which wakes any blocked reader.
pub struct WireAdapter {
    endpoint: Endpoint,
    config: WireConfig,
    name: String,
    stream: RwLock<Option<Arc<WireStream>>>,
    listener: Mutex<Option<Listener>>,
}

impl WireAdapter {
    /// Create an adapter with default configuration. Nothing is opened yet.
    pub fn new(endpoint: Endpoint) -> Self {
        Self::with_config(endpoint, WireConfig::default())
    }

    /// Create an adapter with explicit configuration.
    pub fn with_config(endpoint: Endpoint, config: WireConfig) -> Self {
        Self {
            name: endpoint.to_string(),
            endpoint,
            config,
            stream: RwLock::new(None),
            listener: Mutex::new(None),
        }
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Current adapter configuration.
    pub fn config(&self) -> &WireConfig {
        &self.config
    }

    /// Whether a stream is currently established.
    pub fn is_open(&self) -> bool {
        self.stream
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn establish(&self) -> Result<(WireStream, Option<Listener>)> {
        match &self.endpoint {
            Endpoint::TcpConnect(addr) => {
                Ok((tcp::connect(addr, self.config.connect_timeout)?, None))
            }
            Endpoint::TcpListen(addr) => {
                let server = TcpServer::bind(addr)?;
                let stream = server.accept(self.config.accept_timeout)?;
                Ok((stream, Some(Listener::Tcp(server))))
            }
            #[cfg(unix)]
            Endpoint::UnixConnect(path) => Ok((UnixDomainSocket::connect(path)?, None)),
            #[cfg(unix)]
            Endpoint::UnixListen(path) => {
                let socket = UnixDomainSocket::bind(path)?;
                let stream = socket.accept(self.config.accept_timeout)?;
                Ok((stream, Some(Listener::Unix(socket))))
            }
        }
    }

    fn current(&self) -> Result<Arc<WireStream>> {
        self.stream
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(TransportError::Closed)
    }
}

impl Adapter for WireAdapter {
    fn open(&self) -> Result<()> {
        if self.is_open() {
            debug!(endpoint = %self.endpoint, "wire already open");
            return Ok(());
        }

        let (stream, listener) = self.establish()?;
        stream.set_read_timeout(Some(self.config.read_timeout))?;
        stream.set_write_timeout(self.config.write_timeout)?;

        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = listener;
        *self.stream.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(stream));
        info!(endpoint = %self.endpoint, "wire open");
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let stream = self
            .stream
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(stream) = stream {
            stream.shutdown()?;
            info!(endpoint = %self.endpoint, "wire closed");
        }
        Ok(())
    }

    fn read(&self) -> Result<Bytes> {
        let stream = self.current()?;
        let mut chunk = vec![0u8; self.config.read_chunk_size];
        loop {
            match (&*stream).read(&mut chunk) {
                Ok(0) => {
                    debug!(endpoint = %self.endpoint, "flight peer closed the wire");
                    return Err(TransportError::Closed);
                }
                Ok(n) => {
                    chunk.truncate(n);
                    return Ok(Bytes::from(chunk));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(Bytes::new());
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write(&self, data: &[u8]) -> Result<bool> {
        let stream = self.current()?;
        let mut writer = &*stream;
        match writer.write_all(data).and_then(|()| writer.flush()) {
            Ok(()) => Ok(true),
            Err(err) => {
                warn!(endpoint = %self.endpoint, bytes = data.len(), error = %err, "wire write failed");
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for WireAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireAdapter")
            .field("endpoint", &self.endpoint)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::time::Instant;

    use super::*;

    fn fast_config() -> WireConfig {
        WireConfig {
            read_timeout: Duration::from_millis(20),
            ..WireConfig::default()
        }
    }

    #[test]
    fn read_and_write_before_open_report_closed() {
        let adapter = WireAdapter::new(Endpoint::TcpConnect("127.0.0.1:1".to_string()));
        assert!(matches!(adapter.read(), Err(TransportError::Closed)));
        assert!(matches!(adapter.write(b"x"), Err(TransportError::Closed)));
    }

    #[test]
    fn tcp_connect_reads_writes_and_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let adapter = WireAdapter::with_config(Endpoint::TcpConnect(addr), fast_config());
        adapter.open().unwrap();
        let (mut fsw, _) = listener.accept().unwrap();

        // Idle read returns empty rather than blocking.
        let started = Instant::now();
        assert!(adapter.read().unwrap().is_empty());
        assert!(started.elapsed() < Duration::from_secs(1));

        fsw.write_all(b"\xDE\xAD").unwrap();
        let mut got = Vec::new();
        while got.len() < 2 {
            got.extend_from_slice(&adapter.read().unwrap());
        }
        assert_eq!(got, b"\xDE\xAD");

        assert!(adapter.write(b"cmd").unwrap());
        let mut buf = [0u8; 3];
        fsw.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"cmd");

        adapter.close().unwrap();
        assert!(!adapter.is_open());
        assert!(matches!(adapter.write(b"late"), Err(TransportError::Closed)));
    }

    #[test]
    fn peer_hangup_reads_as_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let adapter = WireAdapter::with_config(Endpoint::TcpConnect(addr), fast_config());
        adapter.open().unwrap();
        let (fsw, _) = listener.accept().unwrap();
        drop(fsw);

        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            match adapter.read() {
                Err(TransportError::Closed) => break,
                Ok(bytes) if bytes.is_empty() && Instant::now() < deadline => continue,
                other => panic!("expected closed, got {other:?}"),
            }
        }
    }

    #[test]
    fn close_wakes_blocked_reader() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let adapter = Arc::new(WireAdapter::with_config(
            Endpoint::TcpConnect(addr),
            WireConfig {
                read_timeout: Duration::from_secs(30),
                ..WireConfig::default()
            },
        ));
        adapter.open().unwrap();
        let _fsw = listener.accept().unwrap();

        let reader = {
            let adapter = Arc::clone(&adapter);
            std::thread::spawn(move || adapter.read())
        };
        std::thread::sleep(Duration::from_millis(50));
        adapter.close().unwrap();

        assert!(matches!(reader.join().unwrap(), Err(TransportError::Closed)));
    }

    #[cfg(unix)]
    #[test]
    fn unix_listen_accepts_flight_peer() {
        let dir = std::env::temp_dir().join(format!("gdslink-wire-uds-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fsw.sock");

        let adapter = Arc::new(WireAdapter::with_config(
            Endpoint::UnixListen(path.clone()),
            WireConfig {
                accept_timeout: Some(Duration::from_secs(3)),
                ..fast_config()
            },
        ));
        let opener = {
            let adapter = Arc::clone(&adapter);
            std::thread::spawn(move || adapter.open())
        };

        let fsw = loop {
            match std::os::unix::net::UnixStream::connect(&path) {
                Ok(stream) => break stream,
                Err(_) => std::thread::sleep(Duration::from_millis(10)),
            }
        };
        opener.join().unwrap().unwrap();
        assert_eq!(adapter.name(), format!("unix-listen://{}", path.display()));

        assert!(adapter.write(b"up").unwrap());
        let mut buf = [0u8; 2];
        (&fsw).read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"up");

        adapter.close().unwrap();
        assert!(!path.exists(), "listener socket removed on close");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
