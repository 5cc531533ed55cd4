use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use gdslink_frame::{FprimeFramer, FprimeFramerConfig, FramerDeframer};
use gdslink_transport::tcp::connect_stream;
use tracing::{debug, info};

use crate::error::{GroundError, Result};
use crate::traits::GroundChannel;

/// Line sent after connecting, announcing this client as the flight source.
pub const DEFAULT_REGISTRATION: &str = "Register FSW\n";

/// Prefix that routes a frame to every GUI client of the distribution server.
pub const DEFAULT_ROUTING_PREFIX: &str = "A5A5 GUI ";

const INITIAL_POOL_CAPACITY: usize = 8 * 1024;

/// Configuration for [`TcpGround`].
#[derive(Debug, Clone)]
pub struct TcpGroundConfig {
    /// Address of the distribution server.
    pub address: String,
    /// Registration line sent on open.
    pub registration: String,
    /// Routing prefix written ahead of every downlinked frame.
    pub routing_prefix: String,
    /// Bound on each `receive_all()` read.
    pub read_timeout: Duration,
    /// Bound on each write.
    pub write_timeout: Option<Duration>,
    /// Timeout for the initial connect.
    pub connect_timeout: Duration,
    /// Maximum bytes read per `receive_all()` call.
    pub read_chunk_size: usize,
    /// Framing used on the ground connection.
    pub framer: FprimeFramerConfig,
}

impl Default for TcpGroundConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:50050".to_string(),
            registration: DEFAULT_REGISTRATION.to_string(),
            routing_prefix: DEFAULT_ROUTING_PREFIX.to_string(),
            read_timeout: Duration::from_millis(100),
            write_timeout: Some(Duration::from_secs(1)),
            connect_timeout: Duration::from_secs(5),
            read_chunk_size: 8 * 1024,
            framer: FprimeFramerConfig::default(),
        }
    }
}

/// [`GroundChannel`] speaking to a threaded TCP distribution server.
///
/// Downlinked frames are framed again for the ground connection and written
/// behind the routing prefix. Uplink packets arrive framed the same way and
/// are deframed out of a pool owned by this channel.
pub struct TcpGround {
    config: TcpGroundConfig,
    framer: FprimeFramer,
    stream: RwLock<Option<Arc<TcpStream>>>,
    pool: Mutex<BytesMut>,
}

impl TcpGround {
    /// Create a ground channel. Nothing is connected until [`GroundChannel::open`].
    pub fn new(config: TcpGroundConfig) -> Self {
        Self {
            framer: FprimeFramer::with_config(config.framer.clone()),
            config,
            stream: RwLock::new(None),
            pool: Mutex::new(BytesMut::with_capacity(INITIAL_POOL_CAPACITY)),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &TcpGroundConfig {
        &self.config
    }

    /// Whether the ground connection is established.
    pub fn is_open(&self) -> bool {
        self.stream
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn connect(&self) -> Result<TcpStream> {
        let address = &self.config.address;
        connect_stream(address, self.config.connect_timeout).map_err(|source| {
            GroundError::Connect {
                endpoint: address.clone(),
                source,
            }
        })
    }

    fn current(&self) -> Result<Arc<TcpStream>> {
        self.stream
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(GroundError::Closed)
    }
}

impl GroundChannel for TcpGround {
    fn open(&self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }

        let mut stream = self.connect()?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(self.config.read_timeout))?;
        stream.set_write_timeout(self.config.write_timeout)?;
        stream.write_all(self.config.registration.as_bytes())?;

        *self.stream.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(stream));
        info!(address = %self.config.address, "registered with ground distribution server");
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let stream = self
            .stream
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(stream) = stream {
            match stream.shutdown(Shutdown::Both) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotConnected => {}
                Err(err) => return Err(err.into()),
            }
            info!(address = %self.config.address, "ground connection closed");
        }
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }

    fn send_all(&self, frames: Vec<Bytes>) -> Result<()> {
        if frames.is_empty() {
            return Ok(());
        }
        let stream = self.current()?;

        let prefix = self.config.routing_prefix.as_bytes();
        let mut out = BytesMut::new();
        for frame in &frames {
            out.extend_from_slice(prefix);
            self.framer.encode(frame, &mut out)?;
        }

        let mut writer: &TcpStream = &stream;
        writer.write_all(&out).map_err(classify_io)?;
        debug!(frames = frames.len(), bytes = out.len(), "sent frames to ground");
        Ok(())
    }

    fn receive_all(&self) -> Result<Vec<Bytes>> {
        let stream = self.current()?;
        let mut chunk = vec![0u8; self.config.read_chunk_size];

        let mut reader: &TcpStream = &stream;
        let read = loop {
            match reader.read(&mut chunk) {
                Ok(0) => return Err(GroundError::Closed),
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(Vec::new());
                }
                Err(err) => return Err(classify_io(err)),
            }
        };

        let mut pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        pool.extend_from_slice(&chunk[..read]);
        Ok(self.framer.deframe_all(&mut pool))
    }
}

fn classify_io(err: std::io::Error) -> GroundError {
    match err.kind() {
        ErrorKind::BrokenPipe
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected => GroundError::Closed,
        _ => GroundError::Io(err),
    }
}

impl std::fmt::Debug for TcpGround {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpGround")
            .field("address", &self.config.address)
            .field("open", &self.is_open())
            .finish()
    }
}
