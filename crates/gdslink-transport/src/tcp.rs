use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::WireStream;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Open a TCP stream to `addr`, trying each resolved address in turn.
///
/// Returns the error of the last candidate tried.
pub fn connect_stream(addr: &str, timeout: Duration) -> std::io::Result<TcpStream> {
    let mut last_err = None;
    for candidate in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => {
                debug!(%candidate, "connected to tcp endpoint");
                return Ok(stream);
            }
            Err(err) => last_err = Some(err),
        }
    }

    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "address resolved to nothing",
        )
    }))
}

/// Connect the wire to `addr`.
pub fn connect(addr: &str, timeout: Duration) -> Result<WireStream> {
    let stream = connect_stream(addr, timeout).map_err(|source| TransportError::Connect {
        endpoint: addr.to_string(),
        source,
    })?;
    stream.set_nodelay(true)?;
    Ok(WireStream::from_tcp(stream))
}

/// Listening TCP endpoint that hands out flight connections one at a time.
pub struct TcpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpServer {
    /// Bind to `addr`.
    pub fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(|source| TransportError::Bind {
            endpoint: addr.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "listening for flight connection on tcp");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept one connection, waiting at most `timeout` when set.
    pub fn accept(&self, timeout: Option<Duration>) -> Result<WireStream> {
        let (stream, peer) = match timeout {
            None => self.listener.accept().map_err(TransportError::Accept)?,
            Some(timeout) => self.accept_until(Instant::now() + timeout, timeout)?,
        };
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        info!(%peer, "accepted flight connection");
        Ok(WireStream::from_tcp(stream))
    }

    fn accept_until(&self, deadline: Instant, timeout: Duration) -> Result<(TcpStream, SocketAddr)> {
        self.listener.set_nonblocking(true)?;
        let result = loop {
            match self.listener.accept() {
                Ok(accepted) => break Ok(accepted),
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        break Err(TransportError::AcceptTimeout(timeout));
                    }
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => break Err(TransportError::Accept(err)),
            }
        };
        self.listener.set_nonblocking(false)?;
        result
    }

    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
