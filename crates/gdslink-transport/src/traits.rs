use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// Raw byte I/O against the wire.
///
/// Implementations are shared between the downlink thread (which reads) and
/// the uplink thread (which writes), so every method takes `&self`.
pub trait Adapter: Send + Sync {
    /// Prepare the link. Called by the surrounding process, never by a pipeline.
    fn open(&self) -> Result<()> {
        Ok(())
    }

    /// Tear down the link. Blocked reads on other threads must return.
    fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Read whatever bytes are available.
    ///
    /// Blocks for at most an implementation-defined timeout and returns an
    /// empty buffer when nothing arrived. Must never block indefinitely.
    fn read(&self) -> Result<Bytes>;

    /// Attempt one write of `data`.
    ///
    /// `Ok(false)` reports a failed attempt the caller may retry. `Err` means
    /// the transport is closed.
    fn write(&self, data: &[u8]) -> Result<bool>;

    /// Short name for diagnostics.
    fn name(&self) -> &str {
        "adapter"
    }
}

/// A connected wire stream.
///
/// Like `TcpStream`, `&WireStream` implements `Read` and `Write`, so one
/// thread can block in a read while another writes.
pub struct WireStream {
    inner: WireStreamInner,
}

enum WireStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for &WireStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &self.inner {
            WireStreamInner::Tcp(stream) => {
                let mut stream: &TcpStream = stream;
                stream.read(buf)
            }
            #[cfg(unix)]
            WireStreamInner::Unix(stream) => {
                let mut stream: &std::os::unix::net::UnixStream = stream;
                stream.read(buf)
            }
        }
    }
}

impl Write for &WireStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &self.inner {
            WireStreamInner::Tcp(stream) => {
                let mut stream: &TcpStream = stream;
                stream.write(buf)
            }
            #[cfg(unix)]
            WireStreamInner::Unix(stream) => {
                let mut stream: &std::os::unix::net::UnixStream = stream;
                stream.write(buf)
            }
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &self.inner {
            WireStreamInner::Tcp(stream) => {
                let mut stream: &TcpStream = stream;
                stream.flush()
            }
            #[cfg(unix)]
            WireStreamInner::Unix(stream) => {
                let mut stream: &std::os::unix::net::UnixStream = stream;
                stream.flush()
            }
        }
    }
}

impl WireStream {
    /// Wrap a connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: WireStreamInner::Tcp(stream),
        }
    }

    /// Wrap a connected Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: WireStreamInner::Unix(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            WireStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            WireStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            WireStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            WireStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Shut down both directions. Unblocks readers on other threads.
    pub fn shutdown(&self) -> Result<()> {
        let result = match &self.inner {
            WireStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            WireStreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        match result {
            Ok(()) => Ok(()),
            // Peer already went away.
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Stream kind for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.inner {
            WireStreamInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            WireStreamInner::Unix(_) => "unix",
        }
    }
}

impl std::fmt::Debug for WireStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireStream")
            .field("type", &self.kind())
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn shared_reference_reads_and_writes() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let left = WireStream::from_unix(left);
        let right = WireStream::from_unix(right);

        (&left).write_all(b"wire").unwrap();
        let mut buf = [0u8; 4];
        (&right).read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"wire");
        assert_eq!(left.kind(), "unix");
    }

    #[test]
    fn shutdown_unblocks_peer_read() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let left = WireStream::from_unix(left);
        let right = WireStream::from_unix(right);

        left.shutdown().unwrap();
        let mut buf = [0u8; 8];
        assert_eq!((&right).read(&mut buf).unwrap(), 0);
    }
}
