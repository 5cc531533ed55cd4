//! Wire adapter capability for gdslink.
//!
//! An [`Adapter`] moves raw bytes to and from the remote flight peer. It knows
//! nothing about frames: reads hand back whatever bytes arrived within a
//! bounded timeout, writes report success or failure of one attempt.
//!
//! [`WireAdapter`] implements the capability over stream sockets:
//! - TCP, as client or as a single-connection server
//! - Unix domain sockets (Linux/macOS), as client or server

pub mod error;
pub mod tcp;
pub mod traits;
pub mod wire;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use traits::{Adapter, WireStream};
pub use wire::{Endpoint, WireAdapter, WireConfig};

#[cfg(unix)]
pub use uds::UnixDomainSocket;
