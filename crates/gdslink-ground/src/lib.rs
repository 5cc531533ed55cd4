//! Ground side of the gdslink bridge.
//!
//! A [`GroundChannel`] moves packets between the link and the rest of the
//! ground system. [`TcpGround`] speaks to a threaded TCP distribution server:
//! it registers as the flight source, routes downlinked frames to GUI
//! clients, and deframes the command packets the server forwards.

pub mod error;
pub mod tcp;
pub mod traits;

pub use error::{GroundError, Result};
pub use tcp::{TcpGround, TcpGroundConfig, DEFAULT_REGISTRATION, DEFAULT_ROUTING_PREFIX};
pub use traits::GroundChannel;
