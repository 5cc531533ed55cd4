/// Errors that can occur on the ground side of the link.
#[derive(Debug, thiserror::Error)]
pub enum GroundError {
    /// Failed to connect to the ground distribution server.
    #[error("failed to connect to ground at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the ground connection.
    #[error("ground I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be wrapped for the ground connection.
    #[error("frame error: {0}")]
    Frame(#[from] gdslink_frame::FrameError),

    /// The ground connection is closed.
    #[error("ground connection closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, GroundError>;
