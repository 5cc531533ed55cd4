/// Errors that can occur while framing outbound data.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The packet is larger than the framer will emit.
    #[error("packet too large to frame ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
