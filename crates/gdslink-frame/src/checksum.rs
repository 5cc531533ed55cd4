/// Checksum value written by [`Checksum::Fixed`].
pub const FIXED_CHECKSUM: u32 = 0xCAFE_CAFE;

/// Frame trailer checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Checksum {
    /// CRC-32 (IEEE) over start token, length, and data.
    #[default]
    Crc32,
    /// Constant `0xCAFECAFE`, for links whose far end does not check.
    Fixed,
}

impl Checksum {
    /// Compute the checksum of `data`.
    pub fn compute(self, data: &[u8]) -> u32 {
        match self {
            Checksum::Crc32 => crc32fast::hash(data),
            Checksum::Fixed => FIXED_CHECKSUM,
        }
    }

    /// Name used on the command line and in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Checksum::Crc32 => "crc32",
            Checksum::Fixed => "fixed",
        }
    }
}
