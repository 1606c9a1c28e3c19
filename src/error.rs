use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong in the connector and transport layers.
///
/// All operations report failure explicitly through this enum; each layer
/// hands errors to its immediate caller and performs no retries.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("no matching peer")]
    NotFound,

    #[error("peer with SSRC {0:#010x} already listed")]
    DuplicateSsrc(u32),

    #[error("malformed packet: {0}")]
    MalformedPacket(&'static str),

    #[error("truncated input")]
    Truncated,

    #[error("buffer too small: need {required} bytes, have {available}")]
    BufferTooSmall { required: usize, available: usize },

    #[error("no target attached")]
    NoTarget,

    #[error("no source attached")]
    NoSource,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
