use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Message type '{0}' has no portable representation")]
    UnencodableMessage(&'static str),

    #[error("Message parameter {0} ('{1}') has no portable representation")]
    UnencodableParameter(usize, String),

    #[error("Encountered an invalid event frame magic number (0x{0:08X})")]
    BadMagic(u32),

    #[error("Unsupported event frame version ({0})")]
    UnsupportedVersion(u8),

    #[error("Event frame size ({0}) exceeds the configured maximum ({1})")]
    FrameTooLarge(usize, usize),

    #[error("Event frame is truncated (expected {0} bytes, got {1})")]
    Truncated(usize, usize),

    #[error("Error cause chain length ({0}) exceeds the maximum ({1})")]
    CauseChainTooDeep(usize, usize),

    #[error("Found {0} bytes past the end of the event frame")]
    TrailingBytes(usize),

    #[error("Failed to encode or decode the event body ({0})")]
    Encoding(#[from] bincode::Error),

    #[error("Invalid configuration ({0})")]
    Config(#[from] serde_yaml::Error),

    #[error(
        "Encountered and IO error while reading or writing the event stream ({})",
        .0.kind()
    )]
    Io(#[from] io::Error),
}

impl Error {
    /// Returns true for errors describing a non-encodable event or a malformed frame.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, Error::Io(_) | Error::Config(_))
    }

    pub(crate) fn unencodable_parameter<S: AsRef<str>>(index: usize, v: S) -> Self {
        Error::UnencodableParameter(index, v.as_ref().to_owned())
    }
}
