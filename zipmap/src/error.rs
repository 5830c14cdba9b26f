use std::io;
use thiserror::Error;

/// Errors that can occur when working with a zipmap buffer
#[derive(Error, Debug)]
pub enum ZipMapError {
    /// IO errors when persisting or loading a blob
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The backing store could not grow to the requested size
    #[error("Allocation of {requested} bytes failed")]
    Alloc { requested: usize },

    /// A length tag, entry or header points outside the buffer
    #[error("Malformed zipmap at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },

    /// Key or value length does not fit in a 32 bit length tag
    #[error("Length {len} exceeds the maximum encodable length")]
    TooLarge { len: usize },

    /// Encoding errors when converting typed data to bytes
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Decoding errors when converting stored bytes back to typed data
    #[error("Decoding error: {0}")]
    Decoding(String),
}

pub type Result<T> = std::result::Result<T, ZipMapError>;

impl ZipMapError {
    pub(crate) fn malformed(offset: usize, reason: &'static str) -> Self {
        ZipMapError::Malformed { offset, reason }
    }

    /// True for errors caused by corrupt buffer contents
    pub fn is_malformed(&self) -> bool {
        matches!(self, ZipMapError::Malformed { .. })
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for ZipMapError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            ZipMapError::Io(io::Error::new(io_err.kind(), err.to_string()))
        } else {
            ZipMapError::Encoding(err.to_string())
        }
    }
}
