use std::path::PathBuf;

/// Errors that can occur in byte transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the specified device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer stopped accepting bytes in the middle of a write.
    #[error("transport closed ({written} of {total} bytes written)")]
    Closed { written: usize, total: usize },

    /// The stream kept refusing output for longer than the write timeout.
    #[error("write stalled for {0:?}")]
    WriteTimeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, TransportError>;
