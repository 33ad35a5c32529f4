//! Error types for streaming buffer operations.

use std::io;

use thiserror::Error;

/// A reader or writer failed partway through a streaming transfer.
///
/// Returned by [`Buffer::read_from`](crate::buffer::Buffer::read_from) and
/// [`Buffer::write_to`](crate::buffer::Buffer::write_to). `completed`
/// reports how many bytes made it across before the underlying I/O error;
/// those bytes remain in (or were drained from) the buffer as documented on
/// the respective operation.
#[derive(Debug, Error)]
#[error("stream transfer stopped after {completed} bytes")]
pub struct TransferError {
    /// Bytes successfully transferred before the failure.
    pub completed: u64,
    /// The error reported by the reader or writer.
    #[source]
    pub source: io::Error,
}

impl TransferError {
    pub(crate) fn new(completed: u64, source: io::Error) -> Self {
        Self { completed, source }
    }
}
