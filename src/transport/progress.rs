//! Progress tracking for request bodies
//!
//! The file part of a storage POST is handed to the HTTP client as a stream
//! of slices. Every slice the client pulls is reported to the progress sink,
//! so progress follows what has actually been handed to the connection.

use crate::transport::{ProgressEvent, ProgressSink};
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Slice size handed to the HTTP client
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A body stream over in-memory content that reports how much was read
pub struct ProgressStream {
    content: Bytes,
    offset: usize,
    chunk_size: usize,
    sink: Option<ProgressSink>,
}

impl ProgressStream {
    /// # Arguments
    ///
    /// * `content` - The bytes to stream
    /// * `chunk_size` - Size of each slice, at least one byte
    /// * `sink` - Receives a progress event after each slice
    pub fn new(content: Bytes, chunk_size: usize, sink: Option<ProgressSink>) -> Self {
        Self {
            content,
            offset: 0,
            chunk_size: chunk_size.max(1),
            sink,
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn bytes_read(&self) -> u64 {
        self.offset as u64
    }
}

impl Stream for ProgressStream {
    type Item = Result<Bytes, std::io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.offset >= self.content.len() {
            return Poll::Ready(None);
        }

        let end = (self.offset + self.chunk_size).min(self.content.len());
        let chunk = self.content.slice(self.offset..end);
        self.offset = end;

        if let Some(ref sink) = self.sink {
            sink(ProgressEvent::new(self.bytes_read(), Some(self.total_bytes())));
        }

        Poll::Ready(Some(Ok(chunk)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.content.len() - self.offset;
        let chunks = remaining.div_ceil(self.chunk_size);
        (chunks, Some(chunks))
    }
}
