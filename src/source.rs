use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Result;

/// Type alias for the body of one streaming response
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Type alias for the pending request that resolves to a response body
pub type ConnectFuture = Pin<Box<dyn Future<Output = Result<ByteStream>> + Send>>;

/// Outcome of a single pull from a [`ByteSource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceItem {
    Chunk(Bytes),
    End,
    Cancelled,
}

/// Clonable handle for cancelling a session from another task
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Pull-based view over one response body with cooperative cancellation.
///
/// The underlying stream is dropped on [`ByteSource::release`], which happens
/// at most once; every later pull reports end-of-stream or cancellation.
pub struct ByteSource {
    inner: Option<ByteStream>,
    cancel: CancelHandle,
}

impl ByteSource {
    pub fn new(stream: ByteStream, cancel: CancelHandle) -> Self {
        Self {
            inner: Some(stream),
            cancel,
        }
    }

    /// Wait for the next chunk, the end of the body, or cancellation
    pub async fn next_chunk(&mut self) -> Result<SourceItem> {
        if self.cancel.is_cancelled() {
            return Ok(SourceItem::Cancelled);
        }

        let Some(stream) = self.inner.as_mut() else {
            return Ok(SourceItem::End);
        };
        let token = self.cancel.token();

        tokio::select! {
            biased;
            _ = token.cancelled() => Ok(SourceItem::Cancelled),
            item = stream.next() => match item {
                Some(Ok(chunk)) => Ok(SourceItem::Chunk(chunk)),
                Some(Err(e)) => Err(e),
                None => Ok(SourceItem::End),
            },
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drop the underlying response body. Returns true only on the first call.
    pub fn release(&mut self) -> bool {
        match self.inner.take() {
            Some(stream) => {
                drop(stream);
                debug!("Released byte source");
                true
            }
            None => false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }
}

impl Drop for ByteSource {
    fn drop(&mut self) {
        self.release();
    }
}
