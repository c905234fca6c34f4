use futures::Stream;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::config::StreamConfig;
use crate::error::{Result, StreamError};
use crate::metrics::StreamMetrics;
use crate::source::{ByteSource, ByteStream, CancelHandle, ConnectFuture, SourceItem};
use crate::streaming::decoder::Utf8Decoder;
use crate::streaming::format::{DecodedEvent, FrameFormat, MalformedPolicy};
use crate::streaming::splitter::{FrameSplitter, RawFrame};

/// Lifecycle of a [`StreamSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Completed,
    Cancelled,
    Errored,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Cancelled | SessionState::Errored
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Streaming => "streaming",
            SessionState::Completed => "completed",
            SessionState::Cancelled => "cancelled",
            SessionState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Item yielded by a session
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A successfully parsed frame payload
    Data(DecodedEvent),
    /// Synthetic sentinel marking normal completion, yielded exactly once
    Done,
}

impl StreamEvent {
    pub fn as_data(&self) -> Option<&DecodedEvent> {
        match self {
            StreamEvent::Data(event) => Some(event),
            StreamEvent::Done => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, StreamEvent::Done)
    }
}

/// Drives one response body through decoding, splitting and payload
/// extraction, handing events to a single consumer one at a time.
///
/// Nothing happens until the first [`StreamSession::next_event`] call, which
/// issues the request. The next chunk is only pulled once every event from
/// the previous one has been taken.
pub struct StreamSession<F: FrameFormat> {
    id: Uuid,
    state: SessionState,
    connect: Option<ConnectFuture>,
    source: Option<ByteSource>,
    cancel: CancelHandle,
    decoder: Utf8Decoder,
    splitter: FrameSplitter,
    format: F,
    config: StreamConfig,
    pending: VecDeque<StreamEvent>,
    // raised after the events ahead of it have been yielded
    deferred_error: Option<StreamError>,
    metrics: StreamMetrics,
}

impl<F: FrameFormat> StreamSession<F> {
    pub fn new(connect: ConnectFuture, format: F, config: StreamConfig) -> Self {
        let splitter = FrameSplitter::new(format.delimiter());
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            connect: Some(connect),
            source: None,
            cancel: CancelHandle::new(),
            decoder: Utf8Decoder::new(),
            splitter,
            format,
            config,
            pending: VecDeque::new(),
            deferred_error: None,
            metrics: StreamMetrics::new(),
        }
    }

    /// Build a session over a body that is already available
    pub fn from_stream(stream: ByteStream, format: F, config: StreamConfig) -> Self {
        Self::new(
            Box::pin(futures::future::ready(Ok(stream))),
            format,
            config,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn metrics(&self) -> &StreamMetrics {
        &self.metrics
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    /// Stop delivery. No event is yielded after this returns.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Handle for cancelling from another task
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Pull the next event.
    ///
    /// Returns `None` once the session is terminal. An errored session yields
    /// its error exactly once, as its last item.
    pub async fn next_event(&mut self) -> Option<Result<StreamEvent>> {
        loop {
            if self.state.is_terminal() {
                return None;
            }

            if self.cancel.is_cancelled() {
                self.finish(SessionState::Cancelled);
                return None;
            }

            if let Some(event) = self.pending.pop_front() {
                match event {
                    StreamEvent::Data(_) => self.metrics.record_event(),
                    StreamEvent::Done => self.finish(SessionState::Completed),
                }
                return Some(Ok(event));
            }

            if let Some(e) = self.deferred_error.take() {
                return Some(Err(self.fail(e)));
            }

            let step = match self.state {
                SessionState::Idle => {
                    self.transition(SessionState::Connecting);
                    Ok(())
                }
                SessionState::Connecting => self.connect().await,
                SessionState::Streaming => self.pull().await,
                _ => return None,
            };

            if let Err(e) = step {
                return Some(Err(self.fail(e)));
            }
        }
    }

    /// Consume the session as a `Stream` of events
    pub fn into_stream(self) -> impl Stream<Item = Result<StreamEvent>> + Send {
        futures::stream::unfold(self, |mut session| async move {
            let event = session.next_event().await?;
            Some((event, session))
        })
    }

    async fn connect(&mut self) -> Result<()> {
        let Some(connect) = self.connect.take() else {
            return Err(StreamError::Transport(
                "session has no pending request".to_string(),
            ));
        };

        let token = self.cancel.token().clone();
        let stream = tokio::select! {
            biased;
            // dropping the request future aborts it
            _ = token.cancelled() => return Ok(()),
            result = connect => result?,
        };

        self.source = Some(ByteSource::new(stream, self.cancel.clone()));
        self.transition(SessionState::Streaming);
        Ok(())
    }

    async fn pull(&mut self) -> Result<()> {
        let Some(source) = self.source.as_mut() else {
            return Err(StreamError::Transport(
                "byte source already released".to_string(),
            ));
        };

        match source.next_chunk().await? {
            SourceItem::Chunk(chunk) => {
                self.metrics.record_chunk(chunk.len());
                debug!(session = %self.id, bytes = chunk.len(), "Received chunk");

                let text = self.decoder.decode(&chunk);
                let frames = self.splitter.feed(&text);
                self.extract(frames);
                if self.splitter.pending_len() > self.config.max_frame_bytes {
                    self.deferred_error = Some(StreamError::FrameTooLarge {
                        limit: self.config.max_frame_bytes,
                    });
                }
            }
            SourceItem::End => {
                debug!(session = %self.id, "Byte source ended");
                let tail = self.decoder.flush()?;
                let mut frames = self.splitter.feed(&tail);
                frames.extend(self.splitter.flush());
                self.extract(frames);
                self.release_source();
                self.pending.push_back(StreamEvent::Done);
            }
            // picked up at the top of the next loop iteration
            SourceItem::Cancelled => {}
        }

        Ok(())
    }

    fn extract(&mut self, frames: Vec<RawFrame>) {
        self.metrics.record_frames(frames.len());

        for frame in frames {
            for result in self.format.parse_frame(&frame) {
                match result {
                    Ok(payload) => self
                        .pending
                        .push_back(StreamEvent::Data(DecodedEvent::new(frame.clone(), payload))),
                    Err(e) => {
                        self.metrics.record_malformed();
                        match self.format.malformed_policy() {
                            MalformedPolicy::Report => warn!(
                                session = %self.id,
                                format = self.format.name(),
                                error = %e,
                                "Skipping malformed frame"
                            ),
                            MalformedPolicy::Silent => trace!(
                                session = %self.id,
                                format = self.format.name(),
                                line = %e.line,
                                "Dropped unparseable line"
                            ),
                        }
                    }
                }
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(session = %self.id, from = %self.state, to = %next, "Session transition");
        self.state = next;
    }

    fn release_source(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.release();
        }
    }

    fn fail(&mut self, e: StreamError) -> StreamError {
        warn!(session = %self.id, format = self.format.name(), error = %e, "Stream failed");
        self.finish(SessionState::Errored);
        e
    }

    fn finish(&mut self, terminal: SessionState) {
        self.pending.clear();
        self.deferred_error = None;
        self.splitter.reset();
        self.decoder.reset();
        self.connect = None;
        self.release_source();
        self.transition(terminal);
        info!(
            session = %self.id,
            format = self.format.name(),
            state = %terminal,
            "{}",
            self.metrics.snapshot()
        );
    }
}
