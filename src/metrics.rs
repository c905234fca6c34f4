use std::time::{Duration, Instant};

/// Counters for a single stream session
///
/// Owned by the session and only touched by its single consumer, so plain
/// integers are enough.
#[derive(Debug, Clone)]
pub struct StreamMetrics {
    /// Chunks pulled from the byte source
    pub chunks: u64,

    /// Total body bytes received
    pub bytes: u64,

    /// Complete frames produced by the splitter
    pub frames: u64,

    /// Data events handed to the consumer
    pub events: u64,

    /// Payloads dropped because they failed to parse
    pub malformed: u64,

    started: Instant,
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self {
            chunks: 0,
            bytes: 0,
            frames: 0,
            events: 0,
            malformed: 0,
            started: Instant::now(),
        }
    }
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a chunk arriving from the source
    pub fn record_chunk(&mut self, len: usize) {
        self.chunks += 1;
        self.bytes += len as u64;
    }

    pub fn record_frames(&mut self, count: usize) {
        self.frames += count as u64;
    }

    pub fn record_event(&mut self) {
        self.events += 1;
    }

    pub fn record_malformed(&mut self) {
        self.malformed += 1;
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Get snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            chunks: self.chunks,
            bytes: self.bytes,
            frames: self.frames,
            events: self.events,
            malformed: self.malformed,
            elapsed: self.elapsed(),
        }
    }
}

/// Immutable snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub chunks: u64,
    pub bytes: u64,
    pub frames: u64,
    pub events: u64,
    pub malformed: u64,
    pub elapsed: Duration,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Stream Metrics: {} bytes in {} chunks, {} frames, {} events, {} malformed, {:.2}ms",
            self.bytes,
            self.chunks,
            self.frames,
            self.events,
            self.malformed,
            self.elapsed.as_secs_f64() * 1000.0
        )
    }
}
