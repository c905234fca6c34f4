use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::FramePayloadError;
use crate::streaming::splitter::{BLANK_LINE, NEWLINE, RawFrame};

/// Prefix marking significant lines in a chat frame
pub const DATA_PREFIX: &str = "data: ";

/// How a session reports frames whose payload does not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Log at warn level, then skip the frame
    Report,
    /// Skip the frame with only a trace record
    Silent,
}

/// A frame payload that parsed successfully
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    /// The frame the payload came from
    pub frame: RawFrame,
    /// Parsed structured payload
    pub payload: Value,
}

impl DecodedEvent {
    pub fn new(frame: RawFrame, payload: Value) -> Self {
        Self { frame, payload }
    }

    /// Deserialize the payload into a typed value
    pub fn payload_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.payload)
    }
}

/// Wire format of one pipeline: where frames end and how their payload parses
pub trait FrameFormat: Send {
    /// Delimiter that terminates a frame
    fn delimiter(&self) -> &str;

    /// Parse one complete frame into zero or more payloads, in order
    fn parse_frame(&self, frame: &RawFrame) -> Vec<Result<Value, FramePayloadError>>;

    /// What to do with payloads that fail to parse
    fn malformed_policy(&self) -> MalformedPolicy;

    /// Name for logging
    fn name(&self) -> &str;
}

fn parse_json(text: &str) -> Result<Value, FramePayloadError> {
    serde_json::from_str(text).map_err(|source| FramePayloadError {
        line: text.to_string(),
        source,
    })
}

/// Chat token stream: blank-line frames of `data: {json}` lines
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatFormat;

impl FrameFormat for ChatFormat {
    fn delimiter(&self) -> &str {
        BLANK_LINE
    }

    fn parse_frame(&self, frame: &RawFrame) -> Vec<Result<Value, FramePayloadError>> {
        frame
            .lines()
            .filter_map(|line| line.strip_prefix(DATA_PREFIX))
            .map(parse_json)
            .collect()
    }

    fn malformed_policy(&self) -> MalformedPolicy {
        MalformedPolicy::Report
    }

    fn name(&self) -> &str {
        "chat"
    }
}

/// Model download progress: one raw JSON object per line
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressFormat;

impl FrameFormat for ProgressFormat {
    fn delimiter(&self) -> &str {
        NEWLINE
    }

    fn parse_frame(&self, frame: &RawFrame) -> Vec<Result<Value, FramePayloadError>> {
        vec![parse_json(frame.trim_end_matches('\r'))]
    }

    fn malformed_policy(&self) -> MalformedPolicy {
        MalformedPolicy::Silent
    }

    fn name(&self) -> &str {
        "progress"
    }
}
