pub mod decoder;
pub mod format;
pub mod session;
pub mod splitter;

pub use decoder::Utf8Decoder;
pub use format::{
    ChatFormat, DATA_PREFIX, DecodedEvent, FrameFormat, MalformedPolicy, ProgressFormat,
};
pub use session::{SessionState, StreamEvent, StreamSession};
pub use splitter::{BLANK_LINE, FrameSplitter, NEWLINE, RawFrame};

/// Session over the chat token stream
pub type ChatSession = StreamSession<ChatFormat>;

/// Session over the model download progress stream
pub type ProgressSession = StreamSession<ProgressFormat>;
