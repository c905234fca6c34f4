use std::fmt;
use std::ops::Deref;

/// Blank-line delimiter used by the chat stream
pub const BLANK_LINE: &str = "\n\n";
/// Single-newline delimiter used by the progress stream
pub const NEWLINE: &str = "\n";

/// One delimiter-bounded unit of decoded text, without its delimiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame(String);

impl RawFrame {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for RawFrame {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stateful splitter that turns decoded text into complete frames
///
/// Text after the last delimiter stays buffered until more text arrives or
/// [`FrameSplitter::flush`] is called at end of stream.
#[derive(Debug)]
pub struct FrameSplitter {
    delimiter: String,
    buffer: String,
    /// Offset below which the buffer is known not to contain a delimiter
    scanned: usize,
}

impl FrameSplitter {
    /// An empty delimiter never splits, so the whole body becomes one frame on flush
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            buffer: String::with_capacity(8192),
            scanned: 0,
        }
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Feed decoded text and extract every frame it completes
    pub fn feed(&mut self, text: &str) -> Vec<RawFrame> {
        let mut frames = Vec::new();
        if text.is_empty() {
            return frames;
        }

        self.buffer.push_str(text);
        if self.delimiter.is_empty() {
            return frames;
        }

        let mut consumed = 0;
        let mut search_from = self.scanned;
        while let Some(offset) = self.buffer[search_from..].find(self.delimiter.as_str()) {
            let end = search_from + offset;
            if end > consumed {
                frames.push(RawFrame::new(&self.buffer[consumed..end]));
            }
            consumed = end + self.delimiter.len();
            search_from = consumed;
        }
        // compact once per feed
        self.buffer.drain(..consumed);

        // A delimiter may straddle the next chunk, so rescan its possible prefix
        self.scanned = self
            .buffer
            .len()
            .saturating_sub(self.delimiter.len() - 1);
        while !self.buffer.is_char_boundary(self.scanned) {
            self.scanned -= 1;
        }

        frames
    }

    /// Emit whatever is left once the source has ended
    pub fn flush(&mut self) -> Option<RawFrame> {
        self.scanned = 0;
        if self.buffer.is_empty() {
            return None;
        }
        Some(RawFrame::new(std::mem::take(&mut self.buffer)))
    }

    /// Bytes of the current undelimited remainder
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop the undelimited remainder without emitting it
    pub fn reset(&mut self) {
        self.buffer.clear();
        if self.buffer.capacity() > 65536 {
            // 64KB max, reallocate if too large
            self.buffer = String::with_capacity(8192);
        }
        self.scanned = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(frames: Vec<RawFrame>) -> Vec<String> {
        frames.into_iter().map(RawFrame::into_string).collect()
    }

    #[test]
    fn test_single_complete_frame() {
        let mut splitter = FrameSplitter::new(BLANK_LINE);
        assert_eq!(texts(splitter.feed("data: a\n\n")), vec!["data: a"]);
        assert_eq!(splitter.pending_len(), 0);
        assert!(splitter.flush().is_none());
    }

    #[test]
    fn test_remainder_is_buffered() {
        let mut splitter = FrameSplitter::new(BLANK_LINE);
        assert!(splitter.feed("data: a").is_empty());
        assert_eq!(texts(splitter.feed("bc\n\ndata: d")), vec!["data: abc"]);
        assert_eq!(splitter.flush(), Some(RawFrame::new("data: d")));
    }

    #[test]
    fn test_delimiter_split_across_feeds() {
        let mut splitter = FrameSplitter::new(BLANK_LINE);
        assert!(splitter.feed("data: a\n").is_empty());
        assert_eq!(texts(splitter.feed("\ndata: b\n\n")), vec!["data: a", "data: b"]);
    }

    #[test]
    fn test_multiline_frame_keeps_inner_newlines() {
        let mut splitter = FrameSplitter::new(BLANK_LINE);
        let frames = texts(splitter.feed("event: x\ndata: 1\n\n"));
        assert_eq!(frames, vec!["event: x\ndata: 1"]);
    }

    #[test]
    fn test_empty_frames_skipped() {
        let mut splitter = FrameSplitter::new(NEWLINE);
        assert_eq!(texts(splitter.feed("\n\na\n\n\nb\n")), vec!["a", "b"]);
        assert!(splitter.feed("").is_empty());
        assert!(splitter.flush().is_none());
    }

    #[test]
    fn test_reconstructs_input() {
        let input = "one\ntwo\nthree\nfour";
        let mut splitter = FrameSplitter::new(NEWLINE);
        let mut rebuilt = String::new();

        for piece in ["on", "e\nt", "wo\nthree", "\nfo", "ur"] {
            for frame in splitter.feed(piece) {
                rebuilt.push_str(&frame);
                rebuilt.push_str(NEWLINE);
            }
        }
        if let Some(frame) = splitter.flush() {
            rebuilt.push_str(&frame);
        }

        assert_eq!(rebuilt, input);
    }

    #[test]
    fn test_multibyte_text_near_delimiter() {
        let mut splitter = FrameSplitter::new(BLANK_LINE);
        assert!(splitter.feed("€").is_empty());
        assert!(splitter.feed("€\n").is_empty());
        assert_eq!(texts(splitter.feed("\n")), vec!["€€"]);
    }

    #[test]
    fn test_reset_discards_remainder() {
        let mut splitter = FrameSplitter::new(NEWLINE);
        splitter.feed("partial");
        assert_eq!(splitter.pending_len(), 7);
        splitter.reset();
        assert!(splitter.flush().is_none());
    }

    #[test]
    fn test_many_frames_in_one_feed() {
        let mut splitter = FrameSplitter::new(NEWLINE);
        let mut text: String = (0..500).map(|i| format!("{{\"n\":{}}}\n", i)).collect();
        text.push_str("{\"n\":");

        let frames = splitter.feed(&text);
        assert_eq!(frames.len(), 500);
        assert_eq!(&*frames[0], "{\"n\":0}");
        assert_eq!(&*frames[499], "{\"n\":499}");
        assert_eq!(splitter.pending_len(), "{\"n\":".len());

        let frames = splitter.feed("500}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(&*frames[0], "{\"n\":500}");
        assert_eq!(splitter.pending_len(), 0);
    }
}
