use std::char::REPLACEMENT_CHARACTER;

use crate::error::{Result, StreamError};

/// Incremental UTF-8 decoder that carries split code points across chunks
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Leading bytes of a code point whose remaining bytes have not arrived yet
    carry: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, holding back any trailing incomplete sequence.
    ///
    /// Bytes that can never form a valid sequence become U+FFFD; a sequence
    /// that is merely cut off by the chunk boundary is never replaced.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let joined;
        let mut rest: &[u8] = if self.carry.is_empty() {
            chunk
        } else {
            let mut bytes = std::mem::take(&mut self.carry);
            bytes.extend_from_slice(chunk);
            joined = bytes;
            joined.as_slice()
        };

        let mut text = String::with_capacity(rest.len());
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(invalid) => {
                            text.push(REPLACEMENT_CHARACTER);
                            rest = &tail[invalid..];
                        }
                        None => {
                            self.carry = tail.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        text
    }

    /// Finish the stream. Leftover bytes mean the body was cut mid character.
    pub fn flush(&mut self) -> Result<String> {
        if self.carry.is_empty() {
            return Ok(String::new());
        }

        let pending_bytes = self.carry.len();
        self.carry.clear();
        Err(StreamError::DecodeIntegrity { pending_bytes })
    }

    /// Number of bytes held back for the next chunk
    pub fn pending_bytes(&self) -> usize {
        self.carry.len()
    }

    pub fn reset(&mut self) {
        self.carry.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"hello"), "hello");
        assert_eq!(decoder.pending_bytes(), 0);
        assert_eq!(decoder.flush().unwrap(), "");
    }

    #[test]
    fn test_euro_split_across_chunks() {
        let euro = "€".as_bytes();
        assert_eq!(euro.len(), 3);

        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&euro[..1]), "");
        assert_eq!(decoder.pending_bytes(), 1);
        assert_eq!(decoder.decode(&euro[1..]), "€");
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn test_four_byte_char_one_byte_at_a_time() {
        let input = "a🦀b".as_bytes();
        let mut decoder = Utf8Decoder::new();

        let text: String = input.iter().map(|b| decoder.decode(&[*b])).collect();
        assert_eq!(text, "a🦀b");
        assert!(!text.contains(REPLACEMENT_CHARACTER));
    }

    #[test]
    fn test_empty_chunk_keeps_carry() {
        let euro = "€".as_bytes();
        let mut decoder = Utf8Decoder::new();

        decoder.decode(&euro[..2]);
        assert_eq!(decoder.decode(b""), "");
        assert_eq!(decoder.pending_bytes(), 2);
        assert_eq!(decoder.decode(&euro[2..]), "€");
    }

    #[test]
    fn test_truncated_sequence_fails_flush() {
        let mut decoder = Utf8Decoder::new();
        decoder.decode(b"ok");
        decoder.decode(&"€".as_bytes()[..2]);

        match decoder.flush() {
            Err(StreamError::DecodeIntegrity { pending_bytes }) => assert_eq!(pending_bytes, 2),
            other => panic!("expected decode integrity error, got {:?}", other),
        }
        // reported once
        assert_eq!(decoder.flush().unwrap(), "");
    }

    #[test]
    fn test_invalid_byte_replaced_mid_stream() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
        assert_eq!(decoder.pending_bytes(), 0);
    }
}
