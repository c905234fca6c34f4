use serde::Deserialize;

use crate::streaming::DecodedEvent;

/// Payload of one chat stream event
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Reply text assembled by folding chat events
#[derive(Debug, Clone, Default)]
pub struct ChatTranscript {
    text: String,
    tokens: usize,
    done: bool,
    error: Option<String>,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the transcript, returning the token it carried
    pub fn apply(&mut self, event: &DecodedEvent) -> serde_json::Result<Option<String>> {
        let chunk: ChatChunk = event.payload_as()?;

        if chunk.done {
            self.done = true;
        }
        if let Some(error) = chunk.error {
            self.error = Some(error);
        }

        match chunk.token {
            Some(token) if !token.is_empty() => {
                self.text.push_str(&token);
                self.tokens += 1;
                Ok(Some(token))
            }
            _ => Ok(None),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn token_count(&self) -> usize {
        self.tokens
    }

    /// Whether the backend sent its own `done` marker
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
