//! # Agent Chat Stream
//!
//! Incremental decoding of the long-lived HTTP responses a local model chat
//! backend produces.
//!
//! ## Overview
//!
//! Two wire formats share one pipeline:
//! - **Chat tokens** - blank-line separated frames of `data: {json}` lines
//! - **Model pull progress** - one JSON object per line
//!
//! Each response body is driven by a [`StreamSession`](streaming::StreamSession):
//! - Byte chunks are decoded to UTF-8, keeping code points split across chunks
//! - Decoded text is split into frames on the format's delimiter
//! - Frame payloads are parsed as JSON; malformed frames are skipped
//! - Events are handed out one at a time, ending with a `Done` sentinel,
//!   an error, or nothing at all after cancellation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agent_chat_stream::client::{BackendClient, ChatRequest};
//! use agent_chat_stream::config::ClientConfig;
//! use agent_chat_stream::streaming::StreamEvent;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let client = BackendClient::new(config.backend, config.stream)?;
//!
//! let mut session = client.chat(&ChatRequest::new("session-1", "Hello"));
//! while let Some(event) = session.next_event().await {
//!     match event? {
//!         StreamEvent::Data(event) => println!("{}", event.payload),
//!         StreamEvent::Done => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Error types and handling
//! - [`source`] - Cancellable byte source over a response body
//! - [`streaming`] - Decoder, frame splitter, payload formats and the session
//! - [`client`] - HTTP requests that open sessions
//! - [`chat`] / [`progress`] - Folding decoded events into application state
//! - [`metrics`] - Per-session counters

pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod progress;
pub mod source;
pub mod streaming;

pub use config::ClientConfig;
pub use error::{Result, StreamError};
