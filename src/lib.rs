//! # Scriptoria
//!
//! Client core for a streaming document Q&A service.
//!
//! ## Overview
//!
//! The service answers uploads and questions with a newline-delimited stream
//! of `data: {json}` records. This library turns that byte stream into typed
//! session state:
//!
//! - **ChunkBuffer** - reassembles records from arbitrary transport fragments
//! - **EventFrameParser** - decodes one record into a typed event
//! - **SessionMachine** - tracks an upload or query session to its terminal state
//! - **StreamConsumer** - drives a session lazily from a fragment stream
//! - **normalize** - makes the final answer's math markup renderer-safe
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use scriptoria::client::{Backend, HttpBackend};
//! use scriptoria::config::ClientConfig;
//! use scriptoria::consumer::StreamConsumer;
//! use scriptoria::conversation::ConversationLog;
//! use scriptoria::session::{SessionKind, SessionState};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let consumer = StreamConsumer::new(config.stream.clone());
//! let backend = HttpBackend::new(config)?;
//!
//! let log = ConversationLog::new();
//! let source = backend.ask(&log.request("What is the ground state energy?")).await?;
//!
//! let mut session = consumer.open(SessionKind::Query, source);
//! while let Some(state) = session.next().await {
//!     if let SessionState::Complete(outcome) = state {
//!         println!("{}", outcome.answer().map(|a| a.as_str()).unwrap_or_default());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`streaming`] - Record reassembly and event frame parsing
//! - [`session`] - Upload and query session state machines
//! - [`consumer`] - Lazy session streams over fragment sources
//! - [`normalize`] - Math markup normalization pipeline
//! - [`client`] - Backend trait and HTTP implementation
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Error types and handling

pub mod client;
pub mod config;
pub mod consumer;
pub mod conversation;
pub mod error;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod render;
pub mod session;
pub mod streaming;
pub mod validation;

pub use config::ClientConfig;
pub use consumer::{SessionStream, StreamConsumer};
pub use error::{ClientError, Result};
pub use normalize::{NormalizedText, normalize};
pub use session::{Outcome, SessionKind, SessionMachine, SessionState};
