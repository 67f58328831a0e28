//! `docquery-reconciler` library crate.
//!
//! Keeps one client-side view of an analytics job current by merging a
//! push channel (completion subscription) and a pull channel (fallback
//! poll) into a single event loop. The console binary lives in `main.rs`.

pub mod config;
pub mod error;
pub mod events;
pub mod reconciler;
pub mod render;
pub mod session;
pub mod view;

pub use config::{ClientConfig, ReconcilerConfig};
pub use error::ConfigError;
pub use error::{ChannelFailure, FetchError, ReconciliationError, SubmissionError};
pub use events::{ReconcilerEvent, TimerEvent, UpdateSource};
pub use reconciler::Reconciler;
pub use view::{JobView, PollOutcome};
