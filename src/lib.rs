//! Relay between a browser front end and the Gemini API
//!
//! Forwards homework document analysis requests as a server-sent-event stream
//! and turns handwriting samples plus answer text into generated PNG images.

pub mod ai;
pub mod error;
pub mod image;
pub mod models;
pub mod prompts;
pub mod relay;
pub mod server;

pub use error::{Error, Result};
