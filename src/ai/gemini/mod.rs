pub mod analyze;
pub mod client;
pub mod error;
pub mod handwriting;
pub mod types;

pub use analyze::GeminiAnalysisClient;
pub use client::GeminiHttpClient;
pub use handwriting::GeminiHandwritingClient;
