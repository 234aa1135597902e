//! Completion service implementations

pub mod genai;

// Re-export for convenience
pub use genai::{GenerativeAi, RestBackend};
