// src/ai/mod.rs
pub mod connector;
pub mod gemini;
pub mod result;

pub use connector::AiConnector;
pub use gemini::{GeminiClient, GeminiSettings};
pub use result::{AnalysisResult, FailureReason};
