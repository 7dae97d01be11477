// src/ai/connector.rs
use crate::encode::EncodedImage;

use super::result::AnalysisResult;

/// Trait defining the interface for remote image analysis
pub trait AiConnector: Send + Sync {
    /// Ask the model about one image. Failures come back as `AnalysisResult::Failure`.
    fn analyze(&self, image: &EncodedImage, instruction: &str) -> AnalysisResult;

    /// Model identifier, for logs
    fn model_name(&self) -> &str;
}
