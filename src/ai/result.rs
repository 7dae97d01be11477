// src/ai/result.rs
use thiserror::Error;

use crate::capture::CaptureError;
use crate::encode::EncodingError;

/// Why a cycle produced no answer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("capture failed: {0}")]
    Capture(String),
    #[error("image encoding failed: {0}")]
    Encoding(String),
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("endpoint answered with HTTP {0}")]
    NonSuccessStatus(u16),
    #[error("response did not contain an answer")]
    MalformedResponse,
}

impl FailureReason {
    /// Text shown to the user in the status label and error popup
    pub fn user_message(&self) -> String {
        match self {
            FailureReason::Capture(detail) => format!("Fotoğraf çekerken hata: {}", detail),
            FailureReason::Encoding(detail) => format!("Görüntü işleme hatası: {}", detail),
            FailureReason::Timeout => "İstek zaman aşımına uğradı".to_string(),
            FailureReason::Connection(_) => "İnternet bağlantısı hatası".to_string(),
            FailureReason::NonSuccessStatus(code) => format!("API Hatası: {}", code),
            FailureReason::MalformedResponse => "API'dan cevap alınamadı".to_string(),
        }
    }
}

impl From<CaptureError> for FailureReason {
    fn from(err: CaptureError) -> Self {
        FailureReason::Capture(err.to_string())
    }
}

impl From<EncodingError> for FailureReason {
    fn from(err: EncodingError) -> Self {
        FailureReason::Encoding(err.to_string())
    }
}

/// Outcome of one analysis, consumed exactly once by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisResult {
    Answer(String),
    Failure(FailureReason),
}

impl AnalysisResult {
    pub fn is_answer(&self) -> bool {
        matches!(self, AnalysisResult::Answer(_))
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            AnalysisResult::Answer(text) => Some(text),
            AnalysisResult::Failure(_) => None,
        }
    }
}

impl From<FailureReason> for AnalysisResult {
    fn from(reason: FailureReason) -> Self {
        AnalysisResult::Failure(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_carry_status_codes() {
        assert_eq!(FailureReason::NonSuccessStatus(503).user_message(), "API Hatası: 503");
        assert_eq!(FailureReason::Timeout.user_message(), "İstek zaman aşımına uğradı");
    }

    #[test]
    fn encoding_errors_convert() {
        let reason: FailureReason = EncodingError::Empty.into();
        assert_eq!(reason, FailureReason::Encoding("frame has no pixels".to_string()));
    }
}
