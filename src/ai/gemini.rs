// src/ai/gemini.rs
use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::connector::AiConnector;
use super::result::{AnalysisResult, FailureReason};
use crate::encode::EncodedImage;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Everything needed to reach a `generateContent` endpoint
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Single-shot client for Gemini's `generateContent` API
pub struct GeminiClient {
    endpoint: String,
    model_url: String,
    model: String,
    api_key: String,
    client: Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn new(instruction: &'a str, image: &'a EncodedImage) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text { text: instruction },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type,
                            data: &image.data,
                        },
                    },
                ],
            }],
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(settings: &GeminiSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(anyhow!("Gemini API key is not set"));
        }

        let base_url = settings.base_url.trim_end_matches('/');
        let model_url = format!("{}/models/{}", base_url, settings.model);
        let endpoint = format!("{}:generateContent", model_url);

        info!(
            "Initializing Gemini client: model {} at {} (timeout {:?})",
            settings.model, base_url, settings.timeout
        );

        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout.min(Duration::from_secs(10)))
            .build()?;

        Ok(Self {
            endpoint,
            model_url,
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Check that the key is accepted and the model exists
    pub fn check_model(&self) -> Result<()> {
        let response = self
            .client
            .get(&self.model_url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Model '{}' unavailable: HTTP {}",
                self.model,
                response.status().as_u16()
            ));
        }
        Ok(())
    }
}

impl AiConnector for GeminiClient {
    fn analyze(&self, image: &EncodedImage, instruction: &str) -> AnalysisResult {
        let request = GenerateRequest::new(instruction, image);

        info!(
            "Sending {}x{} image ({} base64 chars) to {}",
            image.width,
            image.height,
            image.data.len(),
            self.model
        );

        let response = match self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
        {
            Ok(response) => response,
            Err(e) => return transport_failure(&e).into(),
        };

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Gemini API answered with status {}", status);
            return FailureReason::NonSuccessStatus(status.as_u16()).into();
        }

        let body = match response.text() {
            Ok(body) => body,
            Err(e) => return transport_failure(&e).into(),
        };

        match extract_answer(&body) {
            Ok(answer) => {
                info!("Answer received ({} chars)", answer.len());
                AnalysisResult::Answer(answer)
            }
            Err(reason) => reason.into(),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn transport_failure(err: &reqwest::Error) -> FailureReason {
    if err.is_timeout() {
        warn!("Gemini request timed out");
        FailureReason::Timeout
    } else {
        warn!("Gemini request failed: {}", err);
        FailureReason::Connection(err.to_string())
    }
}

/// First candidate's first text part, verbatim
fn extract_answer(body: &str) -> Result<String, FailureReason> {
    let parsed: GenerateResponse = serde_json::from_str(body).map_err(|e| {
        debug!("Unparseable response body: {}", e);
        FailureReason::MalformedResponse
    })?;

    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| {
            warn!("Response carried no candidate text");
            FailureReason::MalformedResponse
        })
}
