// src/config.rs
use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::ai::gemini::{GeminiSettings, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::encode::{ImageEncoder, DEFAULT_MAX_DIMENSION};

pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_BASE_URL: &str = "SNAPSOLVE_BASE_URL";
pub const ENV_MODEL: &str = "SNAPSOLVE_MODEL";

/// Solve the academic question in the picture, answer only; say so if there is none
pub const DEFAULT_INSTRUCTION: &str = "Bu görüntüdeki matematik, fen, edebiyat veya diğer akademik soruyu analiz et ve çöz. Sadece sorunun cevabını ver, açıklama yapma. Eğer görüntüde soru yoksa 'Görüntüde soru bulunamadı' yaz.";

#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_dimension: u32,
    pub instruction: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: 30,
            max_dimension: DEFAULT_MAX_DIMENSION,
            instruction: DEFAULT_INSTRUCTION.to_string(),
        }
    }
}

// keeps the key out of logs
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_dimension", &self.max_dimension)
            .field("instruction", &self.instruction)
            .finish()
    }
}

impl AppConfig {
    /// Defaults, then the optional TOML file, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_toml_str(&text)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        debug!("Effective configuration: {:?}", config);
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Overlay values from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.trim().is_empty()) {
            self.model = model;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be greater than zero"));
        }
        if self.max_dimension == 0 {
            return Err(anyhow!("max_dimension must be greater than zero"));
        }
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must not be empty"));
        }
        if self.instruction.trim().is_empty() {
            return Err(anyhow!("instruction must not be empty"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn encoder(&self) -> ImageEncoder {
        ImageEncoder::new(self.max_dimension)
    }

    pub fn gemini_settings(&self) -> Result<GeminiSettings> {
        let api_key = self
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No API key configured. Set {} or pass --api-key.",
                    ENV_API_KEY
                )
            })?;

        Ok(GeminiSettings {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key,
            timeout: self.timeout(),
        })
    }
}
