use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::fetch::request::{default_features, AnnotateRequest, Feature};
use crate::fetch::{AnnotateResponse, Annotator};

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";
pub const DEFAULT_KEY_FILE: &str = "google-api-key";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
    pub features: Vec<Feature>,
}

impl FetchConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
            timeout: Duration::from_secs(60),
            features: default_features(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features = features;
        self
    }
}

/// An explicit key wins; otherwise the first line of `key_file`.
pub fn load_api_key(explicit: Option<String>, key_file: &Path) -> Result<String> {
    if let Some(key) = explicit.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
        return Ok(key);
    }
    let key = fs::read_to_string(key_file)
        .with_context(|| format!("no API key given and failed to read {}", key_file.display()))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("API key file is empty: {}", key_file.display());
    }
    Ok(key.to_string())
}

/// Blocking client for the `images:annotate` endpoint.
pub struct VisionClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl VisionClient {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .with_context(|| "failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

impl Annotator for VisionClient {
    fn annotate(&self, request: &AnnotateRequest) -> Result<AnnotateResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .with_context(|| format!("request to {} failed", self.endpoint))?;

        let status = response.status();
        if status == StatusCode::OK {
            let body = response
                .bytes()
                .with_context(|| "failed to read response body")?;
            return Ok(AnnotateResponse::Success { body: body.to_vec() });
        }

        Ok(AnnotateResponse::Rejected {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            body: response.text().unwrap_or_default(),
        })
    }
}
