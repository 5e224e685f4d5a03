use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::config::Settings;
use crate::error::FetchError;

/// One fetched page. Transient: read once by the extractor, then dropped.
#[derive(Debug, Clone)]
pub struct Document {
    pub source_url: String,
    pub raw_markup: String,
    pub status: u16,
    pub content_type: Option<String>,
}

impl Document {
    /// A document read from disk, treated as a successful HTML fetch.
    pub fn local(source: impl Into<String>, markup: impl Into<String>) -> Self {
        Document {
            source_url: source.into(),
            raw_markup: markup.into(),
            status: 200,
            content_type: Some("text/html".to_string()),
        }
    }

    /// Only 200 responses with an HTML content type (or none declared)
    /// are worth parsing.
    pub fn ensure_html(&self) -> Result<(), FetchError> {
        if self.status != 200 {
            return Err(FetchError::Status {
                url: self.source_url.clone(),
                status: self.status,
            });
        }
        match &self.content_type {
            Some(ct) if !ct.to_ascii_lowercase().contains("html") => Err(FetchError::NotHtml {
                url: self.source_url.clone(),
                content_type: ct.clone(),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Document, FetchError>;
}

/// Plain GET with a fixed timeout and no retry.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.fetch_timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(HttpFetcher {
            client,
            timeout_secs: settings.fetch_timeout_secs,
        })
    }

    fn map_err(&self, url: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        let start = Instant::now();
        let response = self.client.get(url).send().await.map_err(|e| self.map_err(url, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let raw_markup = response.text().await.map_err(|e| self.map_err(url, e))?;

        debug!(
            url,
            status,
            bytes = raw_markup.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        Ok(Document {
            source_url: url.to_string(),
            raw_markup,
            status,
            content_type,
        })
    }
}
