use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::RunError;

const DEFAULT_FILE: &str = "mindmap";
const ENV_PREFIX: &str = "MINDMAP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryLanguage {
    Fr,
    En,
}

/// Upper word-count bound per candidate origin. Headings tolerate more words
/// than the fragments cut out of running text.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WordLimits {
    pub heading: usize,
    pub list_item: usize,
    pub segmented_text: usize,
    pub keyword: usize,
}

impl Default for WordLimits {
    fn default() -> Self {
        WordLimits {
            heading: 10,
            list_item: 8,
            segmented_text: 6,
            keyword: 6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    pub max_results: usize,
    pub query_language: QueryLanguage,
    pub search_endpoint: String,
    pub fallback_bucket: String,
    pub word_limits: WordLimits,
    pub filter_headings: bool,
    pub linguistic_filter: bool,
    pub enrich_max_chars: usize,
    pub summary_sentences: usize,
    pub keyword_count: usize,
    pub label_max_chars: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            fetch_timeout_secs: 10,
            user_agent: concat!("product_mindmap/", env!("CARGO_PKG_VERSION")).to_string(),
            max_results: 10,
            query_language: QueryLanguage::Fr,
            search_endpoint: "https://html.duckduckgo.com/html/".to_string(),
            fallback_bucket: "Fonctionnalités diverses".to_string(),
            word_limits: WordLimits::default(),
            filter_headings: true,
            linguistic_filter: true,
            enrich_max_chars: 2000,
            summary_sentences: 3,
            keyword_count: 5,
            label_max_chars: 50,
        }
    }
}

impl Settings {
    /// Defaults, then `mindmap.toml` (or `path`), then `MINDMAP_*` env vars.
    pub fn load(path: Option<&Path>) -> Result<Self, RunError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_FILE).required(false),
        };
        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), RunError> {
        if self.fallback_bucket.trim().is_empty() {
            return Err(RunError::Config("fallback_bucket must not be empty".into()));
        }
        if self.label_max_chars == 0 {
            return Err(RunError::Config("label_max_chars must be positive".into()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(RunError::Config("fetch_timeout_secs must be positive".into()));
        }
        Ok(())
    }
}
