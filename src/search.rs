use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::info;

use crate::config::{QueryLanguage, Settings};
use crate::error::RunError;

static RESULT_LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.result__a").unwrap());

const REDIRECT_PARAM: &str = "uddg";

/// Query sent to the search backend for one entity + year.
pub fn compose_query(entity: &str, year: &str, language: QueryLanguage) -> String {
    match language {
        QueryLanguage::Fr => format!("{} produits fonctionnalités {}", entity.trim(), year.trim()),
        QueryLanguage::En => format!("{} products features {}", entity.trim(), year.trim()),
    }
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Ordered result URLs, at most `max`. Zero hits is `Ok(vec![])`; an
    /// unreachable backend is `RunError::SearchUnavailable`.
    async fn search(&self, query: &str, max: usize) -> Result<Vec<String>, RunError>;
}

/// DuckDuckGo's HTML results page; no API key needed.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    endpoint: Url,
}

impl DuckDuckGoSearch {
    pub fn new(settings: &Settings) -> Result<Self, RunError> {
        let endpoint = Url::parse(&settings.search_endpoint)
            .map_err(|e| RunError::Config(format!("search_endpoint: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.fetch_timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| RunError::SearchUnavailable(e.to_string()))?;
        Ok(DuckDuckGoSearch { client, endpoint })
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoSearch {
    async fn search(&self, query: &str, max: usize) -> Result<Vec<String>, RunError> {
        let url = Url::parse_with_params(self.endpoint.as_str(), &[("q", query)])
            .map_err(|e| RunError::Config(e.to_string()))?;

        info!("Searching: {}", query);
        let html = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RunError::SearchUnavailable(e.to_string()))?
            .text()
            .await
            .map_err(|e| RunError::SearchUnavailable(e.to_string()))?;

        let urls = parse_results(&html, &self.endpoint, max);
        info!("Search returned {} URLs", urls.len());
        Ok(urls)
    }
}

/// A fixed URL list supplied by the caller instead of a search.
pub struct StaticUrls(pub Vec<String>);

#[async_trait]
impl SearchBackend for StaticUrls {
    async fn search(&self, _query: &str, max: usize) -> Result<Vec<String>, RunError> {
        Ok(self.0.iter().take(max).cloned().collect())
    }
}

/// Pull result links out of a results page, unwrapping redirect links,
/// dropping non-http(s) and duplicate targets, capped at `max`.
fn parse_results(html: &str, base: &Url, max: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for anchor in document.select(&RESULT_LINK_SEL) {
        if urls.len() >= max {
            break;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(target) = resolve_target(href, base) else {
            continue;
        };
        if seen.insert(target.clone()) {
            urls.push(target);
        }
    }
    urls
}

fn resolve_target(href: &str, base: &Url) -> Option<String> {
    let url = base.join(href).ok()?;
    let target = match url.query_pairs().find(|(k, _)| k == REDIRECT_PARAM) {
        Some((_, v)) => Url::parse(&v).ok()?,
        None => url,
    };
    let is_web = matches!(target.scheme(), "http" | "https");
    let is_ad = target.domain().is_some_and(|d| d.ends_with("duckduckgo.com"));
    (is_web && !is_ad).then(|| target.to_string())
}
