//! Google Custom Search JSON API client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};

/// The default Custom Search API base URL.
pub const CUSTOM_SEARCH_API_BASE: &str = "https://www.googleapis.com";

/// A single related-paper hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaperHit {
    /// Page title.
    pub title: String,
    /// Result URL.
    pub link: String,
    /// Short description.
    pub snippet: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Deserialize)]
struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Keyword search for papers related to a topic.
///
/// # Example
///
/// ```rust,ignore
/// use buddy_search::{PaperSearch, SearchConfig};
///
/// let search = PaperSearch::new(api_key, engine_id, SearchConfig::default())?;
/// let hits = search.search("graph neural networks").await?;
/// ```
#[derive(Debug, Clone)]
pub struct PaperSearch {
    http: reqwest::Client,
    api_key: String,
    engine_id: String,
    base_url: String,
    config: SearchConfig,
}

impl PaperSearch {
    /// Create a client for the search engine `engine_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for empty credentials or an invalid
    /// configuration.
    pub fn new(
        api_key: impl Into<String>,
        engine_id: impl Into<String>,
        config: SearchConfig,
    ) -> Result<Self> {
        let api_key = api_key.into();
        let engine_id = engine_id.into();
        if api_key.is_empty() || engine_id.is_empty() {
            return Err(SearchError::Config(
                "search API key and engine id must not be empty".to_string(),
            ));
        }
        config.validate()?;
        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            engine_id,
            base_url: CUSTOM_SEARCH_API_BASE.to_string(),
            config,
        })
    }

    /// Point the client at a different API base (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn query_params(&self, topic: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", format!("Research Papers on Topic: {topic}")),
            ("key", self.api_key.clone()),
            ("cx", self.engine_id.clone()),
            ("num", self.config.max_results.to_string()),
            ("safe", self.config.safesearch.as_param().to_string()),
        ];
        let (country, language) = self.config.locale();
        if let Some(country) = country {
            params.push(("gl", country.to_string()));
        }
        if let Some(language) = language {
            params.push(("hl", language.to_string()));
        }
        if let Some(limit) = self.config.timelimit {
            params.push(("dateRestrict", limit.as_param().to_string()));
        }
        params
    }

    /// Search for papers on `topic`.
    ///
    /// Returns an empty list when nothing matched or the daily quota is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// - [`SearchError::Request`] on transport failure
    /// - [`SearchError::Api`] on any other non-success status
    /// - [`SearchError::Decode`] on an unexpected body
    pub async fn search(&self, topic: &str) -> Result<Vec<PaperHit>> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), self.config.backend.path());
        debug!(topic, backend = ?self.config.backend, "searching for papers");

        let response = self
            .http
            .get(&url)
            .query(&self.query_params(topic))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "search request failed");
                SearchError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_quota_exhausted(status, &body) {
                warn!(%status, "search quota exhausted, returning no results");
                return Ok(Vec::new());
            }
            error!(%status, "search API error");
            return Err(SearchError::Api { status: status.as_u16(), message: body });
        }

        let body: SearchResponse =
            response.json().await.map_err(|e| SearchError::Decode(e.to_string()))?;
        if body.items.is_empty() {
            debug!(topic, "search returned no items");
        }
        Ok(body
            .items
            .into_iter()
            .map(|item| PaperHit { title: item.title, link: item.link, snippet: item.snippet })
            .collect())
    }
}

fn is_quota_exhausted(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    if status != StatusCode::FORBIDDEN {
        return false;
    }
    let body = body.to_ascii_lowercase();
    ["ratelimitexceeded", "dailylimitexceeded", "quota"]
        .iter()
        .any(|reason| body.contains(reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SafeSearch;

    fn search(config: SearchConfig) -> PaperSearch {
        PaperSearch::new("key", "engine", config).unwrap()
    }

    #[test]
    fn default_parameters() {
        let params = search(SearchConfig::default()).query_params("transformers");
        let get = |name: &str| params.iter().find(|(k, _)| *k == name).map(|(_, v)| v.as_str());
        assert_eq!(get("q"), Some("Research Papers on Topic: transformers"));
        assert_eq!(get("num"), Some("5"));
        assert_eq!(get("safe"), Some("active"));
        assert_eq!(get("gl"), Some("us"));
        assert_eq!(get("hl"), Some("en"));
        assert_eq!(get("dateRestrict"), Some("m1"));
    }

    #[test]
    fn optional_parameters_are_omitted() {
        let config = SearchConfig {
            region: "wt-wt".into(),
            safesearch: SafeSearch::Off,
            timelimit: None,
            ..Default::default()
        };
        let params = search(config).query_params("x");
        let names: Vec<&str> = params.iter().map(|(k, _)| *k).collect();
        assert!(!names.contains(&"gl"));
        assert!(!names.contains(&"dateRestrict"));
        assert!(params.contains(&("safe", "off".to_string())));
    }

    #[test]
    fn quota_detection() {
        assert!(is_quota_exhausted(StatusCode::TOO_MANY_REQUESTS, ""));
        assert!(is_quota_exhausted(
            StatusCode::FORBIDDEN,
            r#"{"error": {"errors": [{"reason": "dailyLimitExceeded"}]}}"#
        ));
        assert!(!is_quota_exhausted(StatusCode::FORBIDDEN, "API key not valid"));
        assert!(!is_quota_exhausted(StatusCode::INTERNAL_SERVER_ERROR, "quota"));
    }

    #[test]
    fn rejects_missing_credentials() {
        assert!(matches!(
            PaperSearch::new("", "engine", SearchConfig::default()),
            Err(SearchError::Config(_))
        ));
    }
}
