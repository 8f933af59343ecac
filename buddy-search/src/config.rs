//! Search parameters.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// Upper bound the Custom Search API accepts for `num`.
pub const MAX_RESULTS_LIMIT: usize = 10;

/// Safe-search filtering level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    /// Strict filtering.
    On,
    /// Filter explicit results.
    #[default]
    Moderate,
    /// No filtering.
    Off,
}

impl SafeSearch {
    /// The `safe` query value.
    pub fn as_param(self) -> &'static str {
        match self {
            Self::On | Self::Moderate => "active",
            Self::Off => "off",
        }
    }
}

/// How recent hits must be.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimeLimit {
    /// Past day.
    #[serde(rename = "d")]
    Day,
    /// Past week.
    #[serde(rename = "w")]
    Week,
    /// Past month.
    #[serde(rename = "m")]
    Month,
    /// Past year.
    #[serde(rename = "y")]
    Year,
}

impl TimeLimit {
    /// The `dateRestrict` query value.
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Day => "d1",
            Self::Week => "w1",
            Self::Month => "m1",
            Self::Year => "y1",
        }
    }
}

/// Which Custom Search endpoint to call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// `/customsearch/v1`.
    #[default]
    #[serde(alias = "api", alias = "html", alias = "lite")]
    Auto,
    /// `/customsearch/v1/siterestrict`, for engines restricted to a site list.
    SiteRestricted,
}

impl Backend {
    /// Path of the endpoint relative to the API base.
    pub fn path(self) -> &'static str {
        match self {
            Self::Auto => "customsearch/v1",
            Self::SiteRestricted => "customsearch/v1/siterestrict",
        }
    }
}

/// Parameters applied to every search.
///
/// Defaults: region `us-en`, moderate safe search, past month, auto backend,
/// five results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    /// `{country}-{language}`, e.g. `us-en`. `wt-wt` means no restriction.
    pub region: String,
    /// Safe-search filtering.
    pub safesearch: SafeSearch,
    /// Recency restriction; `None` searches all time.
    pub timelimit: Option<TimeLimit>,
    /// Endpoint selection.
    pub backend: Backend,
    /// Number of hits requested, `1..=10`.
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            region: "us-en".to_string(),
            safesearch: SafeSearch::Moderate,
            timelimit: Some(TimeLimit::Month),
            backend: Backend::Auto,
            max_results: 5,
        }
    }
}

impl SearchConfig {
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `max_results` is outside `1..=10`.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_RESULTS_LIMIT).contains(&self.max_results) {
            return Err(SearchError::Config(format!(
                "max_results must be between 1 and {MAX_RESULTS_LIMIT}, got {}",
                self.max_results
            )));
        }
        Ok(())
    }

    /// Country (`gl`) and language (`hl`) derived from `region`.
    pub fn locale(&self) -> (Option<&str>, Option<&str>) {
        let mut parts = self.region.splitn(2, '-');
        let country = parts.next().filter(|c| !c.is_empty() && *c != "wt");
        let language = parts.next().filter(|l| !l.is_empty() && *l != "wt");
        (country, language)
    }
}
