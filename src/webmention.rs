use crate::config::AppSettings;
use crate::mention_filter::filter_mentions;
use crate::models::{Mention, MentionFeed};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, error, instrument, warn};
use url::Url;

#[derive(Error, Debug)]
pub enum WebmentionError {
    #[error("No site domain configured")]
    MissingDomain,
    #[error("No webmention API token configured")]
    MissingToken,
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {body}")]
    Api { status: StatusCode, body: String },
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("Failed to deserialize response: {0}")]
    Deserialization(reqwest::Error),
}

impl WebmentionError {
    /// True when the fetch was skipped because the build has no credentials or domain.
    pub fn is_missing_config(&self) -> bool {
        matches!(self, Self::MissingDomain | Self::MissingToken)
    }
}

/// Where fresh mentions come from. The pipeline only needs one call per build.
#[async_trait]
pub trait MentionSource: Send + Sync {
    /// Fetch accepted mentions newer than `since` (ISO-8601), oldest first.
    async fn fetch_mentions(
        &self,
        since: Option<&str>,
        per_page: u32,
    ) -> Result<Vec<Mention>, WebmentionError>;
}

#[derive(Debug)]
pub struct WebmentionApiClient {
    client: Client,
    api_url: Url,
    domain: Option<String>,
    api_token: Option<String>,
}

/// Host name of the site URL, which is what webmention.io keys mentions by.
pub fn site_domain(site_url: &str) -> Result<Option<String>, url::ParseError> {
    let url = Url::parse(site_url)?;
    Ok(url.host_str().map(str::to_string))
}

impl WebmentionApiClient {
    pub fn new(settings: &AppSettings) -> Result<Self, WebmentionError> {
        let api_url = Url::parse(&settings.api_url)?;

        let domain = match settings.site_url.as_deref() {
            Some(site_url) => match site_domain(site_url) {
                Ok(domain) => domain,
                Err(e) => {
                    warn!("Ignoring invalid site URL {:?}: {}", site_url, e);
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            client: Client::new(),
            api_url,
            domain,
            api_token: settings.api_token.clone(),
        })
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }
}

#[async_trait]
impl MentionSource for WebmentionApiClient {
    #[instrument(skip(self))]
    async fn fetch_mentions(
        &self,
        since: Option<&str>,
        per_page: u32,
    ) -> Result<Vec<Mention>, WebmentionError> {
        let domain = self.domain.as_deref().ok_or(WebmentionError::MissingDomain)?;
        let token = self
            .api_token
            .as_deref()
            .ok_or(WebmentionError::MissingToken)?;

        debug!("Fetching webmentions from: {}", self.api_url);

        let per_page = per_page.to_string();
        let mut request = self.client.get(self.api_url.clone()).query(&[
            ("domain", domain),
            ("token", token),
            ("sort-dir", "up"),
            ("per-page", per_page.as_str()),
        ]);
        if let Some(since) = since {
            request = request.query(&[("since", since)]);
        }

        let response = request.send().await.map_err(WebmentionError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error body: {}", e));
            error!("Webmention API Error: {} - {}", status, body);
            return Err(WebmentionError::Api { status, body });
        }

        let feed = response
            .json::<MentionFeed>()
            .await
            .map_err(WebmentionError::Deserialization)?;

        let received = feed.children.len();
        let accepted = filter_mentions(feed.children);
        debug!(
            "Received {} webmentions, {} accepted",
            received,
            accepted.len()
        );

        Ok(accepted)
    }
}
