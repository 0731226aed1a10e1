// Listing-page fetcher with a fixed browser identity. Both sites vary their
// markup by client fingerprint, so the header set is part of the contract.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};
use url::Url;

use crate::error::{Result, SourceError};

/// Seam between the adapters and the network; implemented by [`PageFetcher`]
/// and by test stubs.
#[async_trait]
pub trait FetchPage: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "hu-HU,hu;q=0.9,en;q=0.8";

pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    pub fn new(timeout: Duration) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(ACCEPT_HTML),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static(ACCEPT_LANGUAGE),
        );
        Self {
            client: reqwest::Client::builder()
                .user_agent(BROWSER_USER_AGENT)
                .default_headers(headers)
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Fetch one document. Redirect loops on a bare-domain URL get a single
    /// retry against the `www.`-prefixed host (site quirk: the apex redirects
    /// to itself for some client fingerprints). Failure is never fatal to the
    /// caller; every call site downgrades errors to warnings.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        match self.get_text(url).await {
            Err(SourceError::RedirectLoop { .. }) => {
                if let Some(www_url) = www_variant(url) {
                    warn!(url, "Redirect loop on bare domain, retrying www host");
                    self.get_text(&www_url).await
                } else {
                    Err(SourceError::RedirectLoop { url: url.to_string() })
                }
            }
            other => other,
        }
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        info!(url, "Fetching page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            warn!(url, status = status.as_u16(), "Unexpected response status");
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| classify(url, e))?;
        info!(url, bytes = body.len(), "Fetched successfully");
        Ok(body)
    }
}

#[async_trait]
impl FetchPage for PageFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        PageFetcher::fetch(self, url).await
    }
}

fn classify(url: &str, error: reqwest::Error) -> SourceError {
    if error.is_timeout() {
        SourceError::Timeout { url: url.to_string() }
    } else if error.is_redirect() {
        SourceError::RedirectLoop { url: url.to_string() }
    } else {
        SourceError::Fetch {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}

/// `https://mafab.hu/x` → `https://www.mafab.hu/x`. None when the host
/// already carries a `www.` prefix or the URL does not parse.
pub(crate) fn www_variant(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if host.starts_with("www.") {
        return None;
    }
    let www_host = format!("www.{host}");
    parsed.set_host(Some(&www_host)).ok()?;
    Some(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::www_variant;

    #[test]
    fn www_variant_prefixes_bare_domains() {
        assert_eq!(
            www_variant("https://mafab.hu/filmek/filmek/").as_deref(),
            Some("https://www.mafab.hu/filmek/filmek/")
        );
    }

    #[test]
    fn www_variant_leaves_www_hosts_alone() {
        assert_eq!(www_variant("https://www.mafab.hu/filmek/filmek/"), None);
    }
}
