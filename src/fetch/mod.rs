// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::{Client, ClientBuilder};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::dates::DateToken;

/// Something that can turn a URL into a rendered HTML document.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    async fn load(&self, url: &Url) -> Result<String>;
}

/// Plain HTTP page loads. The lake-level table is rendered server-side, so
/// the response body is the document the extractor reads.
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = client_builder(cfg)
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }
}

fn client_builder(cfg: &Config) -> ClientBuilder {
    Client::builder()
        .user_agent(cfg.user_agent.as_str())
        .timeout(cfg.page_timeout())
        .cookie_store(true)
        .gzip(true)
}

impl PageSource for HttpSource {
    async fn load(&self, url: &Url) -> Result<String> {
        debug!("Fetching text from {}", url);
        self.client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Non-success status {}", url))?
            .text()
            .await
            .with_context(|| format!("Reading text from {}", url))
    }
}

/// `<base>?date=<DD-MM-YYYY>`, keeping any query the base already carries.
pub fn date_url(base: &Url, date: &DateToken) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().append_pair("date", date.as_str());
    url
}

/// Whether `err` was caused by a request timing out.
pub fn is_timeout(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .is_some_and(|e| e.is_timeout())
    })
}
