// src/session.rs

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use url::Url;

use crate::config::Config;
use crate::dates::DateToken;
use crate::extract::{extract_table, Extraction};
use crate::fetch::{date_url, is_timeout, PageSource};

/// What one date produced. Every extracted row ends with the date itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateBlock {
    pub date: DateToken,
    pub extraction: Extraction,
}

impl DateBlock {
    pub fn empty(date: DateToken) -> Self {
        Self {
            date,
            extraction: Extraction::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.extraction.is_empty()
    }
}

/// One page source plus everything needed to scrape a date with it.
/// The source is held for the life of the session and released on drop.
pub struct Session<S> {
    source: S,
    base_url: Url,
    table_selector: String,
    headers: Vec<String>,
    settle_delay: Duration,
    politeness_delay: Duration,
}

impl<S: PageSource> Session<S> {
    pub fn new(source: S, cfg: &Config) -> Result<Self> {
        let base_url = Url::parse(&cfg.base_url)
            .with_context(|| format!("parsing base URL {}", cfg.base_url))?;
        info!(base = %base_url, "session opened");
        Ok(Self {
            source,
            base_url,
            table_selector: cfg.table_selector.clone(),
            headers: cfg.headers.clone(),
            settle_delay: cfg.settle_delay(),
            politeness_delay: cfg.politeness_delay(),
        })
    }

    #[cfg(test)]
    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    /// Pause the batch loop applies after every date.
    pub fn politeness_delay(&self) -> Duration {
        self.politeness_delay
    }

    /// Load the page for `date` and extract the configured columns.
    /// Load failures and timeouts come back as an empty block.
    pub async fn scrape_date(&self, date: &DateToken) -> DateBlock {
        let url = date_url(&self.base_url, date);
        info!(date = %date, "scraping {}", url);

        let html = match self.source.load(&url).await {
            Ok(html) => html,
            Err(e) if is_timeout(&e) => {
                warn!(date = %date, "timeout waiting for page to load");
                return DateBlock::empty(date.clone());
            }
            Err(e) => {
                warn!(date = %date, error = %format!("{e:#}"), "error loading page");
                return DateBlock::empty(date.clone());
            }
        };

        sleep(self.settle_delay).await;

        let mut extraction = extract_table(&html, &self.table_selector, &self.headers);
        if extraction.is_empty() {
            info!(date = %date, "no data found");
            return DateBlock::empty(date.clone());
        }
        for row in &mut extraction.rows {
            row.push(date.to_string());
        }
        DateBlock {
            date: date.clone(),
            extraction,
        }
    }
}

impl<S> Drop for Session<S> {
    fn drop(&mut self) {
        info!("session closed");
    }
}
