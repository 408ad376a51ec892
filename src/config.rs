// src/config.rs

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_BASE_URL: &str = "https://cmwssb.tn.gov.in/lake-level";
pub const DEFAULT_TABLE_SELECTOR: &str =
    "table.lack-view.table.table-responsive.table-striped.table-bordered";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

static FULL_HEADERS: &[&str] = &[
    "RESERVOIR",
    "Full Tank Level (ft.)",
    "Full Capacity (mcft)",
    "Level (ft)",
    "Storage (mcft)",
    "Storage Level (%)",
    "Inflow (cusecs)",
    "Outflow (cusecs)",
    "Rainfall (mm)",
    "Storage as on same day last year (mcft)",
];

static LEVEL_HEADERS: &[&str] = &["RESERVOIR", "Level (ft)"];

/// Preset header lists and file names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    /// Every column the lake-level table publishes.
    #[default]
    Full,
    /// Reservoir name and current level only.
    Level,
}

/// What to do when a later date exposes a different header subset than the
/// one recorded from the first successful date.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SchemaPolicy {
    /// Realign the rows to the recorded schema by header name.
    #[default]
    Align,
    /// Drop the rows of that date.
    Strict,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub base_url: String,
    pub table_selector: String,
    pub headers: Vec<String>,
    pub input: PathBuf,
    pub output: PathBuf,
    pub settle_delay_ms: u64,
    pub politeness_delay_ms: u64,
    pub page_timeout_secs: u64,
    pub user_agent: String,
    pub schema_policy: SchemaPolicy,
}

/// Partial config as read from YAML; every present key replaces the profile value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    pub table_selector: Option<String>,
    pub headers: Option<Vec<String>>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub settle_delay_ms: Option<u64>,
    pub politeness_delay_ms: Option<u64>,
    pub page_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub schema_policy: Option<SchemaPolicy>,
}

impl Default for Config {
    fn default() -> Self {
        Self::for_profile(Profile::default())
    }
}

impl Config {
    pub fn for_profile(profile: Profile) -> Self {
        let (headers, input, output) = match profile {
            Profile::Full => (FULL_HEADERS, "datesn.xlsx", "lake_level_extract.xlsx"),
            Profile::Level => (LEVEL_HEADERS, "poondi.xlsx", "poondi_level.xlsx"),
        };
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            table_selector: DEFAULT_TABLE_SELECTOR.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            input: PathBuf::from(input),
            output: PathBuf::from(output),
            settle_delay_ms: 2_000,
            politeness_delay_ms: 2_000,
            page_timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            schema_policy: SchemaPolicy::default(),
        }
    }

    /// Profile defaults, overlaid with the YAML file at `path` if one is given.
    pub fn load(profile: Profile, path: Option<&Path>) -> Result<Self> {
        let mut cfg = Self::for_profile(profile);
        if let Some(path) = path {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let file = Self::parse_file(&text)
                .with_context(|| format!("parsing config {}", path.display()))?;
            cfg.apply(file);
        }
        Ok(cfg)
    }

    pub fn parse_file(text: &str) -> Result<ConfigFile> {
        // an empty document deserializes to unit, not a map
        if text.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn apply(&mut self, file: ConfigFile) {
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.table_selector {
            self.table_selector = v;
        }
        if let Some(v) = file.headers {
            self.headers = v;
        }
        if let Some(v) = file.input {
            self.input = v;
        }
        if let Some(v) = file.output {
            self.output = v;
        }
        if let Some(v) = file.settle_delay_ms {
            self.settle_delay_ms = v;
        }
        if let Some(v) = file.politeness_delay_ms {
            self.politeness_delay_ms = v;
        }
        if let Some(v) = file.page_timeout_secs {
            self.page_timeout_secs = v;
        }
        if let Some(v) = file.user_agent {
            self.user_agent = v;
        }
        if let Some(v) = file.schema_policy {
            self.schema_policy = v;
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }
}
