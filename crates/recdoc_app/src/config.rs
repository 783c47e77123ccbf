use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use recdoc_core::DEFAULT_PASSWORD_ENV;
use recdoc_engine::{ExtractionOptions, FetchSettings, DEFAULT_USER_AGENT};
use recdoc_logging::engine_info;
use serde::{Deserialize, Serialize};

use crate::logging::LogDestination;

pub const DEFAULT_CONFIG_FILENAME: &str = "recdoc.ron";

/// Settings read once at startup from a RON file. Every field is optional in
/// the file; missing ones take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    /// Environment variable that holds the access password.
    pub password_env: String,
    pub fetch: FetchConfig,
    pub extraction: ExtractionConfig,
    pub render: RenderConfig,
    pub log_destination: LogDestination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub exclude_selectors: Vec<String>,
    pub noise_phrases: Vec<String>,
    pub strip_before_first_heading: bool,
    pub annotate_links: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub agency: String,
    pub include_image_sources: bool,
    pub include_metadata: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("template.docx"),
            output_dir: PathBuf::from("output"),
            password_env: DEFAULT_PASSWORD_ENV.to_string(),
            fetch: FetchConfig::default(),
            extraction: ExtractionConfig::default(),
            render: RenderConfig::default(),
            log_destination: LogDestination::Terminal,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        let settings = FetchSettings::default();
        Self {
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            request_timeout_secs: settings.request_timeout.as_secs(),
            redirect_limit: settings.redirect_limit,
            max_bytes: settings.max_bytes,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let recommended = ExtractionOptions::recommended();
        Self {
            exclude_selectors: recommended.exclude_selectors,
            noise_phrases: recommended.noise_phrases,
            strip_before_first_heading: false,
            annotate_links: false,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            agency: String::new(),
            include_image_sources: false,
            include_metadata: true,
        }
    }
}

impl AppConfig {
    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()))
            }
        };
        let config: Self = ron::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        engine_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.fetch.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.fetch.request_timeout_secs),
            redirect_limit: self.fetch.redirect_limit,
            max_bytes: self.fetch.max_bytes,
            user_agent: self.fetch.user_agent.clone(),
            ..FetchSettings::default()
        }
    }

    pub fn extraction_options(&self) -> ExtractionOptions {
        ExtractionOptions {
            exclude_selectors: self.extraction.exclude_selectors.clone(),
            strip_before_first_heading: self.extraction.strip_before_first_heading,
            annotate_links: self.extraction.annotate_links,
            noise_phrases: self.extraction.noise_phrases.clone(),
        }
    }
}
