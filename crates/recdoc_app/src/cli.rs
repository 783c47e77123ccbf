use std::path::PathBuf;

use clap::Parser;
use recdoc_engine::{DocumentContext, Keyword, RunRequest};

use crate::config::{AppConfig, DEFAULT_CONFIG_FILENAME};

#[derive(Parser, Debug)]
#[command(name = "recdoc")]
#[command(about = "Build a content-recommendations document from one web page")]
#[command(version)]
pub struct Cli {
    /// Page to extract from
    pub url: String,

    /// Use a saved copy of the page instead of fetching it
    #[arg(long, value_name = "FILE")]
    pub html_file: Option<PathBuf>,

    /// CSS selector to drop before extraction (repeatable, added to the configured list)
    #[arg(long, value_name = "SELECTOR")]
    pub exclude: Vec<String>,

    /// Append link targets after link text
    #[arg(long)]
    pub annotate_links: bool,

    /// Ignore everything before the first heading
    #[arg(long)]
    pub strip_before_first_heading: bool,

    /// List image sources next to their alt text
    #[arg(long)]
    pub include_image_sources: bool,

    #[arg(long)]
    pub client: Option<String>,

    #[arg(long)]
    pub agency: Option<String>,

    /// Target keyword with its monthly search volume, e.g. "red shoes=1.2k"
    #[arg(long = "keyword", value_name = "KEYWORD=VOLUME")]
    pub keywords: Vec<Keyword>,

    /// Print the extracted title, description, body and metadata; no document is written
    #[arg(long)]
    pub preview: bool,

    /// DOCX template with {{placeholders}}
    #[arg(long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Directory the document is written to
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Flags win over the configuration file; boolean flags can only switch options on.
    pub fn run_request(&self, config: &AppConfig, date: String) -> RunRequest {
        let mut options = config.extraction_options();
        options.exclude_selectors.extend(self.exclude.iter().cloned());
        options.annotate_links |= self.annotate_links;
        options.strip_before_first_heading |= self.strip_before_first_heading;

        let context = DocumentContext {
            date,
            client: self.client.clone().unwrap_or_default(),
            agency: self
                .agency
                .clone()
                .unwrap_or_else(|| config.render.agency.clone()),
            keywords: self.keywords.clone(),
            include_image_sources: self.include_image_sources
                || config.render.include_image_sources,
            include_metadata: config.render.include_metadata,
        };

        RunRequest {
            url: self.url.clone(),
            options,
            context,
        }
    }

    pub fn template_path(&self, config: &AppConfig) -> PathBuf {
        self.template
            .clone()
            .unwrap_or_else(|| config.template_path.clone())
    }

    pub fn output_dir(&self, config: &AppConfig) -> PathBuf {
        self.out.clone().unwrap_or_else(|| config.output_dir.clone())
    }
}
