use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;

use serde_json::Value;

use crate::extract::{ContentBlock, ExtractedContent};
use crate::filename::page_name_from_url;

/// Every placeholder name the filler knows how to replace.
pub const PLACEHOLDER_NAMES: &[&str] = &[
    "headings",
    "paragraphs",
    "images",
    "metadata",
    "body",
    "title",
    "title_length",
    "description",
    "description_length",
    "page",
    "url",
    "date",
    "client",
    "agency",
    "keywords",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    pub term: String,
    pub volume: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeywordParseError {
    #[error("expected keyword=volume, got {0:?}")]
    MissingVolume(String),
    #[error("keyword must not be empty")]
    EmptyTerm,
    #[error("unrecognised search volume {0:?}")]
    BadVolume(String),
}

impl FromStr for Keyword {
    type Err = KeywordParseError;

    /// Parses `term=volume`, e.g. `red shoes=1.2k`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (term, volume) = raw
            .rsplit_once('=')
            .ok_or_else(|| KeywordParseError::MissingVolume(raw.to_string()))?;
        let term = term.trim();
        if term.is_empty() {
            return Err(KeywordParseError::EmptyTerm);
        }
        let volume =
            parse_volume(volume).ok_or_else(|| KeywordParseError::BadVolume(volume.to_string()))?;
        Ok(Self {
            term: term.to_string(),
            volume,
        })
    }
}

/// Accepts `1200`, `1,200`, `1.2k` and `3M`.
pub fn parse_volume(raw: &str) -> Option<u64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    let (number, multiplier) = match cleaned.chars().last()? {
        'k' => (&cleaned[..cleaned.len() - 1], 1_000.0),
        'm' => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };
    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier).round() as u64)
}

/// Highest volume first; ties keep their given order.
pub fn format_keywords(keywords: &[Keyword]) -> String {
    let mut sorted: Vec<&Keyword> = keywords.iter().collect();
    sorted.sort_by(|a, b| b.volume.cmp(&a.volume));
    sorted
        .iter()
        .map(|kw| format!("{} ({})", kw.term, kw.volume))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Per-run values that do not come from the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContext {
    /// Already formatted, `DD/MM/YYYY`.
    pub date: String,
    pub client: String,
    pub agency: String,
    pub keywords: Vec<Keyword>,
    pub include_image_sources: bool,
    pub include_metadata: bool,
}

impl Default for DocumentContext {
    fn default() -> Self {
        Self {
            date: String::new(),
            client: String::new(),
            agency: String::new(),
            keywords: Vec::new(),
            include_image_sources: false,
            include_metadata: true,
        }
    }
}

/// Placeholder name to replacement text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedFields(BTreeMap<String, String>);

impl RenderedFields {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

pub fn render_fields(content: &ExtractedContent, url: &str, ctx: &DocumentContext) -> RenderedFields {
    let mut fields = RenderedFields::default();

    let title = content.title.clone().unwrap_or_default();
    let description = content.description.clone().unwrap_or_default();
    let page = content
        .page_name
        .clone()
        .unwrap_or_else(|| page_name_from_url(url));
    let metadata = match (&content.metadata, ctx.include_metadata) {
        (Some(value), true) => render_metadata(value),
        _ => String::new(),
    };

    fields.insert("headings", render_headings(content));
    fields.insert("paragraphs", content.paragraphs().collect::<Vec<_>>().join("\n\n"));
    fields.insert("images", render_images(content, ctx.include_image_sources));
    fields.insert("metadata", metadata);
    fields.insert("body", render_body(content, ctx.include_image_sources));
    fields.insert("title_length", title.chars().count().to_string());
    fields.insert("title", title);
    fields.insert("description_length", description.chars().count().to_string());
    fields.insert("description", description);
    fields.insert("page", page);
    fields.insert("url", url);
    fields.insert("date", ctx.date.clone());
    fields.insert("client", ctx.client.clone());
    fields.insert("agency", ctx.agency.clone());
    fields.insert("keywords", format_keywords(&ctx.keywords));
    fields
}

fn render_headings(content: &ExtractedContent) -> String {
    content
        .headings()
        .map(|h| format!("{}{}", "  ".repeat(usize::from(h.level.saturating_sub(1))), h.text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_images(content: &ExtractedContent, with_sources: bool) -> String {
    content
        .images()
        .map(|image| match (&image.src, with_sources) {
            (Some(src), true) => format!("{} ({})", image.alt, src),
            _ => image.alt.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_body(content: &ExtractedContent, with_sources: bool) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(content.blocks.len());
    for block in &content.blocks {
        match block {
            ContentBlock::Heading(h) => {
                if h.level > 1 && !lines.is_empty() {
                    lines.push(String::new());
                }
                lines.push(format!("<h{}> {}", h.level, h.text));
            }
            ContentBlock::Paragraph(text) => lines.push(format!("<p> {text}")),
            ContentBlock::Image(image) => {
                let mut line = format!("<img alt=\"{}\"", escape_quotes(&image.alt));
                if let (Some(src), true) = (&image.src, with_sources) {
                    let _ = write!(line, " src=\"{}\"", escape_quotes(src));
                }
                line.push('>');
                lines.push(line);
            }
        }
    }
    lines.join("\n")
}

fn escape_quotes(value: &str) -> String {
    value.replace('"', "\\\"")
}

/// One `path: value` line per leaf, keys sorted, e.g. `author.name: Ada` or `image[0]: a.png`.
pub fn render_metadata(value: &Value) -> String {
    let mut lines = Vec::new();
    flatten_into(value, String::new(), &mut lines);
    lines.join("\n")
}

fn flatten_into(value: &Value, path: String, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (key, child) in entries {
                let next = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                flatten_into(child, next, out);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                flatten_into(child, format!("{path}[{idx}]"), out);
            }
        }
        Value::String(text) => out.push(leaf(&path, text)),
        other => out.push(leaf(&path, &other.to_string())),
    }
}

fn leaf(path: &str, value: &str) -> String {
    if path.is_empty() {
        value.to_string()
    } else {
        format!("{path}: {value}")
    }
}
