use crate::{ContentCounts, Step};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Caller submitted a URL to fetch.
    UrlSubmitted(String),
    /// Caller supplied the page HTML directly; the fetch is skipped.
    HtmlSubmitted { url: String, bytes: u64 },
    /// Fetcher returned the page body.
    Fetched { final_url: String, bytes: u64 },
    /// Extractor produced content.
    Extracted(ContentCounts),
    /// Template filler produced the document.
    Filled { bytes: u64, filename: String },
    /// Document handed back to the caller.
    Delivered,
    /// A step failed; the run stops here.
    Failed { step: Step, message: String },
}
