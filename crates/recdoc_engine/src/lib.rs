//! Recdoc engine: fetching, extraction, rendering and template filling.
mod decode;
mod extract;
mod fetch;
mod filename;
mod links;
mod persist;
mod pipeline;
mod render;
mod template;
mod types;

pub use decode::{decode_html, decode_page, DecodeError, DecodedHtml};
pub use extract::{
    ContentBlock, ExtractedContent, ExtractionOptions, Extractor, Heading, ImageRef,
    StructuralExtractor,
};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher, DEFAULT_USER_AGENT};
pub use filename::{output_filename, page_name_from_url};
pub use links::resolve_reference;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pipeline::{Pipeline, PipelineError, Preview, RunError, RunOutput, RunRequest};
pub use render::{
    format_keywords, parse_volume, render_fields, render_metadata, DocumentContext, Keyword,
    KeywordParseError, RenderedFields, PLACEHOLDER_NAMES,
};
pub use template::{FilledDocument, Template, TemplateError};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput, PageDocument};
