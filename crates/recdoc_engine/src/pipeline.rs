use std::collections::VecDeque;

use recdoc_core::{update, AuthContext, ContentCounts, Effect, Msg, RunStage, RunState, Step};
use recdoc_logging::{engine_debug, engine_info, engine_warn};
use thiserror::Error;

use crate::decode::{decode_page, DecodeError};
use crate::extract::{ExtractedContent, ExtractionOptions, Extractor, StructuralExtractor};
use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::filename::output_filename;
use crate::render::{render_fields, DocumentContext, RenderedFields};
use crate::template::{FilledDocument, Template, TemplateError};
use crate::{FetchError, PageDocument};

/// Everything one run needs besides the template.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub url: String,
    pub options: ExtractionOptions,
    pub context: DocumentContext,
}

#[derive(Debug)]
pub struct RunOutput {
    pub document: FilledDocument,
    pub content: ExtractedContent,
    /// Suggested name for the saved document.
    pub filename: String,
    pub final_url: String,
    pub state: RunState,
}

/// Extracted content and its rendered fields, with no document built.
#[derive(Debug)]
pub struct Preview {
    pub content: ExtractedContent,
    pub fields: RenderedFields,
    pub final_url: String,
    /// Left at `RunStage::Extracted`.
    pub state: RunState,
}

impl RunOutput {
    /// Records that the caller saved the document.
    pub fn mark_delivered(&mut self) {
        let state = std::mem::take(&mut self.state);
        self.state = update(state, Msg::Delivered).0;
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("could not decode page: {0}")]
    Parse(#[from] DecodeError),
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error("{0}")]
    Rejected(String),
    #[error("run stopped at {0:?}")]
    Incomplete(RunStage),
    #[error("no template loaded; only previews are possible")]
    NoTemplate,
}

impl PipelineError {
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Fetch(err) => err.user_message(),
            other => other.to_string(),
        }
    }

    fn step(&self) -> Step {
        match self {
            PipelineError::Fetch(_) => Step::Fetch,
            PipelineError::Parse(_) => Step::Extract,
            PipelineError::Template(_) | PipelineError::NoTemplate => Step::Fill,
            PipelineError::Rejected(_) | PipelineError::Incomplete(_) => Step::Submit,
        }
    }
}

/// A failed run: the first error plus the run state it left behind.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunError {
    pub error: PipelineError,
    /// Always at `RunStage::Failed`.
    pub state: RunState,
}

impl RunError {
    pub fn user_message(&self) -> String {
        self.error.user_message()
    }
}

/// Fetch, extract and fill for one URL, sequenced by the core run state machine.
pub struct Pipeline {
    fetcher: Box<dyn Fetcher>,
    extractor: Box<dyn Extractor>,
    template: Option<Template>,
}

impl Pipeline {
    pub fn new(settings: FetchSettings, template: Template) -> Self {
        Self::with_parts(
            Box::new(ReqwestFetcher::new(settings)),
            Box::new(StructuralExtractor),
            template,
        )
    }

    /// For previews: fetch and extract work, filling fails with `NoTemplate`.
    pub fn without_template(settings: FetchSettings) -> Self {
        Self {
            fetcher: Box::new(ReqwestFetcher::new(settings)),
            extractor: Box::new(StructuralExtractor),
            template: None,
        }
    }

    pub fn with_parts(
        fetcher: Box<dyn Fetcher>,
        extractor: Box<dyn Extractor>,
        template: Template,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            template: Some(template),
        }
    }

    /// The first error any stage hits is returned as-is; nothing is retried.
    pub async fn run(
        &self,
        _auth: &AuthContext,
        request: RunRequest,
    ) -> Result<RunOutput, RunError> {
        let first = Msg::UrlSubmitted(request.url.clone());
        let progress = self.drive(first, None, &request, Goal::Filled).await?;
        progress.into_output()
    }

    /// Skips the network: `html` is treated as the page found at `request.url`.
    pub async fn run_with_html(
        &self,
        _auth: &AuthContext,
        html: &str,
        request: RunRequest,
    ) -> Result<RunOutput, RunError> {
        let (first, page) = pasted_page(html, &request);
        let progress = self.drive(first, Some(page), &request, Goal::Filled).await?;
        progress.into_output()
    }

    /// Fetches and extracts without touching the template.
    pub async fn preview(
        &self,
        _auth: &AuthContext,
        request: RunRequest,
    ) -> Result<Preview, RunError> {
        let first = Msg::UrlSubmitted(request.url.clone());
        let progress = self.drive(first, None, &request, Goal::Extracted).await?;
        progress.into_preview(&request.context)
    }

    pub async fn preview_html(
        &self,
        _auth: &AuthContext,
        html: &str,
        request: RunRequest,
    ) -> Result<Preview, RunError> {
        let (first, page) = pasted_page(html, &request);
        let progress = self.drive(first, Some(page), &request, Goal::Extracted).await?;
        progress.into_preview(&request.context)
    }

    async fn drive(
        &self,
        first: Msg,
        mut page: Option<PageDocument>,
        request: &RunRequest,
        goal: Goal,
    ) -> Result<Progress, RunError> {
        let (mut state, effects) = update(RunState::new(), first);
        if let Some(failure) = state.failure() {
            let error = PipelineError::Rejected(failure.message.clone());
            return Err(RunError { error, state });
        }
        let mut queue: VecDeque<Effect> = effects.into();
        let mut final_url = request.url.trim().to_string();
        let mut content: Option<ExtractedContent> = None;
        let mut document: Option<FilledDocument> = None;

        while let Some(effect) = queue.pop_front() {
            let outcome = match effect {
                Effect::Fetch { url } => self.fetch_page(&url).await.map(|fetched| {
                    let msg = Msg::Fetched {
                        final_url: fetched.final_url.clone(),
                        bytes: fetched.byte_len(),
                    };
                    page = Some(fetched);
                    msg
                }),
                Effect::Extract => match page.take() {
                    Some(fetched) => {
                        final_url = fetched.final_url.clone();
                        let extracted = self.extractor.extract(
                            &fetched.html,
                            Some(&fetched.final_url),
                            &request.options,
                        );
                        let counts = content_counts(&extracted);
                        content = Some(extracted);
                        Ok(Msg::Extracted(counts))
                    }
                    None => Err(PipelineError::Incomplete(state.stage())),
                },
                Effect::Fill if goal == Goal::Extracted => break,
                Effect::Fill => match content.as_ref() {
                    Some(extracted) => self.fill(extracted, &final_url, request).map(|filled| {
                        let msg = Msg::Filled {
                            bytes: filled.0.bytes.len() as u64,
                            filename: filled.1,
                        };
                        document = Some(filled.0);
                        msg
                    }),
                    None => Err(PipelineError::Incomplete(state.stage())),
                },
                Effect::Deliver { filename } => {
                    engine_debug!("document ready as {}", filename);
                    continue;
                }
            };

            let msg = match outcome {
                Ok(msg) => msg,
                Err(error) => return Err(fail(state, error)),
            };

            let before = state.stage();
            let (next, effects) = update(state, msg);
            state = next;
            if state.consume_dirty() {
                engine_info!("run {:?} -> {:?}", before, state.stage());
            }
            queue.extend(effects);
        }

        Ok(Progress {
            state,
            content,
            document,
            final_url,
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<PageDocument, PipelineError> {
        let output = self.fetcher.fetch(url).await?;
        let page = decode_page(output)?;
        engine_debug!(
            "decoded {} bytes as {} from {}",
            page.byte_len(),
            page.encoding_label,
            page.final_url
        );
        Ok(page)
    }

    fn fill(
        &self,
        content: &ExtractedContent,
        final_url: &str,
        request: &RunRequest,
    ) -> Result<(FilledDocument, String), PipelineError> {
        let fields = render_fields(content, final_url, &request.context);
        let template = self.template.as_ref().ok_or(PipelineError::NoTemplate)?;
        let document = template.fill(&fields)?;
        let page = fields.get("page").unwrap_or_default();
        let filename = output_filename(page, Some(request.context.client.as_str()));
        Ok((document, filename))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Goal {
    Extracted,
    Filled,
}

/// What a driven run produced before it stopped.
struct Progress {
    state: RunState,
    content: Option<ExtractedContent>,
    document: Option<FilledDocument>,
    final_url: String,
}

impl Progress {
    fn into_output(self) -> Result<RunOutput, RunError> {
        let filename = self.state.view().filename;
        match (self.state.stage(), self.document, self.content, filename) {
            (RunStage::Filled, Some(document), Some(content), Some(filename)) => Ok(RunOutput {
                document,
                content,
                filename,
                final_url: self.final_url,
                state: self.state,
            }),
            (stage, ..) => Err(fail(self.state, PipelineError::Incomplete(stage))),
        }
    }

    fn into_preview(self, context: &DocumentContext) -> Result<Preview, RunError> {
        match (self.state.stage(), self.content) {
            (RunStage::Extracted, Some(content)) => Ok(Preview {
                fields: render_fields(&content, &self.final_url, context),
                content,
                final_url: self.final_url,
                state: self.state,
            }),
            (stage, _) => Err(fail(self.state, PipelineError::Incomplete(stage))),
        }
    }
}

fn pasted_page(html: &str, request: &RunRequest) -> (Msg, PageDocument) {
    let page = PageDocument {
        requested_url: request.url.clone(),
        final_url: request.url.clone(),
        html: html.to_string(),
        encoding_label: "UTF-8".to_string(),
    };
    let first = Msg::HtmlSubmitted {
        url: request.url.clone(),
        bytes: page.byte_len(),
    };
    (first, page)
}

fn fail(state: RunState, error: PipelineError) -> RunError {
    let failed = Msg::Failed {
        step: error.step(),
        message: error.to_string(),
    };
    let (state, _) = update(state, failed);
    engine_warn!("run {}", state.view().summary());
    RunError { error, state }
}

fn content_counts(content: &ExtractedContent) -> ContentCounts {
    ContentCounts {
        headings: content.headings().count(),
        paragraphs: content.paragraphs().count(),
        images: content.images().count(),
        has_metadata: content.metadata.is_some(),
    }
}
