use std::fmt;

use crate::view_model::RunView;

/// Lifecycle of one run: `NotStarted -> Fetched -> Extracted -> Filled -> Done`,
/// with `Failed` reachable from any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStage {
    #[default]
    NotStarted,
    Fetched,
    Extracted,
    Filled,
    Done,
    Failed,
}

impl RunStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStage::Done | RunStage::Failed)
    }
}

/// The pipeline step a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Submit,
    Fetch,
    Extract,
    Fill,
    Deliver,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Submit => write!(f, "submit"),
            Step::Fetch => write!(f, "fetch"),
            Step::Extract => write!(f, "extract"),
            Step::Fill => write!(f, "fill"),
            Step::Deliver => write!(f, "deliver"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentCounts {
    pub headings: usize,
    pub paragraphs: usize,
    pub images: usize,
    pub has_metadata: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    pub step: Step,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunState {
    pub(crate) stage: RunStage,
    pub(crate) requested_url: Option<String>,
    pub(crate) final_url: Option<String>,
    pub(crate) page_bytes: Option<u64>,
    pub(crate) counts: Option<ContentCounts>,
    pub(crate) document_bytes: Option<u64>,
    pub(crate) filename: Option<String>,
    pub(crate) failure: Option<RunFailure>,
    dirty: bool,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        self.failure.as_ref()
    }

    pub fn view(&self) -> RunView {
        RunView {
            stage: self.stage,
            requested_url: self.requested_url.clone(),
            final_url: self.final_url.clone(),
            page_bytes: self.page_bytes,
            counts: self.counts,
            document_bytes: self.document_bytes,
            filename: self.filename.clone(),
            failure: self.failure.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether the state changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn advance(&mut self, stage: RunStage) {
        self.stage = stage;
        self.dirty = true;
    }

    pub(crate) fn fail(&mut self, step: Step, message: String) {
        self.failure = Some(RunFailure { step, message });
        self.advance(RunStage::Failed);
    }
}
