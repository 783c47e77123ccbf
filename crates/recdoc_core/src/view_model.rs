use crate::{ContentCounts, RunFailure, RunStage};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunView {
    pub stage: RunStage,
    pub requested_url: Option<String>,
    pub final_url: Option<String>,
    pub page_bytes: Option<u64>,
    pub counts: Option<ContentCounts>,
    pub document_bytes: Option<u64>,
    pub filename: Option<String>,
    pub failure: Option<RunFailure>,
    pub dirty: bool,
}

impl RunView {
    /// One-line status suitable for a terminal or a log record.
    pub fn summary(&self) -> String {
        match self.stage {
            RunStage::Failed => match &self.failure {
                Some(failure) => format!("failed at {}: {}", failure.step, failure.message),
                None => "failed".to_string(),
            },
            RunStage::Done => format!(
                "done: {} ({} bytes)",
                self.filename.as_deref().unwrap_or("document"),
                self.document_bytes.unwrap_or(0)
            ),
            stage => format!("{stage:?}"),
        }
    }
}
