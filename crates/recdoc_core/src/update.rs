use crate::{Effect, Msg, RunStage, RunState, Step};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not fit the current stage are ignored, and terminal
/// stages accept nothing further.
pub fn update(mut state: RunState, msg: Msg) -> (RunState, Vec<Effect>) {
    if state.stage.is_terminal() {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::UrlSubmitted(raw) if state.stage == RunStage::NotStarted => {
            let url = raw.trim().to_string();
            if url.is_empty() {
                state.fail(Step::Submit, "please enter a URL".to_string());
                return (state, Vec::new());
            }
            state.requested_url = Some(url.clone());
            vec![Effect::Fetch { url }]
        }
        Msg::HtmlSubmitted { url, bytes } if state.stage == RunStage::NotStarted => {
            let url = url.trim().to_string();
            state.requested_url = Some(url.clone());
            state.final_url = Some(url);
            state.page_bytes = Some(bytes);
            state.advance(RunStage::Fetched);
            vec![Effect::Extract]
        }
        Msg::Fetched { final_url, bytes }
            if state.stage == RunStage::NotStarted && state.requested_url.is_some() =>
        {
            state.final_url = Some(final_url);
            state.page_bytes = Some(bytes);
            state.advance(RunStage::Fetched);
            vec![Effect::Extract]
        }
        Msg::Extracted(counts) if state.stage == RunStage::Fetched => {
            state.counts = Some(counts);
            state.advance(RunStage::Extracted);
            vec![Effect::Fill]
        }
        Msg::Filled { bytes, filename } if state.stage == RunStage::Extracted => {
            state.document_bytes = Some(bytes);
            state.filename = Some(filename.clone());
            state.advance(RunStage::Filled);
            vec![Effect::Deliver { filename }]
        }
        Msg::Delivered if state.stage == RunStage::Filled => {
            state.advance(RunStage::Done);
            Vec::new()
        }
        Msg::Failed { step, message } => {
            state.fail(step, message);
            Vec::new()
        }
        _ => Vec::new(),
    };

    (state, effects)
}
