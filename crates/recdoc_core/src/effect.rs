/// Work the pipeline must perform after a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Fetch { url: String },
    Extract,
    Fill,
    Deliver { filename: String },
}
