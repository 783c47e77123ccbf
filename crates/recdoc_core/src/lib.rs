//! Recdoc core: pure run state machine, auth gate and view-model helpers.
mod auth;
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use auth::{AuthContext, AuthError, AuthGate, DEFAULT_PASSWORD_ENV};
pub use effect::Effect;
pub use msg::Msg;
pub use state::{ContentCounts, RunFailure, RunStage, RunState, Step};
pub use update::update;
pub use view_model::RunView;
