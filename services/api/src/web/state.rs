//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use learning_assistant_core::pipeline::LearningPipeline;
use learning_assistant_core::ports::{AccountStore, LearningStore};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountStore>,
    pub store: Arc<dyn LearningStore>,
    pub pipeline: Arc<LearningPipeline>,
    pub config: Arc<Config>,
}
