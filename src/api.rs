//! HTTP API
//!
//! Thin presentation layer over the conversation runtime: handlers validate
//! and dispatch events; all conversation state of record lives in the
//! runtime.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::llm::ModelRegistry;
use crate::runtime::SessionHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
    pub models: Arc<ModelRegistry>,
}

impl AppState {
    pub fn new(session: SessionHandle, models: Arc<ModelRegistry>) -> Self {
        Self { session, models }
    }
}
