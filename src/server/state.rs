//! Server state shared across handlers.

use std::sync::Arc;

use crate::service::StickyPrintService;

/// Application state shared across handlers.
pub struct AppState {
    pub service: Arc<StickyPrintService>,
}

impl AppState {
    pub fn new(service: Arc<StickyPrintService>) -> Self {
        Self { service }
    }
}
