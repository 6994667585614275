//! Pagination types and traits

use crate::types::JsonObject;
use serde_json::Value;

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq)]
pub enum NextPage {
    /// More pages available; merge these fields into the next request body
    Continue {
        /// Request body fields to add or replace
        body_fields: JsonObject,
    },
    /// No more pages
    Done,
}

impl NextPage {
    /// Create a continuation with a single body field
    pub fn with_field(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut body_fields = JsonObject::new();
        body_fields.insert(key.into(), value.into());
        Self::Continue { body_fields }
    }

    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Check if this is a continue result
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue { .. })
    }
}

/// Tracks pagination state during iteration
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Pages processed so far
    pub pages: u32,
    /// Token for the next page
    pub page_token: Option<String>,
    /// Total records fetched so far
    pub total_fetched: u64,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
        self.page_token = None;
    }

    /// Record a processed page
    pub fn add_page(&mut self, records: usize) {
        self.pages += 1;
        self.total_fetched += records as u64;
    }

    /// Set the next page token
    pub fn set_page_token(&mut self, token: String) {
        self.page_token = Some(token);
    }
}

/// Core trait for pagination strategies
pub trait Paginator: Send + Sync {
    /// Body fields for the first request
    fn initial_body_fields(&self, state: &PaginationState) -> JsonObject;

    /// Process a response and determine if there's a next page
    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage;
}
