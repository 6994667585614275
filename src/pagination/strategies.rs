//! Pagination strategy implementations

use super::types::{NextPage, PaginationState, Paginator};
use crate::types::{get_path, JsonObject};
use serde_json::Value;

// ============================================================================
// Page Token Pagination
// ============================================================================

/// Page token pagination used by `googleAds:search`.
///
/// Each response may carry a `nextPageToken`; the token is sent back as
/// `pageToken` in the next request body. A missing or empty token ends the
/// iteration.
#[derive(Debug, Clone)]
pub struct PageTokenPaginator {
    /// Request body field carrying the token
    pub token_param: String,
    /// Response path holding the next token
    pub token_path: String,
}

impl Default for PageTokenPaginator {
    fn default() -> Self {
        Self::new("pageToken", "nextPageToken")
    }
}

impl PageTokenPaginator {
    /// Create a new page token paginator
    pub fn new(token_param: impl Into<String>, token_path: impl Into<String>) -> Self {
        Self {
            token_param: token_param.into(),
            token_path: token_path.into(),
        }
    }
}

impl Paginator for PageTokenPaginator {
    fn initial_body_fields(&self, state: &PaginationState) -> JsonObject {
        let mut fields = JsonObject::new();
        if let Some(token) = &state.page_token {
            fields.insert(self.token_param.clone(), Value::String(token.clone()));
        }
        fields
    }

    fn process_response(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_page(records_count);

        match get_path(body, &self.token_path).and_then(Value::as_str) {
            Some(token) if !token.is_empty() => {
                state.set_page_token(token.to_string());
                NextPage::with_field(&self.token_param, token)
            }
            _ => {
                state.mark_done();
                NextPage::Done
            }
        }
    }
}
