//! Pagination module
//!
//! Supports: page token (Google Ads search)
//!
//! # Overview
//!
//! Each strategy inspects a response body and decides which fields the next
//! request body needs, or that pagination is complete.

mod strategies;
mod types;

pub use strategies::PageTokenPaginator;
pub use types::{NextPage, PaginationState, Paginator};
