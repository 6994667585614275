//! State management module
//!
//! Tracks per-stream bookmarks so incremental streams resume where the
//! previous run stopped.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - Singer bookmark document
//! - `StateManager` - Shared state with optional file persistence

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{Bookmark, State};
