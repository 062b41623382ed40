//! State module for tracking leaf progress
//!
//! A leaf is one city of one category. Its pagination is driven by a small
//! state machine whose transitions are checked at runtime.
//!
//! # Components
//!
//! - `LeafState`: The states of the per-city loop (list page, record selected, ...)
//! - `LeafCursor`: Current state plus page number, rejecting invalid transitions

mod leaf_state;

// Re-export main types
pub use leaf_state::{LeafCursor, LeafState};
