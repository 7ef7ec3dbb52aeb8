//! Layer stack orchestration: the single-writer state container and its patch types.

/// Partial-update types.
pub mod patch;
/// [`state::MockupStore`] and its events.
pub mod state;
