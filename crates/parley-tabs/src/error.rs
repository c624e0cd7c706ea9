//! Tab error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TabError {
    #[error("Maximum {max_tabs} tabs allowed. Please close a tab first.")]
    CapacityExceeded { max_tabs: usize },

    #[error("Session already open in a tab: {0}")]
    DuplicateSession(String),

    #[error("Invalid tab index {index} ({len} tabs open)")]
    InvalidIndex { index: usize, len: usize },

    #[error("No open tab for session: {0}")]
    NotFound(String),
}
