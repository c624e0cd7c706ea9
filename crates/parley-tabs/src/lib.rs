//! Parley Tab Management
//!
//! Each open tab is bound to exactly one backend conversation. The manager
//! keeps the ordered tab list, the active pointer and the per-session message
//! caches consistent across open, close, switch and replace.
//!
//! All state lives in an explicit [`ChatState`] owned per logical UI session;
//! [`TabManager`] holds only configuration and collaborators.

mod error;
mod manager;
mod notify;
mod state;
mod tab;
mod title;

pub use error::TabError;
pub use manager::TabManager;
pub use notify::{Notifier, TracingNotifier};
pub use state::{
    ActiveTabInfo, ChatState, SessionKeys, CHAT_INPUT_KEY, FAQ_FLAG_KEY, TAB_SELECTOR_PREFIX,
};
pub use tab::{generate_session_id, Tab, NEW_CHAT_TITLE};
pub use title::{derive_fallback_title, title_from_prompt};

pub type Result<T> = std::result::Result<T, TabError>;
