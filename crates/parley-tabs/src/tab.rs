//! Tab data structure
//!
//! A tab is a UI slot bound to one backend session. Identity is the session id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const NEW_CHAT_TITLE: &str = "New Chat";

/// Titles longer than this are shortened in the tab selector
const LABEL_MAX_CHARS: usize = 15;
const LABEL_KEEP_CHARS: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    /// Backend session this tab is bound to
    pub session_id: String,
    /// Full title, shown in the tab header
    pub title: String,
    /// When the tab was opened or last rebound to a session
    pub opened_at: DateTime<Utc>,
}

impl Tab {
    pub fn new(session_id: String, title: String) -> Self {
        Self {
            session_id,
            title,
            opened_at: Utc::now(),
        }
    }

    /// A tab for a session that has no messages yet
    pub fn new_chat(session_id: String) -> Self {
        Self::new(session_id, NEW_CHAT_TITLE.to_string())
    }

    /// Bind the tab to a different session, keeping its slot
    pub fn rebind(&mut self, session_id: String) {
        tracing::debug!(
            from = %self.session_id,
            to = %session_id,
            "Rebinding tab"
        );

        self.session_id = session_id;
        self.title = NEW_CHAT_TITLE.to_string();
        self.opened_at = Utc::now();
    }

    pub fn set_title(&mut self, title: String) {
        self.title = title;
    }

    /// Label for the tab selector
    pub fn display_label(&self) -> String {
        if self.title.chars().count() > LABEL_MAX_CHARS {
            let kept: String = self.title.chars().take(LABEL_KEEP_CHARS).collect();
            format!("{kept}...")
        } else {
            self.title.clone()
        }
    }
}

/// Fresh application-unique session id: `session_` plus 8 hex digits.
pub fn generate_session_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("session_{}", &hex[..8])
}
