//! User intents deposited by the UI layer

use parley_tabs::ActiveTabInfo;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// Close button on a tab header
    CloseTab { index: usize },
    /// "New tab" in the sidebar
    NewTab,
    /// "New chat": replace the active tab's conversation
    StartNewChat,
    /// A session picked from the history list
    OpenSession { session_id: String, title: String },
    /// Tab selector change
    SwitchTab { index: usize },
}

impl Intent {
    /// Order of application within one render cycle. Closes run first so
    /// indexes refer to the tab list the user was looking at.
    pub(crate) fn priority(&self) -> u8 {
        match self {
            Intent::CloseTab { .. } => 0,
            Intent::NewTab => 1,
            Intent::StartNewChat => 2,
            Intent::OpenSession { .. } => 3,
            Intent::SwitchTab { .. } => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderOutcome {
    /// State changed; the UI should redraw
    pub rerun: bool,
    /// Tab to render
    pub active: Option<ActiveTabInfo>,
}
