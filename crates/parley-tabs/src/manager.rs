//! Tab Manager
//!
//! Lifecycle operations over a [`ChatState`]:
//!
//! - the tab list is never empty once initialized; closing the last tab
//!   swaps in a fresh chat
//! - session ids are unique across open tabs
//! - the active pointer stays in range
//! - every open session has a message cache entry, dropped when it closes
//! - at most `max_tabs` tabs are open

use std::sync::Arc;

use parley_session::{MessageRecord, SessionFetcher};

use crate::error::TabError;
use crate::notify::Notifier;
use crate::state::{ActiveTabInfo, ChatState, TAB_SELECTOR_PREFIX};
use crate::tab::{generate_session_id, Tab};
use crate::title::{derive_fallback_title, title_from_prompt};
use crate::Result;

/// User id used when recovering without a caller-supplied one
const DEFAULT_USER_ID: &str = "default_user";

pub struct TabManager {
    max_tabs: usize,
    fetcher: Arc<dyn SessionFetcher>,
    notifier: Arc<dyn Notifier>,
}

impl TabManager {
    pub fn new(
        max_tabs: usize,
        fetcher: Arc<dyn SessionFetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            max_tabs: max_tabs.max(1),
            fetcher,
            notifier,
        }
    }

    pub fn max_tabs(&self) -> usize {
        self.max_tabs
    }

    /// Bring `state` into a valid shape. Returns true if anything changed.
    pub fn initialize(&self, state: &mut ChatState) -> bool {
        let mut changed = false;

        if state.tabs.is_empty() {
            let session_id = generate_session_id();
            state.messages.insert(session_id.clone(), Vec::new());
            state.tabs.push(Tab::new_chat(session_id.clone()));
            state.active_index = 0;
            tracing::info!(session_id = %session_id, "Opened initial tab");
            changed = true;
        }

        for tab in &state.tabs {
            if !state.messages.contains_key(&tab.session_id) {
                state.messages.insert(tab.session_id.clone(), Vec::new());
                changed = true;
            }
        }

        if state.active_index >= state.tabs.len() {
            state.active_index = state.tabs.len() - 1;
            changed = true;
        }

        changed
    }

    /// Open a tab, either for a brand new chat (`session_id` is `None`) or
    /// bound to an existing backend session. Returns the new tab's index,
    /// which becomes active.
    pub fn add_tab(
        &self,
        state: &mut ChatState,
        user_id: &str,
        session_id: Option<&str>,
        title: Option<&str>,
    ) -> Result<usize> {
        self.ensure_capacity(state)?;

        let tab = match session_id {
            Some(id) if state.position_of(id).is_some() => {
                tracing::debug!(session_id = %id, "Session already open, not adding a tab");
                return Err(TabError::DuplicateSession(id.to_string()));
            }
            Some(id) => {
                let messages = self.load_session_messages(user_id, id);
                let title = match title {
                    Some(title) => title.to_string(),
                    None => derive_fallback_title(id, &messages),
                };
                state.messages.insert(id.to_string(), messages);
                Tab::new(id.to_string(), title)
            }
            None => {
                let id = generate_session_id();
                state.messages.insert(id.clone(), Vec::new());
                Tab::new_chat(id)
            }
        };

        tracing::info!(
            session_id = %tab.session_id,
            title = %tab.title,
            tab_count = state.tabs.len() + 1,
            "Added tab"
        );

        state.tabs.push(tab);
        state.active_index = state.tabs.len() - 1;

        Ok(state.active_index)
    }

    /// Switch to the tab holding `session_id`, or open it in a new tab.
    pub fn open_session(
        &self,
        state: &mut ChatState,
        session_id: &str,
        title: &str,
        user_id: &str,
    ) -> Result<usize> {
        if let Some(index) = state.position_of(session_id) {
            tracing::debug!(session_id, index, "Session already open, switching");
            state.active_index = index;
            return Ok(index);
        }

        let title = (!title.trim().is_empty()).then_some(title);
        self.add_tab(state, user_id, Some(session_id), title)
    }

    pub fn close_tab(&self, state: &mut ChatState, index: usize, user_id: &str) -> Result<()> {
        let len = state.tabs.len();
        if index >= len {
            tracing::warn!(index, len, "Cannot close tab: invalid index");
            return Err(TabError::InvalidIndex { index, len });
        }

        if len == 1 {
            let closed = state.tabs[0].session_id.clone();
            let fresh = generate_session_id();

            state.tabs = vec![Tab::new_chat(fresh.clone())];
            state.messages.clear();
            state.messages.insert(fresh.clone(), Vec::new());
            state.active_index = 0;

            state.forget_session(&closed);
            state.ui.purge_prefix(TAB_SELECTOR_PREFIX);

            tracing::info!(
                user_id,
                closed = %closed,
                opened = %fresh,
                "Closed last tab, replaced with a new chat"
            );
            return Ok(());
        }

        let active = state.active_index;
        if active == index {
            if index == len - 1 {
                state.active_index = index.saturating_sub(1);
            }
            // Otherwise the next tab slides into this slot and stays active
        } else if active > index {
            state.active_index = active - 1;
        }

        let removed = state.tabs.remove(index);
        state.forget_session(&removed.session_id);
        state.recently_closed.insert(removed.session_id.clone());
        state.ui.purge_prefix(TAB_SELECTOR_PREFIX);

        if state.active_index >= state.tabs.len() {
            state.active_index = state.tabs.len().saturating_sub(1);
        }

        tracing::info!(
            user_id,
            session_id = %removed.session_id,
            index,
            active_index = state.active_index,
            tab_count = state.tabs.len(),
            "Closed tab"
        );

        Ok(())
    }

    /// Make the tab at `index` active (tab selector change).
    pub fn switch_tab(&self, state: &mut ChatState, index: usize) -> Result<()> {
        let len = state.tabs.len();
        if index >= len {
            tracing::warn!(index, len, "Cannot switch tab: invalid index");
            return Err(TabError::InvalidIndex { index, len });
        }

        state.active_index = index;
        Ok(())
    }

    /// Rename the tab at `index`. Out-of-range indexes are ignored.
    pub fn update_tab_title(&self, state: &mut ChatState, index: usize, title: impl Into<String>) {
        match state.tabs.get_mut(index) {
            Some(tab) => tab.set_title(title.into()),
            None => tracing::warn!(index, "Cannot rename tab: invalid index"),
        }
    }

    /// Rebind the active tab to a fresh, empty session in place.
    pub fn start_new_chat_in_active_tab(&self, state: &mut ChatState, user_id: &str) {
        let Some(active) = self.active_tab_info(state) else {
            tracing::warn!(user_id, "No active tab, opening a new one");
            if let Err(e) = self.add_tab(state, DEFAULT_USER_ID, None, None) {
                tracing::error!("Failed to open recovery tab: {}", e);
            }
            return;
        };

        let fresh = generate_session_id();
        state.tabs[active.index].rebind(fresh.clone());
        state.messages.insert(fresh.clone(), Vec::new());
        state.forget_session(&active.session_id);

        tracing::info!(
            user_id,
            index = active.index,
            old_session_id = %active.session_id,
            session_id = %fresh,
            "Started new chat in active tab"
        );
    }

    pub fn active_tab_info(&self, state: &ChatState) -> Option<ActiveTabInfo> {
        state.active_tab()
    }

    /// Append a finished exchange to an open session. The first exchange
    /// of a session also names its tab after the prompt.
    pub fn record_exchange(
        &self,
        state: &mut ChatState,
        session_id: &str,
        message: MessageRecord,
    ) -> Result<()> {
        let index = state
            .position_of(session_id)
            .ok_or_else(|| TabError::NotFound(session_id.to_string()))?;

        let messages = state.messages.entry(session_id.to_string()).or_default();
        let title = if messages.is_empty() {
            title_from_prompt(&message.query)
        } else {
            None
        };
        messages.push(message);

        if let Some(title) = title {
            state.tabs[index].set_title(title);
        }

        Ok(())
    }

    fn ensure_capacity(&self, state: &ChatState) -> Result<()> {
        if state.tabs.len() >= self.max_tabs {
            let err = TabError::CapacityExceeded {
                max_tabs: self.max_tabs,
            };
            tracing::warn!(max_tabs = self.max_tabs, "Tab limit reached");
            self.notifier.warn(&err.to_string());
            return Err(err);
        }
        Ok(())
    }

    fn load_session_messages(&self, user_id: &str, session_id: &str) -> Vec<MessageRecord> {
        tracing::info!(session_id, "Loading messages for session");

        match self.fetcher.fetch_messages(user_id, session_id) {
            Ok(messages) if messages.is_empty() => {
                tracing::warn!(session_id, "No messages returned for session");
                messages
            }
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(session_id, error = %e, "Failed to load session messages");
                Vec::new()
            }
        }
    }
}
