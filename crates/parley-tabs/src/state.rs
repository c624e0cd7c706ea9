//! Per-user-session chat state
//!
//! One `ChatState` exists per logical UI session (one browser tab of one
//! user). Nothing here is global; the UI layer owns the value and lends it
//! to the `TabManager` for each render cycle.

use std::collections::{BTreeSet, HashMap, HashSet};

use parley_session::MessageRecord;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::tab::Tab;

/// Reserved prefix for the tab-selector widget's cached selection
pub const TAB_SELECTOR_PREFIX: &str = "tab_selector_";
/// Per-session chat input widget value
pub const CHAT_INPUT_KEY: &str = "chat_input";
/// Per-session "suggested question was just clicked" flag
pub const FAQ_FLAG_KEY: &str = "faq_just_clicked";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveTabInfo {
    pub session_id: String,
    pub title: String,
    pub index: usize,
}

/// UI-local values, with an explicit registry of which keys belong to
/// which session so closing a tab removes exactly those keys.
#[derive(Debug, Default, Clone)]
pub struct SessionKeys {
    values: HashMap<String, Value>,
    owned: HashMap<String, BTreeSet<String>>,
}

impl SessionKeys {
    pub fn session_key(name: &str, session_id: &str) -> String {
        format!("{name}_{session_id}")
    }

    /// Store a value derived from `session_id` and register its key.
    pub fn set_for_session(&mut self, session_id: &str, name: &str, value: Value) -> String {
        let key = Self::session_key(name, session_id);
        self.owned
            .entry(session_id.to_string())
            .or_default()
            .insert(key.clone());
        self.values.insert(key.clone(), value);
        key
    }

    pub fn get_for_session(&self, session_id: &str, name: &str) -> Option<&Value> {
        self.values.get(&Self::session_key(name, session_id))
    }

    pub fn take_for_session(&mut self, session_id: &str, name: &str) -> Option<Value> {
        let key = Self::session_key(name, session_id);
        if let Some(keys) = self.owned.get_mut(session_id) {
            keys.remove(&key);
            if keys.is_empty() {
                self.owned.remove(session_id);
            }
        }
        self.values.remove(&key)
    }

    /// Store a value not tied to any session
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn registered_keys(&self, session_id: &str) -> impl Iterator<Item = &str> {
        self.owned
            .get(session_id)
            .into_iter()
            .flat_map(|keys| keys.iter().map(String::as_str))
    }

    /// Drop every key registered to `session_id`. Keys already gone are skipped.
    pub fn release_session(&mut self, session_id: &str) -> usize {
        let Some(keys) = self.owned.remove(session_id) else {
            return 0;
        };
        keys.iter()
            .filter(|key| self.values.remove(key.as_str()).is_some())
            .count()
    }

    pub fn purge_prefix(&mut self, prefix: &str) -> usize {
        let before = self.values.len();
        self.values.retain(|key, _| !key.starts_with(prefix));
        before - self.values.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Default, Clone)]
pub struct ChatState {
    pub(crate) tabs: Vec<Tab>,
    pub(crate) active_index: usize,
    pub(crate) messages: HashMap<String, Vec<MessageRecord>>,
    pub(crate) drafts: HashMap<String, String>,
    pub(crate) ui: SessionKeys,
    pub(crate) recently_closed: HashSet<String>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active_tab(&self) -> Option<ActiveTabInfo> {
        let tab = self.tabs.get(self.active_index)?;
        Some(ActiveTabInfo {
            session_id: tab.session_id.clone(),
            title: tab.title.clone(),
            index: self.active_index,
        })
    }

    pub fn position_of(&self, session_id: &str) -> Option<usize> {
        self.tabs.iter().position(|t| t.session_id == session_id)
    }

    pub fn messages(&self, session_id: &str) -> Option<&[MessageRecord]> {
        self.messages.get(session_id).map(Vec::as_slice)
    }

    /// Session ids with a cached message list
    pub fn cached_sessions(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    pub fn draft(&self, session_id: &str) -> Option<&str> {
        self.drafts.get(session_id).map(String::as_str)
    }

    pub fn set_draft(&mut self, session_id: &str, text: impl Into<String>) {
        self.drafts.insert(session_id.to_string(), text.into());
    }

    pub fn ui(&self) -> &SessionKeys {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut SessionKeys {
        &mut self.ui
    }

    pub fn was_recently_closed(&self, session_id: &str) -> bool {
        self.recently_closed.contains(session_id)
    }

    /// Widget key for the tab selector. Changes whenever the set or order
    /// of open tabs changes, so the widget re-derives its selection.
    pub fn selector_key(&self) -> String {
        let mut hasher = Sha256::new();
        for tab in &self.tabs {
            hasher.update(tab.session_id.as_bytes());
            hasher.update([0u8]);
        }
        let digest = hasher.finalize();
        let short: String = digest[..6].iter().map(|b| format!("{b:02x}")).collect();
        format!("{TAB_SELECTOR_PREFIX}{}_{short}", self.tabs.len())
    }

    /// The selector's cached selection, seeded from the active pointer.
    pub fn selector_selection(&mut self) -> usize {
        let key = self.selector_key();
        let active = self.active_index;
        match self.ui.get(&key).and_then(Value::as_u64) {
            Some(selected) => selected as usize,
            None => {
                self.ui.set(key, Value::from(active));
                active
            }
        }
    }

    /// Remove everything held for `session_id`: message cache, draft and
    /// registered UI keys.
    pub(crate) fn forget_session(&mut self, session_id: &str) {
        let had_messages = self.messages.remove(session_id).is_some();
        let had_draft = self.drafts.remove(session_id).is_some();
        let released_keys = self.ui.release_session(session_id);

        tracing::debug!(
            session_id,
            had_messages,
            had_draft,
            released_keys,
            "Cleaned up session state"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_release_is_exact() {
        let mut keys = SessionKeys::default();
        keys.set_for_session("session_1", CHAT_INPUT_KEY, json!("draft"));
        keys.set_for_session("session_1", FAQ_FLAG_KEY, json!(true));
        // One id is a substring of the other
        keys.set_for_session("session_12", CHAT_INPUT_KEY, json!("other"));
        keys.set("theme", json!("light"));

        assert_eq!(keys.release_session("session_1"), 2);
        assert!(keys.get_for_session("session_12", CHAT_INPUT_KEY).is_some());
        assert!(keys.contains("theme"));
        assert_eq!(keys.release_session("session_1"), 0);
    }

    #[test]
    fn test_release_tolerates_missing_values() {
        let mut keys = SessionKeys::default();
        let key = keys.set_for_session("s", FAQ_FLAG_KEY, json!(true));
        keys.remove(&key);
        assert_eq!(keys.release_session("s"), 0);
        assert_eq!(keys.registered_keys("s").count(), 0);
    }

    #[test]
    fn test_take_unregisters() {
        let mut keys = SessionKeys::default();
        keys.set_for_session("s", FAQ_FLAG_KEY, json!(true));
        assert_eq!(keys.take_for_session("s", FAQ_FLAG_KEY), Some(json!(true)));
        assert_eq!(keys.registered_keys("s").count(), 0);
        assert!(keys.is_empty());
    }

    #[test]
    fn test_purge_prefix() {
        let mut keys = SessionKeys::default();
        keys.set("tab_selector_2_abc", json!(1));
        keys.set("tab_selector_3_def", json!(0));
        keys.set("tab_title", json!("x"));
        assert_eq!(keys.purge_prefix(TAB_SELECTOR_PREFIX), 2);
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn test_selector_key_tracks_tabs() {
        let mut state = ChatState::new();
        state.tabs.push(Tab::new_chat("a".to_string()));
        let one = state.selector_key();
        assert!(one.starts_with("tab_selector_1_"));

        state.tabs.push(Tab::new_chat("b".to_string()));
        let two = state.selector_key();
        assert_ne!(one, two);

        state.tabs.swap(0, 1);
        assert_ne!(two, state.selector_key());
    }

    #[test]
    fn test_selector_selection_seeds_from_active() {
        let mut state = ChatState::new();
        state.tabs.push(Tab::new_chat("a".to_string()));
        state.tabs.push(Tab::new_chat("b".to_string()));
        state.active_index = 1;

        assert_eq!(state.selector_selection(), 1);
        state.active_index = 0;
        // Cached until the key changes or is purged
        assert_eq!(state.selector_selection(), 1);
        state.ui.purge_prefix(TAB_SELECTOR_PREFIX);
        assert_eq!(state.selector_selection(), 0);
    }

    #[test]
    fn test_active_tab_out_of_range() {
        let mut state = ChatState::new();
        assert!(state.active_tab().is_none());
        state.tabs.push(Tab::new_chat("a".to_string()));
        state.active_index = 3;
        assert!(state.active_tab().is_none());
    }
}
