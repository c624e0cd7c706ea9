//! Chat application state container
//!
//! Holds one `ChatState` per logical UI session, keyed by the UI's own
//! session identity, so two users (or two browser tabs of one user) served
//! by the same process never see each other's tabs.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use parley_session::{HttpSessionFetcher, MessageRecord, SessionFetcher};
use parley_tabs::{ChatState, Notifier, TabManager, TracingNotifier};

use crate::config::Config;
use crate::intent::{Intent, RenderOutcome};
use crate::Result;

const NO_ACTIVE_CHATS: &str = "No active chats. Creating a new one.";

pub struct ChatApp {
    config: Config,
    tab_manager: TabManager,
    notifier: Arc<dyn Notifier>,
    /// UI session key -> that session's chat state
    states: RwLock<HashMap<String, Arc<Mutex<ChatState>>>>,
}

impl ChatApp {
    pub fn new(config: Config, fetcher: Arc<dyn SessionFetcher>, notifier: Arc<dyn Notifier>) -> Self {
        let tab_manager = TabManager::new(config.max_tabs, fetcher, Arc::clone(&notifier));

        Self {
            config,
            tab_manager,
            notifier,
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Wire up the HTTP session API from `config`. Notices go to the log.
    pub fn with_http_backend(config: Config, auth_token: Option<String>) -> Result<Self> {
        let mut fetcher = HttpSessionFetcher::new(
            config.backend_base_url.clone(),
            config.bot_id.clone(),
            config.subscription_key.clone(),
            config.request_timeout(),
        )?;
        if let Some(token) = auth_token {
            fetcher = fetcher.with_auth_token(token);
        }

        tracing::info!(
            backend = %config.backend_base_url,
            max_tabs = config.max_tabs,
            "Chat app configured"
        );

        Ok(Self::new(config, Arc::new(fetcher), Arc::new(TracingNotifier)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tab_manager(&self) -> &TabManager {
        &self.tab_manager
    }

    /// State for a UI session, created on first use.
    pub fn state_for(&self, ui_session: &str) -> Arc<Mutex<ChatState>> {
        if let Some(state) = self.states.read().get(ui_session) {
            return Arc::clone(state);
        }

        let mut states = self.states.write();
        let state = states.entry(ui_session.to_string()).or_insert_with(|| {
            tracing::debug!(ui_session, "Created chat state");
            Arc::new(Mutex::new(ChatState::new()))
        });
        Arc::clone(state)
    }

    /// Discard a UI session's state (logout, disconnect).
    pub fn drop_state(&self, ui_session: &str) -> bool {
        let removed = self.states.write().remove(ui_session).is_some();
        if removed {
            tracing::debug!(ui_session, "Dropped chat state");
        }
        removed
    }

    pub fn ui_session_count(&self) -> usize {
        self.states.read().len()
    }

    /// Run `f` against a UI session's state.
    pub fn with_state<F, T>(&self, ui_session: &str, f: F) -> T
    where
        F: FnOnce(&TabManager, &mut ChatState) -> T,
    {
        let shared = self.state_for(ui_session);
        let mut state = shared.lock();
        f(&self.tab_manager, &mut *state)
    }

    /// One render pass: make state valid, apply the deposited intents,
    /// and report which tab to draw.
    pub fn render_cycle(&self, ui_session: &str, user_id: &str, intents: Vec<Intent>) -> RenderOutcome {
        let shared = self.state_for(ui_session);
        let mut state = shared.lock();

        let mut rerun = self.tab_manager.initialize(&mut state);

        let mut intents = intents;
        intents.sort_by_key(Intent::priority);
        for intent in intents {
            rerun |= self.apply(&mut state, user_id, intent);
        }

        let active = match self.tab_manager.active_tab_info(&state) {
            Some(active) => Some(active),
            None => {
                self.notifier.info(NO_ACTIVE_CHATS);
                match self.tab_manager.add_tab(&mut state, user_id, None, None) {
                    Ok(_) => {
                        rerun = true;
                        self.tab_manager.active_tab_info(&state)
                    }
                    Err(e) => {
                        tracing::error!(ui_session, "Failed to recover an empty tab list: {}", e);
                        None
                    }
                }
            }
        };

        RenderOutcome { rerun, active }
    }

    /// Store a finished exchange in an open session.
    pub fn record_exchange(
        &self,
        ui_session: &str,
        session_id: &str,
        message: MessageRecord,
    ) -> Result<()> {
        self.with_state(ui_session, |manager, state| {
            manager.record_exchange(state, session_id, message)
        })?;
        Ok(())
    }

    fn apply(&self, state: &mut ChatState, user_id: &str, intent: Intent) -> bool {
        let result = match intent {
            Intent::CloseTab { index } => self.tab_manager.close_tab(state, index, user_id),
            Intent::NewTab => self
                .tab_manager
                .add_tab(state, user_id, None, None)
                .map(|_| ()),
            Intent::StartNewChat => {
                self.tab_manager.start_new_chat_in_active_tab(state, user_id);
                Ok(())
            }
            Intent::OpenSession { session_id, title } => self
                .tab_manager
                .open_session(state, &session_id, &title, user_id)
                .map(|_| ()),
            Intent::SwitchTab { index } => self.tab_manager.switch_tab(state, index),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Intent not applied");
                false
            }
        }
    }
}
