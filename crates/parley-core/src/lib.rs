//! Parley Core
//!
//! Coordination layer between the chat UI and the tab manager. Each logical
//! UI session (one browser tab of one user) gets its own isolated
//! `ChatState`; the UI deposits intents and gets back what to render.

mod app;
mod config;
mod error;
mod intent;

pub use app::ChatApp;
pub use config::Config;
pub use error::CoreError;
pub use intent::{Intent, RenderOutcome};

// Re-export core components
pub use parley_session::{
    Citation, HttpSessionFetcher, ImageRef, MessageRecord, SessionApiError, SessionFetcher,
};
pub use parley_tabs::{
    ActiveTabInfo, ChatState, Notifier, SessionKeys, Tab, TabError, TabManager, TracingNotifier,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging. `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &Config) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
