//! Parley Session API
//!
//! Client side of the backend conversation store. A session is a persisted
//! conversation identified by an opaque id; this crate fetches its message
//! history and defines the seam the tab layer calls through.

mod client;
mod error;
mod message;

pub use client::{interpret_session_response, HttpSessionFetcher, SessionFetcher};
pub use error::SessionApiError;
pub use message::{Citation, ImageRef, MessageRecord};

pub type Result<T> = std::result::Result<T, SessionApiError>;
