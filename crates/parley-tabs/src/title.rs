//! Tab title derivation
//!
//! Titles come from the first prompt of a conversation: its first three
//! words, with "..." appended when there were more. Splitting is on
//! whitespace only.

use parley_session::MessageRecord;

const TITLE_WORDS: usize = 3;
const ELLIPSIS: &str = "...";
const FALLBACK_ID_CHARS: usize = 8;

/// Title for a conversation whose first prompt is `prompt`.
/// `None` when the prompt has no words.
pub fn title_from_prompt(prompt: &str) -> Option<String> {
    let words: Vec<&str> = prompt.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }

    let mut title = words[..words.len().min(TITLE_WORDS)].join(" ");
    if words.len() > TITLE_WORDS {
        title.push_str(ELLIPSIS);
    }
    Some(title)
}

/// Fallback title for an existing session opened without one.
///
/// The backend normally supplies titles, so this only runs when it didn't.
/// Without a usable first query the title is `Session <last 8 chars of id>`.
/// A whitespace-only first query counts as unusable, never as an empty title.
pub fn derive_fallback_title(session_id: &str, messages: &[MessageRecord]) -> String {
    messages
        .first()
        .and_then(|message| title_from_prompt(&message.query))
        .unwrap_or_else(|| format!("Session {}", id_suffix(session_id)))
}

fn id_suffix(session_id: &str) -> &str {
    let start = session_id
        .char_indices()
        .rev()
        .nth(FALLBACK_ID_CHARS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &session_id[start..]
}
