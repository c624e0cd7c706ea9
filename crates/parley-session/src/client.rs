//! Session fetch collaborator
//!
//! `SessionFetcher` is the seam the tab manager calls when a tab is bound to
//! an existing backend session. `HttpSessionFetcher` is the production
//! implementation against `GET /v1/session/{id}`.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::SessionApiError;
use crate::message::MessageRecord;
use crate::Result;

/// Retrieves the persisted message history of a session.
pub trait SessionFetcher: Send + Sync {
    fn fetch_messages(&self, user_id: &str, session_id: &str) -> Result<Vec<MessageRecord>>;
}

pub struct HttpSessionFetcher {
    client: Client,
    base_url: Url,
    bot_id: String,
    subscription_key: String,
    auth_token: Option<String>,
}

impl HttpSessionFetcher {
    pub fn new(
        base_url: Url,
        bot_id: String,
        subscription_key: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            bot_id,
            subscription_key,
            auth_token: None,
        })
    }

    /// Attach the signed-in user's id token. Empty tokens are ignored.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.auth_token = (!token.is_empty()).then_some(token);
        self
    }

    fn session_url(&self, session_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            segments.pop_if_empty().extend(["v1", "session", session_id]);
        }
        Ok(url)
    }
}

impl SessionFetcher for HttpSessionFetcher {
    fn fetch_messages(&self, user_id: &str, session_id: &str) -> Result<Vec<MessageRecord>> {
        let url = self.session_url(session_id)?;
        tracing::debug!(user_id, session_id, %url, "Fetching session messages");

        let mut request = self
            .client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
            .header("BotID", &self.bot_id);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;

        interpret_session_response(session_id, status, &body)
    }
}

#[derive(Deserialize)]
struct SessionEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<SessionDetails>,
}

#[derive(Deserialize)]
struct SessionDetails {
    #[serde(default)]
    messages: Option<Vec<Value>>,
}

/// Turn a session-details response into its messages, oldest first.
pub fn interpret_session_response(
    session_id: &str,
    status: u16,
    body: &str,
) -> Result<Vec<MessageRecord>> {
    match status {
        200 => {
            let envelope: SessionEnvelope = serde_json::from_str(body)?;
            let details = match envelope {
                SessionEnvelope {
                    success: true,
                    data: Some(details),
                } => details,
                _ => {
                    return Err(SessionApiError::UnexpectedResponse(format!(
                        "missing success/data for session {session_id}"
                    )))
                }
            };

            match details.messages {
                Some(raw) => {
                    let mut messages: Vec<MessageRecord> = raw
                        .into_iter()
                        .enumerate()
                        .filter_map(|(position, value)| match serde_json::from_value(value) {
                            Ok(message) => Some(message),
                            Err(e) => {
                                tracing::warn!(session_id, position, error = %e, "Skipping malformed message");
                                None
                            }
                        })
                        .collect();
                    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
                    Ok(messages)
                }
                None => {
                    tracing::warn!(session_id, "Session details response has no messages field");
                    Ok(Vec::new())
                }
            }
        }
        404 => Err(SessionApiError::NotFound(session_id.to_string())),
        403 => Err(SessionApiError::AccessDenied(session_id.to_string())),
        code => Err(SessionApiError::Status {
            code,
            body: body.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(base: &str) -> HttpSessionFetcher {
        HttpSessionFetcher::new(
            Url::parse(base).unwrap(),
            "bot_test_1234".to_string(),
            String::new(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_session_url() {
        let url = fetcher("http://127.0.0.1:8000").session_url("session_abcd1234").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/v1/session/session_abcd1234");

        let url = fetcher("https://api.example.com/chat/").session_url("s1").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/chat/v1/session/s1");
    }

    #[test]
    fn test_empty_auth_token_ignored() {
        let f = fetcher("http://127.0.0.1:8000").with_auth_token("");
        assert!(f.auth_token.is_none());

        let f = fetcher("http://127.0.0.1:8000").with_auth_token("abc");
        assert_eq!(f.auth_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_messages_sorted_by_timestamp() {
        let body = r#"{
            "success": true,
            "data": {
                "session_id": "s1",
                "messages": [
                    {"query": "second", "response": "b", "created_at": "2024-05-01T10:05:00Z"},
                    {"query": "first", "response": "a", "created_at": "2024-05-01T10:00:00Z"}
                ]
            }
        }"#;

        let messages = interpret_session_response("s1", 200, body).unwrap();
        let queries: Vec<_> = messages.iter().map(|m| m.query.as_str()).collect();
        assert_eq!(queries, vec!["first", "second"]);
    }

    #[test]
    fn test_missing_timestamp_sorts_first() {
        let body = r#"{
            "success": true,
            "data": {
                "messages": [
                    {"query": "later", "response": "b", "created_at": "2024-05-01T10:00:00Z"},
                    {"query": "undated", "response": "a"}
                ]
            }
        }"#;

        let messages = interpret_session_response("s1", 200, body).unwrap();
        let queries: Vec<_> = messages.iter().map(|m| m.query.as_str()).collect();
        assert_eq!(queries, vec!["undated", "later"]);
    }

    #[test]
    fn test_bad_record_does_not_drop_history() {
        let body = r#"{
            "success": true,
            "data": {
                "messages": [
                    {"query": "Quarterly numbers please", "response": "Here", "created_at": "2024-05-01T10:00:00Z"},
                    {"query": null, "response": "orphan", "created_at": "2024-05-01T10:01:00Z"},
                    {"query": "Broken", "citations": "not a list", "created_at": "2024-05-01T10:02:00Z"}
                ]
            }
        }"#;

        let messages = interpret_session_response("s1", 200, body).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].query, "Quarterly numbers please");
        assert_eq!(messages[1].query, "");
        assert_eq!(messages[1].response, "orphan");
    }

    #[test]
    fn test_missing_messages_field_is_empty() {
        let body = r#"{"success": true, "data": {"session_id": "s1"}}"#;
        assert!(interpret_session_response("s1", 200, body).unwrap().is_empty());
    }

    #[test]
    fn test_unsuccessful_envelope() {
        let body = r#"{"success": false, "error": "boom"}"#;
        assert!(matches!(
            interpret_session_response("s1", 200, body),
            Err(SessionApiError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_error_statuses() {
        assert!(matches!(
            interpret_session_response("s1", 404, ""),
            Err(SessionApiError::NotFound(id)) if id == "s1"
        ));
        assert!(matches!(
            interpret_session_response("s1", 403, ""),
            Err(SessionApiError::AccessDenied(_))
        ));
        assert!(matches!(
            interpret_session_response("s1", 500, "oops"),
            Err(SessionApiError::Status { code: 500, .. })
        ));
        assert!(matches!(
            interpret_session_response("s1", 200, "not json"),
            Err(SessionApiError::Json(_))
        ));
    }

    fn session_body() -> serde_json::Value {
        json!({
            "success": true,
            "data": {
                "session_id": "session_abcd1234",
                "messages": [
                    {"query": "What is the refund policy", "response": "30 days", "created_at": "2024-05-01T10:00:00Z"}
                ]
            }
        })
    }

    /// Runs a fetch on a blocking thread; the blocking client must not be
    /// built or dropped on the async runtime.
    async fn fetch_from(
        server: &MockServer,
        key: &'static str,
        token: Option<&'static str>,
        session_id: &'static str,
    ) -> Result<Vec<MessageRecord>> {
        let base = Url::parse(&server.uri()).unwrap();
        tokio::task::spawn_blocking(move || {
            let mut f = HttpSessionFetcher::new(
                base,
                "bot_test_1234".to_string(),
                key.to_string(),
                Duration::from_secs(5),
            )?;
            if let Some(token) = token {
                f = f.with_auth_token(token);
            }
            f.fetch_messages("alice", session_id)
        })
        .await
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_sends_gateway_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/session/session_abcd1234"))
            .and(header("Content-Type", "application/json"))
            .and(header("Ocp-Apim-Subscription-Key", "sub-key"))
            .and(header("BotID", "bot_test_1234"))
            .and(bearer_token("id-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .expect(1)
            .mount(&server)
            .await;

        let messages = fetch_from(&server, "sub-key", Some("id-token"), "session_abcd1234")
            .await
            .unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].query, "What is the refund policy");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_without_token_omits_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/session/session_abcd1234"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;

        fetch_from(&server, "sub-key", None, "session_abcd1234")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_maps_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/session/session_gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = fetch_from(&server, "", None, "session_gone").await;

        assert!(matches!(result, Err(SessionApiError::NotFound(id)) if id == "session_gone"));
    }

    #[test]
    fn test_connection_refused_is_transport_error() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let result = fetcher(&format!("http://127.0.0.1:{port}")).fetch_messages("alice", "s1");
        assert!(matches!(result, Err(SessionApiError::Transport(_))));
    }
}
