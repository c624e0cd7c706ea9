//! Message records as stored by the backend
//!
//! Each record is one query/response exchange. The backend is loose about
//! optional fields (it sends `null` lists and extra keys), so deserialization
//! is lenient.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Backend message id, absent for exchanges not yet persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The user's prompt
    #[serde(default, deserialize_with = "lenient_string")]
    pub query: String,
    /// The assistant's answer
    #[serde(default, deserialize_with = "lenient_string")]
    pub response: String,
    /// ISO-8601 timestamp, used for ordering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// 1 positive, 0 negative, absent when not rated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<i32>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub citations: Vec<Citation>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub images: Vec<ImageRef>,
}

impl MessageRecord {
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Any other reference metadata the backend attaches
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An image attached to a response: either a plain URL or an image group object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    Url(String),
    Group(Map<String, Value>),
}

fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// `null` and non-string values read as an empty string.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        _ => String::new(),
    })
}
