//! Session credential and request body types.
//!
//! The widget talks JSON to the relay; the relay talks JSON to the upstream
//! sessions API. Only the fields below cross the relay in either direction.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::secret::Secret;

/// Short-lived credential minted by the upstream for the browser widget.
///
/// Deserializing an upstream session keeps only these two fields, so
/// serializing it back yields exactly what the caller needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredential {
    pub client_secret: Secret,
    /// Unix timestamp (seconds). Omitted when the upstream omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// Body of `POST /api/chatkit/start`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StartRequest {
    /// Caller-supplied end-user identifier. Non-string values count as absent.
    #[serde(default, deserialize_with = "lenient_string")]
    pub user: Option<String>,
}

/// Body of `POST /api/chatkit/refresh`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Only required in forward mode; a non-string value counts as absent.
    #[serde(default, deserialize_with = "lenient_secret")]
    pub current_client_secret: Option<Secret>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user: Option<String>,
}

/// Keep a field only when it is a JSON string.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn lenient_secret<'de, D>(deserializer: D) -> std::result::Result<Option<Secret>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.map(Secret::from))
}

/// Parse a request body, treating an empty body or JSON `null` as
/// `T::default()`. Bodies that are not JSON at all are still rejected.
pub fn from_body<T>(body: &[u8]) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: Value = serde_json::from_slice(body)?;
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value)?)
}
