//! Decoded shape of a SIPIS `/stats/summary/json` response.
//!
//! Decoding is tolerant at the field level: a field that is missing, `null`
//! or of the wrong JSON type takes its zero value. Only a body that is not
//! JSON at all, or whose top-level value is not an object, is rejected.
//! Bytes after the top-level value are ignored.

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::Deserialize;

/// One instance's statistics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Measurement {
    #[serde(default, deserialize_with = "lenient")]
    pub server: Server,
    #[serde(default, deserialize_with = "lenient")]
    pub instance: Instance,
}

/// Server process information.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Server {
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub version_string: String,
    #[serde(default, deserialize_with = "lenient")]
    pub version_number: String,
    /// Build identifier. Decoded but not exported.
    #[serde(default, deserialize_with = "lenient")]
    pub build: String,
    #[serde(default, deserialize_with = "lenient")]
    pub uptime_in_seconds: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub message_loop_queue_size: f64,
}

/// Managed instance counters.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Instance {
    #[serde(default, deserialize_with = "lenient")]
    pub count: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub count_in_state: CountInState,
}

/// Instance counts broken down by registration state.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CountInState {
    #[serde(default, deserialize_with = "lenient")]
    pub idle: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub registered: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub registering: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub unauthorized: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub error: f64,
}

impl Measurement {
    /// Decode a response body.
    ///
    /// Fails if the body does not start with a JSON value or that value is
    /// not an object. Everything below the top level falls back to zero
    /// values, and anything after the first value is ignored.
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value = serde_json::Deserializer::from_slice(body)
            .into_iter::<serde_json::Value>()
            .next()
            .ok_or_else(|| serde_json::Error::custom("empty body"))??;

        if !value.is_object() {
            return Err(serde_json::Error::custom(format!(
                "expected a JSON object, found {}",
                json_kind(&value)
            )));
        }

        Measurement::deserialize(value)
    }
}

/// Deserialize a field, substituting its default when the JSON value has
/// the wrong type.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
