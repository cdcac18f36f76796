use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::models::{CompletionRequest, ConversationTurn, EndpointConfig, RequestId};
use crate::errors::GptError;

/// Body of the raw dispatch route.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchBody {
    #[serde(default)]
    pub user_inputs: Option<String>,
    #[serde(flatten)]
    pub request: CompletionRequest,
}

/// Body of the orchestrated conversation route.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationBody {
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub messages: Vec<ConversationTurn>,
    #[serde(default)]
    pub user_inputs: Option<String>,
    #[serde(default)]
    pub request_id: Option<RequestId>,
    #[serde(default)]
    pub rag_file_name: Option<String>,
    #[serde(default)]
    pub use_case: Option<String>,
}

/// # Errors
///
/// Returns `GptError::ParseError` if `body` is not JSON of the expected shape.
pub fn parse_json_body<T: DeserializeOwned>(body: &str) -> Result<T, GptError> {
    serde_json::from_str(body)
        .map_err(|e| GptError::ParseError(format!("Invalid JSON body: {e}")))
}

pub fn v_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = root;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

pub fn v_str<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    v_path(root, path).and_then(|v| v.as_str())
}

pub fn get_header_value<'a>(headers: &'a Value, name: &str) -> Option<&'a str> {
    if let Some(v) = headers.get(name).and_then(|s| s.as_str()) {
        return Some(v);
    }
    headers.as_object().and_then(|map| {
        map.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                v.as_str()
            } else {
                None
            }
        })
    })
}

/// HTTP method for both API Gateway payload versions.
pub fn request_method(payload: &Value) -> Option<&str> {
    v_str(payload, &["requestContext", "http", "method"])
        .or_else(|| v_str(payload, &["httpMethod"]))
}

pub fn request_path(payload: &Value) -> Option<&str> {
    v_str(payload, &["rawPath"]).or_else(|| v_str(payload, &["path"]))
}

/// First `X-Forwarded-For` hop, else the source IP API Gateway saw.
pub fn client_ip(payload: &Value) -> Option<String> {
    payload
        .get("headers")
        .and_then(|headers| get_header_value(headers, "X-Forwarded-For"))
        .and_then(|forwarded| forwarded.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| v_str(payload, &["requestContext", "http", "sourceIp"]))
        .or_else(|| v_str(payload, &["requestContext", "identity", "sourceIp"]))
        .map(ToString::to_string)
}
