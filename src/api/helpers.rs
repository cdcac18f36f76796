//! Response builders shared by the API routes.

use serde_json::{Value, json};

use crate::errors::GptError;

/// Returns a 200 OK response with `body` serialized as JSON.
#[must_use]
pub fn ok_json(body: &Value) -> Value {
    json!({
        "statusCode": 200,
        "headers": { "Content-Type": "application/json" },
        "body": body.to_string()
    })
}

/// Returns an error response with the given status code and message.
#[must_use]
pub fn err_response(status_code: u16, message: &str) -> Value {
    json!({
        "statusCode": status_code,
        "headers": { "Content-Type": "application/json" },
        "body": json!({ "error": message }).to_string()
    })
}

/// Maps a failed turn to the response the caller sees.
#[must_use]
pub fn error_for(error: &GptError) -> Value {
    match error {
        GptError::ParseError(_) => err_response(400, &error.to_string()),
        GptError::ProviderError(_) => err_response(500, &format!("GPT request failed: {error}")),
        GptError::MalformedResponse(_) | GptError::UnrecognizedResponseShape(_) => {
            err_response(502, &error.to_string())
        }
        _ => err_response(500, &error.to_string()),
    }
}
