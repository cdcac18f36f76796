//! Classifies the model's reply into one of the known response shapes.
//!
//! The model picks its own shape and sends no discriminator, so the shape is
//! decided structurally, trying predicates in this fixed order:
//!
//! 1. `question` + `choices`  -> [`InterpretedResponse::Interview`]
//! 2. `proposals`             -> [`InterpretedResponse::ConsultationTurn`] with proposals
//! 3. `fullText`              -> [`InterpretedResponse::ConsultationTurn`] with detail text
//! 4. `answer`                -> [`InterpretedResponse::Answer`]
//!
//! Once a shape is chosen its fields are type-checked. A reply carrying only
//! half of the interview markers, a mistyped field, or none of the markers is
//! rejected as `UnrecognizedResponseShape`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::models::EndpointType;
use crate::errors::GptError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Answer,
    Interview,
    ConsultationProposals,
    ConsultationDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InterpretedResponse {
    Answer {
        text: String,
    },
    Interview {
        question: String,
        choices: Vec<String>,
        proposals: Vec<Proposal>,
    },
    ConsultationTurn {
        answer: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        proposals: Option<Vec<Proposal>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        full_text: Option<String>,
    },
}

impl InterpretedResponse {
    #[must_use]
    pub fn shape(&self) -> ResponseShape {
        match self {
            InterpretedResponse::Answer { .. } => ResponseShape::Answer,
            InterpretedResponse::Interview { .. } => ResponseShape::Interview,
            InterpretedResponse::ConsultationTurn {
                proposals: Some(_), ..
            } => ResponseShape::ConsultationProposals,
            InterpretedResponse::ConsultationTurn { .. } => ResponseShape::ConsultationDetail,
        }
    }

    /// Text to show the user in the conversation transcript.
    #[must_use]
    pub fn display_text(&self) -> &str {
        match self {
            InterpretedResponse::Answer { text } => text,
            InterpretedResponse::Interview { question, .. } => question,
            InterpretedResponse::ConsultationTurn { answer, .. } => answer,
        }
    }
}

/// Interpret a reply under the contract of `endpoint_type`.
///
/// Free chat replies are free text and are returned verbatim; interview and
/// consultation replies must be JSON.
///
/// # Errors
///
/// See [`interpret`].
pub fn interpret_for(
    endpoint_type: EndpointType,
    content: &str,
) -> Result<InterpretedResponse, GptError> {
    match endpoint_type {
        EndpointType::FreeChat => Ok(InterpretedResponse::Answer {
            text: content.to_string(),
        }),
        EndpointType::Interview | EndpointType::Consultation => interpret(content),
    }
}

/// Parse `content` as JSON and classify it.
///
/// # Errors
///
/// Returns `GptError::MalformedResponse` if `content` is not a JSON object or
/// carries none of the shape keys, and `GptError::UnrecognizedResponseShape`
/// if a shape only half matches or a field has the wrong type.
pub fn interpret(content: &str) -> Result<InterpretedResponse, GptError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| GptError::MalformedResponse(format!("reply is not valid JSON: {e}")))?;

    let Value::Object(object) = value else {
        return Err(GptError::MalformedResponse(
            "reply is JSON but not an object".to_string(),
        ));
    };

    classify(&object)
}

fn classify(object: &Map<String, Value>) -> Result<InterpretedResponse, GptError> {
    let has_question = object.contains_key("question");
    let has_choices = object.contains_key("choices");

    if has_question || has_choices {
        if !(has_question && has_choices) {
            return Err(GptError::UnrecognizedResponseShape(
                "interview reply needs both `question` and `choices`".to_string(),
            ));
        }
        return Ok(InterpretedResponse::Interview {
            question: string_field(object, "question")?,
            choices: string_list(object, "choices")?,
            proposals: match object.get("proposals") {
                Some(value) => proposal_list(value)?,
                None => Vec::new(),
            },
        });
    }

    if let Some(value) = object.get("proposals") {
        return Ok(InterpretedResponse::ConsultationTurn {
            answer: string_field(object, "answer")?,
            proposals: Some(proposal_list(value)?),
            full_text: None,
        });
    }

    if object.contains_key("fullText") {
        let answer = match object.get("answer") {
            Some(_) => string_field(object, "answer")?,
            None => String::new(),
        };
        return Ok(InterpretedResponse::ConsultationTurn {
            answer,
            proposals: None,
            full_text: Some(string_field(object, "fullText")?),
        });
    }

    if object.contains_key("answer") {
        return Ok(InterpretedResponse::Answer {
            text: string_field(object, "answer")?,
        });
    }

    let keys: Vec<&str> = object.keys().map(String::as_str).collect();
    Err(GptError::MalformedResponse(format!(
        "no recognized keys in reply (found: {})",
        keys.join(", ")
    )))
}

fn string_field(object: &Map<String, Value>, key: &str) -> Result<String, GptError> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| GptError::UnrecognizedResponseShape(format!("`{key}` must be a string")))
}

fn string_list(object: &Map<String, Value>, key: &str) -> Result<Vec<String>, GptError> {
    let items = object.get(key).and_then(Value::as_array).ok_or_else(|| {
        GptError::UnrecognizedResponseShape(format!("`{key}` must be an array"))
    })?;

    items
        .iter()
        .map(|item| {
            item.as_str().map(ToString::to_string).ok_or_else(|| {
                GptError::UnrecognizedResponseShape(format!("`{key}` must contain only strings"))
            })
        })
        .collect()
}

fn proposal_list(value: &Value) -> Result<Vec<Proposal>, GptError> {
    if !value.is_array() {
        return Err(GptError::UnrecognizedResponseShape(
            "`proposals` must be an array".to_string(),
        ));
    }
    serde_json::from_value(value.clone()).map_err(|e| {
        GptError::UnrecognizedResponseShape(format!(
            "`proposals` entries need string `title` and `content`: {e}"
        ))
    })
}
