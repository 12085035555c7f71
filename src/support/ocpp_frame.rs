//! OCPP-J message framing
//!
//! The OCPP-J envelope is a JSON array whose first element selects the
//! frame kind:
//!
//! - **Call**       `[2, "<uniqueId>", "<action>", {<payload>}]`
//! - **CallResult** `[3, "<uniqueId>", {<payload>}]`
//! - **CallError**  `[4, "<uniqueId>", "<errorCode>", "<errorDescription>", {<errorDetails>}]`
//!
//! The central system only ever answers Calls with CallResults; CallError
//! parsing exists so frames a station sends us are at least classified and
//! logged instead of dropped as unreadable.

use serde_json::{json, Value};
use thiserror::Error;

const MSG_TYPE_CALL: u64 = 2;
const MSG_TYPE_CALL_RESULT: u64 = 3;
const MSG_TYPE_CALL_ERROR: u64 = 4;

/// A parsed OCPP-J frame.
#[derive(Debug, Clone)]
pub enum OcppFrame {
    Call {
        unique_id: String,
        action: String,
        payload: Value,
    },
    CallResult {
        unique_id: String,
        payload: Value,
    },
    CallError {
        unique_id: String,
        error_code: String,
        error_description: String,
    },
}

/// Errors raised while parsing an OCPP-J frame.
#[derive(Debug, Error)]
pub enum OcppFrameError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Frame is not a JSON array")]
    NotAnArray,

    #[error("Message type is missing or not a number")]
    InvalidMessageType,

    #[error("Unknown message type: {0}")]
    UnknownMessageType(u64),

    #[error("Frame has {got} elements, expected at least {expected}")]
    MissingElements { expected: usize, got: usize },

    #[error("Frame element {0} must be a string")]
    ElementNotAString(usize),
}

impl OcppFrame {
    /// Parse raw message text into a frame.
    pub fn parse(text: &str) -> Result<Self, OcppFrameError> {
        let value: Value = serde_json::from_str(text)?;
        let elements = value.as_array().ok_or(OcppFrameError::NotAnArray)?;

        let msg_type = elements
            .first()
            .and_then(Value::as_u64)
            .ok_or(OcppFrameError::InvalidMessageType)?;

        match msg_type {
            MSG_TYPE_CALL => {
                require_len(elements, 4)?;
                Ok(Self::Call {
                    unique_id: string_element(elements, 1)?,
                    action: string_element(elements, 2)?,
                    payload: elements[3].clone(),
                })
            }
            MSG_TYPE_CALL_RESULT => {
                require_len(elements, 3)?;
                Ok(Self::CallResult {
                    unique_id: string_element(elements, 1)?,
                    payload: elements[2].clone(),
                })
            }
            MSG_TYPE_CALL_ERROR => {
                require_len(elements, 4)?;
                Ok(Self::CallError {
                    unique_id: string_element(elements, 1)?,
                    error_code: string_element(elements, 2)?,
                    error_description: string_element(elements, 3)?,
                })
            }
            unknown => Err(OcppFrameError::UnknownMessageType(unknown)),
        }
    }

    /// Serialize this frame to message text.
    pub fn serialize(&self) -> String {
        let array = match self {
            Self::Call {
                unique_id,
                action,
                payload,
            } => json!([MSG_TYPE_CALL, unique_id, action, payload]),
            Self::CallResult { unique_id, payload } => {
                json!([MSG_TYPE_CALL_RESULT, unique_id, payload])
            }
            Self::CallError {
                unique_id,
                error_code,
                error_description,
            } => json!([
                MSG_TYPE_CALL_ERROR,
                unique_id,
                error_code,
                error_description,
                {}
            ]),
        };

        // Serializing a Value never fails
        array.to_string()
    }
}

fn require_len(elements: &[Value], expected: usize) -> Result<(), OcppFrameError> {
    if elements.len() < expected {
        return Err(OcppFrameError::MissingElements {
            expected,
            got: elements.len(),
        });
    }
    Ok(())
}

fn string_element(elements: &[Value], index: usize) -> Result<String, OcppFrameError> {
    elements[index]
        .as_str()
        .map(str::to_string)
        .ok_or(OcppFrameError::ElementNotAString(index))
}
