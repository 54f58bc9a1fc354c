use serde::Serialize;
use serde_json::Value;

/// What an action returns to its host.
///
/// Serializes as `{"statusCode", "body"}` on success and
/// `{"error": {"statusCode", "body"}}` on failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionResponse {
    Success {
        #[serde(rename = "statusCode")]
        status_code: u16,
        body: Value,
    },
    Error {
        error: ErrorPayload,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: Value,
}

impl ActionResponse {
    pub fn ok(body: impl Into<Value>) -> Self {
        Self::Success {
            status_code: 200,
            body: body.into(),
        }
    }

    pub fn error(status_code: u16, body: Value) -> Self {
        Self::Error {
            error: ErrorPayload { status_code, body },
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Success { status_code, .. } => *status_code,
            Self::Error { error } => error.status_code,
        }
    }

    pub fn body(&self) -> &Value {
        match self {
            Self::Success { body, .. } => body,
            Self::Error { error } => &error.body,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
