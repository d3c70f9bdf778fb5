use serde::{Deserialize, Serialize};

/// Body of `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: Option<String>,
}

/// Successful `POST /chat` response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub answer: String,
}

/// A trimmed, non-empty question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question(String);

impl Question {
    /// `None` for blank or whitespace-only input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Extract the question from a raw JSON body. Anything that is not an
    /// object with a non-blank string `question` yields `None`.
    pub fn from_body(body: &[u8]) -> Option<Self> {
        // Only objects: serde would otherwise accept `["..."]` positionally.
        let value: serde_json::Value = serde_json::from_slice(body).ok()?;
        if !value.is_object() {
            return None;
        }
        let request: ChatRequest = serde_json::from_value(value).ok()?;
        Self::parse(request.question.as_deref()?)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
