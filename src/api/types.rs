use serde::{Deserialize, Serialize};

/// Discriminated response envelope: `{ "data": … }` (payload may be null) or
/// `{ "error": "…" }`. Application-level errors ride inside the envelope with
/// HTTP 200; only infrastructure failures change the status code.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ApiResponse<T> {
    Data { data: Option<T> },
    Error { error: String },
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self::Data { data: Some(data) }
    }

    pub const fn null() -> Self {
        Self::Data { data: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(rename = "SearchTerm", default)]
    pub search_term: Option<String>,
}
