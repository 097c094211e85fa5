use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),
    #[error("Not signed in: {0}")]
    Unauthenticated(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("{recorded} vote(s) recorded before the ballot failed: {source}")]
    PartialBallot { recorded: usize, source: Box<Error> },
    #[error("Already in progress: {0}")]
    Busy(&'static str),
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::default();
        errors.push(field, message);
        Error::Validation(errors)
    }

    /// Maps a non-success HTTP response onto the client error taxonomy.
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed = FieldErrors::from_body(body);
        match status {
            400 => Error::Validation(parsed),
            401 => Error::Unauthenticated(parsed.summary("Session expired, please sign in again")),
            403 => {
                Error::Unauthorized(parsed.summary("You do not have permission for this action"))
            }
            404 => Error::NotFound(parsed.summary("The requested record does not exist")),
            _ => Error::Server {
                status,
                message: parsed.summary(&format!("HTTP {status}")),
            },
        }
    }

    /// Whether offering the user a manual retry makes sense.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Server { .. })
    }

    /// Text shown to the user: one line per field error, otherwise a single line.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(errors) if !errors.fields.is_empty() => errors
                .fields
                .iter()
                .flat_map(|(field, messages)| {
                    messages.iter().map(move |message| format!("{field}: {message}"))
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Error::NotFound(message) => message.clone(),
            Error::PartialBallot { recorded, source } => format!(
                "{}\n{} vote(s) were already recorded and cannot be cast again.",
                source.user_message(),
                recorded
            ),
            Error::Network(_) => "Could not reach the server.".to_string(),
            Error::Server { .. } => "The server failed to handle the request.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Field-level messages in the shape returned by the backend's validators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub detail: Option<String>,
    pub fields: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Accepts `{"detail": ".."}`, `{"message": ".."}`, `{"field": ["..", ..]}`,
    /// `{"field": ".."}` and plain-text bodies.
    pub fn from_body(body: &str) -> Self {
        let mut errors = FieldErrors::default();
        let value = match serde_json::from_str::<Value>(body) {
            Ok(value) => value,
            Err(_) => {
                let text = body.trim();
                if !text.is_empty() {
                    errors.detail = Some(text.to_string());
                }
                return errors;
            }
        };

        match value {
            Value::Object(map) => {
                for (key, value) in map {
                    match (key.as_str(), value) {
                        ("detail" | "message" | "non_field_errors", Value::String(text)) => {
                            errors.detail = Some(text)
                        }
                        (_, Value::String(text)) => errors.push(&key, text),
                        (_, Value::Array(items)) => {
                            for item in items {
                                match item {
                                    Value::String(text) => errors.push(&key, text),
                                    other => errors.push(&key, other.to_string()),
                                }
                            }
                        }
                        (_, other) => errors.push(&key, other.to_string()),
                    }
                }
            }
            Value::String(text) => errors.detail = Some(text),
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("; ");
                if !joined.is_empty() {
                    errors.detail = Some(joined);
                }
            }
            _ => {}
        }
        errors
    }

    fn summary(&self, fallback: &str) -> String {
        let text = self.to_string();
        if text.is_empty() { fallback.to_string() } else { text }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(detail) = &self.detail {
            parts.push(detail.clone());
        }
        for (field, messages) in &self.fields {
            parts.push(format!("{field}: {}", messages.join(", ")));
        }
        write!(f, "{}", parts.join("; "))
    }
}
