use crate::constants::CONTENT_TYPE_PREFIX;
use serde::{Deserialize, Deserializer};
use std::fmt;
use thiserror::Error;
use tracing_error::{SpanTrace, SpanTraceStatus};

#[derive(Error, Debug)]
pub enum SleuthError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upstream error (status {0}): {1}")]
    Upstream(reqwest::StatusCode, String),

    #[error("SSE line exceeds the {limit} byte limit")]
    LineTooLong { limit: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// A [`SleuthError`] plus the span stack it was raised under. The span
/// trace only goes to the log; users see `inner`.
#[derive(Debug)]
pub struct ObservedError {
    pub inner: SleuthError,
    pub span_trace: SpanTrace,
}

impl ObservedError {
    pub fn new(inner: SleuthError) -> Self {
        Self {
            inner,
            span_trace: SpanTrace::capture(),
        }
    }
}

impl fmt::Display for ObservedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)?;
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            write!(f, " (in spans: {})", self.span_trace)?;
        }
        Ok(())
    }
}

impl std::error::Error for ObservedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner)
    }
}

impl<E: Into<SleuthError>> From<E> for ObservedError {
    fn from(error: E) -> Self {
        Self::new(error.into())
    }
}

pub type Result<T> = std::result::Result<T, ObservedError>;

/// What a payload is about. Wire values may carry a `CONTENT_TYPE_` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ContentType {
    ProgressStatus,
    Sources,
    ChainOfThought,
    ChatResponse,
    SessionName,
    FollowUpSuggestions,
    ExecutionTime,
    ErrorMessage,
    AlternateQuestions,
    ShiftFocusToSummary,
    Other(String),
    #[default]
    Unspecified,
}

impl ContentType {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let name = trimmed.strip_prefix(CONTENT_TYPE_PREFIX).unwrap_or(trimmed);
        match name.to_ascii_uppercase().as_str() {
            "PROGRESS_STATUS" => Self::ProgressStatus,
            "SOURCES" => Self::Sources,
            "CHAIN_OF_THOUGHT" => Self::ChainOfThought,
            "CHAT_RESPONSE" => Self::ChatResponse,
            "SESSION_NAME" => Self::SessionName,
            "FOLLOW_UP_SUGGESTIONS" => Self::FollowUpSuggestions,
            "EXECUTION_TIME" => Self::ExecutionTime,
            "ERROR_MESSAGE" => Self::ErrorMessage,
            "ALTERNATE_QUESTIONS" => Self::AlternateQuestions,
            "SHIFT_FOCUS_TO_SUMMARY" => Self::ShiftFocusToSummary,
            "" => Self::Unspecified,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    /// Ambient content is rendered between lines of an open block without
    /// closing it.
    pub fn is_ambient(&self) -> bool {
        matches!(
            self,
            Self::ProgressStatus | Self::Sources | Self::Other(_) | Self::Unspecified
        )
    }
}

impl<'de> Deserialize<'de> for ContentType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// One decoded unit from the stream. Built per frame and dropped once handled.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Event {
    pub event_type: String,
    pub content_type: ContentType,
    pub parts: Vec<String>,
    pub is_delta: Option<bool>,
    pub end_turn: bool,
    pub session_uuid: Option<String>,
}

impl Event {
    pub fn is_delta(&self) -> bool {
        self.is_delta.unwrap_or(false)
    }

    pub fn first_part(&self) -> &str {
        match self.parts.first() {
            Some(p) => p.as_str(),
            None => "",
        }
    }
}

/// Whether the stream ended on an explicit `end_turn` or by the connection
/// closing underneath us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    EndTurn,
    Closed,
}
