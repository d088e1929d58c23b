//! Structured error types shared across NUQ crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`NuqError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (indices, sizes, positions, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the NUQ engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum NuqError {
    /// A required setup step is missing or an operation was invoked in an
    /// incompatible mode.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Out-of-range index or malformed input shape.
    #[error("argument error: {0}")]
    Argument(ErrorInfo),
    /// Density-matrix algebra errors.
    #[error("algebra error: {0}")]
    Algebra(ErrorInfo),
    /// Adaptive stepper failures.
    #[error("ode error: {0}")]
    Ode(ErrorInfo),
    /// Medium or trajectory errors.
    #[error("media error: {0}")]
    Media(ErrorInfo),
    /// Interaction tensor construction errors.
    #[error("interaction error: {0}")]
    Interaction(ErrorInfo),
    /// Serialization and snapshot format errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl NuqError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            NuqError::Config(info)
            | NuqError::Argument(info)
            | NuqError::Algebra(info)
            | NuqError::Ode(info)
            | NuqError::Media(info)
            | NuqError::Interaction(info)
            | NuqError::Serde(info) => info,
        }
    }
}
