//! Error types for the agent execution protocol.
//!
//! Every failure carries an [`ErrorKind`] naming the lifecycle stage that
//! produced it:
//!
//! 1. **Pre-lifecycle**: `MalformedRequest`, `IdentityMismatch`.
//!    Rejected before any contract operation runs. These never reach the
//!    agent's `on_error` hook.
//!
//! 2. **Lifecycle**: `Validation`, `Hook`, `Execution`, `Configuration`.
//!    Raised by (or around) a contract operation. These are funneled through
//!    `on_error` so the agent can redact or enrich them before they become
//!    user-visible.

use crate::types::Payload;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Failure classification, one per lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Missing or unparseable request body at the transport boundary
    MalformedRequest,

    /// Caller's expected agent code does not match the serving agent
    IdentityMismatch,

    /// Input rejected by `validate_input`
    Validation,

    /// `before_execute` or `after_execute` failed
    Hook,

    /// `execute` failed
    Execution,

    /// `set_configuration` failed
    Configuration,
}

impl ErrorKind {
    /// Whether errors of this kind are rejected before the lifecycle starts.
    ///
    /// Such errors never reach `on_error`.
    pub fn is_pre_lifecycle(&self) -> bool {
        matches!(self, Self::MalformedRequest | Self::IdentityMismatch)
    }

    /// Whether the caller can fix the failure by changing the request.
    pub fn is_caller_fault(&self) -> bool {
        match self {
            Self::MalformedRequest | Self::IdentityMismatch | Self::Validation => true,
            Self::Hook | Self::Execution | Self::Configuration => false,
        }
    }

    /// HTTP status code used by the reference binding.
    pub fn http_status(&self) -> u16 {
        if self.is_caller_fault() {
            400
        } else {
            500
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MalformedRequest => "MALFORMED_REQUEST",
            Self::IdentityMismatch => "IDENTITY_MISMATCH",
            Self::Validation => "VALIDATION",
            Self::Hook => "HOOK",
            Self::Execution => "EXECUTION",
            Self::Configuration => "CONFIGURATION",
        };
        write!(f, "{}", s)
    }
}

/// Error raised anywhere in the agent lifecycle.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("[{kind}] {message}")]
pub struct AgentError {
    /// Lifecycle stage that failed (machine-readable)
    pub kind: ErrorKind,

    /// Human-readable message, surfaced to the caller
    pub message: String,

    /// Additional structured context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<HashMap<String, serde_json::Value>>,

    /// Suggested remediation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<SuggestedAction>,
}

impl AgentError {
    /// Create a new error
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
            suggested_action: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let context = self.context.get_or_insert_with(HashMap::new);
        if let Ok(v) = serde_json::to_value(value) {
            context.insert(key.into(), v);
        }
        self
    }

    /// Set suggested action
    pub fn with_suggestion(mut self, action: SuggestedAction) -> Self {
        self.suggested_action = Some(action);
        self
    }

    /// Re-tag the error with another kind, keeping message and context.
    pub fn reclassify(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Caller-facing error details.
    ///
    /// Always holds `error` and `error_kind`; `context` and `suggestion`
    /// are added when present.
    pub fn to_details(&self) -> Payload {
        let mut details = Payload::new();
        details.insert("error".into(), self.message.clone().into());
        details.insert("error_kind".into(), self.kind.to_string().into());
        if let Some(ref context) = self.context {
            details.insert(
                "context".into(),
                serde_json::Value::Object(context.clone().into_iter().collect()),
            );
        }
        if let Some(ref action) = self.suggested_action {
            details.insert("suggestion".into(), action.to_string().into());
        }
        details
    }

    // ═══════════════════════════════════════════════════════════
    // Common error constructors
    // ═══════════════════════════════════════════════════════════

    /// Malformed request body
    pub fn malformed_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedRequest, message)
    }

    /// Caller addressed a different agent
    pub fn identity_mismatch(expected: &str, requested: &str) -> Self {
        Self::new(
            ErrorKind::IdentityMismatch,
            format!(
                "agent code mismatch: expected {}, got {}",
                expected, requested
            ),
        )
        .with_context("expected", expected)
        .with_context("requested", requested)
    }

    /// Input failed validation
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Pre- or post-execute hook failed
    pub fn hook(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Hook, message)
    }

    /// Domain logic failed
    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Execution, message)
    }

    /// Configuration rejected
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }
}

/// Suggested actions for recovering from an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Use a different approach
    Alternative {
        /// Description of the alternative
        description: String,
    },

    /// Fix a specific input field
    FixInput {
        /// Offending field
        field: String,
    },

    /// Check configuration
    CheckConfig {
        /// Configuration key to check
        key: String,
    },

    /// Consult the agent's self-description (`/info`)
    SeeSchema,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alternative { description } => write!(f, "Try: {}", description),
            Self::FixInput { field } => write!(f, "Fix input field: {}", field),
            Self::CheckConfig { key } => write!(f, "Check config key: {}", key),
            Self::SeeSchema => write!(f, "See the agent's input schema"),
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::malformed_request(format!("JSON error: {}", e))
    }
}

/// Result type alias for contract operations
pub type AgentResult<T> = Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_lifecycle_kinds() {
        assert!(ErrorKind::MalformedRequest.is_pre_lifecycle());
        assert!(ErrorKind::IdentityMismatch.is_pre_lifecycle());
        assert!(!ErrorKind::Validation.is_pre_lifecycle());
        assert!(!ErrorKind::Hook.is_pre_lifecycle());
        assert!(!ErrorKind::Execution.is_pre_lifecycle());
        assert!(!ErrorKind::Configuration.is_pre_lifecycle());
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(ErrorKind::MalformedRequest.http_status(), 400);
        assert_eq!(ErrorKind::IdentityMismatch.http_status(), 400);
        assert_eq!(ErrorKind::Validation.http_status(), 400);
        assert_eq!(ErrorKind::Hook.http_status(), 500);
        assert_eq!(ErrorKind::Execution.http_status(), 500);
        assert_eq!(ErrorKind::Configuration.http_status(), 500);
    }

    #[test]
    fn test_identity_mismatch_message() {
        let err = AgentError::identity_mismatch("data_analysis_agent", "other_agent");
        assert_eq!(err.kind, ErrorKind::IdentityMismatch);
        assert!(err.message.contains("data_analysis_agent"));
        assert!(err.message.contains("other_agent"));
        let ctx = err.context.unwrap();
        assert_eq!(ctx.get("requested").unwrap(), "other_agent");
    }

    #[test]
    fn test_details_shape() {
        let details = AgentError::validation("data must not be empty").to_details();
        assert_eq!(details["error"], "data must not be empty");
        assert_eq!(details["error_kind"], "VALIDATION");
        assert!(!details.contains_key("suggestion"));
        assert!(!details.contains_key("context"));

        let details = AgentError::execution("boom")
            .with_suggestion(SuggestedAction::CheckConfig { key: "unit".into() })
            .to_details();
        assert_eq!(details["suggestion"], "Check config key: unit");
    }

    #[test]
    fn test_error_serialization() {
        let err = AgentError::hook("audit sink unavailable");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"HOOK\""));

        let recovered: AgentError = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered, err);
    }

    #[test]
    fn test_json_error_is_malformed_request() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: AgentError = parse_err.into();
        assert_eq!(err.kind, ErrorKind::MalformedRequest);
        assert!(err.message.starts_with("JSON error:"));
    }

    #[test]
    fn test_suggestion_rendering() {
        let alternative = SuggestedAction::Alternative {
            description: "use the median instead".into(),
        };
        assert_eq!(alternative.to_string(), "Try: use the median instead");

        let details = AgentError::execution("mean undefined")
            .with_suggestion(alternative)
            .to_details();
        assert_eq!(details["suggestion"], "Try: use the median instead");
        assert_eq!(
            SuggestedAction::FixInput { field: "data".into() }.to_string(),
            "Fix input field: data"
        );
    }

    #[test]
    fn test_reclassify_keeps_message() {
        let err = AgentError::execution("bad value").reclassify(ErrorKind::Validation);
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "bad value");
        assert_eq!(err.to_string(), "[VALIDATION] bad value");
    }
}
