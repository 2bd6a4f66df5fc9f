//! Lifecycle events for observability.
//!
//! The orchestrator publishes an event at each lifecycle checkpoint.
//! Subscribers (dashboards, audit sinks, tests) receive them over a
//! broadcast channel; a bounded history is kept for late readers.

use crate::errors::{AgentError, ErrorKind};
use crate::types::InvocationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Unique event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "evt_{}", self.0)
    }
}

/// A step of the invocation lifecycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStep {
    IdentityCheck,
    ValidateInput,
    BeforeExecute,
    Execute,
    AfterExecute,
}

impl LifecycleStep {
    /// Error kind reported when this step fails
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            Self::IdentityCheck => ErrorKind::IdentityMismatch,
            Self::ValidateInput => ErrorKind::Validation,
            Self::BeforeExecute | Self::AfterExecute => ErrorKind::Hook,
            Self::Execute => ErrorKind::Execution,
        }
    }
}

impl std::fmt::Display for LifecycleStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::IdentityCheck => "identity_check",
            Self::ValidateInput => "validate_input",
            Self::BeforeExecute => "before_execute",
            Self::Execute => "execute",
            Self::AfterExecute => "after_execute",
        };
        write!(f, "{}", s)
    }
}

/// Event payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventType {
    /// Orchestrator accepted an invocation and started the timer.
    InvocationAccepted,

    /// A lifecycle step finished without error.
    StepCompleted { step: LifecycleStep },

    /// Invocation produced a success outcome.
    InvocationSucceeded {
        #[serde(with = "duration_millis")]
        duration: Duration,
    },

    /// Invocation produced a failure outcome.
    InvocationFailed {
        error_kind: ErrorKind,
        error_message: String,
        #[serde(with = "duration_millis")]
        duration: Duration,
    },

    /// A new configuration was applied.
    ConfigurationApplied { keys: usize },

    /// The agent rejected a configuration.
    ConfigurationRejected { error_message: String },
}

/// Event emitted by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub id: EventId,

    /// Agent the event belongs to.
    pub agent_code: String,

    #[serde(flatten)]
    pub event_type: EventType,

    pub timestamp: DateTime<Utc>,

    /// Invocation the event belongs to (absent for configuration events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation_id: Option<InvocationId>,
}

impl LifecycleEvent {
    pub fn new(agent_code: impl Into<String>, event_type: EventType) -> Self {
        Self {
            id: EventId::new(),
            agent_code: agent_code.into(),
            event_type,
            timestamp: Utc::now(),
            invocation_id: None,
        }
    }

    /// Attach an invocation id.
    pub fn in_invocation(mut self, invocation_id: InvocationId) -> Self {
        self.invocation_id = Some(invocation_id);
        self
    }

    pub fn accepted(agent_code: &str, invocation_id: InvocationId) -> Self {
        Self::new(agent_code, EventType::InvocationAccepted).in_invocation(invocation_id)
    }

    pub fn step_completed(
        agent_code: &str,
        invocation_id: InvocationId,
        step: LifecycleStep,
    ) -> Self {
        Self::new(agent_code, EventType::StepCompleted { step }).in_invocation(invocation_id)
    }

    pub fn succeeded(agent_code: &str, invocation_id: InvocationId, duration: Duration) -> Self {
        Self::new(agent_code, EventType::InvocationSucceeded { duration })
            .in_invocation(invocation_id)
    }

    pub fn failed(
        agent_code: &str,
        invocation_id: InvocationId,
        error: &AgentError,
        duration: Duration,
    ) -> Self {
        Self::new(
            agent_code,
            EventType::InvocationFailed {
                error_kind: error.kind,
                error_message: error.message.clone(),
                duration,
            },
        )
        .in_invocation(invocation_id)
    }

    pub fn configuration_applied(agent_code: &str, keys: usize) -> Self {
        Self::new(agent_code, EventType::ConfigurationApplied { keys })
    }

    pub fn configuration_rejected(agent_code: &str, error: &AgentError) -> Self {
        Self::new(
            agent_code,
            EventType::ConfigurationRejected {
                error_message: error.message.clone(),
            },
        )
    }

    /// Whether this event ends an invocation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.event_type,
            EventType::InvocationSucceeded { .. } | EventType::InvocationFailed { .. }
        )
    }
}

/// Filter for selecting events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub agent_code: Option<String>,
    pub invocation_id: Option<InvocationId>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_agent(mut self, agent_code: impl Into<String>) -> Self {
        self.agent_code = Some(agent_code.into());
        self
    }

    pub fn for_invocation(mut self, invocation_id: InvocationId) -> Self {
        self.invocation_id = Some(invocation_id);
        self
    }

    /// Check if an event matches this filter.
    pub fn matches(&self, event: &LifecycleEvent) -> bool {
        if let Some(code) = &self.agent_code {
            if &event.agent_code != code {
                return false;
            }
        }

        if let Some(id) = &self.invocation_id {
            if event.invocation_id.as_ref() != Some(id) {
                return false;
            }
        }

        true
    }
}

/// Event receiver (broadcast channel).
pub type EventReceiver = broadcast::Receiver<LifecycleEvent>;

/// Broadcasts events and keeps the most recent ones.
pub struct EventManager {
    sender: broadcast::Sender<LifecycleEvent>,
    recent: Mutex<VecDeque<LifecycleEvent>>,
    max_recent: usize,
}

impl EventManager {
    /// Create a manager whose channel buffers `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            recent: Mutex::new(VecDeque::new()),
            max_recent: 100,
        }
    }

    /// Emit an event. Never fails: with no subscribers the event is only
    /// kept in history.
    pub fn emit(&self, event: LifecycleEvent) {
        {
            let mut recent = match self.recent.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            recent.push_back(event.clone());
            while recent.len() > self.max_recent {
                recent.pop_front();
            }
        }

        let _ = self.sender.send(event);
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Most recent events matching `filter`, newest first.
    pub fn recent(&self, filter: &EventFilter, limit: usize) -> Vec<LifecycleEvent> {
        let recent = match self.recent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        recent
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .take(limit)
            .cloned()
            .collect()
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("subscribers", &self.sender.receiver_count())
            .field("max_recent", &self.max_recent)
            .finish()
    }
}

// Duration serialization as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
