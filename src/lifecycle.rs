//! Request lifecycle: turns one invocation into exactly one outcome.
//!
//! ```text
//!  accept ─► identity ─► validate ─► before ─► execute ─► after ─► Success
//!              │            │          │          │         │
//!              │            └──────────┴────┬─────┴─────────┘
//!              │                            ▼
//!              │                        on_error
//!              ▼                            │
//!           Failure ◄───────────────────────┘
//! ```
//!
//! Timing spans the whole sequence. The orchestrator owns the envelope
//! (status, agent code, timing); the agent owns the error details through
//! its `on_error` hook. Identity mismatches are rejected before any
//! contract operation and bypass `on_error`.

use crate::contract::{AgentContract, AgentInfo, HealthReport};
use crate::errors::{AgentError, AgentResult, ErrorKind};
use crate::events::{EventFilter, EventManager, EventReceiver, LifecycleEvent, LifecycleStep};
use crate::types::{InvocationId, Payload, Status};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn};

/// A single call to run an agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Agent code the caller expects to address
    #[serde(default, rename = "agent_code", skip_serializing_if = "Option::is_none")]
    pub requested_code: Option<String>,

    /// Payload handed to the agent
    #[serde(default)]
    pub input: Payload,
}

impl InvocationRequest {
    pub fn new(input: Payload) -> Self {
        Self {
            requested_code: None,
            input,
        }
    }

    /// Confirm the target agent's identity
    pub fn for_agent(mut self, code: impl Into<String>) -> Self {
        self.requested_code = Some(code.into());
        self
    }
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    Success {
        output: Payload,
        execution_time_ms: u64,
    },
    Failure {
        kind: ErrorKind,
        error_details: Payload,
        execution_time_ms: u64,
    },
}

impl InvocationOutcome {
    pub fn status(&self) -> Status {
        match self {
            Self::Success { .. } => Status::Success,
            Self::Failure { .. } => Status::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn execution_time_ms(&self) -> u64 {
        match self {
            Self::Success {
                execution_time_ms, ..
            }
            | Self::Failure {
                execution_time_ms, ..
            } => *execution_time_ms,
        }
    }

    /// Error kind of a failure
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Output on success, error details on failure
    pub fn payload(&self) -> &Payload {
        match self {
            Self::Success { output, .. } => output,
            Self::Failure { error_details, .. } => error_details,
        }
    }

    /// Wrap with agent identity and status
    pub fn into_envelope(self, agent_code: impl Into<String>) -> OutcomeEnvelope {
        let status = self.status();
        let execution_time = self.execution_time_ms();
        let body = match self {
            Self::Success { output, .. } => output,
            Self::Failure { error_details, .. } => error_details,
        };
        OutcomeEnvelope {
            status,
            agent_code: agent_code.into(),
            execution_time,
            body,
        }
    }
}

/// Uniform wrapper returned to callers for every invocation.
///
/// Serializes as one flat object: `status`, `agent_code` and
/// `execution_time` (milliseconds) next to the output or error details.
/// Envelope keys take precedence over payload keys of the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeEnvelope {
    pub status: Status,
    pub agent_code: String,
    pub execution_time: u64,
    pub body: Payload,
}

impl OutcomeEnvelope {
    /// Flatten into a single mapping.
    ///
    /// `status`, `agent_code` and `execution_time` are written last, so a
    /// payload key with one of those names is overwritten rather than
    /// shadowing the envelope.
    pub fn to_payload(&self) -> Payload {
        let mut map = self.body.clone();
        map.insert("status".into(), self.status.to_string().into());
        map.insert("agent_code".into(), self.agent_code.clone().into());
        map.insert("execution_time".into(), self.execution_time.into());
        map
    }
}

impl Serialize for OutcomeEnvelope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_payload().serialize(serializer)
    }
}

/// Drives an agent through the request lifecycle.
///
/// Holds no per-request state, so one orchestrator can be shared across
/// concurrent invocations.
pub struct Orchestrator {
    agent: Arc<dyn AgentContract>,
    events: EventManager,
}

impl Orchestrator {
    pub fn new(agent: Arc<dyn AgentContract>) -> Self {
        Self {
            agent,
            events: EventManager::default(),
        }
    }

    /// Use a specific event manager (e.g. a larger channel).
    pub fn with_events(mut self, events: EventManager) -> Self {
        self.events = events;
        self
    }

    pub fn agent(&self) -> &Arc<dyn AgentContract> {
        &self.agent
    }

    pub fn agent_code(&self) -> &str {
        self.agent.code()
    }

    /// Run one invocation. Always yields exactly one outcome.
    pub fn invoke(&self, request: InvocationRequest) -> InvocationOutcome {
        let started = Instant::now();
        let invocation_id = InvocationId::new();
        let agent_code = self.agent.code();
        let span = info_span!("invocation", agent_code, invocation_id = %invocation_id);
        let _entered = span.enter();

        info!(requested_code = ?request.requested_code, "invocation accepted");
        self.events
            .emit(LifecycleEvent::accepted(agent_code, invocation_id));

        match self.run_steps(invocation_id, request) {
            Ok(output) => {
                let elapsed = started.elapsed();
                info!(elapsed_ms = millis(elapsed), "invocation succeeded");
                self.events
                    .emit(LifecycleEvent::succeeded(agent_code, invocation_id, elapsed));
                InvocationOutcome::Success {
                    output,
                    execution_time_ms: millis(elapsed),
                }
            }
            Err(err) => {
                let error_details = if err.kind.is_pre_lifecycle() {
                    err.to_details()
                } else {
                    self.agent.on_error(&err)
                };
                let elapsed = started.elapsed();
                if err.kind.is_caller_fault() {
                    warn!(kind = %err.kind, elapsed_ms = millis(elapsed), "invocation rejected: {}", err.message);
                } else {
                    error!(kind = %err.kind, elapsed_ms = millis(elapsed), "invocation failed: {}", err.message);
                }
                self.events
                    .emit(LifecycleEvent::failed(agent_code, invocation_id, &err, elapsed));
                InvocationOutcome::Failure {
                    kind: err.kind,
                    error_details,
                    execution_time_ms: millis(elapsed),
                }
            }
        }
    }

    fn run_steps(
        &self,
        invocation_id: InvocationId,
        request: InvocationRequest,
    ) -> AgentResult<Payload> {
        let agent = self.agent.as_ref();
        let InvocationRequest {
            requested_code,
            mut input,
        } = request;

        // An empty code counts as absent.
        if let Some(requested) = requested_code.as_deref().filter(|c| !c.is_empty()) {
            if requested != agent.code() {
                return Err(AgentError::identity_mismatch(agent.code(), requested));
            }
        }
        self.step_done(invocation_id, LifecycleStep::IdentityCheck);

        let valid = agent
            .validate_input(&input)
            .map_err(|e| e.reclassify(ErrorKind::Validation))?;
        if !valid {
            return Err(AgentError::validation("input validation failed"));
        }
        self.step_done(invocation_id, LifecycleStep::ValidateInput);

        agent
            .before_execute(&mut input)
            .map_err(|e| e.reclassify(ErrorKind::Hook))?;
        self.step_done(invocation_id, LifecycleStep::BeforeExecute);

        let output = agent
            .execute(&input)
            .map_err(|e| e.reclassify(ErrorKind::Execution))?;
        self.step_done(invocation_id, LifecycleStep::Execute);

        // A failing post-hook discards the output.
        agent
            .after_execute(&output)
            .map_err(|e| e.reclassify(ErrorKind::Hook))?;
        self.step_done(invocation_id, LifecycleStep::AfterExecute);

        Ok(output)
    }

    fn step_done(&self, invocation_id: InvocationId, step: LifecycleStep) {
        debug!(%step, "step completed");
        self.events.emit(LifecycleEvent::step_completed(
            self.agent.code(),
            invocation_id,
            step,
        ));
    }

    /// Run one invocation and wrap the outcome in its envelope.
    pub fn invoke_enveloped(&self, request: InvocationRequest) -> OutcomeEnvelope {
        self.invoke(request).into_envelope(self.agent.code())
    }

    /// Aggregate self-description. Never touches `execute`.
    pub fn describe(&self) -> AgentInfo {
        AgentInfo::from_agent(self.agent.as_ref())
    }

    pub fn health(&self) -> HealthReport {
        HealthReport::healthy(self.agent.descriptor())
    }

    /// Forward a configuration to the agent.
    ///
    /// Failures come back as `Configuration` errors. What state the agent is
    /// left in after a failure is up to the agent.
    pub fn apply_configuration(&self, config: Payload) -> AgentResult<()> {
        let keys = config.len();
        match self.agent.set_configuration(config) {
            Ok(()) => {
                info!(agent_code = self.agent.code(), keys, "configuration applied");
                self.events
                    .emit(LifecycleEvent::configuration_applied(self.agent.code(), keys));
                Ok(())
            }
            Err(e) => {
                let err = e.reclassify(ErrorKind::Configuration);
                error!(agent_code = self.agent.code(), "configuration rejected: {}", err.message);
                self.events
                    .emit(LifecycleEvent::configuration_rejected(self.agent.code(), &err));
                Err(err)
            }
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Most recent lifecycle events, newest first.
    pub fn recent_events(&self, filter: &EventFilter, limit: usize) -> Vec<LifecycleEvent> {
        self.events.recent(filter, limit)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("agent", self.agent.descriptor())
            .field("events", &self.events)
            .finish()
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
