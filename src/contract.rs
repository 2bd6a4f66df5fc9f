//! The contract every agent implements.
//!
//! An agent supplies two things: its [`AgentBase`] (identity plus the
//! configuration slot) and `execute`. Everything else on [`AgentContract`]
//! has a default, so an agent overrides only what it needs.

use crate::errors::{AgentError, AgentResult};
use crate::types::{AgentDescriptor, Payload, SchemaDescriptor};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Advisory timeout published when an agent does not choose its own.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Catch-all category for agents that do not declare one.
pub const DEFAULT_CATEGORY: &str = "general";

/// Configuration applied to an agent.
///
/// An open mapping with no required keys: agents must check for presence
/// before use. Replaced wholesale by `set_configuration`, never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentConfiguration {
    options: Payload,
}

impl AgentConfiguration {
    pub fn new(options: Payload) -> Self {
        Self { options }
    }

    /// Empty configuration
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add an option
    pub fn option(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.options.insert(key.into(), v);
        }
        self
    }

    /// Get a raw option
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.options.get(key)
    }

    /// Get a typed option; `None` when absent or of the wrong shape
    pub fn get_option<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.options
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get a string option
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn as_payload(&self) -> &Payload {
        &self.options
    }
}

impl From<Payload> for AgentConfiguration {
    fn from(options: Payload) -> Self {
        Self::new(options)
    }
}

/// Shared configuration slot.
///
/// Readers take an `Arc` snapshot; writers swap the whole value under the
/// write lock. A reader therefore sees either the old or the new mapping,
/// never a mix.
#[derive(Debug, Default)]
pub struct ConfigurationCell {
    current: RwLock<Arc<AgentConfiguration>>,
}

impl ConfigurationCell {
    pub fn new(config: AgentConfiguration) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Current configuration snapshot
    pub fn snapshot(&self) -> Arc<AgentConfiguration> {
        // A poisoned lock still holds a whole Arc; the swap below cannot tear it.
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replace the configuration
    pub fn replace(&self, config: AgentConfiguration) {
        let next = Arc::new(config);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

/// State every agent carries: its identity and its configuration.
///
/// Agents embed one of these and hand it out through
/// [`AgentContract::base`]; the trait's defaults delegate to it.
#[derive(Debug)]
pub struct AgentBase {
    descriptor: AgentDescriptor,
    configuration: ConfigurationCell,
}

impl AgentBase {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::from_descriptor(AgentDescriptor::new(code, name, description))
    }

    pub fn from_descriptor(descriptor: AgentDescriptor) -> Self {
        tracing::debug!(agent_code = descriptor.code(), "agent initialized");
        Self {
            descriptor,
            configuration: ConfigurationCell::default(),
        }
    }

    pub fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    pub fn configuration(&self) -> Arc<AgentConfiguration> {
        self.configuration.snapshot()
    }

    pub fn replace_configuration(&self, config: AgentConfiguration) {
        self.configuration.replace(config);
    }
}

/// The capability set every agent satisfies.
///
/// Operations take `&self` so one instance can serve overlapping
/// invocations; configuration is the only mutable state and goes through
/// [`ConfigurationCell`].
pub trait AgentContract: Send + Sync {
    /// Identity and configuration holder
    fn base(&self) -> &AgentBase;

    /// Run the agent's domain logic.
    ///
    /// Must depend only on `input` and the current configuration.
    fn execute(&self, input: &Payload) -> AgentResult<Payload>;

    // ═══════════════════════════════════════════════════════
    // DEFAULT IMPLEMENTATIONS
    // ═══════════════════════════════════════════════════════

    fn descriptor(&self) -> &AgentDescriptor {
        self.base().descriptor()
    }

    /// Unique agent code
    fn code(&self) -> &str {
        self.descriptor().code()
    }

    /// Current configuration snapshot
    fn configuration(&self) -> Arc<AgentConfiguration> {
        self.base().configuration()
    }

    /// Shape of accepted input
    fn input_schema(&self) -> SchemaDescriptor {
        SchemaDescriptor::empty_input()
    }

    /// Shape of produced output
    fn output_schema(&self) -> SchemaDescriptor {
        SchemaDescriptor::object()
    }

    /// Semantic capabilities, for discovery
    fn capabilities(&self) -> Vec<String> {
        Vec::new()
    }

    fn category(&self) -> String {
        DEFAULT_CATEGORY.to_string()
    }

    fn tags(&self) -> Vec<String> {
        Vec::new()
    }

    /// Advisory timeout for the caller. Not enforced by the orchestrator.
    fn timeout_seconds(&self) -> u64 {
        DEFAULT_TIMEOUT_SECONDS
    }

    /// Replace the configuration wholesale.
    ///
    /// Overrides that validate should fail before calling
    /// [`AgentBase::replace_configuration`] so a rejected mapping is never
    /// applied.
    fn set_configuration(&self, config: Payload) -> AgentResult<()> {
        self.base().replace_configuration(config.into());
        Ok(())
    }

    /// Check the input before anything else runs.
    ///
    /// Prefer returning a descriptive `Err` over `Ok(false)`: the message is
    /// surfaced to the caller.
    fn validate_input(&self, _input: &Payload) -> AgentResult<bool> {
        Ok(true)
    }

    /// Runs before `execute`; changes to `input` are seen by `execute`.
    fn before_execute(&self, _input: &mut Payload) -> AgentResult<()> {
        Ok(())
    }

    /// Runs after a successful `execute`. A failure here discards the output.
    fn after_execute(&self, _output: &Payload) -> AgentResult<()> {
        Ok(())
    }

    /// Translate a lifecycle error into caller-facing details.
    ///
    /// The result must keep `error` and `error_kind`.
    fn on_error(&self, error: &AgentError) -> Payload {
        error.to_details()
    }
}

/// Self-description of an agent, for discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub agent_code: String,
    pub agent_name: String,
    pub description: String,
    pub input_schema: SchemaDescriptor,
    pub output_schema: SchemaDescriptor,
    pub capabilities: Vec<String>,
    pub category: String,
    pub tags: Vec<String>,
    /// Advisory timeout in seconds
    pub timeout: u64,
}

impl AgentInfo {
    /// Create from an agent instance
    pub fn from_agent<A: AgentContract + ?Sized>(agent: &A) -> Self {
        let descriptor = agent.descriptor();
        Self {
            agent_code: descriptor.code().to_string(),
            agent_name: descriptor.name().to_string(),
            description: descriptor.description().to_string(),
            input_schema: agent.input_schema(),
            output_schema: agent.output_schema(),
            capabilities: agent.capabilities(),
            category: agent.category(),
            tags: agent.tags(),
            timeout: agent.timeout_seconds(),
        }
    }
}

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub agent_code: String,
    pub agent_name: String,
}

impl HealthReport {
    pub fn healthy(descriptor: &AgentDescriptor) -> Self {
        Self {
            status: "healthy".to_string(),
            agent_code: descriptor.code().to_string(),
            agent_name: descriptor.name().to_string(),
        }
    }
}
