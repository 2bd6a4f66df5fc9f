//! # Agent SDK
//!
//! The execution protocol for pluggable agents: units of domain logic that
//! describe their own input/output shape and are invoked by an external
//! orchestrating platform over one uniform request/response interface.
//!
//! - **AgentContract**: what every agent implements (identity,
//!   self-description, configuration, validation, lifecycle hooks)
//! - **Orchestrator**: runs one invocation through the lifecycle
//!   (identity → validate → before → execute → after) with timing and
//!   error isolation, always yielding exactly one outcome
//! - **Events**: lifecycle checkpoints published for observability
//! - **Server**: the HTTP binding (`/health`, `/info`, `/execute`, `/config`)
//! - **Agents**: two sample agents (statistics, mocked weather)
//!
//! ## Usage
//!
//! ```rust
//! use agent_sdk::prelude::*;
//! use std::sync::Arc;
//!
//! struct GreeterAgent {
//!     base: AgentBase,
//! }
//!
//! impl AgentContract for GreeterAgent {
//!     fn base(&self) -> &AgentBase {
//!         &self.base
//!     }
//!
//!     fn execute(&self, input: &Payload) -> AgentResult<Payload> {
//!         let name = input.get("name").and_then(|v| v.as_str()).unwrap_or("world");
//!         let mut out = Payload::new();
//!         out.insert("greeting".into(), format!("hello, {}", name).into());
//!         Ok(out)
//!     }
//! }
//!
//! let agent = GreeterAgent { base: AgentBase::new("greeter", "Greeter", "Says hello") };
//! let orchestrator = Orchestrator::new(Arc::new(agent));
//! let outcome = orchestrator.invoke(InvocationRequest::default().for_agent("greeter"));
//! assert!(outcome.is_success());
//! ```

pub mod agents;
pub mod contract;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod server;
pub mod types;

// Re-export everything in prelude for convenience
pub mod prelude {
    pub use crate::contract::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::lifecycle::*;
    pub use crate::types::*;
}

// Also re-export at crate root
pub use prelude::*;
