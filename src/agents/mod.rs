//! Sample agents shipped with the SDK.

pub mod data_analysis;
pub mod weather;

pub use data_analysis::DataAnalysisAgent;
pub use weather::WeatherAgent;

use crate::contract::AgentContract;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which sample agent to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    DataAnalysis,
    Weather,
}

impl AgentKind {
    pub fn build(&self) -> Arc<dyn AgentContract> {
        match self {
            Self::DataAnalysis => Arc::new(DataAnalysisAgent::new()),
            Self::Weather => Arc::new(WeatherAgent::new()),
        }
    }

    /// Port the agent listens on unless told otherwise
    pub fn default_port(&self) -> u16 {
        match self {
            Self::DataAnalysis => 5002,
            Self::Weather => 5001,
        }
    }

    /// Example invocation body for start-up banners
    pub fn sample_request(&self) -> serde_json::Value {
        match self {
            Self::DataAnalysis => {
                serde_json::json!({"input": {"data": [1, 2, 3, 4, 5], "operation": "avg"}})
            }
            Self::Weather => serde_json::json!({"input": {"city": "Beijing"}}),
        }
    }
}
