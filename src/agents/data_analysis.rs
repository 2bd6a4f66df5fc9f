//! Statistical aggregation over a list of numbers.

use crate::contract::{AgentBase, AgentContract};
use crate::errors::{AgentError, AgentResult, SuggestedAction};
use crate::types::{Payload, SchemaDescriptor};
use serde_json::{json, Number, Value};
use std::str::FromStr;

pub const AGENT_CODE: &str = "data_analysis_agent";

/// Supported aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Sum,
    Avg,
    Max,
    Min,
    Median,
    Stdev,
    Variance,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Self::Sum,
        Self::Avg,
        Self::Max,
        Self::Min,
        Self::Median,
        Self::Stdev,
        Self::Variance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Max => "max",
            Self::Min => "min",
            Self::Median => "median",
            Self::Stdev => "stdev",
            Self::Variance => "variance",
        }
    }

    fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|op| op.as_str()).collect()
    }

    /// Apply to a non-empty sample.
    ///
    /// `stdev` and `variance` are sample statistics (n - 1); both are 0 for
    /// a single value.
    pub fn apply(&self, data: &[f64]) -> f64 {
        let n = data.len() as f64;
        match self {
            Self::Sum => data.iter().sum(),
            Self::Avg => data.iter().sum::<f64>() / n,
            Self::Max => data.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Min => data.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Median => {
                let mut sorted = data.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            Self::Variance => sample_variance(data),
            Self::Stdev => sample_variance(data).sqrt(),
        }
    }

    /// Whether the result stays an integer for integer input.
    fn preserves_integers(&self) -> bool {
        !matches!(self, Self::Stdev | Self::Variance)
    }
}

impl FromStr for Operation {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| AgentError::execution(format!("unsupported operation: {}", s)))
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn sample_variance(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
}

/// Render a result, keeping integers integral when exact.
fn number_value(result: f64, integral: bool) -> Value {
    if integral && result.fract() == 0.0 && result.abs() < i64::MAX as f64 {
        Value::from(result as i64)
    } else {
        Number::from_f64(result)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Computes sum/avg/max/min/median/stdev/variance over `data`.
pub struct DataAnalysisAgent {
    base: AgentBase,
}

impl DataAnalysisAgent {
    pub fn new() -> Self {
        Self {
            base: AgentBase::new(
                AGENT_CODE,
                "Data Analysis Agent",
                "Statistical analysis over a list of numbers: sum, average, maximum, \
                 minimum, median, standard deviation and variance.",
            ),
        }
    }
}

impl Default for DataAnalysisAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentContract for DataAnalysisAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn execute(&self, input: &Payload) -> AgentResult<Payload> {
        let raw = input
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| AgentError::execution("data must be an array"))?;
        if raw.is_empty() {
            return Err(AgentError::execution("data must not be empty"));
        }
        let data = raw
            .iter()
            .map(|v| {
                v.as_f64()
                    .ok_or_else(|| AgentError::execution("data must contain only numbers"))
            })
            .collect::<AgentResult<Vec<f64>>>()?;
        let operation: Operation = input
            .get("operation")
            .and_then(Value::as_str)
            .unwrap_or("sum")
            .parse()?;

        let integral = raw.iter().all(|v| v.is_i64() || v.is_u64());
        let result = operation.apply(&data);

        // Range keeps the caller's original number representation.
        let min = raw
            .iter()
            .zip(&data)
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(v, _)| v.clone());
        let max = raw
            .iter()
            .zip(&data)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(v, _)| v.clone());

        let output = json!({
            "operation": operation.as_str(),
            "result": number_value(result, integral && operation.preserves_integers()),
            "data_count": data.len(),
            "data_range": {"min": min, "max": max},
        });
        Ok(output.as_object().cloned().unwrap_or_default())
    }

    fn input_schema(&self) -> SchemaDescriptor {
        SchemaDescriptor::object()
            .property(
                "data",
                SchemaDescriptor::array(SchemaDescriptor::number())
                    .describe("Numbers to analyse"),
            )
            .property(
                "operation",
                SchemaDescriptor::string()
                    .one_of(Operation::names())
                    .describe(
                        "sum (total), avg (mean), max, min, median, \
                         stdev (sample standard deviation), variance (sample variance)",
                    ),
            )
            .require("data")
            .require("operation")
    }

    fn output_schema(&self) -> SchemaDescriptor {
        SchemaDescriptor::object()
            .property(
                "operation",
                SchemaDescriptor::string().describe("Operation performed"),
            )
            .property("result", SchemaDescriptor::number().describe("Computed value"))
            .property(
                "data_count",
                SchemaDescriptor::integer().describe("Number of values"),
            )
            .property(
                "data_range",
                SchemaDescriptor::object()
                    .property("min", SchemaDescriptor::number().describe("Smallest value"))
                    .property("max", SchemaDescriptor::number().describe("Largest value")),
            )
    }

    fn capabilities(&self) -> Vec<String> {
        ["statistics", "data-analysis", "math", "aggregation"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn category(&self) -> String {
        "data-analysis".to_string()
    }

    fn tags(&self) -> Vec<String> {
        ["data", "analysis", "statistics", "math"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn validate_input(&self, input: &Payload) -> AgentResult<bool> {
        let data = input
            .get("data")
            .ok_or_else(|| missing("data"))?;
        let operation = input
            .get("operation")
            .ok_or_else(|| missing("operation"))?;

        let items = data.as_array().ok_or_else(|| {
            AgentError::validation("data must be an array")
                .with_suggestion(SuggestedAction::FixInput { field: "data".into() })
        })?;
        if items.is_empty() {
            return Err(AgentError::validation("data must not be empty")
                .with_suggestion(SuggestedAction::FixInput { field: "data".into() }));
        }
        if !items.iter().all(Value::is_number) {
            return Err(AgentError::validation("data must contain only numbers")
                .with_suggestion(SuggestedAction::FixInput { field: "data".into() }));
        }

        let valid = operation
            .as_str()
            .map(|op| op.parse::<Operation>().is_ok())
            .unwrap_or(false);
        if !valid {
            return Err(AgentError::validation(format!(
                "operation must be one of: {}",
                Operation::names().join(", ")
            ))
            .with_suggestion(SuggestedAction::SeeSchema));
        }

        Ok(true)
    }
}

fn missing(field: &str) -> AgentError {
    AgentError::validation(format!("missing required parameter: {}", field))
        .with_suggestion(SuggestedAction::FixInput {
            field: field.to_string(),
        })
}
