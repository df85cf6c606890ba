use std::str::FromStr;

use chrono::{DateTime, Utc};
use gatebench_core::GateDecision;
use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// The two execution policies under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Baseline: every request pays for the renderer.
    Ungated,
    /// The gate decides per request whether the renderer runs.
    Gated,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Ungated => "ungated",
            Mode::Gated => "gated",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ungated" => Ok(Mode::Ungated),
            "gated" => Ok(Mode::Gated),
            other => Err(EvalError::InvalidMode(other.to_string())),
        }
    }
}

/// Per-request outcome of an evaluation run.
///
/// Immutable once produced; the caller of the runner owns the list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub request_id: String,
    pub mode: Mode,
    /// Whether the renderer actually ran for this request. Always true in
    /// ungated mode; true iff the gate said "render" in gated mode.
    pub transformer_invoked: bool,
    pub transformer_latency_ms: f64,
    /// None in ungated mode, where no gate is consulted.
    pub gate_decision: Option<GateDecision>,
    pub gate_latency_ms: f64,
    pub gate_confidence: Option<f64>,
    pub gate_metadata: Option<serde_json::Value>,
    pub output: String,
    pub tokens_generated: u32,
    /// Execution-path tag: the decision wire value in gated mode,
    /// "transformer_generated" in ungated mode.
    pub output_type: String,
    /// Wall-clock time for the whole request, gate included.
    pub total_latency_ms: f64,
    /// Taken once at the start of processing, for throughput computation.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_both_values() {
        assert_eq!("ungated".parse::<Mode>().unwrap(), Mode::Ungated);
        assert_eq!("gated".parse::<Mode>().unwrap(), Mode::Gated);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = "an1".parse::<Mode>().unwrap_err();
        assert!(matches!(err, EvalError::InvalidMode(_)));
        assert!(err.to_string().contains("an1"));
    }

    #[test]
    fn mode_serializes_to_wire_value() {
        assert_eq!(serde_json::to_string(&Mode::Gated).unwrap(), "\"gated\"");
        assert_eq!(
            serde_json::to_string(&Mode::Ungated).unwrap(),
            "\"ungated\""
        );
    }
}
