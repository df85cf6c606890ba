use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::decision::GateDecision;
use crate::error::GateError;
use crate::request::Request;

/// Capability contract for decision gates.
///
/// The runner depends only on this trait, never on a concrete gate.
/// `analyze_request` must be a pure function of the request plus the gate's
/// own internal state (a call counter, a cached availability flag); it must
/// not mutate the request.
pub trait Gate: Send + Sync {
    /// Classify a request into one of the four decisions.
    fn analyze_request<'a>(
        &'a self,
        request: &'a Request,
    ) -> Pin<Box<dyn Future<Output = Result<GateResponse, GateError>> + Send + 'a>>;

    /// Whether the gate is ready to take requests. Networked gates may
    /// re-probe lazily here.
    fn is_available<'a>(&'a self) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

    /// Descriptive mapping for reporting: gate type, configuration, and
    /// whatever the implementation knows about itself.
    fn info<'a>(&'a self) -> Pin<Box<dyn Future<Output = serde_json::Value> + Send + 'a>>;
}

/// Outcome of a single gate analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateResponse {
    pub decision: GateDecision,
    /// Confidence in the decision, in [0, 1].
    pub confidence: f64,
    /// Modeled (or measured) analysis latency in milliseconds.
    pub analysis_time_ms: f64,
    /// Open provenance mapping. A response produced through a fallback path
    /// always carries `fallback_used = true` and a `fallback_reason`.
    pub metadata: serde_json::Value,
}

impl GateResponse {
    /// Whether this response was produced by a fallback gate rather than the
    /// configured one.
    pub fn fallback_used(&self) -> bool {
        self.metadata
            .get("fallback_used")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}
