use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::clock::{Clock, SystemClock};
use crate::decision::GateDecision;
use crate::error::GateError;
use crate::gate::{Gate, GateResponse};
use crate::request::Request;

// Confidence reported with each decision band. These are fixed per gate
// version; the band boundaries themselves live in [`StubProfile`].
const UNSAFE_ABSTAIN_CONFIDENCE: f64 = 0.95;
const TRIVIAL_NO_OP_CONFIDENCE: f64 = 0.90;
const TRIVIAL_DIRECT_CONFIDENCE: f64 = 0.85;
const CREATIVE_RENDER_CONFIDENCE: f64 = 0.80;
const CREATIVE_DIRECT_CONFIDENCE: f64 = 0.70;
const DEFAULT_NO_OP_CONFIDENCE: f64 = 0.85;
const DEFAULT_ABSTAIN_CONFIDENCE: f64 = 0.90;
const DEFAULT_DIRECT_CONFIDENCE: f64 = 0.80;
const DEFAULT_RENDER_CONFIDENCE: f64 = 0.75;

/// Base modeled analysis latency in milliseconds. The seed adds up to 4 ms
/// on top, so modeled latency spans [1.0, 5.0) ms.
const BASE_ANALYSIS_LATENCY_MS: f64 = 1.0;

/// Decision-band boundaries for the stub gate, over a seed in [0, 100).
///
/// The defaults are illustrative placeholders, not a calibrated model of any
/// real classifier. They are plain data so an evaluation can tune them
/// without touching decision logic.
#[derive(Debug, Clone, Serialize)]
pub struct StubProfile {
    /// "trivial" hint: seeds below this are NoOp, the rest DirectAction.
    pub trivial_no_op_below: u64,
    /// "creative"/"business" hint: seeds below this are RenderOnly, the rest
    /// DirectAction.
    pub creative_render_below: u64,
    /// No hint: the three lower band boundaries; seeds at or above
    /// `unhinted_direct_below` are RenderOnly.
    pub unhinted_no_op_below: u64,
    pub unhinted_abstain_below: u64,
    pub unhinted_direct_below: u64,
}

impl Default for StubProfile {
    fn default() -> Self {
        Self {
            trivial_no_op_below: 70,
            creative_render_below: 80,
            unhinted_no_op_below: 10,
            unhinted_abstain_below: 15,
            unhinted_direct_below: 75,
        }
    }
}

impl StubProfile {
    /// Map a category hint and decision seed to a decision and confidence.
    fn decide(&self, category: Option<&str>, seed: u64) -> (GateDecision, f64) {
        match category {
            Some("unsafe") => (GateDecision::Abstain, UNSAFE_ABSTAIN_CONFIDENCE),
            Some("trivial") => {
                if seed < self.trivial_no_op_below {
                    (GateDecision::NoOp, TRIVIAL_NO_OP_CONFIDENCE)
                } else {
                    (GateDecision::DirectAction, TRIVIAL_DIRECT_CONFIDENCE)
                }
            }
            Some("creative") | Some("business") => {
                if seed < self.creative_render_below {
                    (GateDecision::RenderOnly, CREATIVE_RENDER_CONFIDENCE)
                } else {
                    (GateDecision::DirectAction, CREATIVE_DIRECT_CONFIDENCE)
                }
            }
            _ => {
                if seed < self.unhinted_no_op_below {
                    (GateDecision::NoOp, DEFAULT_NO_OP_CONFIDENCE)
                } else if seed < self.unhinted_abstain_below {
                    (GateDecision::Abstain, DEFAULT_ABSTAIN_CONFIDENCE)
                } else if seed < self.unhinted_direct_below {
                    (GateDecision::DirectAction, DEFAULT_DIRECT_CONFIDENCE)
                } else {
                    (GateDecision::RenderOnly, DEFAULT_RENDER_CONFIDENCE)
                }
            }
        }
    }
}

/// Deterministic gate used when no remote gate is reachable.
///
/// The sole source of "randomness" is a stable hash of the request input, so
/// the same input always yields the same decision, confidence, and modeled
/// latency for a given gate version.
pub struct StubGate {
    profile: StubProfile,
    clock: Arc<dyn Clock>,
    call_count: AtomicU64,
}

impl StubGate {
    pub fn new() -> Self {
        Self::with_profile(StubProfile::default(), Arc::new(SystemClock))
    }

    pub fn with_profile(profile: StubProfile, clock: Arc<dyn Clock>) -> Self {
        Self {
            profile,
            clock,
            call_count: AtomicU64::new(0),
        }
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_profile(StubProfile::default(), clock)
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl Default for StubGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Reduce the input text to a seed in [0, 100) via SHA-256.
fn decision_seed(input: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hex::encode(hasher.finalize());
    // First 8 hex chars always parse; the fallback is unreachable.
    u64::from_str_radix(&digest[..8], 16).unwrap_or(0) % 100
}

impl Gate for StubGate {
    fn analyze_request<'a>(
        &'a self,
        request: &'a Request,
    ) -> Pin<Box<dyn Future<Output = Result<GateResponse, GateError>> + Send + 'a>> {
        Box::pin(async move {
            let call_count = self.call_count.fetch_add(1, Ordering::Relaxed) + 1;

            let seed = decision_seed(&request.input);
            let category = request.category_hint();
            let (decision, confidence) = self.profile.decide(category, seed);

            tracing::debug!(
                request_id = %request.id,
                decision = %decision,
                seed = seed,
                category = category.unwrap_or("none"),
                "Stub gate decision"
            );

            // Modeled analysis latency, derived from the same seed so it is
            // reproducible. Burned through the clock; the reported value is
            // the model, which a no-op clock leaves intact.
            let analysis_time_ms = BASE_ANALYSIS_LATENCY_MS + (seed % 40) as f64 / 10.0;
            self.clock
                .sleep(Duration::from_secs_f64(analysis_time_ms / 1000.0))
                .await;

            Ok(GateResponse {
                decision,
                confidence,
                analysis_time_ms,
                metadata: json!({
                    "gate_type": "stub",
                    "input_length": request.input.len(),
                    "max_tokens": request.max_output_tokens,
                    "decision_seed": seed,
                    "category_hint": category.unwrap_or("unknown"),
                    "call_count": call_count,
                }),
            })
        })
    }

    fn is_available<'a>(&'a self) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async { true })
    }

    fn info<'a>(&'a self) -> Pin<Box<dyn Future<Output = serde_json::Value> + Send + 'a>> {
        Box::pin(async move {
            json!({
                "gate_type": "stub",
                "version": env!("CARGO_PKG_VERSION"),
                "description": "Deterministic hash-based gate used when no remote gate is reachable",
                "profile": &self.profile,
                "call_count": self.call_count(),
            })
        })
    }
}
