use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use gatebench_core::{Gate, GateDecision, Request, StubGate};

use crate::client::GateClient;
use crate::config::{EvalConfig, GateProvider};
use crate::error::EvalError;
use crate::renderer::{ModelInfo, Renderer, SimulatedRenderer};
use crate::types::{EvaluationResult, Mode};

/// Synthetic token count attributed to a direct gate answer, modeling that
/// direct answers are short. Always capped by the request's own
/// `max_output_tokens`; held constant for a given configuration so token
/// accounting stays comparable across runs.
pub const DIRECT_ACTION_TOKEN_CAP: u32 = 50;

/// Execution-path tag for ungated results, where no gate decision exists.
pub const OUTPUT_TYPE_UNGATED: &str = "transformer_generated";

/// What one request produced, before run-level fields are attached.
struct Outcome {
    transformer_invoked: bool,
    transformer_latency_ms: f64,
    gate_decision: Option<GateDecision>,
    gate_latency_ms: f64,
    gate_confidence: Option<f64>,
    gate_metadata: Option<serde_json::Value>,
    output: String,
    tokens_generated: u32,
    output_type: String,
}

/// Executes a workload under one of the two policies.
///
/// One gate and one renderer are constructed per run and shared across all
/// requests; requests are processed strictly one at a time, in workload
/// order. No retries anywhere: a fatal gate failure aborts the run and the
/// partial results are discarded.
pub struct EvaluationRunner {
    gate: Arc<dyn Gate>,
    renderer: Arc<dyn Renderer>,
    warmup_requests: usize,
}

impl EvaluationRunner {
    pub fn new(gate: Arc<dyn Gate>, renderer: Arc<dyn Renderer>, warmup_requests: usize) -> Self {
        Self {
            gate,
            renderer,
            warmup_requests,
        }
    }

    /// Build gate and renderer from configuration.
    ///
    /// With the HTTP provider, an unreachable endpoint is not an error here:
    /// the client degrades to its internal stub (when fallback is enabled)
    /// and the degradation is observable through [`Self::gate_info`].
    pub async fn from_config(config: &EvalConfig) -> Result<Self, EvalError> {
        let renderer = Arc::new(SimulatedRenderer::new(config.renderer.clone()));

        let gate: Arc<dyn Gate> = match config.gate.provider {
            GateProvider::Stub => Arc::new(StubGate::new()),
            GateProvider::Http => Arc::new(GateClient::connect(&config.gate).await?),
        };

        Ok(Self::new(gate, renderer, config.measurement.warmup_requests))
    }

    /// Descriptive mapping for the configured gate, fallback state included.
    pub async fn gate_info(&self) -> serde_json::Value {
        self.gate.info().await
    }

    /// Static metadata of the shared renderer, for the metrics consumer.
    pub fn model_info(&self) -> ModelInfo {
        self.renderer.model_info()
    }

    /// Echo of the shared renderer's effective configuration, for reporting.
    pub fn renderer_config(&self) -> serde_json::Value {
        self.renderer.config()
    }

    /// Run the workload in the given mode and return one result per
    /// non-warmup request, in workload order.
    pub async fn run(
        &self,
        workload: &[Request],
        mode: Mode,
    ) -> Result<Vec<EvaluationResult>, EvalError> {
        // Warmup only when the workload is strictly larger than the count;
        // it must never consume the whole workload.
        let measured = if self.warmup_requests > 0 && workload.len() > self.warmup_requests {
            tracing::info!(count = self.warmup_requests, "Running warmup requests");
            for request in &workload[..self.warmup_requests] {
                // Results are discarded; failures are not.
                self.process_one(request, mode).await?;
            }
            &workload[self.warmup_requests..]
        } else {
            workload
        };

        tracing::info!(count = measured.len(), mode = %mode, "Processing evaluation requests");

        let mut results = Vec::with_capacity(measured.len());
        for (i, request) in measured.iter().enumerate() {
            results.push(self.process_one(request, mode).await?);
            if (i + 1) % 100 == 0 {
                tracing::debug!(processed = i + 1, total = measured.len(), "Progress");
            }
        }

        Ok(results)
    }

    async fn process_one(
        &self,
        request: &Request,
        mode: Mode,
    ) -> Result<EvaluationResult, EvalError> {
        let timestamp = Utc::now();
        let started = Instant::now();

        let outcome = match mode {
            Mode::Ungated => self.process_ungated(request).await,
            Mode::Gated => self.process_gated(request).await?,
        };

        Ok(EvaluationResult {
            request_id: request.id.clone(),
            mode,
            transformer_invoked: outcome.transformer_invoked,
            transformer_latency_ms: outcome.transformer_latency_ms,
            gate_decision: outcome.gate_decision,
            gate_latency_ms: outcome.gate_latency_ms,
            gate_confidence: outcome.gate_confidence,
            gate_metadata: outcome.gate_metadata,
            output: outcome.output,
            tokens_generated: outcome.tokens_generated,
            output_type: outcome.output_type,
            total_latency_ms: started.elapsed().as_secs_f64() * 1000.0,
            timestamp,
        })
    }

    /// Baseline policy: every request pays for the renderer.
    async fn process_ungated(&self, request: &Request) -> Outcome {
        let output = self
            .renderer
            .generate(&request.input, request.max_output_tokens)
            .await;

        Outcome {
            transformer_invoked: true,
            transformer_latency_ms: output.latency_ms,
            gate_decision: None,
            gate_latency_ms: 0.0,
            gate_confidence: None,
            gate_metadata: None,
            output: output.text,
            tokens_generated: output.tokens_generated,
            output_type: OUTPUT_TYPE_UNGATED.into(),
        }
    }

    /// Gated policy: consult the gate, then branch on its decision. Only
    /// the render decision invokes the renderer.
    async fn process_gated(&self, request: &Request) -> Result<Outcome, EvalError> {
        let response =
            self.gate
                .analyze_request(request)
                .await
                .map_err(|source| EvalError::RequestFailed {
                    id: request.id.clone(),
                    stage: "gate_analysis",
                    source,
                })?;

        let mut outcome = Outcome {
            transformer_invoked: false,
            transformer_latency_ms: 0.0,
            gate_decision: Some(response.decision),
            gate_latency_ms: response.analysis_time_ms,
            gate_confidence: Some(response.confidence),
            gate_metadata: Some(response.metadata),
            output: String::new(),
            tokens_generated: 0,
            output_type: response.decision.to_string(),
        };

        match response.decision {
            GateDecision::NoOp => {
                outcome.output = "NO_OPERATION_NEEDED".into();
            }
            GateDecision::Abstain => {
                outcome.output = "ABSTAIN_UNSAFE_OR_UNSOLVABLE".into();
            }
            GateDecision::DirectAction => {
                outcome.output = format!("DIRECT_ANSWER_CONFIDENCE_{:.2}", response.confidence);
                outcome.tokens_generated = DIRECT_ACTION_TOKEN_CAP.min(request.max_output_tokens);
            }
            GateDecision::RenderOnly => {
                let output = self
                    .renderer
                    .generate(&request.input, request.max_output_tokens)
                    .await;
                outcome.transformer_invoked = true;
                outcome.transformer_latency_ms = output.latency_ms;
                outcome.output = output.text;
                outcome.tokens_generated = output.tokens_generated;
            }
        }

        Ok(outcome)
    }
}
