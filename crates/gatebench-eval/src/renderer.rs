use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use gatebench_core::clock::{Clock, SystemClock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::RendererConfig;

/// Caps at or below this many tokens always produce exactly the cap;
/// above it the count is drawn uniformly from [floor, cap].
pub const DETERMINISTIC_TOKEN_FLOOR: u32 = 20;

// Latency model for an 8B-class model, before optimization multipliers.
const BASE_LATENCY_MS: f64 = 120.0;
const TOKENS_PER_MS: f64 = 2.1;

// Named optimization multipliers. Each flag scales one of the two constants.
const CONTINUOUS_BATCHING_BASE_FACTOR: f64 = 0.8;
const KV_CACHE_BASE_FACTOR: f64 = 0.9;
const SPECULATIVE_DECODING_RATE_FACTOR: f64 = 1.3;

/// Output of a single render call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOutput {
    pub text: String,
    pub tokens_generated: u32,
    /// Modeled generation latency in milliseconds.
    pub latency_ms: f64,
}

/// Static model metadata, used only by external reporting (FLOPs, cost).
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub parameter_count: u64,
    pub architecture: &'static str,
    pub precision: String,
}

/// The expensive computation backend shared by both evaluation modes.
///
/// One instance serves an entire run; both policies call it with identical
/// configuration, which is what makes the A/B comparison fair.
pub trait Renderer: Send + Sync {
    fn generate<'a>(
        &'a self,
        input_text: &'a str,
        max_tokens: u32,
    ) -> Pin<Box<dyn Future<Output = RenderOutput> + Send + 'a>>;

    /// Echo of the effective configuration, for reporting only.
    fn config(&self) -> serde_json::Value;

    /// Static model metadata, for reporting only.
    fn model_info(&self) -> ModelInfo;
}

/// Simulated renderer: models latency as a per-call base cost plus a
/// per-token generation cost, scaled by the configured optimization flags,
/// and burns the modeled time through the injected clock.
pub struct SimulatedRenderer {
    config: RendererConfig,
    base_latency_ms: f64,
    tokens_per_ms: f64,
    rng: Mutex<StdRng>,
    clock: Arc<dyn Clock>,
}

impl SimulatedRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RendererConfig, clock: Arc<dyn Clock>) -> Self {
        let mut base_latency_ms = BASE_LATENCY_MS;
        let mut tokens_per_ms = TOKENS_PER_MS;

        if config.continuous_batching {
            base_latency_ms *= CONTINUOUS_BATCHING_BASE_FACTOR;
        }
        if config.kv_cache {
            base_latency_ms *= KV_CACHE_BASE_FACTOR;
        }
        if config.speculative_decoding {
            tokens_per_ms *= SPECULATIVE_DECODING_RATE_FACTOR;
        }

        let rng = Mutex::new(StdRng::seed_from_u64(config.seed));

        Self {
            config,
            base_latency_ms,
            tokens_per_ms,
            rng,
            clock,
        }
    }

    fn draw_token_count(&self, max_tokens: u32) -> u32 {
        if max_tokens <= DETERMINISTIC_TOKEN_FLOOR {
            max_tokens
        } else {
            self.rng
                .lock()
                .expect("rng lock poisoned")
                .gen_range(DETERMINISTIC_TOKEN_FLOOR..=max_tokens)
        }
    }
}

impl Renderer for SimulatedRenderer {
    fn generate<'a>(
        &'a self,
        input_text: &'a str,
        max_tokens: u32,
    ) -> Pin<Box<dyn Future<Output = RenderOutput> + Send + 'a>> {
        Box::pin(async move {
            let tokens_generated = self.draw_token_count(max_tokens);
            let latency_ms =
                self.base_latency_ms + f64::from(tokens_generated) / self.tokens_per_ms;

            tracing::debug!(
                input_words = input_text.split_whitespace().count(),
                tokens = tokens_generated,
                latency_ms = latency_ms,
                "Render"
            );

            self.clock
                .sleep(Duration::from_secs_f64(latency_ms / 1000.0))
                .await;

            RenderOutput {
                text: format!("RENDER_OUTPUT_{tokens_generated}_TOKENS"),
                tokens_generated,
                latency_ms,
            }
        })
    }

    fn config(&self) -> serde_json::Value {
        json!({
            "model_name": self.config.model_name,
            "max_batch_size": self.config.max_batch_size,
            "continuous_batching": self.config.continuous_batching,
            "kv_cache": self.config.kv_cache,
            "prefix_caching": self.config.prefix_caching,
            "speculative_decoding": self.config.speculative_decoding,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "seed": self.config.seed,
            "effective_base_latency_ms": self.base_latency_ms,
            "effective_tokens_per_ms": self.tokens_per_ms,
        })
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model_name: self.config.model_name.clone(),
            parameter_count: parameter_count(&self.config.model_name),
            architecture: "transformer_decoder",
            precision: self.config.dtype.clone(),
        }
    }
}

/// Parameter counts for the models this bench is normally pointed at.
/// Unknown names fall back to the 8B-class default the latency constants
/// were calibrated for.
fn parameter_count(model_name: &str) -> u64 {
    match model_name {
        "gemma-2-9b" => 9_240_000_000,
        "gemma-2-27b" => 27_200_000_000,
        "llama-3.1-8b" => 8_030_000_000,
        "llama-3.1-70b" => 70_553_000_000,
        "llama-3.2-3b" => 3_210_000_000,
        "mistral-7b" => 7_240_000_000,
        "mixtral-8x7b" => 46_700_000_000,
        "qwen2.5-7b" => 7_615_000_000,
        "phi-3.5-mini" => 3_820_000_000,
        "gpt2" => 124_000_000,
        _ => 8_030_000_000,
    }
}
