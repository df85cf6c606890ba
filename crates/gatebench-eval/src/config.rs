use std::path::Path;

use serde::Deserialize;

use crate::error::EvalError;

/// Top-level evaluation configuration, loaded from TOML.
///
/// Every section and field has a default so a run works with no config file
/// at all; the file only overrides what it names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvalConfig {
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub measurement: MeasurementConfig,
}

/// Renderer identity and tuning flags, shared by both evaluation modes.
#[derive(Debug, Clone, Deserialize)]
pub struct RendererConfig {
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: u32,
    #[serde(default = "default_true")]
    pub continuous_batching: bool,
    #[serde(default = "default_true")]
    pub kv_cache: bool,
    #[serde(default = "default_true")]
    pub prefix_caching: bool,
    #[serde(default = "default_true")]
    pub speculative_decoding: bool,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_dtype")]
    pub dtype: String,
    /// Seed for the stochastic token-count draw; fixed seed, reproducible run.
    #[serde(default)]
    pub seed: u64,
}

fn default_model_name() -> String {
    "gemma-2-9b".into()
}
fn default_max_batch_size() -> u32 {
    8
}
fn default_true() -> bool {
    true
}
fn default_temperature() -> f64 {
    0.7
}
fn default_top_p() -> f64 {
    0.9
}
fn default_dtype() -> String {
    "fp16".into()
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            max_batch_size: default_max_batch_size(),
            continuous_batching: true,
            kv_cache: true,
            prefix_caching: true,
            speculative_decoding: true,
            temperature: default_temperature(),
            top_p: default_top_p(),
            dtype: default_dtype(),
            seed: 0,
        }
    }
}

/// Which gate implementation to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum GateProvider {
    /// Remote gate over HTTP, with optional stub fallback.
    #[serde(rename = "http")]
    Http,
    /// Deterministic local stub, no network at all.
    #[serde(rename = "stub")]
    Stub,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_gate_provider")]
    pub provider: GateProvider,
    #[serde(default = "default_gate_url")]
    pub url: String,
    /// Bound on the health probe and on each decision call.
    #[serde(default = "default_gate_timeout_secs")]
    pub timeout_secs: f64,
    /// When the endpoint fails, degrade to the stub gate instead of aborting
    /// the run.
    #[serde(default = "default_true")]
    pub fallback_to_stub: bool,
}

fn default_gate_provider() -> GateProvider {
    GateProvider::Http
}
fn default_gate_url() -> String {
    "http://localhost:8080".into()
}
fn default_gate_timeout_secs() -> f64 {
    5.0
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            provider: default_gate_provider(),
            url: default_gate_url(),
            timeout_secs: default_gate_timeout_secs(),
            fallback_to_stub: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeasurementConfig {
    /// Number of leading requests processed and discarded to stabilize
    /// internal state. Skipped entirely when the workload is not larger.
    #[serde(default = "default_warmup_requests")]
    pub warmup_requests: usize,
    /// Assumed GPU power draw for the energy estimate.
    #[serde(default = "default_gpu_power_watts")]
    pub gpu_power_watts: f64,
    /// Multiplier on the 2 * params * tokens FLOPs estimate.
    #[serde(default = "default_flops_fudge_factor")]
    pub flops_fudge_factor: f64,
}

fn default_warmup_requests() -> usize {
    10
}
fn default_gpu_power_watts() -> f64 {
    320.0
}
fn default_flops_fudge_factor() -> f64 {
    1.2
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            warmup_requests: default_warmup_requests(),
            gpu_power_watts: default_gpu_power_watts(),
            flops_fudge_factor: default_flops_fudge_factor(),
        }
    }
}

impl EvalConfig {
    pub fn from_file(path: &Path) -> Result<Self, EvalError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| EvalError::Config(format!("failed to parse {}: {e}", path.display())))
    }
}
