use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::MeasurementConfig;
use crate::renderer::ModelInfo;
use crate::types::EvaluationResult;

/// Fixed estimate for one gate analysis, conservative by design: the gate is
/// orders of magnitude cheaper than the renderer and the comparison only
/// needs that order of magnitude to be visible.
const GATE_FLOPS_PER_REQUEST: f64 = 1_000_000.0;

/// Aggregate metrics over one run's result list.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetrics {
    pub latency: LatencyMetrics,
    pub throughput: ThroughputMetrics,
    pub invocation: InvocationMetrics,
    pub tokens: TokenMetrics,
    pub compute: ComputeMetrics,
    pub output_types: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyMetrics {
    pub mean: f64,
    pub median: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub min: f64,
    pub max: f64,
    pub std: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThroughputMetrics {
    pub requests_per_sec: f64,
    pub tokens_per_sec: f64,
    pub total_requests: usize,
    pub total_time_seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvocationMetrics {
    pub transformer_rate: f64,
    pub transformer_invocations: usize,
    pub total_requests: usize,
    /// Per-decision rates over the whole run, keyed by wire value. Empty in
    /// ungated mode where no decisions exist.
    pub decision_rates: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenMetrics {
    pub total_generated: u64,
    pub mean_per_request: f64,
    pub median_per_request: f64,
    pub min_per_request: u32,
    pub max_per_request: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComputeMetrics {
    pub renderer_active_seconds: f64,
    pub gate_seconds: f64,
    pub total_energy_joules: f64,
    pub renderer_flops: f64,
    pub gate_flops: f64,
    pub total_flops: f64,
    pub renderer_flops_percent: f64,
}

/// Compute run metrics from a result list. Returns `None` for an empty list.
pub fn calculate(
    results: &[EvaluationResult],
    model: &ModelInfo,
    measurement: &MeasurementConfig,
) -> Option<RunMetrics> {
    if results.is_empty() {
        return None;
    }

    let mut output_types = BTreeMap::new();
    for result in results {
        *output_types.entry(result.output_type.clone()).or_insert(0) += 1;
    }

    Some(RunMetrics {
        latency: latency_metrics(results),
        throughput: throughput_metrics(results),
        invocation: invocation_metrics(results),
        tokens: token_metrics(results),
        compute: compute_metrics(results, model, measurement),
        output_types,
    })
}

fn latency_metrics(results: &[EvaluationResult]) -> LatencyMetrics {
    let mut latencies: Vec<f64> = results.iter().map(|r| r.total_latency_ms).collect();
    latencies.sort_by(|a, b| a.partial_cmp(b).expect("latency is never NaN"));

    let mean = latencies.iter().sum::<f64>() / latencies.len() as f64;
    let variance =
        latencies.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / latencies.len() as f64;

    LatencyMetrics {
        mean,
        median: percentile(&latencies, 50.0),
        p50: percentile(&latencies, 50.0),
        p95: percentile(&latencies, 95.0),
        p99: percentile(&latencies, 99.0),
        min: latencies[0],
        max: latencies[latencies.len() - 1],
        std: variance.sqrt(),
    }
}

/// Linear-interpolated percentile over a sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

fn throughput_metrics(results: &[EvaluationResult]) -> ThroughputMetrics {
    let total_requests = results.len();
    let total_tokens: u64 = results.iter().map(|r| u64::from(r.tokens_generated)).sum();

    // Span between the first and last request timestamps. A single-request
    // run has no span, so rates stay zero rather than dividing by nothing.
    let first = results.iter().map(|r| r.timestamp).min();
    let last = results.iter().map(|r| r.timestamp).max();
    let total_time_seconds = match (first, last) {
        (Some(first), Some(last)) => (last - first).num_milliseconds() as f64 / 1000.0,
        _ => 0.0,
    };

    if total_requests < 2 || total_time_seconds <= 0.0 {
        return ThroughputMetrics {
            requests_per_sec: 0.0,
            tokens_per_sec: 0.0,
            total_requests,
            total_time_seconds,
        };
    }

    ThroughputMetrics {
        requests_per_sec: total_requests as f64 / total_time_seconds,
        tokens_per_sec: total_tokens as f64 / total_time_seconds,
        total_requests,
        total_time_seconds,
    }
}

fn invocation_metrics(results: &[EvaluationResult]) -> InvocationMetrics {
    let total_requests = results.len();
    let transformer_invocations = results.iter().filter(|r| r.transformer_invoked).count();

    let mut decision_counts: BTreeMap<String, usize> = BTreeMap::new();
    for result in results {
        if let Some(decision) = result.gate_decision {
            *decision_counts.entry(decision.to_string()).or_insert(0) += 1;
        }
    }

    let decision_rates = decision_counts
        .into_iter()
        .map(|(decision, count)| (decision, count as f64 / total_requests as f64))
        .collect();

    InvocationMetrics {
        transformer_rate: transformer_invocations as f64 / total_requests as f64,
        transformer_invocations,
        total_requests,
        decision_rates,
    }
}

fn token_metrics(results: &[EvaluationResult]) -> TokenMetrics {
    let mut counts: Vec<u32> = results.iter().map(|r| r.tokens_generated).collect();
    counts.sort_unstable();

    let total_generated: u64 = counts.iter().map(|&c| u64::from(c)).sum();
    let as_f64: Vec<f64> = counts.iter().map(|&c| f64::from(c)).collect();

    TokenMetrics {
        total_generated,
        mean_per_request: total_generated as f64 / counts.len() as f64,
        median_per_request: percentile(&as_f64, 50.0),
        min_per_request: counts[0],
        max_per_request: counts[counts.len() - 1],
    }
}

fn compute_metrics(
    results: &[EvaluationResult],
    model: &ModelInfo,
    measurement: &MeasurementConfig,
) -> ComputeMetrics {
    let renderer_active_seconds: f64 = results
        .iter()
        .map(|r| r.transformer_latency_ms)
        .sum::<f64>()
        / 1000.0;
    let gate_seconds: f64 = results.iter().map(|r| r.gate_latency_ms).sum::<f64>() / 1000.0;

    // FLOPs estimate: 2 * params * tokens per generated token, with a fudge
    // factor for attention overhead. Only renderer invocations count.
    let renderer_flops: f64 = results
        .iter()
        .filter(|r| r.transformer_invoked)
        .map(|r| {
            2.0 * model.parameter_count as f64
                * f64::from(r.tokens_generated)
                * measurement.flops_fudge_factor
        })
        .sum();
    let gate_flops = results.len() as f64 * GATE_FLOPS_PER_REQUEST;
    let total_flops = renderer_flops + gate_flops;

    ComputeMetrics {
        renderer_active_seconds,
        gate_seconds,
        total_energy_joules: renderer_active_seconds * measurement.gpu_power_watts,
        renderer_flops,
        gate_flops,
        total_flops,
        renderer_flops_percent: if total_flops > 0.0 {
            renderer_flops / total_flops * 100.0
        } else {
            0.0
        },
    }
}
