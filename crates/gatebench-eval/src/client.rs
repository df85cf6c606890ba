use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use gatebench_core::{Gate, GateDecision, GateError, GateResponse, Request, StubGate};
use serde_json::{Value, json};

use crate::config::GateConfig;

/// Safety default for decision strings outside the closed enumeration: a
/// gate speaking a newer protocol gets the renderer, because paying for an
/// unnecessary render is recoverable and silently skipping computation is
/// not.
const UNKNOWN_DECISION_DEFAULT: GateDecision = GateDecision::RenderOnly;

/// Machine-readable reason tagged into fallback responses.
const FALLBACK_REASON: &str = "remote_gate_unavailable";

/// Client for a remote decision gate over HTTP.
///
/// Probes `GET /health` once at construction and caches the availability
/// flag. On any call failure the endpoint is marked unavailable and, if
/// configured, requests degrade to an internal [`StubGate`] whose responses
/// are tagged with fallback provenance. With fallback disabled the same
/// failure is surfaced to the caller.
pub struct GateClient {
    http: reqwest::Client,
    base_url: String,
    fallback_to_stub: bool,
    available: Mutex<Option<bool>>,
    fallback: OnceLock<StubGate>,
}

impl GateClient {
    /// Build the client and perform the one-time health probe.
    pub async fn connect(config: &GateConfig) -> Result<Self, GateError> {
        let timeout = Duration::from_secs_f64(config.timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GateError::Http(format!("failed to build HTTP client: {e}")))?;

        let client = Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            fallback_to_stub: config.fallback_to_stub,
            available: Mutex::new(None),
            fallback: OnceLock::new(),
        };

        if client.probe().await {
            tracing::info!(endpoint = %client.base_url, "Remote gate healthy");
        } else {
            tracing::warn!(
                endpoint = %client.base_url,
                fallback = client.fallback_to_stub,
                "Remote gate unreachable at construction"
            );
        }

        Ok(client)
    }

    async fn probe(&self) -> bool {
        let healthy = match self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        };
        *self.available.lock().expect("availability lock poisoned") = Some(healthy);
        healthy
    }

    fn cached_availability(&self) -> Option<bool> {
        *self.available.lock().expect("availability lock poisoned")
    }

    fn mark_unavailable(&self) {
        *self.available.lock().expect("availability lock poisoned") = Some(false);
    }

    async fn analyze_remote(&self, request: &Request) -> Result<GateResponse, GateError> {
        let started = Instant::now();

        let body = json!({
            "input": request.input,
            "modality": request.modality,
            "max_output_tokens": request.max_output_tokens,
            "metadata": request.metadata,
        });

        let response = self
            .http
            .post(format!("{}/gate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| GateError::Http(format!("gate request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GateError::Http(format!("gate returned {status}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| GateError::InvalidResponse(format!("non-JSON gate response: {e}")))?;

        let (decision, confidence) = parse_gate_payload(&payload)?;

        Ok(GateResponse {
            decision,
            confidence,
            analysis_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            metadata: json!({
                "gate_type": "remote",
                "http_status": status.as_u16(),
                "api_response": payload,
            }),
        })
    }

    /// Degrade to the stub, or surface the cause when fallback is off.
    async fn fallback_response(
        &self,
        request: &Request,
        cause: GateError,
    ) -> Result<GateResponse, GateError> {
        if !self.fallback_to_stub {
            return Err(GateError::Unavailable {
                reason: cause.to_string(),
            });
        }

        let stub = self.fallback.get_or_init(StubGate::new);
        let mut response = stub.analyze_request(request).await?;
        if let Some(map) = response.metadata.as_object_mut() {
            map.insert("fallback_used".into(), json!(true));
            map.insert("fallback_reason".into(), json!(FALLBACK_REASON));
            map.insert("fallback_detail".into(), json!(cause.to_string()));
        }
        Ok(response)
    }
}

/// Extract decision and confidence from a gate response body.
///
/// A missing `decision` field is an invalid response; a present but
/// unrecognized value maps to [`UNKNOWN_DECISION_DEFAULT`] with a warning,
/// never an error.
fn parse_gate_payload(payload: &Value) -> Result<(GateDecision, f64), GateError> {
    let decision_str = payload
        .get("decision")
        .and_then(Value::as_str)
        .ok_or_else(|| GateError::InvalidResponse("missing 'decision' field".into()))?;

    let decision = GateDecision::from_wire(decision_str).unwrap_or_else(|| {
        tracing::warn!(
            value = decision_str,
            "Unrecognised gate decision, defaulting to render"
        );
        UNKNOWN_DECISION_DEFAULT
    });

    let confidence = payload
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.5);

    Ok((decision, confidence))
}

impl Gate for GateClient {
    fn analyze_request<'a>(
        &'a self,
        request: &'a Request,
    ) -> Pin<Box<dyn Future<Output = Result<GateResponse, GateError>> + Send + 'a>> {
        Box::pin(async move {
            if self.cached_availability() == Some(true) {
                match self.analyze_remote(request).await {
                    Ok(response) => return Ok(response),
                    Err(e) => {
                        tracing::warn!(
                            request_id = %request.id,
                            error = %e,
                            "Remote gate call failed, marking unavailable"
                        );
                        self.mark_unavailable();
                        return self.fallback_response(request, e).await;
                    }
                }
            }

            self.fallback_response(
                request,
                GateError::Unavailable {
                    reason: "endpoint did not pass health probe".into(),
                },
            )
            .await
        })
    }

    fn is_available<'a>(&'a self) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async move {
            // Re-probe lazily only when the cached flag is unset; every
            // decision must not become a health check.
            match self.cached_availability() {
                Some(available) => available,
                None => self.probe().await,
            }
        })
    }

    fn info<'a>(&'a self) -> Pin<Box<dyn Future<Output = Value> + Send + 'a>> {
        Box::pin(async move {
            let mut info = json!({
                "gate_type": "remote",
                "endpoint": self.base_url,
                "available": self.cached_availability(),
                "fallback_enabled": self.fallback_to_stub,
            });

            // Descriptive payload from the endpoint, best-effort: a failure
            // to fetch extra info never raises.
            if self.cached_availability() == Some(true) {
                if let Ok(response) = self
                    .http
                    .get(format!("{}/info", self.base_url))
                    .send()
                    .await
                {
                    if let Ok(extra) = response.json::<Value>().await {
                        if let (Some(map), Some(extra_map)) =
                            (info.as_object_mut(), extra.as_object())
                        {
                            for (key, value) in extra_map {
                                map.insert(key.clone(), value.clone());
                            }
                        }
                    }
                }
            }

            info
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Port 9 (discard) refuses connections immediately on loopback, so these
    // tests exercise the failure paths without waiting out the timeout.
    fn unreachable_config(fallback: bool) -> GateConfig {
        GateConfig {
            url: "http://127.0.0.1:9".into(),
            timeout_secs: 0.5,
            fallback_to_stub: fallback,
            ..GateConfig::default()
        }
    }

    fn make_request(input: &str) -> Request {
        Request {
            id: "r1".into(),
            modality: "text".into(),
            input: input.into(),
            max_output_tokens: 50,
            metadata: json!({}),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let client = GateClient::connect(&unreachable_config(true)).await.unwrap();
        assert!(!client.is_available().await);
    }

    #[tokio::test]
    async fn fallback_response_is_tagged() {
        let client = GateClient::connect(&unreachable_config(true)).await.unwrap();
        let request = make_request("does the endpoint matter");

        let response = client.analyze_request(&request).await.unwrap();

        assert!(response.fallback_used());
        assert_eq!(response.metadata["fallback_reason"], FALLBACK_REASON);
        assert_eq!(response.metadata["gate_type"], "stub");
    }

    #[tokio::test]
    async fn fallback_is_deterministic() {
        let client = GateClient::connect(&unreachable_config(true)).await.unwrap();
        let request = make_request("same input, same decision");

        let first = client.analyze_request(&request).await.unwrap();
        let second = client.analyze_request(&request).await.unwrap();
        assert_eq!(first.decision, second.decision);
    }

    #[tokio::test]
    async fn fallback_disabled_is_fatal() {
        let client = GateClient::connect(&unreachable_config(false)).await.unwrap();
        let request = make_request("x");

        let err = client.analyze_request(&request).await.unwrap_err();
        assert!(matches!(err, GateError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn info_reports_local_config_without_endpoint() {
        let client = GateClient::connect(&unreachable_config(true)).await.unwrap();
        let info = client.info().await;

        assert_eq!(info["gate_type"], "remote");
        assert_eq!(info["endpoint"], "http://127.0.0.1:9");
        assert_eq!(info["available"], false);
        assert_eq!(info["fallback_enabled"], true);
    }

    #[test]
    fn parse_accepts_all_wire_values() {
        for (wire, expected) in [
            ("no_op", GateDecision::NoOp),
            ("abstain", GateDecision::Abstain),
            ("direct", GateDecision::DirectAction),
            ("render", GateDecision::RenderOnly),
        ] {
            let payload = json!({"decision": wire, "confidence": 0.9});
            let (decision, confidence) = parse_gate_payload(&payload).unwrap();
            assert_eq!(decision, expected);
            assert_eq!(confidence, 0.9);
        }
    }

    #[test]
    fn unknown_decision_defaults_to_render() {
        let payload = json!({"decision": "transcend", "confidence": 0.99});
        let (decision, _) = parse_gate_payload(&payload).unwrap();
        assert_eq!(decision, GateDecision::RenderOnly);
    }

    #[test]
    fn missing_decision_is_invalid() {
        let payload = json!({"confidence": 0.5});
        assert!(matches!(
            parse_gate_payload(&payload),
            Err(GateError::InvalidResponse(_))
        ));
    }

    #[test]
    fn missing_confidence_defaults() {
        let payload = json!({"decision": "render"});
        let (_, confidence) = parse_gate_payload(&payload).unwrap();
        assert_eq!(confidence, 0.5);
    }
}
