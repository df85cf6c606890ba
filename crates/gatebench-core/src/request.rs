use serde::{Deserialize, Serialize};

/// A single inference request from the workload.
///
/// Immutable for the duration of processing. The workload loader is
/// responsible for rejecting requests with missing fields; by the time a
/// `Request` exists it is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Opaque identifier, unique within a workload.
    pub id: String,
    /// Classification tag (e.g. "text"). Passed through, never interpreted.
    pub modality: String,
    /// The text payload to be analyzed and, if needed, rendered.
    pub input: String,
    /// Upper bound on generated output length.
    pub max_output_tokens: u32,
    /// Open-ended auxiliary hints. The stub gate reads `category` from here.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Request {
    /// The optional category hint used to condition the stub gate's
    /// simulated decision distribution.
    pub fn category_hint(&self) -> Option<&str> {
        self.metadata.get("category").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_metadata() {
        let json = r#"{
            "id": "r1",
            "modality": "text",
            "input": "hello",
            "max_output_tokens": 64,
            "metadata": {"category": "trivial"}
        }"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert_eq!(request.id, "r1");
        assert_eq!(request.category_hint(), Some("trivial"));
    }

    #[test]
    fn metadata_is_optional() {
        let json = r#"{"id": "r2", "modality": "text", "input": "x", "max_output_tokens": 8}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert_eq!(request.category_hint(), None);
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let json = r#"{"id": "r3", "modality": "text", "input": "x"}"#;
        assert!(serde_json::from_str::<Request>(json).is_err());
    }
}
