use serde::{Deserialize, Serialize};

/// Closed set of gate decisions about computational necessity.
///
/// Each value maps to exactly one execution path in the runner; only
/// [`GateDecision::RenderOnly`] pays for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateDecision {
    /// Request is trivial or cached; nothing to compute.
    #[serde(rename = "no_op")]
    NoOp,
    /// Unsafe or unsolvable; must refuse.
    #[serde(rename = "abstain")]
    Abstain,
    /// The gate answers directly without the renderer.
    #[serde(rename = "direct")]
    DirectAction,
    /// The gate defers to the renderer.
    #[serde(rename = "render")]
    RenderOnly,
}

impl GateDecision {
    /// Parse a wire value. Returns `None` for anything outside the closed set;
    /// callers decide what the safe default is.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "no_op" => Some(GateDecision::NoOp),
            "abstain" => Some(GateDecision::Abstain),
            "direct" => Some(GateDecision::DirectAction),
            "render" => Some(GateDecision::RenderOnly),
            _ => None,
        }
    }

    /// Whether this decision's execution path invokes the renderer.
    pub fn requires_renderer(self) -> bool {
        matches!(self, GateDecision::RenderOnly)
    }
}

impl std::fmt::Display for GateDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateDecision::NoOp => write!(f, "no_op"),
            GateDecision::Abstain => write!(f, "abstain"),
            GateDecision::DirectAction => write!(f, "direct"),
            GateDecision::RenderOnly => write!(f, "render"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_round_trip() {
        for decision in [
            GateDecision::NoOp,
            GateDecision::Abstain,
            GateDecision::DirectAction,
            GateDecision::RenderOnly,
        ] {
            let wire = decision.to_string();
            assert_eq!(GateDecision::from_wire(&wire), Some(decision));

            let json = serde_json::to_string(&decision).unwrap();
            assert_eq!(json, format!("\"{wire}\""));
        }
    }

    #[test]
    fn unknown_wire_value_is_none() {
        assert_eq!(GateDecision::from_wire("maybe"), None);
        assert_eq!(GateDecision::from_wire(""), None);
        assert_eq!(GateDecision::from_wire("RENDER_ONLY"), None);
    }

    #[test]
    fn only_render_requires_renderer() {
        assert!(GateDecision::RenderOnly.requires_renderer());
        assert!(!GateDecision::NoOp.requires_renderer());
        assert!(!GateDecision::Abstain.requires_renderer());
        assert!(!GateDecision::DirectAction.requires_renderer());
    }
}
