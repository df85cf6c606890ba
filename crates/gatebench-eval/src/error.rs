use gatebench_core::GateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("request {id} failed during {stage}: {source}")]
    RequestFailed {
        id: String,
        stage: &'static str,
        #[source]
        source: GateError,
    },

    #[error("gate error: {0}")]
    Gate(#[from] GateError),

    #[error("invalid mode: {0} (expected \"ungated\" or \"gated\")")]
    InvalidMode(String),

    #[error("workload error: {0}")]
    Workload(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
