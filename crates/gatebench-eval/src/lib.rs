pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod renderer;
pub mod runner;
pub mod types;
pub mod workload;

pub use client::GateClient;
pub use config::{EvalConfig, GateConfig, GateProvider, MeasurementConfig, RendererConfig};
pub use error::EvalError;
pub use renderer::{ModelInfo, RenderOutput, Renderer, SimulatedRenderer};
pub use runner::EvaluationRunner;
pub use types::{EvaluationResult, Mode};
