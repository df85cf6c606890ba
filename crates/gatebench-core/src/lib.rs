//! Core decision model for gatebench.
//!
//! Defines the [`Gate`] capability contract, the closed [`GateDecision`]
//! taxonomy, and the deterministic [`StubGate`] used when no remote gate is
//! reachable. The networked client and the evaluation runner live in
//! `gatebench-eval`; they depend only on the trait defined here.

pub mod clock;
pub mod decision;
pub mod error;
pub mod gate;
pub mod request;
pub mod stub;

pub use clock::{Clock, NoopClock, SystemClock};
pub use decision::GateDecision;
pub use error::GateError;
pub use gate::{Gate, GateResponse};
pub use request::Request;
pub use stub::{StubGate, StubProfile};
