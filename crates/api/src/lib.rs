//! HTTP gate: path classification, redirect policy and the axum middleware
//! that applies them in front of the page application.

pub mod app;
pub mod config;
pub mod context;
pub mod gate;
pub mod middleware;
pub mod paths;
pub mod redirect;

pub use config::{ConfigError, GateConfig};
pub use gate::{Gate, GateRequest, Session, Verdict};
pub use redirect::{GateReason, RedirectDecision};
