//! # QP xApp
//!
//! Prediction request pipeline for the QoE predictor.
//!
//! A request names a set of terminals. For each one the service looks up the
//! serving and neighbor cells, trains a per-cell model on first use, forecasts
//! the next throughput sample and persists it. Truncated payloads are repaired
//! before parsing.
//!
//! ```rust,no_run
//! use qp_xapp::{LineSink, QpConfig, QpContext};
//! use qp_xapp::handler::{InboundMessage, PREDICTION_REQUEST};
//!
//! # fn main() -> qp_xapp::Result<()> {
//! let context = QpContext::from_config(QpConfig::load(None)?)?;
//! let sink = LineSink::new(std::io::stdout());
//! let request = InboundMessage::new(PREDICTION_REQUEST, r#"{"UEPredictionSet": ["ue1"]}"#);
//! context.run([request], &sink);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod json;
pub mod locks;
pub mod logging;
pub mod orchestrator;
pub mod readiness;
pub mod repair;
pub mod result;
pub mod service;

pub use crate::config::QpConfig;
pub use crate::dispatch::{Dispatcher, LineSink, MessageHandler, MessageSink};
pub use crate::error::{ConfigError, Result, XappError};
pub use crate::handler::{PredictionHandler, RequestStats, StatsSnapshot};
pub use crate::orchestrator::Orchestrator;
pub use crate::readiness::{ModelState, ReadinessGate};
pub use crate::repair::{repair, RepairMode, RepairOutcome};
pub use crate::result::{CellForecast, CellMap, NullReason, PredictionResult};
pub use crate::service::QpContext;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
