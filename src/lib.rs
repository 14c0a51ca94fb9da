//! # QoE Predictor
//!
//! Workspace facade re-exporting the forecasting library and the prediction
//! service.
//!
//! ```rust,no_run
//! use qoe_predictor_workspace::xapp::{QpConfig, QpContext};
//!
//! # fn main() -> qoe_predictor_workspace::xapp::Result<()> {
//! let context = QpContext::from_config(QpConfig::load(None)?)?;
//! context.connect()?;
//! # Ok(())
//! # }
//! ```

pub use qp_forecast as forecast;
pub use qp_xapp as xapp;
