//! # startup_valuation
//!
//! Values a startup from its historical financial statements using a
//! discounted cash flow model and comparable-company multiples, then blends
//! the two into a single recommendation with a WACC / terminal-growth
//! sensitivity table.
//!
//! ## Example
//!
//! ```rust,no_run
//! use startup_valuation::prelude::*;
//! use std::path::Path;
//!
//! let inputs = ValuationInputs::load_dir(Path::new("data"))?;
//! let model = ValuationModel::new(inputs, ModelConfig::default())?;
//! let report = model.run()?;
//! println!("{}", report.summary);
//! # Ok::<(), ValuationError>(())
//! ```

pub mod config;
pub mod data;
pub mod dcf;
pub mod error;
pub mod historical;
pub mod model;
pub mod multiples;
pub mod params;
pub mod projection;
pub mod report;
pub mod summary;
pub mod types;

pub mod prelude {
    //! Commonly used types and functions
    pub use crate::config::{DataPaths, ModelConfig};
    pub use crate::dcf::{run_dcf, sensitivity, DcfResult, SensitivityCell, SensitivityConfig, SensitivityGrid};
    pub use crate::error::{Result, ValuationError};
    pub use crate::historical::{analyze_historical, HistoricalAnalysis};
    pub use crate::model::{ValuationInputs, ValuationModel, ValuationReport};
    pub use crate::multiples::{run_multiples, Horizon, Metric, MultiplesResult};
    pub use crate::params::{Parameters, ValuationParameters};
    pub use crate::projection::{AssumptionSchedule, OperatingRatios, Projector, YearAssumption};
    pub use crate::summary::{summarize, ValuationSummary};
    pub use crate::types::*;
}
