//! Parameter store for scalar valuation assumptions

use crate::error::{Result, ValuationError};
use crate::types::Rate;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

pub const TAX_RATE: &str = "Tax_Rate";
pub const WACC: &str = "WACC";
pub const TERMINAL_GROWTH_RATE: &str = "Terminal_Growth_Rate";

/// Raw name -> value parameter table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    values: HashMap<String, f64>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a parameter that must be present
    pub fn get(&self, name: &str) -> Result<f64> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| ValuationError::MissingInput(format!("parameter '{}'", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Validate and extract the typed view used by the pipeline
    pub fn validate(&self) -> Result<ValuationParameters> {
        ValuationParameters::new(
            self.get(TAX_RATE)?,
            self.get(WACC)?,
            self.get(TERMINAL_GROWTH_RATE)?,
        )
    }
}

impl FromIterator<(String, f64)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Validated scalar assumptions, read-only once built
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationParameters {
    pub tax_rate: Rate,
    pub wacc: Rate,
    pub terminal_growth_rate: Rate,
}

impl ValuationParameters {
    /// Build the parameter view, rejecting values the pipeline cannot divide by
    pub fn new(tax_rate: Rate, wacc: Rate, terminal_growth_rate: Rate) -> Result<Self> {
        check_unit_interval(TAX_RATE, tax_rate)?;
        if !(wacc.is_finite() && wacc > 0.0) {
            return Err(ValuationError::invalid(
                "parameters",
                format!("{} must be positive, got {}", WACC, wacc),
            ));
        }
        check_unit_interval(TERMINAL_GROWTH_RATE, terminal_growth_rate)?;

        if wacc <= terminal_growth_rate {
            return Err(ValuationError::invalid(
                "parameters",
                format!(
                    "WACC ({}) must exceed Terminal_Growth_Rate ({})",
                    wacc, terminal_growth_rate
                ),
            ));
        }

        Ok(Self {
            tax_rate,
            wacc,
            terminal_growth_rate,
        })
    }

    /// Copy with a different discount rate and terminal growth, unvalidated.
    /// Used by the sensitivity sweep, which flags bad cells itself.
    pub(crate) fn with_rates(&self, wacc: Rate, terminal_growth_rate: Rate) -> Self {
        Self {
            wacc,
            terminal_growth_rate,
            ..*self
        }
    }
}

fn check_unit_interval(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ValuationError::invalid(
            "parameters",
            format!("{} must lie in (0, 1), got {}", name, value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Parameters {
        Parameters::new()
            .with(TAX_RATE, 0.25)
            .with(WACC, 0.12)
            .with(TERMINAL_GROWTH_RATE, 0.03)
    }

    #[test]
    fn test_validate_ok() {
        let params = base().validate().unwrap();
        assert_eq!(params.tax_rate, 0.25);
        assert_eq!(params.wacc, 0.12);
        assert_eq!(params.terminal_growth_rate, 0.03);
    }

    #[test]
    fn test_extra_parameters_ignored() {
        let params = base().with("Risk_Free_Rate", 0.04);
        assert_eq!(params.len(), 4);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_missing_parameter() {
        let mut params = Parameters::new().with(TAX_RATE, 0.25).with(WACC, 0.12);
        let err = params.validate().unwrap_err();
        assert!(matches!(err, ValuationError::MissingInput(_)));
        assert!(err.to_string().contains(TERMINAL_GROWTH_RATE));

        params.insert(TERMINAL_GROWTH_RATE, 0.03);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_wacc_equal_to_growth_rejected() {
        let err = ValuationParameters::new(0.25, 0.05, 0.05).unwrap_err();
        assert!(matches!(err, ValuationError::InvalidAssumption { .. }));
        let msg = err.to_string();
        assert!(msg.contains("0.05"));
        assert!(msg.contains("WACC"));
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(ValuationParameters::new(1.2, 0.12, 0.03).is_err());
        assert!(ValuationParameters::new(0.25, 0.0, 0.03).is_err());
        assert!(ValuationParameters::new(0.25, 0.12, -0.01).is_err());
        assert!(ValuationParameters::new(0.25, f64::NAN, 0.03).is_err());
        assert!(ValuationParameters::new(0.25, f64::INFINITY, 0.03).is_err());
    }

    #[test]
    fn test_wacc_above_one_accepted() {
        let params = ValuationParameters::new(0.25, 1.5, 0.03).unwrap();
        assert_eq!(params.wacc, 1.5);
    }
}
