//! Discounted cash flow valuation and sensitivity analysis
//!
//! Discounts projected free cash flows and a Gordon-growth terminal value at
//! the WACC. The sensitivity sweep reruns the same valuation over a grid of
//! discount rates and terminal growth rates.

use crate::error::{Result, ValuationError};
use crate::params::ValuationParameters;
use crate::types::{Money, ProjectionRecord, Rate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

const STAGE: &str = "DCF";

/// Startups are treated as debt-free; equity value equals enterprise value.
pub const NET_DEBT: Money = 0.0;

/// Smallest WACC - g spread treated as a finite terminal value
pub const RATE_EPSILON: Rate = 1e-9;

/// Upper bound on points per sensitivity axis
pub const MAX_AXIS_POINTS: usize = 1000;

/// Axis points are rounded to this many units per 1.0 (1e-8)
const AXIS_RESOLUTION: f64 = 1e8;

/// DCF valuation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfResult {
    pub enterprise_value: Money,
    pub equity_value: Money,
    /// Sum of the discounted projected cash flows
    pub pv_fcf_sum: Money,
    pub pv_terminal_value: Money,
    /// Undiscounted terminal value at the end of the horizon
    pub terminal_value: Money,
    /// Discounted cash flow of each projected year
    pub pv_fcf: Vec<Money>,
    pub wacc: Rate,
    pub terminal_growth_rate: Rate,
}

/// Run the DCF valuation over the projected cash flows
pub fn run_dcf(projections: &[ProjectionRecord], params: &ValuationParameters) -> Result<DcfResult> {
    let cash_flows: Vec<Money> = projections.iter().map(|p| p.free_cash_flow).collect();
    let result = discount(&cash_flows, params.wacc, params.terminal_growth_rate)?;

    log::info!(
        "DCF at WACC {:.2}% / g {:.2}%: enterprise value {:.0} (PV FCF {:.0}, PV TV {:.0})",
        params.wacc * 100.0,
        params.terminal_growth_rate * 100.0,
        result.enterprise_value,
        result.pv_fcf_sum,
        result.pv_terminal_value
    );

    Ok(result)
}

/// Discount a cash-flow stream and its Gordon-growth terminal value
pub fn discount(cash_flows: &[Money], wacc: Rate, growth: Rate) -> Result<DcfResult> {
    check_rates(cash_flows, wacc, growth)?;

    let discount_factor = 1.0 + wacc;
    let pv_fcf: Vec<Money> = cash_flows
        .iter()
        .enumerate()
        .map(|(i, fcf)| fcf / discount_factor.powi(i as i32 + 1))
        .collect();
    let pv_fcf_sum: Money = pv_fcf.iter().sum();

    let horizon = cash_flows.len() as i32;
    let final_fcf = cash_flows[cash_flows.len() - 1];
    let terminal_value = final_fcf * (1.0 + growth) / (wacc - growth);
    let pv_terminal_value = terminal_value / discount_factor.powi(horizon);

    let enterprise_value = pv_fcf_sum + pv_terminal_value;
    let equity_value = enterprise_value - NET_DEBT;

    Ok(DcfResult {
        enterprise_value,
        equity_value,
        pv_fcf_sum,
        pv_terminal_value,
        terminal_value,
        pv_fcf,
        wacc,
        terminal_growth_rate: growth,
    })
}

fn check_rates(cash_flows: &[Money], wacc: Rate, growth: Rate) -> Result<()> {
    if cash_flows.is_empty() {
        return Err(ValuationError::invalid(STAGE, "no projected cash flows to discount"));
    }
    if !wacc.is_finite() || !growth.is_finite() {
        return Err(ValuationError::invalid(
            STAGE,
            format!("non-finite rates: WACC {}, terminal growth {}", wacc, growth),
        ));
    }
    if wacc - growth <= RATE_EPSILON {
        return Err(ValuationError::invalid(
            STAGE,
            format!(
                "WACC ({}) must exceed terminal growth rate ({}) for a finite terminal value",
                wacc, growth
            ),
        ));
    }
    if 1.0 + wacc <= 0.0 {
        return Err(ValuationError::invalid(
            STAGE,
            format!("discount factor 1 + WACC is non-positive for WACC {}", wacc),
        ));
    }
    Ok(())
}

/// Ranges swept by the sensitivity analysis, as offsets from the base rates.
/// Each axis runs from `base + lower` up to but excluding `base + upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityConfig {
    pub wacc_lower: Rate,
    pub wacc_upper: Rate,
    pub wacc_step: Rate,
    pub growth_lower: Rate,
    pub growth_upper: Rate,
    pub growth_step: Rate,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            wacc_lower: -0.02,
            wacc_upper: 0.03,
            wacc_step: 0.005,
            growth_lower: -0.01,
            growth_upper: 0.015,
            growth_step: 0.0025,
        }
    }
}

impl SensitivityConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, lower, upper, step) in [
            ("WACC", self.wacc_lower, self.wacc_upper, self.wacc_step),
            ("growth", self.growth_lower, self.growth_upper, self.growth_step),
        ] {
            if !(step > 0.0) || !step.is_finite() {
                return Err(ValuationError::ConfigError(format!(
                    "sensitivity {} step must be positive, got {}",
                    name, step
                )));
            }
            if !(upper > lower) || !lower.is_finite() || !upper.is_finite() {
                return Err(ValuationError::ConfigError(format!(
                    "sensitivity {} range is empty: [{}, {})",
                    name, lower, upper
                )));
            }
            let count = point_count(lower, upper, step);
            if !(count >= 1.0) || count > MAX_AXIS_POINTS as f64 {
                return Err(ValuationError::ConfigError(format!(
                    "sensitivity {} axis must have 1 to {} points, got {} for range [{}, {}) step {}",
                    name, MAX_AXIS_POINTS, count, lower, upper, step
                )));
            }
        }
        Ok(())
    }

    pub fn wacc_axis(&self, base: Rate) -> Vec<Rate> {
        axis(base, self.wacc_lower, self.wacc_upper, self.wacc_step)
    }

    pub fn growth_axis(&self, base: Rate) -> Vec<Rate> {
        axis(base, self.growth_lower, self.growth_upper, self.growth_step)
    }
}

fn point_count(lower: Rate, upper: Rate, step: Rate) -> f64 {
    ((upper - lower) / step).round()
}

/// Points `base + lower + i * step` in `[base + lower, base + upper)`,
/// snapped to a 1e-8 grid so nominally equal rates compare equal
fn axis(base: Rate, lower: Rate, upper: Rate, step: Rate) -> Vec<Rate> {
    let count = point_count(lower, upper, step).clamp(0.0, MAX_AXIS_POINTS as f64) as usize;
    (0..count)
        .map(|i| snap(base + lower + i as f64 * step))
        .collect()
}

fn snap(rate: Rate) -> Rate {
    (rate * AXIS_RESOLUTION).round() / AXIS_RESOLUTION
}

/// One cell of the sensitivity table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SensitivityCell {
    Valid { equity_value: Money },
    /// The rate pair has no finite Gordon-growth value (WACC <= g within `RATE_EPSILON`)
    Invalid { wacc: Rate, growth: Rate },
}

impl SensitivityCell {
    pub fn value(&self) -> Option<Money> {
        match self {
            SensitivityCell::Valid { equity_value } => Some(*equity_value),
            SensitivityCell::Invalid { .. } => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, SensitivityCell::Valid { .. })
    }
}

/// Equity value over a WACC x terminal-growth grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrid {
    /// Row labels
    pub wacc_values: Vec<Rate>,
    /// Column labels
    pub growth_values: Vec<Rate>,
    /// `cells[row][col]` for `wacc_values[row]`, `growth_values[col]`
    pub cells: Vec<Vec<SensitivityCell>>,
}

impl SensitivityGrid {
    pub fn get(&self, row: usize, col: usize) -> Option<&SensitivityCell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    pub fn rows(&self) -> usize {
        self.wacc_values.len()
    }

    pub fn cols(&self) -> usize {
        self.growth_values.len()
    }

    pub fn invalid_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| !cell.is_valid())
            .count()
    }

    /// Smallest and largest valid equity values in the grid
    pub fn value_range(&self) -> Option<(Money, Money)> {
        self.cells
            .iter()
            .flatten()
            .filter_map(SensitivityCell::value)
            .fold(None::<(Money, Money)>, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Write the grid as CSV: one row per WACC, one column per growth rate.
    /// Invalid cells are left empty.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        self.write_records(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn write_records<W: Write>(&self, writer: &mut csv::Writer<W>) -> Result<()> {
        let mut header = vec!["WACC".to_string()];
        header.extend(self.growth_values.iter().map(|g| format!("{:.4}", g)));
        writer.write_record(&header)?;

        for (wacc, row) in self.wacc_values.iter().zip(&self.cells) {
            let mut record = vec![format!("{:.4}", wacc)];
            record.extend(row.iter().map(|cell| match cell.value() {
                Some(v) => format!("{:.2}", v),
                None => String::new(),
            }));
            writer.write_record(&record)?;
        }
        Ok(())
    }
}

/// Recompute the DCF equity value for every (WACC, growth) pair around the base rates
pub fn sensitivity(
    projections: &[ProjectionRecord],
    params: &ValuationParameters,
    config: &SensitivityConfig,
) -> Result<SensitivityGrid> {
    if projections.is_empty() {
        return Err(ValuationError::invalid(STAGE, "no projected cash flows for sensitivity sweep"));
    }
    config.validate()?;

    let cash_flows: Vec<Money> = projections.iter().map(|p| p.free_cash_flow).collect();
    let wacc_values = config.wacc_axis(params.wacc);
    let growth_values = config.growth_axis(params.terminal_growth_rate);

    let cells: Vec<Vec<SensitivityCell>> = wacc_values
        .par_iter()
        .map(|&wacc| {
            growth_values
                .iter()
                .map(|&growth| {
                    let rates = params.with_rates(wacc, growth);
                    sensitivity_cell(&cash_flows, &rates)
                })
                .collect()
        })
        .collect();

    let grid = SensitivityGrid {
        wacc_values,
        growth_values,
        cells,
    };

    let invalid = grid.invalid_count();
    if invalid > 0 {
        log::warn!(
            "{} of {} sensitivity cells have WACC <= terminal growth and were masked",
            invalid,
            grid.rows() * grid.cols()
        );
    }
    log::info!("Sensitivity grid computed: {} x {}", grid.rows(), grid.cols());

    Ok(grid)
}

fn sensitivity_cell(cash_flows: &[Money], rates: &ValuationParameters) -> SensitivityCell {
    match discount(cash_flows, rates.wacc, rates.terminal_growth_rate) {
        Ok(result) if result.equity_value.is_finite() => SensitivityCell::Valid {
            equity_value: result.equity_value,
        },
        _ => SensitivityCell::Invalid {
            wacc: rates.wacc,
            growth: rates.terminal_growth_rate,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn projection(year: i32, fcf: Money) -> ProjectionRecord {
        ProjectionRecord {
            year,
            revenue: 0.0,
            ebitda: 0.0,
            ebitda_margin: 0.0,
            depreciation: 0.0,
            ebit: 0.0,
            interest_expense: 0.0,
            pre_tax_income: 0.0,
            taxes: 0.0,
            net_income: 0.0,
            capex: 0.0,
            working_capital_change: 0.0,
            free_cash_flow: fcf,
        }
    }

    fn params(wacc: Rate, growth: Rate) -> ValuationParameters {
        ValuationParameters::new(0.25, wacc, growth).unwrap()
    }

    #[test]
    fn test_single_period_dcf() {
        let result = run_dcf(&[projection(2025, 100.0)], &params(0.10, 0.03)).unwrap();

        assert_relative_eq!(result.pv_fcf_sum, 90.909, epsilon = 1e-3);
        assert_relative_eq!(result.terminal_value, 1471.43, epsilon = 1e-2);
        assert_relative_eq!(result.pv_terminal_value, 1337.66, epsilon = 1e-2);
        assert_relative_eq!(result.enterprise_value, 1428.57, epsilon = 1e-2);
        assert_eq!(result.equity_value, result.enterprise_value);
    }

    #[test]
    fn test_multi_period_discounting() {
        let flows = [projection(2025, 100.0), projection(2026, 110.0), projection(2027, 121.0)];
        let result = run_dcf(&flows, &params(0.10, 0.02)).unwrap();

        assert_eq!(result.pv_fcf.len(), 3);
        for pv in &result.pv_fcf {
            assert_relative_eq!(*pv, 100.0 / 1.1, epsilon = 1e-9);
        }
        let tv = 121.0 * 1.02 / 0.08;
        assert_relative_eq!(result.terminal_value, tv, epsilon = 1e-9);
        assert_relative_eq!(result.pv_terminal_value, tv / 1.1_f64.powi(3), epsilon = 1e-9);
    }

    #[test]
    fn test_wacc_equal_to_growth_is_error() {
        let err = discount(&[100.0], 0.05, 0.05).unwrap_err();
        assert!(matches!(err, ValuationError::InvalidAssumption { .. }));
        assert!(err.to_string().contains("0.05"));
    }

    #[test]
    fn test_empty_projections_is_error() {
        assert!(run_dcf(&[], &params(0.10, 0.03)).is_err());
    }

    #[test]
    fn test_default_axes() {
        let config = SensitivityConfig::default();
        let wacc = config.wacc_axis(0.12);
        let growth = config.growth_axis(0.03);

        assert_eq!(wacc.len(), 10);
        assert_eq!(growth.len(), 10);
        assert_relative_eq!(wacc[0], 0.10, epsilon = 1e-12);
        assert_relative_eq!(wacc[9], 0.145, epsilon = 1e-12);
        assert_relative_eq!(growth[0], 0.02, epsilon = 1e-12);
        assert_relative_eq!(growth[9], 0.0425, epsilon = 1e-12);
    }

    #[test]
    fn test_grid_matches_direct_dcf() {
        let flows = [projection(2025, 100.0), projection(2026, 120.0)];
        let base = params(0.12, 0.03);
        let grid = sensitivity(&flows, &base, &SensitivityConfig::default()).unwrap();

        assert_eq!(grid.rows(), 10);
        assert_eq!(grid.cols(), 10);
        assert_eq!(grid.invalid_count(), 0);

        for (row, &wacc) in grid.wacc_values.iter().enumerate() {
            for (col, &growth) in grid.growth_values.iter().enumerate() {
                let direct = discount(&[100.0, 120.0], wacc, growth).unwrap();
                assert_eq!(grid.get(row, col).unwrap().value(), Some(direct.equity_value));
            }
        }
    }

    #[test]
    fn test_grid_masks_cells_where_wacc_not_above_growth() {
        let flows = [projection(2025, 100.0)];
        let base = params(0.04, 0.03);
        let grid = sensitivity(&flows, &base, &SensitivityConfig::default()).unwrap();

        assert!(grid.invalid_count() > 0);
        for (row, &wacc) in grid.wacc_values.iter().enumerate() {
            for (col, &growth) in grid.growth_values.iter().enumerate() {
                let cell = grid.get(row, col).unwrap();
                if wacc <= growth {
                    assert!(!cell.is_valid());
                } else {
                    assert!(cell.value().unwrap().is_finite());
                }
            }
        }
    }

    #[test]
    fn test_value_range() {
        let flows = [projection(2025, 100.0)];
        let grid = sensitivity(&flows, &params(0.12, 0.03), &SensitivityConfig::default()).unwrap();
        let (lo, hi) = grid.value_range().unwrap();
        // Highest value at lowest WACC / highest growth
        assert_eq!(Some(hi), grid.get(0, 9).unwrap().value());
        assert_eq!(Some(lo), grid.get(9, 0).unwrap().value());
    }

    #[test]
    fn test_csv_export() {
        let flows = [projection(2025, 100.0)];
        let grid = sensitivity(&flows, &params(0.031, 0.03), &SensitivityConfig::default()).unwrap();

        let mut writer = csv::Writer::from_writer(vec![]);
        grid.write_records(&mut writer).unwrap();
        let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        let lines: Vec<&str> = data.lines().collect();
        assert_eq!(lines.len(), 11);
        assert!(lines[0].starts_with("WACC,"));
        // First row: WACC 1.1% is below every growth rate
        assert!(lines[1].ends_with(",,,,,,,,,,"));
    }

    #[test]
    fn test_invalid_step_rejected() {
        let config = SensitivityConfig {
            wacc_step: 0.0,
            ..SensitivityConfig::default()
        };
        let flows = [projection(2025, 100.0)];
        assert!(matches!(
            sensitivity(&flows, &params(0.12, 0.03), &config),
            Err(ValuationError::ConfigError(_))
        ));
    }

    #[test]
    fn test_nominally_equal_rates_are_masked() {
        // WACC axis starts at 3.0%, growth axis at 3.0%; the offsets must not
        // leave float noise that turns the diagonal into huge valid values
        let flows = [projection(2025, 1_000_000.0)];
        let grid = sensitivity(&flows, &params(0.05, 0.04), &SensitivityConfig::default()).unwrap();

        assert_eq!(grid.wacc_values[0], 0.03);
        assert_eq!(grid.growth_values[0], 0.03);
        assert!(matches!(grid.get(0, 0), Some(SensitivityCell::Invalid { .. })));
        // WACC 3.5% against g 3.5%
        assert!(matches!(grid.get(1, 2), Some(SensitivityCell::Invalid { .. })));

        for (row, &wacc) in grid.wacc_values.iter().enumerate() {
            for (col, &growth) in grid.growth_values.iter().enumerate() {
                let cell = grid.get(row, col).unwrap();
                if wacc - growth < 1e-6 {
                    assert!(!cell.is_valid(), "wacc {} g {} not masked", wacc, growth);
                } else {
                    assert!(cell.value().unwrap() < 1e12);
                }
            }
        }
    }

    #[test]
    fn test_spread_below_epsilon_is_error() {
        assert!(discount(&[100.0], 0.030000000000000002, 0.03).is_err());
    }

    #[test]
    fn test_axis_point_count_bounds() {
        let too_fine = SensitivityConfig {
            wacc_step: 1e-12,
            ..SensitivityConfig::default()
        };
        assert!(matches!(too_fine.validate(), Err(ValuationError::ConfigError(_))));

        let too_coarse = SensitivityConfig {
            growth_step: 1.0,
            ..SensitivityConfig::default()
        };
        assert!(matches!(too_coarse.validate(), Err(ValuationError::ConfigError(_))));

        let single = SensitivityConfig {
            wacc_step: 0.05,
            ..SensitivityConfig::default()
        };
        assert!(single.validate().is_ok());
        assert_eq!(single.wacc_axis(0.12), vec![0.10]);
    }
}
