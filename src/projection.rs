//! Forward financial projections
//!
//! Extrapolates a multi-year forecast from the last historical period using an
//! explicit per-year assumption schedule. Each year depends only on the year
//! before it.

use crate::error::{Result, ValuationError};
use crate::params::ValuationParameters;
use crate::types::{HistoricalRecord, Money, ProjectionRecord, Rate};
use serde::{Deserialize, Serialize};

const STAGE: &str = "projection";

/// Growth and margin assumption for one forecast year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearAssumption {
    pub growth_rate: Rate,
    pub margin_delta: Rate,
}

impl YearAssumption {
    pub fn new(growth_rate: Rate, margin_delta: Rate) -> Self {
        Self {
            growth_rate,
            margin_delta,
        }
    }
}

/// Ordered per-year assumptions, year 1 first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssumptionSchedule {
    years: Vec<YearAssumption>,
}

impl AssumptionSchedule {
    pub fn new(years: Vec<YearAssumption>) -> Self {
        Self { years }
    }

    /// Build from parallel growth and margin-delta sequences
    pub fn from_rates(growth_rates: &[Rate], margin_deltas: &[Rate]) -> Result<Self> {
        if growth_rates.len() != margin_deltas.len() {
            return Err(ValuationError::ConfigError(format!(
                "growth schedule has {} entries but margin schedule has {}",
                growth_rates.len(),
                margin_deltas.len()
            )));
        }

        Ok(Self::new(
            growth_rates
                .iter()
                .zip(margin_deltas)
                .map(|(&g, &m)| YearAssumption::new(g, m))
                .collect(),
        ))
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn years(&self) -> &[YearAssumption] {
        &self.years
    }

    /// Assumptions for the first `horizon` years
    pub fn for_horizon(&self, horizon: usize) -> Result<&[YearAssumption]> {
        if horizon == 0 || horizon > self.years.len() {
            return Err(ValuationError::ConfigurationMismatch {
                horizon,
                available: self.years.len(),
            });
        }
        Ok(&self.years[..horizon])
    }
}

impl Default for AssumptionSchedule {
    /// Declining growth with gradual margin expansion
    fn default() -> Self {
        Self::new(vec![
            YearAssumption::new(0.35, 0.02),
            YearAssumption::new(0.30, 0.015),
            YearAssumption::new(0.25, 0.01),
            YearAssumption::new(0.20, 0.005),
            YearAssumption::new(0.15, 0.005),
        ])
    }
}

/// Line items projected as a fixed share of revenue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatingRatios {
    pub depreciation: Rate,
    pub capex: Rate,
    pub working_capital: Rate,
    pub interest: Rate,
}

impl Default for OperatingRatios {
    fn default() -> Self {
        Self {
            depreciation: 0.025,
            capex: 0.03,
            working_capital: 0.02,
            interest: 0.005,
        }
    }
}

/// Projects forecast years from a base historical period
#[derive(Debug, Clone, Default)]
pub struct Projector {
    schedule: AssumptionSchedule,
    ratios: OperatingRatios,
}

impl Projector {
    pub fn new(schedule: AssumptionSchedule, ratios: OperatingRatios) -> Self {
        Self { schedule, ratios }
    }

    pub fn schedule(&self) -> &AssumptionSchedule {
        &self.schedule
    }

    pub fn ratios(&self) -> &OperatingRatios {
        &self.ratios
    }

    /// Project `horizon` years following `base`
    pub fn project(
        &self,
        base: &HistoricalRecord,
        params: &ValuationParameters,
        horizon: usize,
    ) -> Result<Vec<ProjectionRecord>> {
        let assumptions = self.schedule.for_horizon(horizon)?;

        if !(base.revenue > 0.0) {
            return Err(ValuationError::invalid(
                STAGE,
                format!(
                    "base revenue must be positive, got {} for year {}",
                    base.revenue, base.year
                ),
            ));
        }

        let mut projections: Vec<ProjectionRecord> = Vec::with_capacity(horizon);
        let mut prev_revenue = base.revenue;
        let mut prev_margin = base.ebitda / base.revenue;

        for (i, assumption) in assumptions.iter().enumerate() {
            let year = base.year + i as i32 + 1;
            let record = self.project_year(year, prev_revenue, prev_margin, assumption, params);

            log::debug!(
                "Projected {}: revenue {:.0}, EBITDA margin {:.4}, FCF {:.0}",
                record.year,
                record.revenue,
                record.ebitda_margin,
                record.free_cash_flow
            );

            prev_revenue = record.revenue;
            prev_margin = record.ebitda_margin;
            projections.push(record);
        }

        log::info!(
            "Projected {} years ({}-{})",
            projections.len(),
            base.year + 1,
            base.year + horizon as i32
        );

        Ok(projections)
    }

    fn project_year(
        &self,
        year: i32,
        prev_revenue: Money,
        prev_margin: Rate,
        assumption: &YearAssumption,
        params: &ValuationParameters,
    ) -> ProjectionRecord {
        let revenue = prev_revenue * (1.0 + assumption.growth_rate);
        let ebitda_margin = prev_margin + assumption.margin_delta;
        let ebitda = revenue * ebitda_margin;

        let depreciation = revenue * self.ratios.depreciation;
        let ebit = ebitda - depreciation;
        let interest_expense = revenue * self.ratios.interest;

        // A loss produces a negative tax (tax benefit); not clamped.
        let pre_tax_income = ebit - interest_expense;
        let taxes = pre_tax_income * params.tax_rate;
        let net_income = pre_tax_income - taxes;

        let capex = revenue * self.ratios.capex;
        let working_capital_change = revenue * self.ratios.working_capital;
        let free_cash_flow = net_income + depreciation - capex - working_capital_change;

        ProjectionRecord {
            year,
            revenue,
            ebitda,
            ebitda_margin,
            depreciation,
            ebit,
            interest_expense,
            pre_tax_income,
            taxes,
            net_income,
            capex,
            working_capital_change,
            free_cash_flow,
        }
    }
}
