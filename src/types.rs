//! Core types and constants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValuationError;

/// Fiscal year label
pub type Year = i32;

/// Money type (using f64, unrounded until display)
pub type Money = f64;

/// Rate/ratio type (0.10 = 10%)
pub type Rate = f64;

/// One period of the startup's historical financial statements
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub year: Year,
    pub revenue: Money,
    pub cogs: Money,
    pub ebitda: Money,
    pub free_cash_flow: Money,
}

impl HistoricalRecord {
    /// Create a new historical record
    pub fn new(year: Year, revenue: Money, cogs: Money, ebitda: Money, free_cash_flow: Money) -> Self {
        Self {
            year,
            revenue,
            cogs,
            ebitda,
            free_cash_flow,
        }
    }

    /// Revenue and EBITDA of this period
    pub fn metrics(&self) -> FinancialMetrics {
        FinancialMetrics {
            revenue: self.revenue,
            ebitda: self.ebitda,
        }
    }
}

/// One projected forecast year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRecord {
    pub year: Year,
    pub revenue: Money,
    pub ebitda: Money,
    pub ebitda_margin: Rate,
    pub depreciation: Money,
    pub ebit: Money,
    pub interest_expense: Money,
    pub pre_tax_income: Money,
    pub taxes: Money,
    pub net_income: Money,
    pub capex: Money,
    pub working_capital_change: Money,
    pub free_cash_flow: Money,
}

impl ProjectionRecord {
    /// Revenue and EBITDA of this forecast year
    pub fn metrics(&self) -> FinancialMetrics {
        FinancialMetrics {
            revenue: self.revenue,
            ebitda: self.ebitda,
        }
    }
}

/// Revenue/EBITDA pair a multiple is applied to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub revenue: Money,
    pub ebitda: Money,
}

/// Funding stage of a comparable company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Public,
    Private,
}

impl Stage {
    pub const ALL: [Stage; 2] = [Stage::Public, Stage::Private];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Public => "Public",
            Stage::Private => "Private",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Stage::Public),
            "private" => Ok(Stage::Private),
            other => Err(ValuationError::ParseError(format!("Unknown stage: {}", other))),
        }
    }
}

/// A peer company with its enterprise-value multiples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparableCompany {
    pub name: Option<String>,
    pub stage: Stage,
    pub ev_revenue: Rate,
    pub ev_ebitda: Rate,
}

impl ComparableCompany {
    /// Create an unnamed comparable
    pub fn new(stage: Stage, ev_revenue: Rate, ev_ebitda: Rate) -> Self {
        Self {
            name: None,
            stage,
            ev_revenue,
            ev_ebitda,
        }
    }

    /// Attach a company name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
