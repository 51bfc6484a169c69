//! Historical performance analysis
//!
//! Derives period-over-period growth, margins and aggregate growth metrics
//! from the startup's historical financial statements.

use crate::error::{Result, ValuationError};
use crate::types::{HistoricalRecord, Rate, Year};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution};

const STAGE: &str = "historical analysis";

/// Metrics derived for a single historical period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodMetrics {
    pub year: Year,
    /// Revenue growth vs. the previous period (0 for the first period)
    pub revenue_growth: Rate,
    /// EBITDA growth vs. the previous period; `None` when the previous EBITDA is zero
    pub ebitda_growth: Option<Rate>,
    pub gross_margin: Rate,
    pub ebitda_margin: Rate,
}

/// Result of the historical analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalAnalysis {
    pub periods: Vec<PeriodMetrics>,
    pub revenue_cagr: Rate,
    pub avg_revenue_growth: Rate,
    pub avg_ebitda_margin: Rate,
    pub avg_gross_margin: Rate,
    pub first_year: Year,
    pub last_year: Year,
}

/// Analyze a chronological sequence of historical records
pub fn analyze_historical(records: &[HistoricalRecord]) -> Result<HistoricalAnalysis> {
    validate_series(records)?;

    let mut periods = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let (revenue_growth, ebitda_growth) = match i {
            0 => (0.0, Some(0.0)),
            _ => {
                let prev = &records[i - 1];
                (
                    pct_change(prev.revenue, record.revenue).unwrap_or(0.0),
                    pct_change(prev.ebitda, record.ebitda),
                )
            }
        };

        periods.push(PeriodMetrics {
            year: record.year,
            revenue_growth,
            ebitda_growth,
            gross_margin: (record.revenue - record.cogs) / record.revenue,
            ebitda_margin: record.ebitda / record.revenue,
        });
    }

    let first = &records[0];
    let last = &records[records.len() - 1];
    let revenue_cagr = cagr(first.revenue, last.revenue, records.len() - 1)?;

    let avg_revenue_growth = mean(periods[1..].iter().map(|p| p.revenue_growth));
    let avg_ebitda_margin = mean(periods.iter().map(|p| p.ebitda_margin));
    let avg_gross_margin = mean(periods.iter().map(|p| p.gross_margin));

    log::info!(
        "Analyzed {} historical periods ({}-{}), revenue CAGR {:.2}%",
        records.len(),
        first.year,
        last.year,
        revenue_cagr * 100.0
    );

    Ok(HistoricalAnalysis {
        periods,
        revenue_cagr,
        avg_revenue_growth,
        avg_ebitda_margin,
        avg_gross_margin,
        first_year: first.year,
        last_year: last.year,
    })
}

/// Compound annual growth rate over `transitions` year-over-year steps
pub fn cagr(first: f64, last: f64, transitions: usize) -> Result<Rate> {
    if transitions == 0 {
        return Err(ValuationError::invalid(
            STAGE,
            "CAGR needs at least one year-over-year transition",
        ));
    }
    if !(first > 0.0) {
        return Err(ValuationError::invalid(
            STAGE,
            format!("CAGR undefined for non-positive starting revenue {}", first),
        ));
    }

    let ratio = last / first;
    if !(ratio > 0.0) || !ratio.is_finite() {
        return Err(ValuationError::invalid(
            STAGE,
            format!("CAGR undefined for revenue ratio {} ({} -> {})", ratio, first, last),
        ));
    }

    Ok(ratio.powf(1.0 / transitions as f64) - 1.0)
}

fn validate_series(records: &[HistoricalRecord]) -> Result<()> {
    if records.len() < 2 {
        return Err(ValuationError::invalid(
            STAGE,
            format!("at least two historical periods required, got {}", records.len()),
        ));
    }

    for record in records {
        if !(record.revenue > 0.0) {
            return Err(ValuationError::invalid(
                STAGE,
                format!(
                    "revenue must be positive, got {} for year {}",
                    record.revenue, record.year
                ),
            ));
        }
    }

    for pair in records.windows(2) {
        if pair[1].year <= pair[0].year {
            return Err(ValuationError::invalid(
                STAGE,
                format!(
                    "records must be in ascending year order, found {} after {}",
                    pair[1].year, pair[0].year
                ),
            ));
        }
    }

    Ok(())
}

fn pct_change(prev: f64, current: f64) -> Option<f64> {
    if prev == 0.0 {
        None
    } else {
        Some((current - prev) / prev)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    Data::new(values.collect::<Vec<f64>>()).mean().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> Vec<HistoricalRecord> {
        vec![
            HistoricalRecord::new(2020, 100.0, 45.0, -15.0, -25.0),
            HistoricalRecord::new(2021, 120.0, 52.0, -6.0, -15.0),
            HistoricalRecord::new(2022, 150.0, 62.0, 3.0, -5.0),
            HistoricalRecord::new(2023, 190.0, 75.0, 15.0, 4.0),
            HistoricalRecord::new(2024, 240.0, 91.0, 31.0, 16.0),
        ]
    }

    #[test]
    fn test_first_period_growth_is_zero() {
        let analysis = analyze_historical(&sample()).unwrap();
        assert_eq!(analysis.periods[0].revenue_growth, 0.0);
        assert_eq!(analysis.periods[0].ebitda_growth, Some(0.0));
    }

    #[test]
    fn test_revenue_cagr_closed_form() {
        let analysis = analyze_historical(&sample()).unwrap();
        let expected = (240.0_f64 / 100.0).powf(0.25) - 1.0;
        assert_eq!(analysis.revenue_cagr, expected);
        assert_relative_eq!(analysis.revenue_cagr, 0.2447, epsilon = 1e-4);
    }

    #[test]
    fn test_cagr_uses_number_of_transitions() {
        let records = vec![
            HistoricalRecord::new(2022, 100.0, 40.0, 10.0, 5.0),
            HistoricalRecord::new(2023, 110.0, 44.0, 11.0, 6.0),
            HistoricalRecord::new(2024, 121.0, 48.0, 12.0, 7.0),
        ];
        let analysis = analyze_historical(&records).unwrap();
        assert_relative_eq!(analysis.revenue_cagr, 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_averages_and_margins() {
        let analysis = analyze_historical(&sample()).unwrap();

        let growth = [0.2, 0.25, 190.0 / 150.0 - 1.0, 240.0 / 190.0 - 1.0];
        let expected_growth = growth.iter().sum::<f64>() / 4.0;
        assert_relative_eq!(analysis.avg_revenue_growth, expected_growth, epsilon = 1e-12);

        assert_relative_eq!(analysis.periods[4].gross_margin, (240.0 - 91.0) / 240.0);
        assert_relative_eq!(analysis.periods[4].ebitda_margin, 31.0 / 240.0);

        let margins: f64 = sample().iter().map(|r| r.ebitda / r.revenue).sum();
        assert_relative_eq!(analysis.avg_ebitda_margin, margins / 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ebitda_growth_from_zero_is_undefined() {
        let records = vec![
            HistoricalRecord::new(2023, 100.0, 40.0, 0.0, -5.0),
            HistoricalRecord::new(2024, 130.0, 50.0, 8.0, 2.0),
        ];
        let analysis = analyze_historical(&records).unwrap();
        assert_eq!(analysis.periods[1].ebitda_growth, None);
        assert_relative_eq!(analysis.periods[1].revenue_growth, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_non_positive_revenue() {
        let mut records = sample();
        records[0].revenue = 0.0;
        let err = analyze_historical(&records).unwrap_err();
        assert!(matches!(err, ValuationError::InvalidAssumption { .. }));
        assert!(err.to_string().contains("2020"));
    }

    #[test]
    fn test_rejects_short_or_unordered_series() {
        let records = sample();
        assert!(analyze_historical(&records[..1]).is_err());

        let mut reversed = records.clone();
        reversed.reverse();
        assert!(analyze_historical(&reversed).is_err());
    }

    #[test]
    fn test_cagr_errors() {
        assert!(cagr(0.0, 100.0, 4).is_err());
        assert!(cagr(100.0, -5.0, 4).is_err());
        assert!(cagr(100.0, 120.0, 0).is_err());
    }
}
