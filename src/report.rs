//! Console rendering of valuation results

use crate::dcf::{DcfResult, SensitivityGrid};
use crate::historical::HistoricalAnalysis;
use crate::model::ValuationReport;
use crate::multiples::MultiplesResult;
use crate::summary::{ValuationSummary, DCF_WEIGHT, MULTIPLES_WEIGHT};
use crate::types::{Money, ProjectionRecord, Rate};
use std::fmt;

/// Format an amount in millions, e.g. `$12.3M`
pub fn millions(value: Money) -> String {
    format!("${:.1}M", value / 1e6)
}

/// Format a rate as a percentage, e.g. `24.5%`
pub fn percent(rate: Rate) -> String {
    format!("{:.1}%", rate * 100.0)
}

fn heading(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "{}", "=".repeat(60))?;
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", "=".repeat(60))
}

impl fmt::Display for HistoricalAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "HISTORICAL FINANCIAL ANALYSIS")?;
        writeln!(
            f,
            "Revenue CAGR ({}-{}): {}",
            self.first_year,
            self.last_year,
            percent(self.revenue_cagr)
        )?;
        writeln!(f, "Average Revenue Growth: {}", percent(self.avg_revenue_growth))?;
        writeln!(f, "Average EBITDA Margin:  {}", percent(self.avg_ebitda_margin))?;
        writeln!(f, "Average Gross Margin:   {}", percent(self.avg_gross_margin))?;
        writeln!(f)?;
        writeln!(
            f,
            "{:>6} {:>12} {:>12} {:>12} {:>12}",
            "Year", "Rev Growth", "EBITDA Gr.", "Gross Mgn", "EBITDA Mgn"
        )?;
        for p in &self.periods {
            let ebitda_growth = p.ebitda_growth.map(percent).unwrap_or_else(|| "n/a".to_string());
            writeln!(
                f,
                "{:>6} {:>12} {:>12} {:>12} {:>12}",
                p.year,
                percent(p.revenue_growth),
                ebitda_growth,
                percent(p.gross_margin),
                percent(p.ebitda_margin)
            )?;
        }
        Ok(())
    }
}

/// Table view over projected years
pub struct ProjectionTable<'a>(pub &'a [ProjectionRecord]);

impl fmt::Display for ProjectionTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "FINANCIAL PROJECTIONS")?;
        writeln!(
            f,
            "{:>6} {:>12} {:>12} {:>10} {:>12} {:>12}",
            "Year", "Revenue", "EBITDA", "Margin", "Net Income", "FCF"
        )?;
        for p in self.0 {
            writeln!(
                f,
                "{:>6} {:>12} {:>12} {:>10} {:>12} {:>12}",
                p.year,
                millions(p.revenue),
                millions(p.ebitda),
                percent(p.ebitda_margin),
                millions(p.net_income),
                millions(p.free_cash_flow)
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for DcfResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "DCF VALUATION ANALYSIS")?;
        writeln!(f, "WACC: {}", percent(self.wacc))?;
        writeln!(f, "Terminal Growth Rate: {}", percent(self.terminal_growth_rate))?;
        writeln!(f)?;
        writeln!(
            f,
            "PV of Projected FCF ({} years): {}",
            self.pv_fcf.len(),
            millions(self.pv_fcf_sum)
        )?;
        writeln!(f, "Terminal Value:       {}", millions(self.terminal_value))?;
        writeln!(f, "PV of Terminal Value: {}", millions(self.pv_terminal_value))?;
        writeln!(f, "Enterprise Value:     {}", millions(self.enterprise_value))?;
        writeln!(f, "Equity Value:         {}", millions(self.equity_value))
    }
}

impl fmt::Display for SensitivityGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DCF Sensitivity: Equity Value ($M), WACC (rows) x Terminal Growth (columns)")?;
        write!(f, "{:>8}", "")?;
        for g in &self.growth_values {
            write!(f, " {:>7}", format!("{:.2}%", g * 100.0))?;
        }
        writeln!(f)?;

        for (wacc, row) in self.wacc_values.iter().zip(&self.cells) {
            write!(f, "{:>8}", format!("{:.1}%", wacc * 100.0))?;
            for cell in row {
                match cell.value() {
                    Some(v) => write!(f, " {:>7.0}", v / 1e6)?,
                    None => write!(f, " {:>7}", "n/a")?,
                }
            }
            writeln!(f)?;
        }

        let invalid = self.invalid_count();
        if invalid > 0 {
            writeln!(f, "n/a: WACC does not exceed terminal growth ({} cells)", invalid)?;
        }
        Ok(())
    }
}

impl fmt::Display for MultiplesResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "MARKET MULTIPLES ANALYSIS")?;
        for peers in &self.peers {
            writeln!(f, "{} Companies (n={}):", peers.stage, peers.count)?;
            writeln!(f, "  Median EV/Revenue: {:.1}x", peers.median_ev_revenue)?;
            writeln!(f, "  Median EV/EBITDA:  {:.1}x", peers.median_ev_ebitda)?;
        }
        writeln!(f)?;
        writeln!(f, "Valuation Results (Enterprise Value):")?;
        writeln!(f, "{}", "-".repeat(50))?;
        for estimate in &self.estimates {
            writeln!(
                f,
                "{:<28} {:>6.1}x {:>12}",
                estimate.key.label().replace('_', " "),
                estimate.multiple,
                millions(estimate.value)
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for ValuationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "COMPREHENSIVE VALUATION SUMMARY")?;
        writeln!(f, "DCF Valuation: {}", millions(self.dcf_valuation))?;
        writeln!(f)?;
        writeln!(f, "Market Multiples Valuation:")?;
        for estimate in &self.relevant_multiples {
            writeln!(
                f,
                "  {} ({}): {}",
                estimate.key.metric.as_str(),
                estimate.key.horizon.as_str(),
                millions(estimate.value)
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Multiples Statistics:")?;
        writeln!(f, "  Mean:   {}", millions(self.multiples_mean))?;
        writeln!(f, "  Median: {}", millions(self.multiples_median))?;
        writeln!(
            f,
            "  Range:  {} - {}",
            millions(self.multiples_range.0),
            millions(self.multiples_range.1)
        )?;
        writeln!(f)?;
        writeln!(f, "FINAL VALUATION RECOMMENDATION")?;
        writeln!(f, "Weighted Average Valuation: {}", millions(self.weighted_valuation))?;
        writeln!(
            f,
            "  - DCF ({:.0}% weight): {}",
            DCF_WEIGHT * 100.0,
            millions(self.dcf_valuation)
        )?;
        writeln!(
            f,
            "  - Market Multiples ({:.0}% weight): {}",
            MULTIPLES_WEIGHT * 100.0,
            millions(self.multiples_median)
        )?;
        writeln!(
            f,
            "Valuation Range: {} - {}",
            millions(self.valuation_range.0),
            millions(self.valuation_range.1)
        )
    }
}

impl fmt::Display for ValuationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "STARTUP VALUATION ANALYSIS")?;
        writeln!(f, "Analysis Date: {}", self.analysis_date.format("%B %d, %Y"))?;
        writeln!(f)?;
        writeln!(f, "{}", self.historical)?;
        writeln!(f, "{}", ProjectionTable(&self.projections))?;
        writeln!(f, "{}", self.dcf)?;
        writeln!(f, "{}", self.sensitivity)?;
        writeln!(f, "{}", self.multiples)?;
        write!(f, "{}", self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dcf::{discount, SensitivityCell};

    #[test]
    fn test_formatters() {
        assert_eq!(millions(24_000_000.0), "$24.0M");
        assert_eq!(millions(-1_560_000.0), "$-1.6M");
        assert_eq!(percent(0.2447), "24.5%");
    }

    #[test]
    fn test_dcf_display() {
        let result = discount(&[10_000_000.0], 0.10, 0.03).unwrap();
        let text = result.to_string();
        assert!(text.contains("DCF VALUATION ANALYSIS"));
        assert!(text.contains("WACC: 10.0%"));
        assert!(text.contains("Enterprise Value:     $142.9M"));
    }

    #[test]
    fn test_sensitivity_display_marks_invalid_cells() {
        let grid = SensitivityGrid {
            wacc_values: vec![0.02, 0.10],
            growth_values: vec![0.03],
            cells: vec![
                vec![SensitivityCell::Invalid {
                    wacc: 0.02,
                    growth: 0.03,
                }],
                vec![SensitivityCell::Valid {
                    equity_value: 150_000_000.0,
                }],
            ],
        };
        let text = grid.to_string();
        assert!(text.contains("n/a"));
        assert!(text.contains("150"));
        assert!(text.contains("(1 cells)"));
    }
}
