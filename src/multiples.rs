//! Comparable-company multiples valuation
//!
//! Applies the median EV/Revenue and EV/EBITDA of each peer stage to the
//! startup's current and forward metrics.

use crate::error::{Result, ValuationError};
use crate::types::{ComparableCompany, FinancialMetrics, Money, Rate, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;

const STAGE: &str = "multiples";

/// Enterprise-value multiple applied to a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Revenue,
    Ebitda,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Revenue, Metric::Ebitda];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Revenue => "Revenue",
            Metric::Ebitda => "EBITDA",
        }
    }
}

/// Which period's metric the multiple is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    /// Last historical period
    Current,
    /// First projected period
    Forward,
}

impl Horizon {
    pub const ALL: [Horizon; 2] = [Horizon::Current, Horizon::Forward];

    pub fn as_str(&self) -> &'static str {
        match self {
            Horizon::Current => "Current",
            Horizon::Forward => "Forward",
        }
    }
}

/// Identifies one of the eight multiples estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MultipleKey {
    pub stage: Stage,
    pub metric: Metric,
    pub horizon: Horizon,
}

impl MultipleKey {
    pub fn new(stage: Stage, metric: Metric, horizon: Horizon) -> Self {
        Self {
            stage,
            metric,
            horizon,
        }
    }

    /// Label such as `Private_EV_Revenue_Current`
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MultipleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_EV_{}_{}",
            self.stage,
            self.metric.as_str(),
            self.horizon.as_str()
        )
    }
}

/// Median multiples of one peer stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeerStatistics {
    pub stage: Stage,
    pub count: usize,
    pub median_ev_revenue: Rate,
    pub median_ev_ebitda: Rate,
}

impl PeerStatistics {
    pub fn multiple(&self, metric: Metric) -> Rate {
        match metric {
            Metric::Revenue => self.median_ev_revenue,
            Metric::Ebitda => self.median_ev_ebitda,
        }
    }
}

/// A single multiples-based valuation estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultipleEstimate {
    pub key: MultipleKey,
    pub multiple: Rate,
    pub value: Money,
}

/// The eight multiples estimates plus the peer statistics behind them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplesResult {
    /// Public before Private, Revenue before EBITDA, Current before Forward
    pub estimates: Vec<MultipleEstimate>,
    pub peers: Vec<PeerStatistics>,
}

impl MultiplesResult {
    pub fn get(&self, stage: Stage, metric: Metric, horizon: Horizon) -> Option<Money> {
        let key = MultipleKey::new(stage, metric, horizon);
        self.estimates.iter().find(|e| e.key == key).map(|e| e.value)
    }

    /// Look up an estimate by its label, e.g. `Public_EV_EBITDA_Forward`
    pub fn by_label(&self, label: &str) -> Option<Money> {
        self.estimates
            .iter()
            .find(|e| e.key.label() == label)
            .map(|e| e.value)
    }

    pub fn for_stage(&self, stage: Stage) -> impl Iterator<Item = &MultipleEstimate> {
        self.estimates.iter().filter(move |e| e.key.stage == stage)
    }

    pub fn peers(&self, stage: Stage) -> Option<&PeerStatistics> {
        self.peers.iter().find(|p| p.stage == stage)
    }
}

/// Median of a sample; the mean of the two middle values for an even count
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Median multiples for the given stage
pub fn peer_statistics(comparables: &[ComparableCompany], stage: Stage) -> Result<PeerStatistics> {
    let peers: Vec<&ComparableCompany> = comparables.iter().filter(|c| c.stage == stage).collect();

    let ev_revenue: Vec<f64> = peers.iter().map(|c| c.ev_revenue).collect();
    let ev_ebitda: Vec<f64> = peers.iter().map(|c| c.ev_ebitda).collect();

    match (median(&ev_revenue), median(&ev_ebitda)) {
        (Some(median_ev_revenue), Some(median_ev_ebitda)) => Ok(PeerStatistics {
            stage,
            count: peers.len(),
            median_ev_revenue,
            median_ev_ebitda,
        }),
        _ => Err(ValuationError::invalid(
            STAGE,
            format!(
                "no {} comparables among {} companies; median multiple undefined",
                stage,
                comparables.len()
            ),
        )),
    }
}

/// Value the startup on peer median multiples
pub fn run_multiples(
    current: &FinancialMetrics,
    forward: &FinancialMetrics,
    comparables: &[ComparableCompany],
) -> Result<MultiplesResult> {
    let peers = Stage::ALL
        .iter()
        .map(|&stage| peer_statistics(comparables, stage))
        .collect::<Result<Vec<_>>>()?;

    let mut estimates = Vec::with_capacity(8);
    for stats in &peers {
        log::debug!(
            "{} peers (n={}): EV/Revenue {:.2}x, EV/EBITDA {:.2}x",
            stats.stage,
            stats.count,
            stats.median_ev_revenue,
            stats.median_ev_ebitda
        );

        for metric in Metric::ALL {
            for horizon in Horizon::ALL {
                let metrics = match horizon {
                    Horizon::Current => current,
                    Horizon::Forward => forward,
                };
                let base = match metric {
                    Metric::Revenue => metrics.revenue,
                    Metric::Ebitda => metrics.ebitda,
                };
                let multiple = stats.multiple(metric);

                estimates.push(MultipleEstimate {
                    key: MultipleKey::new(stats.stage, metric, horizon),
                    multiple,
                    value: base * multiple,
                });
            }
        }
    }

    log::info!(
        "Multiples valuation from {} comparables: {} estimates",
        comparables.len(),
        estimates.len()
    );

    Ok(MultiplesResult { estimates, peers })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparables() -> Vec<ComparableCompany> {
        vec![
            ComparableCompany::new(Stage::Public, 10.0, 40.0),
            ComparableCompany::new(Stage::Public, 12.0, 50.0),
            ComparableCompany::new(Stage::Public, 6.0, 30.0),
            ComparableCompany::new(Stage::Private, 7.0, 25.0),
            ComparableCompany::new(Stage::Private, 9.0, 35.0),
            ComparableCompany::new(Stage::Private, 20.0, 60.0),
            ComparableCompany::new(Stage::Private, 5.0, 20.0),
        ]
    }

    fn current() -> FinancialMetrics {
        FinancialMetrics {
            revenue: 240.0,
            ebitda: 31.0,
        }
    }

    fn forward() -> FinancialMetrics {
        FinancialMetrics {
            revenue: 324.0,
            ebitda: 48.0,
        }
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0]), Some(3.0));
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[7.0, 9.0, 20.0, 5.0]), Some(8.0));
    }

    #[test]
    fn test_private_revenue_current_exact() {
        let result = run_multiples(&current(), &forward(), &comparables()).unwrap();
        assert_eq!(result.peers(Stage::Private).unwrap().median_ev_revenue, 8.0);
        assert_eq!(
            result.get(Stage::Private, Metric::Revenue, Horizon::Current),
            Some(1920.0)
        );
        assert_eq!(result.by_label("Private_EV_Revenue_Current"), Some(1920.0));
    }

    #[test]
    fn test_eight_estimates_in_order() {
        let result = run_multiples(&current(), &forward(), &comparables()).unwrap();
        let labels: Vec<String> = result.estimates.iter().map(|e| e.key.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Public_EV_Revenue_Current",
                "Public_EV_Revenue_Forward",
                "Public_EV_EBITDA_Current",
                "Public_EV_EBITDA_Forward",
                "Private_EV_Revenue_Current",
                "Private_EV_Revenue_Forward",
                "Private_EV_EBITDA_Current",
                "Private_EV_EBITDA_Forward",
            ]
        );
    }

    #[test]
    fn test_forward_uses_projected_metrics() {
        let result = run_multiples(&current(), &forward(), &comparables()).unwrap();
        assert_eq!(
            result.get(Stage::Public, Metric::Ebitda, Horizon::Forward),
            Some(48.0 * 40.0)
        );
        assert_eq!(
            result.get(Stage::Private, Metric::Ebitda, Horizon::Forward),
            Some(48.0 * 30.0)
        );
        assert_eq!(result.for_stage(Stage::Private).count(), 4);
    }

    #[test]
    fn test_empty_private_stage_is_error() {
        let public_only: Vec<ComparableCompany> = comparables()
            .into_iter()
            .filter(|c| c.stage == Stage::Public)
            .collect();
        let err = run_multiples(&current(), &forward(), &public_only).unwrap_err();
        assert!(matches!(err, ValuationError::InvalidAssumption { .. }));
        assert!(err.to_string().contains("Private"));
    }

    #[test]
    fn test_outliers_not_trimmed() {
        let mut comps = comparables();
        comps.push(ComparableCompany::new(Stage::Public, 500.0, 900.0));
        let stats = peer_statistics(&comps, Stage::Public).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.median_ev_revenue, 11.0);
    }
}
