//! Blends DCF and comparable multiples into a single recommendation

use crate::dcf::DcfResult;
use crate::error::{Result, ValuationError};
use crate::multiples::{median, Metric, MultipleEstimate, MultiplesResult};
use crate::types::{Money, Rate, Stage};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution};

/// Weight of the DCF equity value in the blended valuation
pub const DCF_WEIGHT: Rate = 0.6;
/// Weight of the multiples median in the blended valuation
pub const MULTIPLES_WEIGHT: Rate = 0.4;

/// Peer stage treated as the relevant comparator for a startup
pub const RELEVANT_STAGE: Stage = Stage::Private;

const STAGE: &str = "summary";

/// One estimate per metric and horizon for the relevant stage
const RELEVANT_ESTIMATES: usize = 4;

/// Final valuation recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub dcf_valuation: Money,
    pub relevant_multiples: Vec<MultipleEstimate>,
    pub multiples_mean: Money,
    pub multiples_median: Money,
    pub multiples_range: (Money, Money),
    pub weighted_valuation: Money,
    /// (min, max) over the relevant multiples and the DCF value
    pub valuation_range: (Money, Money),
}

/// Combine the DCF and the private-peer multiples estimates
pub fn summarize(dcf: &DcfResult, multiples: &MultiplesResult) -> Result<ValuationSummary> {
    let relevant_multiples: Vec<MultipleEstimate> =
        multiples.for_stage(RELEVANT_STAGE).copied().collect();
    if relevant_multiples.len() != RELEVANT_ESTIMATES {
        return Err(ValuationError::invalid(
            STAGE,
            format!(
                "expected {} {} multiples estimates, found {}",
                RELEVANT_ESTIMATES,
                RELEVANT_STAGE,
                relevant_multiples.len()
            ),
        ));
    }
    for metric in [Metric::Revenue, Metric::Ebitda] {
        if !relevant_multiples.iter().any(|e| e.key.metric == metric) {
            return Err(ValuationError::invalid(
                STAGE,
                format!("no {} estimate based on {:?}", RELEVANT_STAGE, metric),
            ));
        }
    }

    let values: Vec<Money> = relevant_multiples.iter().map(|e| e.value).collect();
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(ValuationError::invalid(
            STAGE,
            format!("non-finite {} multiples estimate {}", RELEVANT_STAGE, bad),
        ));
    }
    let dcf_valuation = dcf.equity_value;
    if !dcf_valuation.is_finite() {
        return Err(ValuationError::invalid(
            STAGE,
            format!("non-finite DCF valuation {}", dcf_valuation),
        ));
    }

    let (multiples_median, multiples_mean, multiples_range) =
        match (median(&values), Data::new(values.clone()).mean(), min_max(values.iter().copied())) {
            (Some(median), Some(mean), Some(range)) => (median, mean, range),
            _ => return Err(ValuationError::invalid(STAGE, "no multiples estimates to aggregate")),
        };

    let weighted_valuation = weighted(dcf_valuation, multiples_median);
    let valuation_range = (
        multiples_range.0.min(dcf_valuation),
        multiples_range.1.max(dcf_valuation),
    );

    log::info!(
        "Weighted valuation {:.0} (DCF {:.0} x {}, multiples median {:.0} x {})",
        weighted_valuation,
        dcf_valuation,
        DCF_WEIGHT,
        multiples_median,
        MULTIPLES_WEIGHT
    );

    Ok(ValuationSummary {
        dcf_valuation,
        relevant_multiples,
        multiples_mean,
        multiples_median,
        multiples_range,
        weighted_valuation,
        valuation_range,
    })
}

/// Fixed 60/40 blend of fundamental and comparable valuations
pub fn weighted(dcf_valuation: Money, multiples_median: Money) -> Money {
    DCF_WEIGHT * dcf_valuation + MULTIPLES_WEIGHT * multiples_median
}

fn min_max(values: impl Iterator<Item = Money>) -> Option<(Money, Money)> {
    values.fold(None, |acc: Option<(Money, Money)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
