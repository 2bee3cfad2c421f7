//! Closed-form allocation solver
//!
//! Splits a fixed total across consumers while minimizing the summed
//! absolute deviation from their forecasts. The underlying problem is a
//! small linear program (allocation variables `x_s >= 0`, deviation
//! variables `d_s >= |x_s - f_s|`, budget `sum x_s = total`), but its
//! optimum has a closed form: a single uniform shift `c` applied to every
//! forecast and floored at zero,
//!
//! ```text
//! x_s = max(f_s + c, 0)   with   sum max(f_s + c, 0) = total
//! ```
//!
//! The subgradient of the L1 objective under a uniform shift is monotone in
//! `c`, so this shift-and-clip solution is the unique minimizer. Finding `c`
//! is a sort plus one scan over clip counts, O(n log n), with none of the
//! degenerate-optimum ambiguity a general simplex solver brings.

use crate::error::{AtlasError, Result};
use crate::types::ConsumerId;
use serde::Serialize;
use std::collections::BTreeMap;

/// Absolute tolerance on the budget identity `sum(allocations) == total`
pub const SUM_TOLERANCE: f64 = 1e-6;

/// Optimal allocation of one day's total across consumers
#[derive(Debug, Clone, Serialize)]
pub struct DayAllocation {
    /// Allocated quantity per consumer, all non-negative
    pub quantities: BTreeMap<ConsumerId, f64>,
    /// Uniform shift applied to the forecasts before clipping
    pub shift: f64,
    /// Objective value: summed absolute deviation from forecast
    pub total_deviation: f64,
}

impl DayAllocation {
    /// Number of consumers in this allocation
    pub fn consumer_count(&self) -> usize {
        self.quantities.len()
    }

    /// Sum of allocated quantities
    pub fn allocated_total(&self) -> f64 {
        self.quantities.values().sum()
    }
}

/// Allocate `total` across consumers, minimizing summed deviation from
/// forecast.
///
/// # Errors
/// - [`AtlasError::EmptyConsumerSet`] when `forecasts` is empty
/// - [`AtlasError::InvalidTotal`] when `total` is negative or non-finite
/// - [`AtlasError::NonFiniteForecast`] when any forecast is NaN or infinite
pub fn allocate(total: f64, forecasts: &BTreeMap<ConsumerId, f64>) -> Result<DayAllocation> {
    if forecasts.is_empty() {
        return Err(AtlasError::EmptyConsumerSet);
    }
    if !total.is_finite() || total < 0.0 {
        return Err(AtlasError::InvalidTotal(total));
    }
    for (consumer, forecast) in forecasts {
        if !forecast.is_finite() {
            return Err(AtlasError::NonFiniteForecast(consumer.to_string()));
        }
    }

    // A single consumer absorbs the whole total, whatever it forecast.
    if forecasts.len() == 1 {
        let (consumer, forecast) = forecasts.iter().next().expect("len checked");
        let mut quantities = BTreeMap::new();
        quantities.insert(consumer.clone(), total);
        return Ok(DayAllocation {
            quantities,
            shift: total - forecast,
            total_deviation: (total - forecast).abs(),
        });
    }

    let forecast_sum: f64 = forecasts.values().sum();
    let min_forecast = forecasts.values().cloned().fold(f64::INFINITY, f64::min);

    // Supply matches demand: the forecasts themselves are the optimum.
    if (total - forecast_sum).abs() <= f64::EPSILON * forecast_sum.abs().max(1.0)
        && min_forecast >= 0.0
    {
        return Ok(DayAllocation {
            quantities: forecasts.clone(),
            shift: 0.0,
            total_deviation: 0.0,
        });
    }

    let shift = solve_shift(total, forecasts)?;

    let mut total_deviation = 0.0;
    let quantities: BTreeMap<ConsumerId, f64> = forecasts
        .iter()
        .map(|(consumer, forecast)| {
            let allocated = (forecast + shift).max(0.0);
            total_deviation += (allocated - forecast).abs();
            (consumer.clone(), allocated)
        })
        .collect();

    debug_assert!(
        (quantities.values().sum::<f64>() - total).abs() <= SUM_TOLERANCE * total.abs().max(1.0),
        "budget identity violated"
    );

    Ok(DayAllocation {
        quantities,
        shift,
        total_deviation,
    })
}

/// Solve for the uniform shift `c` with `sum max(f + c, 0) = total`.
///
/// Scans clip counts over the ascending-sorted forecasts: clipping the `k`
/// smallest leaves `m = n - k` active consumers and the candidate
/// `c = (total - suffix_sum_k) / m`, which is the answer exactly when it
/// keeps the clipped ones at or below zero and the active ones at or above.
fn solve_shift(total: f64, forecasts: &BTreeMap<ConsumerId, f64>) -> Result<f64> {
    let mut sorted: Vec<f64> = forecasts.values().cloned().collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite values"));
    let n = sorted.len();

    let tolerance = 1e-9 * sorted.iter().fold(total.abs().max(1.0), |acc, f| acc.max(f.abs()));

    let mut suffix_sum: f64 = sorted.iter().sum();
    for clipped in 0..n {
        let active = (n - clipped) as f64;
        let candidate = (total - suffix_sum) / active;

        let clipped_ok = clipped == 0 || sorted[clipped - 1] + candidate <= tolerance;
        let active_ok = sorted[clipped] + candidate >= -tolerance;
        if clipped_ok && active_ok {
            return Ok(candidate);
        }

        suffix_sum -= sorted[clipped];
    }

    // Unreachable for finite inputs and total >= 0: the scan covers every
    // breakpoint of the piecewise-linear budget function.
    Err(AtlasError::internal("shift search failed to converge"))
}
