//! Per-day driver over the forecast horizon
//!
//! Runs the solver once per horizon day, assembling a date-keyed allocation
//! table. Days are mutually independent (no cross-day state) and are solved
//! in parallel; ordering of the result is presentational only, carried by the
//! `BTreeMap` date keys.

use crate::allocator::solver::{allocate, DayAllocation};
use crate::error::{AtlasError, Result};
use crate::types::{ConsumerId, ForecastPoint};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Date-keyed allocation table spanning the forecast horizon.
pub type AllocationTable = BTreeMap<NaiveDate, DayAllocation>;

/// Allocate `total` for every day of the horizon.
///
/// Day positions and dates come from the first consumer's sequence; all
/// sequences must share that sequence's starting date and be chronologically
/// ordered ([`AtlasError::MisalignedCalendars`] otherwise; the table is
/// never silently misaligned). Consumers whose sequence is shorter than a
/// given position are skipped for that day only; a day with no eligible
/// consumer is skipped, not errored.
///
/// An invalid `total` is request-wide and aborts the whole run before any
/// day is solved.
pub fn plan_horizon(
    total: f64,
    series: &BTreeMap<ConsumerId, Vec<ForecastPoint>>,
) -> Result<AllocationTable> {
    if series.is_empty() {
        return Err(AtlasError::EmptyConsumerSet);
    }
    if !total.is_finite() || total < 0.0 {
        return Err(AtlasError::InvalidTotal(total));
    }

    validate_alignment(series)?;

    // Dates are taken from the first consumer that has any forecasts.
    let reference: &[ForecastPoint] = match series.values().find(|points| !points.is_empty()) {
        Some(points) => points,
        None => return Ok(AllocationTable::new()),
    };

    let mut day_inputs: Vec<(NaiveDate, BTreeMap<ConsumerId, f64>)> = Vec::new();
    for (position, point) in reference.iter().enumerate() {
        let forecasts: BTreeMap<ConsumerId, f64> = series
            .iter()
            .filter_map(|(consumer, points)| {
                points
                    .get(position)
                    .map(|p| (consumer.clone(), p.yhat))
            })
            .collect();

        if forecasts.is_empty() {
            debug!(date = %point.date, "No eligible consumers, skipping day");
            continue;
        }
        day_inputs.push((point.date, forecasts));
    }

    let days: Vec<(NaiveDate, DayAllocation)> = day_inputs
        .into_par_iter()
        .map(|(date, forecasts)| allocate(total, &forecasts).map(|result| (date, result)))
        .collect::<Result<Vec<_>>>()?;

    Ok(days.into_iter().collect())
}

/// Check that every sequence is chronologically ordered and shares day-0
/// with the first non-empty sequence.
fn validate_alignment(series: &BTreeMap<ConsumerId, Vec<ForecastPoint>>) -> Result<()> {
    let mut day_zero: Option<NaiveDate> = None;

    for (consumer, points) in series {
        for window in points.windows(2) {
            if window[1].date <= window[0].date {
                return Err(AtlasError::misaligned(format!(
                    "forecast sequence for {} is not chronologically ordered",
                    consumer
                )));
            }
        }

        if let Some(first) = points.first() {
            match day_zero {
                None => day_zero = Some(first.date),
                Some(expected) if first.date != expected => {
                    return Err(AtlasError::misaligned(format!(
                        "consumer {} starts at {} but the run starts at {}",
                        consumer, first.date, expected
                    )));
                }
                Some(_) => {}
            }
        }
    }

    Ok(())
}
