//! Visible-domain computation for the two time axes.

use chrono::NaiveDate;

use crate::record::Dataset;
use crate::time::{forward_horizon, start_of_year};

/// Inclusive visible range of one time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl AxisBounds {
    pub fn span_days(&self) -> i64 {
        (self.max - self.min).num_days()
    }

    /// A collapsed axis; mapping through it degrades to a constant.
    pub fn is_degenerate(&self) -> bool {
        self.min >= self.max
    }
}

/// Visible domain of a chart: valid time on X, transaction time on Y.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainBounds {
    pub x: AxisBounds,
    pub y: AxisBounds,
}

impl DomainBounds {
    /// Compute the visible domain for a dataset.
    ///
    /// Each axis minimum snaps to January 1st of the year of the
    /// earliest defined endpoint on that axis; open ends contribute
    /// nothing and records without a usable extent are skipped. Both
    /// maximums sit at the fixed forward horizon (January 1st two
    /// years after `today`) regardless of the data. Pure function;
    /// callers re-run it after every dataset replace.
    pub fn compute(dataset: &Dataset, today: NaiveDate) -> Self {
        let horizon = forward_horizon(today);
        let mut earliest_valid: Option<NaiveDate> = None;
        let mut earliest_tran: Option<NaiveDate> = None;

        for record in dataset.iter() {
            let Some(extent) = record.extent() else {
                continue;
            };
            fold_min(&mut earliest_valid, extent.valid.from);
            if let Some(to) = extent.valid.to {
                fold_min(&mut earliest_valid, to);
            }
            fold_min(&mut earliest_tran, extent.tran.from);
            if let Some(to) = extent.tran.to {
                fold_min(&mut earliest_tran, to);
            }
        }

        DomainBounds {
            x: axis_bounds(earliest_valid, today, horizon),
            y: axis_bounds(earliest_tran, today, horizon),
        }
    }
}

fn axis_bounds(earliest: Option<NaiveDate>, today: NaiveDate, horizon: NaiveDate) -> AxisBounds {
    // All-future data would put min past the horizon; collapse instead.
    let min = start_of_year(earliest.unwrap_or(today)).min(horizon);
    AxisBounds { min, max: horizon }
}

fn fold_min(slot: &mut Option<NaiveDate>, candidate: NaiveDate) {
    if slot.map_or(true, |current| candidate < current) {
        *slot = Some(candidate);
    }
}
