use serde::{Deserialize, Serialize};

use crate::Time;

/// Time-of-day cost multipliers.
///
/// Each breakpoint opens an interval that lasts until the next breakpoint.
/// Before the first breakpoint (and when the table is empty) the multiplier
/// is 1.0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeMultipliers {
    breakpoints: Vec<(Time, f64)>,
}

impl TimeMultipliers {
    /// Builds the table from `(start, multiplier)` rows. Rows sharing a start
    /// time resolve last-wins, matching the matrix cell policy.
    pub fn new(mut rows: Vec<(Time, f64)>) -> Self {
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut breakpoints: Vec<(Time, f64)> = Vec::with_capacity(rows.len());
        for row in rows {
            match breakpoints.last_mut() {
                Some(last) if last.0 == row.0 => *last = row,
                _ => breakpoints.push(row),
            }
        }

        TimeMultipliers { breakpoints }
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    /// Multiplier in effect at `instant`.
    pub fn at(&self, instant: Time) -> f64 {
        match self.breakpoints.partition_point(|bp| bp.0 <= instant) {
            0 => 1.0,
            n => self.breakpoints[n - 1].1,
        }
    }

    /// Wall-clock duration of a travel with base duration `base` departing at
    /// `departure`: the integral of the multiplier over
    /// `[departure, departure + base)`, evaluated piecewise across the
    /// breakpoints.
    pub fn stretch(&self, base: Time, departure: Time) -> Time {
        if base <= 0.0 {
            return 0.0;
        }
        if self.breakpoints.is_empty() {
            return base;
        }

        let end = departure + base;
        let mut wall = 0.0;
        let mut t = departure;
        while t < end {
            let next_break = self.breakpoints.partition_point(|bp| bp.0 <= t);
            let segment_end = self
                .breakpoints
                .get(next_break)
                .map_or(end, |bp| bp.0.min(end));
            wall += (segment_end - t) * self.at(t);
            t = segment_end;
        }
        wall
    }
}
