use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Time;

#[derive(Error, Debug)]
#[error("invalid time window [{open}, {close}]")]
pub struct BadTimeWindow {
    pub open: Time,
    pub close: Time,
}

/// A hard `[open, close]` service window. `open <= close` is enforced at
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    open: Time,
    close: Time,
}

impl TimeWindow {
    pub fn new(open: Time, close: Time) -> Result<Self, BadTimeWindow> {
        if open > close || !open.is_finite() || !close.is_finite() {
            return Err(BadTimeWindow { open, close });
        }
        Ok(TimeWindow { open, close })
    }

    pub fn open(&self) -> Time {
        self.open
    }

    pub fn close(&self) -> Time {
        self.close
    }

    pub fn width(&self) -> Time {
        self.close - self.open
    }

    pub fn is_open_at(&self, instant: Time) -> bool {
        self.open <= instant && instant <= self.close
    }

    /// How long an arrival at `arrival` has to wait for the window to open.
    pub fn wait_until_open(&self, arrival: Time) -> Time {
        (self.open - arrival).max(0.0)
    }

    pub fn closes_before(&self, arrival: Time) -> bool {
        arrival > self.close
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_window() {
        assert!(TimeWindow::new(10.0, 5.0).is_err());
        assert!(TimeWindow::new(5.0, 5.0).is_ok());
    }

    #[test]
    fn wait_and_violation() {
        let w = TimeWindow::new(10.0, 20.0).unwrap();
        assert_eq!(w.wait_until_open(4.0), 6.0);
        assert_eq!(w.wait_until_open(15.0), 0.0);
        assert!(!w.closes_before(20.0));
        assert!(w.closes_before(20.5));
    }
}
