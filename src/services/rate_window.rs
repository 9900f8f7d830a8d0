use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GateError;

/// Granularity of the admission window. A gate admits `limit` calls per one
/// unit of this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Length of one unit in whole milliseconds. Sub-millisecond units
    /// truncate to zero.
    pub fn to_millis(self) -> u64 {
        match self {
            TimeUnit::Nanoseconds | TimeUnit::Microseconds => 0,
            TimeUnit::Milliseconds => 1,
            TimeUnit::Seconds => 1_000,
            TimeUnit::Minutes => 60_000,
            TimeUnit::Hours => 3_600_000,
            TimeUnit::Days => 86_400_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Wait(Duration),
}

/// Fixed-window admission counter.
///
/// Not synchronized; the owning [`Gate`](super::gate::Gate) serializes every
/// call. Timestamps are milliseconds on whatever clock the owner uses and
/// are expected to be non-decreasing, though backward steps are tolerated.
#[derive(Debug)]
pub struct RateWindow {
    limit: u32,
    interval_millis: u64,
    count: u32,
    window_end: u64,
}

impl RateWindow {
    pub fn new(limit: i64, interval_millis: u64, now: u64) -> Result<Self, GateError> {
        if limit <= 0 {
            return Err(GateError::InvalidConfiguration(format!(
                "limit must be positive, got {}",
                limit
            )));
        }
        let limit = u32::try_from(limit).map_err(|_| {
            GateError::InvalidConfiguration(format!("limit {} is too large", limit))
        })?;
        if interval_millis == 0 {
            return Err(GateError::InvalidConfiguration(
                "window interval must be at least one millisecond".to_string(),
            ));
        }

        Ok(Self {
            limit,
            interval_millis,
            count: 0,
            window_end: now.saturating_add(interval_millis),
        })
    }

    pub fn for_unit(unit: TimeUnit, limit: i64, now: u64) -> Result<Self, GateError> {
        Self::new(limit, unit.to_millis(), now)
    }

    pub fn try_admit(&mut self, now: u64) -> Admission {
        if now >= self.window_end {
            self.count = 0;
            self.window_end = now.saturating_add(self.interval_millis);
        }

        if self.count < self.limit {
            self.count += 1;
            return Admission::Admitted;
        }

        Admission::Wait(Duration::from_millis(self.window_end.saturating_sub(now)))
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_millis)
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn window_end(&self) -> u64 {
        self.window_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_admits_up_to_limit_then_waits_for_window_end() {
        let mut window = RateWindow::new(2, 1_000, 0).unwrap();

        assert_eq!(window.try_admit(0), Admission::Admitted);
        assert_eq!(window.try_admit(100), Admission::Admitted);
        assert_eq!(
            window.try_admit(200),
            Admission::Wait(Duration::from_millis(800))
        );
        assert_eq!(window.count(), 2);
    }

    #[test]
    fn test_call_at_window_end_starts_new_window() {
        let mut window = RateWindow::new(1, 1_000, 0).unwrap();
        assert_eq!(window.try_admit(10), Admission::Admitted);
        assert!(matches!(window.try_admit(999), Admission::Wait(_)));

        assert_eq!(window.try_admit(1_000), Admission::Admitted);
        assert_eq!(window.count(), 1);
        assert_eq!(window.window_end(), 2_000);
    }

    #[test]
    fn test_rollover_is_relative_to_observed_time() {
        let mut window = RateWindow::new(3, 500, 0).unwrap();
        window.try_admit(0);

        // Idle for many intervals; the next call opens a window at its own time.
        assert_eq!(window.try_admit(10_250), Admission::Admitted);
        assert_eq!(window.window_end(), 10_750);
        assert_eq!(window.count(), 1);
    }

    #[test]
    fn test_backward_clock_neither_rolls_over_nor_goes_negative() {
        let mut window = RateWindow::new(1, 1_000, 5_000).unwrap();
        assert_eq!(window.try_admit(5_500), Admission::Admitted);

        match window.try_admit(5_200) {
            Admission::Wait(wait) => assert_eq!(wait, Duration::from_millis(800)),
            other => panic!("expected wait, got {:?}", other),
        }
        assert_eq!(window.count(), 1);
        assert_eq!(window.window_end(), 6_000);
    }

    #[test]
    fn test_wait_covers_remainder_of_window() {
        let mut window = RateWindow::new(1, 1_000, 0).unwrap();
        window.try_admit(0);

        let wait = match window.try_admit(0) {
            Admission::Wait(wait) => wait,
            Admission::Admitted => panic!("limit exceeded"),
        };
        assert_eq!(wait, Duration::from_millis(1_000));
    }

    #[test]
    fn test_rejects_non_positive_limit() {
        for limit in [0, -1, i64::MIN] {
            let err = RateWindow::new(limit, 1_000, 0).unwrap_err();
            assert!(matches!(err, GateError::InvalidConfiguration(_)));
        }
    }

    #[test]
    fn test_rejects_sub_millisecond_units() {
        for unit in [TimeUnit::Nanoseconds, TimeUnit::Microseconds] {
            let err = RateWindow::for_unit(unit, 5, 0).unwrap_err();
            assert!(matches!(err, GateError::InvalidConfiguration(_)));
        }
        assert!(RateWindow::for_unit(TimeUnit::Milliseconds, 5, 0).is_ok());
    }

    #[test]
    fn test_unit_lengths() {
        assert_eq!(TimeUnit::Seconds.to_millis(), 1_000);
        assert_eq!(TimeUnit::Minutes.to_millis(), 60_000);
        assert_eq!(TimeUnit::Hours.to_millis(), 3_600_000);
        assert_eq!(TimeUnit::Days.to_millis(), 86_400_000);
    }

    #[test]
    fn test_never_exceeds_limit_in_any_window() {
        let limit = 4;
        let mut window = RateWindow::new(limit, 250, 0).unwrap();
        let mut per_window: HashMap<u64, u32> = HashMap::new();

        // Irregular arrival pattern with bursts and gaps.
        let mut now = 0u64;
        for step in 0..5_000u64 {
            now += (step * 7919) % 23;
            if let Admission::Admitted = window.try_admit(now) {
                *per_window.entry(window.window_end()).or_default() += 1;
            }
        }

        assert!(per_window.len() > 1);
        for (end, admitted) in per_window {
            assert!(admitted <= limit as u32, "window ending {} admitted {}", end, admitted);
        }
    }
}
