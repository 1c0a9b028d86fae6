//! Trading window (London session by default).

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Daily UTC window `[open_hour, close_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingWindow {
    pub open_hour: u32,
    pub close_hour: u32,
}

impl Default for TradingWindow {
    fn default() -> Self {
        Self {
            open_hour: 8,
            close_hour: 17,
        }
    }
}

impl TradingWindow {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        let hour = now.hour();
        hour >= self.open_hour && hour < self.close_hour
    }

    /// Next open or close after `now`, whichever comes first.
    pub fn next_boundary(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let hour = now.hour();
        let today = now.date_naive();
        let at = |h: u32| {
            NaiveTime::from_hms_opt(h, 0, 0).map_or(now, |t| today.and_time(t).and_utc())
        };
        if hour < self.open_hour {
            at(self.open_hour)
        } else if hour < self.close_hour {
            at(self.close_hour)
        } else {
            at(self.open_hour) + Duration::days(1)
        }
    }

    pub fn time_remaining(&self, now: DateTime<Utc>) -> Duration {
        self.next_boundary(now) - now
    }

    /// `HH:MM:SS` countdown to the next boundary.
    pub fn countdown(&self, now: DateTime<Utc>) -> String {
        let secs = self.time_remaining(now).num_seconds().max(0);
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }

    pub fn status_line(&self, now: DateTime<Utc>) -> &'static str {
        if self.is_active(now) {
            "London Session Active"
        } else {
            "Outside London Session"
        }
    }
}
