//! Fixed daily schedule and countdown arithmetic

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// A daily event at a fixed UTC time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTime {
    pub label: &'static str,
    pub local_hint: &'static str,
    pub hour: u32,
    pub minute: u32,
}

/// CI redeploys the stack at 00:00 UTC (08:00 Singapore)
pub const DEPLOYMENT: ScheduleTime = ScheduleTime {
    label: "Next Deployment",
    local_hint: "8 AM Singapore",
    hour: 0,
    minute: 0,
};

/// The scheduler rule triggers collection at 09:00 UTC (17:00 Singapore)
pub const COLLECTION: ScheduleTime = ScheduleTime {
    label: "Next Collection",
    local_hint: "5 PM Singapore",
    hour: 9,
    minute: 0,
};

pub const DAILY_EVENTS: [ScheduleTime; 2] = [DEPLOYMENT, COLLECTION];

impl ScheduleTime {
    fn seconds_of_day(&self) -> i64 {
        i64::from(self.hour) * 3600 + i64::from(self.minute) * 60
    }

    /// `(T - now) mod 24h` at whole-second resolution, always in `[0, 24h)`
    pub fn countdown(&self, now: DateTime<Utc>) -> Duration {
        let now_seconds = i64::from(now.num_seconds_from_midnight());
        Duration::seconds((self.seconds_of_day() - now_seconds).rem_euclid(SECONDS_PER_DAY))
    }

    pub fn next_occurrence(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.countdown(now)
    }

    pub fn utc_label(&self) -> String {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
            .map(|t| t.format("%H:%M UTC").to_string())
            .unwrap_or_else(|| format!("{:02}:{:02} UTC", self.hour, self.minute))
    }
}

/// Render as `H:MM:SS`, dropping sub-second precision
pub fn format_countdown(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
