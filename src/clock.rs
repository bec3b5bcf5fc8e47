// src/clock.rs

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Weekday};
use serde::Deserialize;

/// Which report a run is after. Built once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportIdentity {
    /// Day the portal makes the report available.
    pub publish_date: NaiveDate,
    /// "As of" date embedded in every file and blob name.
    pub filename_date: NaiveDate,
    pub base_name: String,
}

/// Weekly release cadence: the report appears on `publish_weekday` and is
/// named after the day `cadence_offset_days` earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportClock {
    pub publish_weekday: Weekday,
    pub cadence_offset_days: u32,
}

impl Default for ReportClock {
    fn default() -> Self {
        // released on Mondays, named after the previous Friday
        Self {
            publish_weekday: Weekday::Mon,
            cadence_offset_days: 3,
        }
    }
}

impl ReportClock {
    pub fn new(publish_weekday: Weekday, cadence_offset_days: u32) -> Self {
        Self {
            publish_weekday,
            cadence_offset_days,
        }
    }

    /// The report due at `now`: the latest publish weekday on or before `now`.
    pub fn target_identity(&self, now: NaiveDateTime, base_name: &str) -> ReportIdentity {
        let publish_date = latest_weekday_on_or_before(now.date(), self.publish_weekday);
        let filename_date = publish_date - TimeDelta::days(i64::from(self.cadence_offset_days));

        ReportIdentity {
            publish_date,
            filename_date,
            base_name: base_name.to_string(),
        }
    }
}

/// Most recent `weekday` on or before `date`; `date` itself when it matches.
pub fn latest_weekday_on_or_before(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let today = date.weekday().num_days_from_monday();
    let wanted = weekday.num_days_from_monday();
    let back = (today + 7 - wanted) % 7;
    date - TimeDelta::days(i64::from(back))
}
