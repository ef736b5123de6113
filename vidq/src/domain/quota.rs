//! Quota clock: when the daily upload quota resets.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Computes reset deadlines as local midnight in a fixed reference zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaClock {
    tz: Tz,
}

impl Default for QuotaClock {
    /// The YouTube Data API resets quotas at midnight Pacific Time.
    fn default() -> Self {
        Self::new(chrono_tz::America::Los_Angeles)
    }
}

impl QuotaClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn time_zone(&self) -> Tz {
        self.tz
    }

    /// The first local midnight strictly after `now`.
    pub fn next_reset(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut date = now.with_timezone(&self.tz).date_naive();
        loop {
            date = match date.succ_opt() {
                Some(next) => next,
                None => return DateTime::<Utc>::MAX_UTC,
            };
            if let Some(midnight) = self.start_of_day(date) {
                if midnight > now {
                    return midnight;
                }
            }
        }
    }

    /// Time left until [`Self::next_reset`].
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Duration {
        (self.next_reset(now) - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// First instant of `date` in the reference zone. Zones that skip
    /// midnight on a transition day start at the first hour that exists.
    fn start_of_day(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        (0..3).find_map(|hour| {
            let local = date.and_hms_opt(hour, 0, 0)?;
            self.tz
                .from_local_datetime(&local)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
        })
    }
}
