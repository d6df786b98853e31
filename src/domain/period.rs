//! Local calendar periods and data windows for reviews.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::domain::types::ReviewType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

/// The calendar period a review counts against for the "already completed"
/// rule. `start` is inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewPeriod {
    pub first_day: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReviewPeriod {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Trailing data window ending at "now": `days` local days including today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewWindow {
    pub today: NaiveDate,
    pub days: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Maps instants onto the user's local calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    tz: Tz,
    week_start: WeekStart,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new(Tz::UTC, WeekStart::Monday)
    }
}

impl Calendar {
    pub fn new(tz: Tz, week_start: WeekStart) -> Self {
        Self { tz, week_start }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.tz).date_naive()
    }

    pub fn period_containing(&self, review_type: ReviewType, at: DateTime<Utc>) -> ReviewPeriod {
        let date = self.local_date(at);
        let first_day = match review_type {
            ReviewType::Daily => date,
            ReviewType::Weekly => {
                let offset = match self.week_start {
                    WeekStart::Monday => date.weekday().num_days_from_monday(),
                    WeekStart::Sunday => date.weekday().num_days_from_sunday(),
                };
                date - Duration::days(i64::from(offset))
            }
        };
        let last_day = first_day + Duration::days(i64::from(review_type.window_days()));

        ReviewPeriod {
            first_day,
            start: self.local_midnight(first_day),
            end: self.local_midnight(last_day),
        }
    }

    pub fn trailing_window(&self, review_type: ReviewType, now: DateTime<Utc>) -> ReviewWindow {
        let today = self.local_date(now);
        let days = review_type.window_days();
        let first_day = today - Duration::days(i64::from(days) - 1);

        ReviewWindow {
            today,
            days,
            start: self.local_midnight(first_day),
            end: now,
        }
    }

    /// Start of `date` in the local zone, as UTC. When a DST jump skips
    /// midnight the first existing instant of the day is used.
    pub fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        (0..=3)
            .find_map(|hours| {
                self.tz
                    .from_local_datetime(&(midnight + Duration::hours(hours)))
                    .earliest()
            })
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }
}
