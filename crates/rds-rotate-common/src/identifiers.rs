//! Date-derived replica identifiers
//!
//! Replicas are named `<base>-YYYYMMDD` after the day they were cloned, in a
//! fixed reference timezone so the date boundary does not depend on where the
//! rotation happens to run.

use crate::defaults::DEFAULT_UTC_OFFSET_HOURS;
use chrono::{FixedOffset, NaiveDate, Offset, Utc};

/// Format of the date suffix
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Source of "today" for identifier computation
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock in a fixed UTC offset
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// `None` if the offset is outside +/-23 hours
    pub fn with_utc_offset_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours * 3600).map(Self::new)
    }
}

impl Default for SystemClock {
    /// UTC+09:00
    fn default() -> Self {
        Self::with_utc_offset_hours(DEFAULT_UTC_OFFSET_HOURS).unwrap_or_else(|| Self::new(Utc.fix()))
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

/// Clock pinned to one date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// `<base>-YYYYMMDD`
pub fn dated_identifier(base: &str, date: NaiveDate) -> String {
    format!("{}-{}", base, date.format(DATE_FORMAT))
}

/// Identifiers for one rotation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationIdentifiers {
    /// Replica to provision today
    pub target: String,
    /// Yesterday's replica, retired at the end of the run
    pub stale: Option<String>,
}

impl RotationIdentifiers {
    pub fn compute(base: &str, today: NaiveDate) -> Self {
        let target = dated_identifier(base, today);
        let stale = today
            .pred_opt()
            .map(|yesterday| dated_identifier(base, yesterday))
            .filter(|stale| *stale != target);
        Self { target, stale }
    }
}
