//! Pure date arithmetic for refresh-day keyed budget cycles.

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};

/// Day of month on which a new budget period begins.
///
/// Restricted to days that exist in every calendar month, so period
/// boundaries never need day clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct RefreshDay(u32);

impl RefreshDay {
    pub const SUPPORTED: [u32; 6] = [1, 5, 10, 15, 20, 25];

    pub fn new(day: u32) -> Result<Self> {
        if Self::SUPPORTED.contains(&day) {
            Ok(RefreshDay(day))
        } else {
            Err(EngineError::InvalidRefreshDay(day))
        }
    }

    pub fn day(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for RefreshDay {
    type Error = EngineError;

    fn try_from(day: u32) -> Result<Self> {
        RefreshDay::new(day)
    }
}

impl From<RefreshDay> for u32 {
    fn from(day: RefreshDay) -> u32 {
        day.0
    }
}

/// One budget cycle, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BudgetPeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Period label derived from the end date, e.g. `2024-06`.
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.end.year(), self.end.month())
    }

    /// True once the whole period lies in the past relative to `date`.
    pub fn closed_at(&self, date: NaiveDate) -> bool {
        self.end < date
    }
}

/// Stateless calculator for refresh-day keyed periods.
pub struct PeriodCalculator;

impl PeriodCalculator {
    /// Returns the period anchored at `refresh_day` of the given month.
    ///
    /// The cycle runs from the refresh day through the day before the
    /// refresh day of the following month; with refresh day 1 that is
    /// exactly the calendar month.
    pub fn period_for(year: i32, month: u32, refresh_day: RefreshDay) -> Result<BudgetPeriod> {
        let start = NaiveDate::from_ymd_opt(year, month, refresh_day.day())
            .ok_or_else(|| EngineError::PeriodNotFound(format!("{year}-{month:02}")))?;
        let (next_year, next_month) = month_after(year, month);
        let next_start = NaiveDate::from_ymd_opt(next_year, next_month, refresh_day.day())
            .ok_or_else(|| EngineError::PeriodNotFound(format!("{next_year}-{next_month:02}")))?;
        Ok(BudgetPeriod {
            start,
            end: next_start - Duration::days(1),
        })
    }

    /// Returns the period containing `date`.
    ///
    /// A date before the refresh day belongs to the previous calendar
    /// month's cycle: the cycle for month M starts on the refresh day of
    /// M and runs into M+1.
    pub fn current_period(date: NaiveDate, refresh_day: RefreshDay) -> Result<BudgetPeriod> {
        let (year, month) = if date.day() < refresh_day.day() {
            month_before(date.year(), date.month())
        } else {
            (date.year(), date.month())
        };
        Self::period_for(year, month, refresh_day)
    }

    /// Returns the period immediately after `period`, holding the refresh day fixed.
    pub fn next_period(period: &BudgetPeriod, refresh_day: RefreshDay) -> Result<BudgetPeriod> {
        let (year, month) = month_after(period.start.year(), period.start.month());
        Self::period_for(year, month, refresh_day)
    }

    /// Returns the period immediately before `period`, holding the refresh day fixed.
    pub fn previous_period(period: &BudgetPeriod, refresh_day: RefreshDay) -> Result<BudgetPeriod> {
        let (year, month) = month_before(period.start.year(), period.start.month());
        Self::period_for(year, month, refresh_day)
    }

    /// Returns the ordered periods between `last_period_end` and `now`, oldest first.
    ///
    /// The walk starts on the day after `last_period_end` and advances one
    /// whole period per step until `now` is covered, so it runs in
    /// O(number of missing periods). An empty list is returned when
    /// `last_period_end` is not in the past; `limit` bounds the walk so
    /// corrupted input cannot loop forever.
    pub fn missing_periods(
        last_period_end: NaiveDate,
        now: NaiveDate,
        refresh_day: RefreshDay,
        limit: usize,
    ) -> Result<Vec<BudgetPeriod>> {
        if last_period_end >= now {
            return Ok(Vec::new());
        }

        let mut periods = Vec::new();
        let mut seen: HashSet<(i32, u32)> = HashSet::new();
        let mut cursor = last_period_end + Duration::days(1);
        while cursor <= now {
            if periods.len() >= limit {
                return Err(EngineError::BackfillLimitExceeded(limit));
            }
            let period = Self::current_period(cursor, refresh_day)?;
            if seen.insert((period.start.year(), period.start.month())) {
                periods.push(period);
            }
            let next = period.end + Duration::days(1);
            if next <= cursor {
                break;
            }
            cursor = next;
        }
        Ok(periods)
    }
}

fn month_after(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn month_before(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}
