use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::db::models::round_money;

/// Minimum lead time between now and check-in for a cancellation.
pub const CANCELLATION_NOTICE_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("Check-out date must be after check-in date")]
    CheckOutNotAfterCheckIn,

    #[error("Check-in date must be in the future")]
    CheckInNotInFuture,
}

/// A half-open `[check_in, check_out)` stay of at least one night.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayDates {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayDates {
    /// Dates for a new or edited booking: ordered, and starting after `today`.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate, today: NaiveDate) -> Result<Self, DateError> {
        let stay = Self::unchecked(check_in, check_out)?;
        if check_in <= today {
            return Err(DateError::CheckInNotInFuture);
        }
        Ok(stay)
    }

    /// Dates for searching; only the ordering is enforced.
    pub fn unchecked(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, DateError> {
        if check_out <= check_in {
            return Err(DateError::CheckOutNotAfterCheckIn);
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Back-to-back stays (one checks out the day the other checks in) do not overlap.
    pub fn overlaps(&self, other: &StayDates) -> bool {
        self.check_in < other.check_out && self.check_out > other.check_in
    }
}

pub fn total_price(price_per_night: Decimal, stay: &StayDates) -> Decimal {
    round_money(price_per_night * Decimal::from(stay.nights()))
}

/// True while check-in is still more than 24 hours away.
pub fn can_cancel(check_in: NaiveDate, check_in_time: NaiveTime, now: NaiveDateTime) -> bool {
    check_in.and_time(check_in_time) > now + Duration::hours(CANCELLATION_NOTICE_HOURS)
}
