//! Day counting and half-day slot overlap.
//!
//! Every calendar day has two slots, morning and afternoon. A leave range
//! occupies a set of slots on each day it touches; two ranges conflict when
//! they claim the same slot on the same day. Everything here is pure.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::model::leave_request::{HalfDay, LeaveRequest};

/// Occupied slots of one day, as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slots(u8);

impl Slots {
    pub const MORNING: Slots = Slots(0b01);
    pub const AFTERNOON: Slots = Slots(0b10);
    pub const BOTH: Slots = Slots(0b11);

    pub fn overlaps(self, other: Slots) -> bool {
        self.0 & other.0 != 0
    }
}

/// An inclusive date range with its boundary half-day markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub start_half: HalfDay,
    pub end_half: HalfDay,
}

impl LeaveSpan {
    pub fn new(start: NaiveDate, end: NaiveDate, start_half: HalfDay, end_half: HalfDay) -> Self {
        Self {
            start,
            end,
            start_half,
            end_half,
        }
    }

    /// Slots this span occupies on `day`, assuming `start <= day <= end`.
    pub fn slots_on(&self, day: NaiveDate) -> Slots {
        let is_start = day == self.start;
        let is_end = day == self.end;

        match (is_start, is_end) {
            (true, true) => match (self.start_half, self.end_half) {
                (HalfDay::Morning, HalfDay::Morning) => Slots::MORNING,
                (HalfDay::Afternoon, HalfDay::Afternoon) => Slots::AFTERNOON,
                _ => Slots::BOTH,
            },
            (true, false) if self.start_half == HalfDay::Afternoon => Slots::AFTERNOON,
            (false, true) if self.end_half == HalfDay::Morning => Slots::MORNING,
            _ => Slots::BOTH,
        }
    }

    /// Number of days charged: whole days inclusive, minus half a day for an
    /// afternoon start and for a morning end, never below zero.
    pub fn days(&self) -> Decimal {
        let raw = Decimal::from((self.end - self.start).num_days() + 1);
        let mut total = raw;
        if self.start_half == HalfDay::Afternoon {
            total -= dec!(0.5);
        }
        if self.end_half == HalfDay::Morning {
            total -= dec!(0.5);
        }
        total.max(Decimal::ZERO)
    }
}

impl From<&LeaveRequest> for LeaveSpan {
    fn from(r: &LeaveRequest) -> Self {
        LeaveSpan::new(r.start_date, r.end_date, r.start_half, r.end_half)
    }
}

pub fn calculate_days(span: &LeaveSpan) -> Decimal {
    span.days()
}

/// First day on which `a` and `b` claim a common slot, if any.
pub fn find_conflict(a: &LeaveSpan, b: &LeaveSpan) -> Option<NaiveDate> {
    let from = a.start.max(b.start);
    let to = a.end.min(b.end);
    if from > to {
        return None;
    }

    from.iter_days()
        .take_while(|d| *d <= to)
        .find(|d| a.slots_on(*d).overlaps(b.slots_on(*d)))
}
