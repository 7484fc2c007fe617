//! Fixed resort price tables. All amounts are whole pesos.

use super::repo_types::{Cottage, VisitTime};

/// Guests included in the base rate.
pub const BASE_CAPACITY: i32 = 4;
pub const EXTRA_GUEST_RATE: i64 = 100;

/// Per-head entrance price for (adult, kid).
pub fn entrance_rates(visit_time: Option<VisitTime>) -> (i64, i64) {
    match visit_time {
        Some(VisitTime::Morning) => (70, 60),
        Some(VisitTime::Night) => (120, 100),
        None => (0, 0),
    }
}

pub fn entrance_fee(visit_time: Option<VisitTime>, adults: i32, kids: i32) -> i64 {
    let (adult, kid) = entrance_rates(visit_time);
    i64::from(adults.max(0)) * adult + i64::from(kids.max(0)) * kid
}

pub fn cottage_fee(cottage: Option<Cottage>) -> i64 {
    match cottage {
        Some(Cottage::Tropahan) => 300,
        Some(Cottage::Barkads) => 400,
        Some(Cottage::Family) => 500,
        None => 0,
    }
}

pub fn extra_guest_charge(guests: i32) -> i64 {
    (i64::from(guests) - i64::from(BASE_CAPACITY)).max(0) * EXTRA_GUEST_RATE
}

pub fn total(entrance_fee: i64, cottage_fee: i64, extra_guest_charge: i64) -> i64 {
    entrance_fee + cottage_fee + extra_guest_charge
}

/// Head count used for the extra guest charge.
///
/// An explicit adult/kid split wins over `guest_count`; with neither the
/// booking counts as one guest. `None` when the split does not fit an `i32`.
pub fn guest_count(adults: Option<i32>, kids: Option<i32>, guest_count: Option<i32>) -> Option<i32> {
    if adults.is_some() || kids.is_some() {
        adults.unwrap_or(0).checked_add(kids.unwrap_or(0))
    } else {
        Some(guest_count.unwrap_or(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fees {
    pub entrance_fee: i64,
    pub cottage_fee: i64,
    pub extra_guest_charge: i64,
}

impl Fees {
    pub fn compute(
        visit_time: Option<VisitTime>,
        cottage: Option<Cottage>,
        adults: i32,
        kids: i32,
        guests: i32,
    ) -> Self {
        Self {
            entrance_fee: entrance_fee(visit_time, adults, kids),
            cottage_fee: cottage_fee(cottage),
            extra_guest_charge: extra_guest_charge(guests),
        }
    }

    pub fn total(&self) -> i64 {
        total(self.entrance_fee, self.cottage_fee, self.extra_guest_charge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_guest_charge_is_hundred_per_head_over_four() {
        assert_eq!(extra_guest_charge(0), 0);
        assert_eq!(extra_guest_charge(1), 0);
        assert_eq!(extra_guest_charge(4), 0);
        assert_eq!(extra_guest_charge(5), 100);
        assert_eq!(extra_guest_charge(9), 500);
        assert_eq!(extra_guest_charge(i32::MIN), 0);
        assert_eq!(
            extra_guest_charge(i32::MAX),
            (i64::from(i32::MAX) - 4) * EXTRA_GUEST_RATE
        );
    }

    #[test]
    fn entrance_fee_follows_visit_time_table() {
        assert_eq!(entrance_fee(Some(VisitTime::Morning), 2, 1), 2 * 70 + 60);
        assert_eq!(entrance_fee(Some(VisitTime::Night), 2, 1), 2 * 120 + 100);
        assert_eq!(entrance_fee(None, 5, 5), 0);
        assert_eq!(entrance_fee(Some(VisitTime::Night), -3, 0), 0);
    }

    #[test]
    fn cottage_fee_table() {
        assert_eq!(cottage_fee(Some(Cottage::Tropahan)), 300);
        assert_eq!(cottage_fee(Some(Cottage::Barkads)), 400);
        assert_eq!(cottage_fee(Some(Cottage::Family)), 500);
        assert_eq!(cottage_fee(None), 0);
    }

    #[test]
    fn guest_count_prefers_split() {
        assert_eq!(guest_count(Some(3), Some(2), Some(1)), Some(5));
        assert_eq!(guest_count(Some(3), None, Some(10)), Some(3));
        assert_eq!(guest_count(None, None, Some(7)), Some(7));
        assert_eq!(guest_count(None, None, None), Some(1));
    }

    #[test]
    fn guest_count_split_that_overflows_is_none() {
        assert_eq!(guest_count(Some(i32::MAX), Some(1), None), None);
        assert_eq!(guest_count(Some(i32::MAX), Some(0), None), Some(i32::MAX));
    }

    #[test]
    fn fees_compose() {
        let fees = Fees::compute(Some(VisitTime::Morning), Some(Cottage::Family), 4, 2, 6);
        assert_eq!(
            fees,
            Fees {
                entrance_fee: 4 * 70 + 2 * 60,
                cottage_fee: 500,
                extra_guest_charge: 200,
            }
        );
        assert_eq!(fees.total(), 400 + 500 + 200);
    }
}
