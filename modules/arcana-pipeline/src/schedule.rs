//! Publish-slot timing.
//!
//! Hours are wall-clock hours of the host, which is expected to run in
//! the site's timezone. Both functions take `now` as a parameter so
//! window and slot behavior is deterministic under test.

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use rand::Rng;

/// Daily slots scheduled posts land in.
const SLOT_HOURS: [u32; 3] = [10, 14, 18];

/// True inside the immediate-publish windows (9-11, 13-15, 17-19).
/// Outside them an immediate publish is deferred to the next slot.
pub fn in_publish_window(now: DateTime<Utc>) -> bool {
    let hour = now.hour();
    (9..11).contains(&hour) || (13..15).contains(&hour) || (17..19).contains(&hour)
}

/// Next slot at 10:00, 14:00, or 18:00, with a random minute so posts do
/// not all land exactly on the hour. Tomorrow's first slot when none
/// remain today.
pub fn next_publish_slot<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> DateTime<Utc> {
    let minute = rng.random_range(0..60u32);

    for hour in SLOT_HOURS {
        let naive = now
            .date_naive()
            .and_hms_opt(hour, minute, 0)
            .expect("slot hour and minute are in range");
        let slot = Utc.from_utc_datetime(&naive);
        if slot > now {
            return slot;
        }
    }

    let naive = (now.date_naive() + Duration::days(1))
        .and_hms_opt(SLOT_HOURS[0], minute, 0)
        .expect("slot hour and minute are in range");
    Utc.from_utc_datetime(&naive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, hour, minute, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn window_boundaries() {
        assert!(!in_publish_window(at(8, 59)));
        assert!(in_publish_window(at(9, 0)));
        assert!(in_publish_window(at(10, 59)));
        assert!(!in_publish_window(at(11, 0)));
        assert!(in_publish_window(at(13, 30)));
        assert!(!in_publish_window(at(15, 0)));
        assert!(in_publish_window(at(18, 59)));
        assert!(!in_publish_window(at(19, 0)));
    }

    #[test]
    fn morning_gets_todays_first_slot() {
        let mut rng = StdRng::seed_from_u64(1);
        let slot = next_publish_slot(at(8, 30), &mut rng);
        assert_eq!(slot.hour(), 10);
        assert_eq!(slot.day(), 7);
        assert!(slot > at(8, 30));
    }

    #[test]
    fn midday_skips_past_slots() {
        let mut rng = StdRng::seed_from_u64(1);
        let slot = next_publish_slot(at(12, 0), &mut rng);
        assert_eq!(slot.hour(), 14);
    }

    #[test]
    fn late_evening_rolls_to_tomorrow() {
        let mut rng = StdRng::seed_from_u64(1);
        let slot = next_publish_slot(at(19, 30), &mut rng);
        assert_eq!(slot.hour(), 10);
        assert_eq!(slot.day(), 8);
    }

    #[test]
    fn slot_is_always_in_the_future() {
        let mut rng = StdRng::seed_from_u64(99);
        for hour in 0..24 {
            let now = at(hour, 59);
            let slot = next_publish_slot(now, &mut rng);
            assert!(slot > now, "slot {slot} not after {now}");
        }
    }
}
