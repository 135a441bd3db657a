//! Delivery-cycle date handling. Mealdrop deliveries align to a weekly cycle
//! anchored on a fixed weekday; tools that take no date default to the next
//! occurrence of that weekday.

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};

use crate::errors::GatewayError;

/// The weekday the delivery cycle is anchored on.
pub const DELIVERY_WEEKDAY: Weekday = Weekday::Mon;

/// The next occurrence of the delivery weekday on or after `today`.
pub fn next_delivery_date(today: NaiveDate) -> NaiveDate {
    let days_ahead = (DELIVERY_WEEKDAY.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    today + Duration::days(days_ahead)
}

/// Resolve an optional `YYYY-MM-DD` parameter, defaulting per the cycle.
pub fn resolve_date(date: Option<&str>) -> Result<NaiveDate, GatewayError> {
    match date {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            GatewayError::Precondition(format!("invalid date '{raw}', expected YYYY-MM-DD"))
        }),
        None => Ok(next_delivery_date(Utc::now().date_naive())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2026-08-24", "2026-08-24")] // a Monday maps to itself
    #[case("2026-08-25", "2026-08-31")]
    #[case("2026-08-30", "2026-08-31")]
    fn it_finds_the_next_cycle_date(#[case] today: &str, #[case] expected: &str) {
        let today = NaiveDate::parse_from_str(today, "%Y-%m-%d").expect("date");
        let expected = NaiveDate::parse_from_str(expected, "%Y-%m-%d").expect("date");
        assert_eq!(next_delivery_date(today), expected);
    }

    #[test]
    fn explicit_dates_are_parsed() {
        let date = resolve_date(Some("2026-09-07")).expect("valid date");
        assert_eq!(date.to_string(), "2026-09-07");
    }

    #[test]
    fn malformed_dates_are_a_precondition_failure() {
        let error = resolve_date(Some("next tuesday")).expect_err("must fail");
        assert!(matches!(error, GatewayError::Precondition(_)));
    }
}
