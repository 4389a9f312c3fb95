//! The single entry point for "what day is it" in any given timezone.
//! Nothing else in the core calls `Utc::now()` with an implicit zone.

use chrono::{NaiveDate, Utc};

/// Returns the current calendar date in `zone`. Falls back to UTC if `zone`
/// is blank or not a recognised IANA name — callers are never blocked on a
/// bad timezone string.
pub fn user_today(zone: &str) -> NaiveDate {
    if zone.trim().is_empty() {
        return Utc::now().date_naive();
    }
    match zone.parse::<chrono_tz::Tz>() {
        Ok(tz) => Utc::now().with_timezone(&tz).date_naive(),
        Err(_) => Utc::now().date_naive(),
    }
}

pub fn validate_zone(zone: &str) -> bool {
    zone.parse::<chrono_tz::Tz>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_zone_falls_back_to_utc() {
        assert_eq!(user_today(""), Utc::now().date_naive());
    }

    #[test]
    fn invalid_zone_falls_back_to_utc() {
        assert_eq!(user_today("Not/AZone"), Utc::now().date_naive());
    }

    #[test]
    fn known_zone_validates() {
        assert!(validate_zone("Europe/Moscow"));
        assert!(!validate_zone("Europe/Nowhere"));
    }
}
