pub mod clock;
pub mod config;

use std::hash::Hasher;

use chrono::{Datelike, Timelike};
use chrono_tz::Tz;

use crate::models::EntitySet;

/// Hash a string using xxHash64 for use as cache keys
pub fn hash_string(s: &str) -> u64 {
    let mut hasher = twox_hash::XxHash64::default();
    hasher.write(s.as_bytes());
    hasher.finish()
}

/// Stable fingerprint of (user, entities). Case-sensitive, so "Ana" and
/// "ana" produce different keys, matching the extractor's dedup rule.
pub fn entity_fingerprint(user_id: &str, entities: &EntitySet) -> u64 {
    let mut hasher = twox_hash::XxHash64::default();
    hasher.write(user_id.as_bytes());
    hasher.write_u8(0);
    hasher.write(&serde_json::to_vec(entities).unwrap_or_default());
    hasher.finish()
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.parse::<Tz>().ok()
}

pub fn local_datetime(ts: i64, tz: Tz) -> chrono::DateTime<Tz> {
    chrono::DateTime::from_timestamp(ts, 0)
        .unwrap_or_default()
        .with_timezone(&tz)
}

/// Hour of day (0-23) of a unix timestamp in `tz`.
pub fn local_hour(ts: i64, tz: Tz) -> u32 {
    local_datetime(ts, tz).hour()
}

/// Day of week with Sunday = 0, in `tz`.
pub fn local_weekday(ts: i64, tz: Tz) -> u32 {
    local_datetime(ts, tz).weekday().num_days_from_sunday()
}

/// "9:00 AM" style label for an hour of day.
pub fn time_label(hour: u32) -> String {
    match hour {
        0 => "12:00 AM".to_string(),
        h if h < 12 => format!("{}:00 AM", h),
        12 => "12:00 PM".to_string(),
        h => format!("{}:00 PM", h - 12),
    }
}

/// Truncate to at most `max` chars without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_and_case_sensitive() {
        let mut a = EntitySet::default();
        a.contacts.names.push("Ana".into());
        let mut b = EntitySet::default();
        b.contacts.names.push("ana".into());
        assert_eq!(entity_fingerprint("u1", &a), entity_fingerprint("u1", &a.clone()));
        assert_ne!(entity_fingerprint("u1", &a), entity_fingerprint("u1", &b));
        assert_ne!(entity_fingerprint("u1", &a), entity_fingerprint("u2", &a));
    }

    #[test]
    fn test_time_label() {
        assert_eq!(time_label(0), "12:00 AM");
        assert_eq!(time_label(9), "9:00 AM");
        assert_eq!(time_label(12), "12:00 PM");
        assert_eq!(time_label(15), "3:00 PM");
    }

    #[test]
    fn test_local_hour_respects_timezone() {
        // 2024-01-01T12:00:00Z
        let ts = 1_704_110_400;
        assert_eq!(local_hour(ts, chrono_tz::UTC), 12);
        assert_eq!(local_hour(ts, chrono_tz::America::Argentina::Buenos_Aires), 9);
        // Monday
        assert_eq!(local_weekday(ts, chrono_tz::UTC), 1);
    }

    #[test]
    fn test_truncate_chars_keeps_code_points() {
        assert_eq!(truncate_chars("mañana", 3), "mañ");
        assert_eq!(truncate_chars("hola", 10), "hola");
    }
}
