//! Due date parsing and formatting.
//!
//! Due dates are stored as local wall-clock timestamps. Input comes from three
//! places with different shapes: snapshots written by earlier versions
//! (`2024-05-01T10:00`), the task parser (ISO 8601, possibly with offset) and
//! people typing on the command line ("tomorrow", "in 3d", "next friday").

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};

/// Canonical serialized form of a due timestamp.
pub const DUE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A date without a time of day is due at the end of that day.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN))
}

/// Parse a machine-formatted timestamp: RFC 3339, `YYYY-MM-DDTHH:MM[:SS]`,
/// `YYYY-MM-DD HH:MM[:SS]` or a bare `YYYY-MM-DD`.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(end_of_day)
}

/// Parse human-readable due input relative to the current local date.
pub fn parse_due_input(s: &str) -> Option<NaiveDateTime> {
    parse_due_input_at(s, Local::now().date_naive())
}

/// Parse human-readable due input with smart natural language support.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "next monday", "this friday", bare weekday names
/// - "this weekend", "end of week" / "eow", "end of month" / "eom"
/// - "in 3d", "in 2w", "in 1m"
/// - any form accepted by [`parse_timestamp`]
pub fn parse_due_input_at(s: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    if let Some(dt) = parse_timestamp(s) {
        return Some(dt);
    }
    parse_relative_date(&s.trim().to_lowercase(), today).map(end_of_day)
}

fn parse_relative_date(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    match s {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => {
            let (_, end) = start_end_of_week(today);
            return Some(end);
        }
        "end of month" | "eom" => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            let first_of_next = NaiveDate::from_ymd_opt(year, month, 1)?;
            return Some(first_of_next - Duration::days(1));
        }
        "this weekend" | "weekend" => {
            let days_until_saturday = (5 + 7 - today.weekday().num_days_from_monday()) % 7;
            return Some(today + Duration::days(days_until_saturday as i64));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        if let Some(n) = rest.strip_suffix('d') {
            return n.trim().parse::<i64>().ok().map(|d| today + Duration::days(d));
        }
        if let Some(n) = rest.strip_suffix('w') {
            return n.trim().parse::<i64>().ok().map(|w| today + Duration::weeks(w));
        }
        if let Some(n) = rest.strip_suffix('m') {
            // Approximate: 30 days per month
            return n.trim().parse::<i64>().ok().map(|m| today + Duration::days(m * 30));
        }
        return None;
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];
    let current = today.weekday().num_days_from_monday() as i64;
    for (name, target) in weekdays {
        let days_ahead = (target + 7 - current) % 7;
        if s == name || s == format!("this {}", name) {
            return Some(today + Duration::days(days_ahead));
        }
        if s == format!("next {}", name) {
            let days = if days_ahead == 0 { 7 } else { days_ahead + 7 };
            return Some(today + Duration::days(days));
        }
    }
    None
}

/// Start and end dates of the ISO week (Monday to Sunday) containing `today`.
pub fn start_end_of_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    (start, start + Duration::days(6))
}

/// Format a due timestamp relative to `now` ("today 14:00", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<NaiveDateTime>, now: NaiveDateTime) -> String {
    let Some(due) = due else {
        return "-".into();
    };
    let days = (due.date() - now.date()).num_days();
    match days {
        0 if due < now => format!("late {}", due.format("%H:%M")),
        0 => format!("today {}", due.format("%H:%M")),
        1 => "tomorrow".into(),
        d if d > 1 => format!("in {}d", d),
        d => format!("{}d late", -d),
    }
}

/// Full human-readable due timestamp.
pub fn format_due_absolute(due: NaiveDateTime) -> String {
    due.format("%a %d %b %Y %H:%M").to_string()
}

/// Serde adapter for optional due timestamps.
///
/// Writes [`DUE_FORMAT`]; reads anything [`parse_timestamp`] understands and
/// drops values it cannot read instead of rejecting the whole snapshot.
pub mod due_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{parse_timestamp, DUE_FORMAT};

    pub fn serialize<S>(due: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match due {
            Some(d) => serializer.serialize_str(&d.format(DUE_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.and_then(|s| {
            if s.trim().is_empty() {
                return None;
            }
            let parsed = parse_timestamp(&s);
            if parsed.is_none() {
                tracing::warn!(value = %s, "dropping unreadable due date");
            }
            parsed
        }))
    }
}
