use anyhow::Context;
use chrono::NaiveDate;
use regex::Regex;

/// Parses "4:30 AM", "4:30AM" or "16:30" into (hour, minute). Returns
/// `None` for anything that is not a clock time.
pub fn parse_clock(token: &str) -> Option<(u32, u32)> {
    let clock_re = Regex::new(
        r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<ampm>[ap]m)?$",
    )
    .ok()?;
    let captures = clock_re.captures(token.trim())?;

    let raw_hour = captures.name("hour")?.as_str().parse::<u32>().ok()?;
    let minute = captures.name("minute")?.as_str().parse::<u32>().ok()?;
    if minute > 59 {
        return None;
    }

    let hour = if let Some(ampm_match) = captures.name("ampm") {
        let ampm = ampm_match.as_str().to_ascii_lowercase();
        if raw_hour == 0 || raw_hour > 12 {
            return None;
        }
        match ampm.as_str() {
            "am" => {
                if raw_hour == 12 {
                    0
                } else {
                    raw_hour
                }
            }
            "pm" => {
                if raw_hour == 12 {
                    12
                } else {
                    raw_hour + 12
                }
            }
            _ => return None,
        }
    } else {
        if raw_hour > 23 {
            return None;
        }
        raw_hour
    };

    Some((hour, minute))
}

pub fn clock_minutes(token: &str) -> Option<u32> {
    parse_clock(token).map(|(h, m)| h * 60 + m)
}

#[must_use]
pub fn format_clock(hour: u32, minute: u32) -> String {
    let period = if hour >= 12 { "PM" } else { "AM" };
    let display_hour = match hour % 12 {
        0 => 12,
        other => other,
    };
    format!("{display_hour}:{minute:02} {period}")
}

/// The calendar widget hands over local dates as ISO `YYYY-MM-DD`; the
/// value is stored as-is and only formatted for display.
pub fn parse_deadline(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date: {raw} (expected YYYY-MM-DD)"))
}

#[must_use]
pub fn format_deadline(date: NaiveDate) -> String {
    date.format("%b %d").to_string()
}

#[must_use]
pub fn format_duration(minutes: u32) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::{clock_minutes, format_clock, format_duration, parse_clock, parse_deadline};

    #[test]
    fn parses_twelve_hour_clock() {
        assert_eq!(parse_clock("4:30 AM"), Some((4, 30)));
        assert_eq!(parse_clock("4:30pm"), Some((16, 30)));
        assert_eq!(parse_clock("12:00 AM"), Some((0, 0)));
        assert_eq!(parse_clock("12:15 PM"), Some((12, 15)));
    }

    #[test]
    fn parses_twenty_four_hour_clock() {
        assert_eq!(parse_clock("16:05"), Some((16, 5)));
        assert_eq!(parse_clock("0:00"), Some((0, 0)));
    }

    #[test]
    fn rejects_out_of_range_clock() {
        assert_eq!(parse_clock("25:00"), None);
        assert_eq!(parse_clock("13:00 PM"), None);
        assert_eq!(parse_clock("9:61"), None);
        assert_eq!(parse_clock("coffee"), None);
    }

    #[test]
    fn clock_minutes_counts_from_midnight() {
        assert_eq!(clock_minutes("1:30 AM"), Some(90));
        assert_eq!(clock_minutes("23:59"), Some(1439));
    }

    #[test]
    fn formats_clock_in_twelve_hour_style() {
        assert_eq!(format_clock(0, 5), "12:05 AM");
        assert_eq!(format_clock(13, 0), "1:00 PM");
        assert_eq!(format_clock(12, 30), "12:30 PM");
    }

    #[test]
    fn deadline_round_trips_iso_dates() {
        let date = parse_deadline("2026-08-09").expect("parse date");
        assert_eq!(date.to_string(), "2026-08-09");
        assert!(parse_deadline("09/08/2026").is_err());
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(465), "7h 45m");
        assert_eq!(format_duration(0), "0h 0m");
    }
}
