use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};

use crate::calendar::days_in_month;
use crate::datetime::clock_minutes;

#[derive(Debug, Clone, Copy)]
enum Rule {
    Factor(f64),
    CelsiusToFahrenheit,
}

#[derive(Debug, Clone, Copy)]
pub struct Conversion {
    pub key: &'static str,
    pub label: &'static str,
    pub from: &'static str,
    pub to: &'static str,
    rule: Rule,
}

impl Conversion {
    #[must_use]
    pub fn apply(&self, value: f64) -> f64 {
        match self.rule {
            Rule::Factor(factor) => value * factor,
            Rule::CelsiusToFahrenheit => value * 9.0 / 5.0 + 32.0,
        }
    }
}

pub const CONVERSIONS: &[Conversion] = &[
    Conversion {
        key: "km-mi",
        label: "Kilometers to Miles",
        from: "km",
        to: "miles",
        rule: Rule::Factor(0.621371),
    },
    Conversion {
        key: "ft-in",
        label: "Feet to Inches",
        from: "ft",
        to: "in",
        rule: Rule::Factor(12.0),
    },
    Conversion {
        key: "in-ft",
        label: "Inches to Feet",
        from: "in",
        to: "ft",
        rule: Rule::Factor(1.0 / 12.0),
    },
    Conversion {
        key: "kg-lb",
        label: "Kilograms to Pounds",
        from: "kg",
        to: "lbs",
        rule: Rule::Factor(2.20462),
    },
    Conversion {
        key: "sqm-sqft",
        label: "Square Meters to Square Feet",
        from: "sqm",
        to: "sqft",
        rule: Rule::Factor(10.7639),
    },
    Conversion {
        key: "min-hr",
        label: "Minutes to Hours",
        from: "min",
        to: "hr",
        rule: Rule::Factor(1.0 / 60.0),
    },
    Conversion {
        key: "mb-gb",
        label: "MB to GB",
        from: "MB",
        to: "GB",
        rule: Rule::Factor(1.0 / 1024.0),
    },
    Conversion {
        key: "kph-mph",
        label: "KPH to MPH",
        from: "kph",
        to: "mph",
        rule: Rule::Factor(0.621371),
    },
    Conversion {
        key: "c-f",
        label: "Celsius to Fahrenheit",
        from: "°C",
        to: "°F",
        rule: Rule::CelsiusToFahrenheit,
    },
];

pub fn find_conversion(key: &str) -> Option<&'static Conversion> {
    CONVERSIONS
        .iter()
        .find(|conv| conv.key.eq_ignore_ascii_case(key.trim()))
}

/// Weight in kilograms over height in centimeters.
pub fn bmi(weight_kg: f64, height_cm: f64) -> anyhow::Result<f64> {
    if weight_kg.is_nan() || weight_kg <= 0.0 {
        return Err(anyhow!("weight must be positive"));
    }
    if height_cm.is_nan() || height_cm <= 0.0 {
        return Err(anyhow!("height must be positive"));
    }
    let meters = height_cm / 100.0;
    Ok(weight_kg / (meters * meters))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Low,
    Moderate,
    High,
}

impl Activity {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Activity::Low),
            "moderate" => Some(Activity::Moderate),
            "high" => Some(Activity::High),
            _ => None,
        }
    }
}

/// 35 ml per kg of body weight, topped up for activity, in liters.
pub fn water_intake_liters(weight_kg: f64, activity: Activity) -> anyhow::Result<f64> {
    if weight_kg.is_nan() || weight_kg <= 0.0 {
        return Err(anyhow!("weight must be positive"));
    }
    let mut ml = weight_kg * 35.0;
    ml += match activity {
        Activity::Low => 0.0,
        Activity::Moderate => 350.0,
        Activity::High => 700.0,
    };
    Ok(ml / 1000.0)
}

/// Calendar age in whole years, months and days, borrowing days from the
/// month preceding `today` when needed.
pub fn calendar_age(dob: NaiveDate, today: NaiveDate) -> anyhow::Result<(i32, i32, i32)> {
    if dob > today {
        return Err(anyhow!("birth date is in the future"));
    }

    let mut years = today.year() - dob.year();
    let mut months = today.month() as i32 - dob.month() as i32;
    let mut days = today.day() as i32 - dob.day() as i32;

    if days < 0 {
        months -= 1;
        let (prev_year, prev_month) = if today.month() == 1 {
            (today.year() - 1, 12)
        } else {
            (today.year(), today.month() - 1)
        };
        days += days_in_month(prev_year, prev_month) as i32;
    }
    if months < 0 {
        years -= 1;
        months += 12;
    }

    Ok((years, months, days))
}

/// Minutes slept between bed time and wake time, wrapping past midnight.
pub fn sleep_duration_minutes(bed: &str, wake: &str) -> anyhow::Result<u32> {
    let bed_minutes =
        clock_minutes(bed).ok_or_else(|| anyhow!("invalid bed time: {bed}"))?;
    let wake_minutes =
        clock_minutes(wake).ok_or_else(|| anyhow!("invalid wake time: {wake}"))?;

    let mut total = wake_minutes as i64 - bed_minutes as i64;
    if total < 0 {
        total += 24 * 60;
    }
    Ok(total as u32)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        Activity, bmi, calendar_age, find_conversion, sleep_duration_minutes,
        water_intake_liters,
    };

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn converts_with_fixed_factors() {
        let conv = find_conversion("km-mi").expect("known conversion");
        assert!((conv.apply(10.0) - 6.21371).abs() < 1e-9);

        let conv = find_conversion("mb-gb").expect("known conversion");
        assert!((conv.apply(2048.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn converts_temperature() {
        let conv = find_conversion("c-f").expect("known conversion");
        assert!((conv.apply(0.0) - 32.0).abs() < 1e-9);
        assert!((conv.apply(100.0) - 212.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_conversion_key_is_none() {
        assert!(find_conversion("mi-km").is_none());
    }

    #[test]
    fn bmi_uses_meters_squared() {
        let value = bmi(70.0, 175.0).expect("bmi");
        assert!((value - 22.857).abs() < 0.01);
        assert!(bmi(70.0, 0.0).is_err());
        assert!(bmi(-1.0, 175.0).is_err());
    }

    #[test]
    fn water_intake_scales_with_activity() {
        let low = water_intake_liters(70.0, Activity::Low).expect("low");
        let moderate = water_intake_liters(70.0, Activity::Moderate).expect("moderate");
        let high = water_intake_liters(70.0, Activity::High).expect("high");
        assert!((low - 2.45).abs() < 1e-9);
        assert!((moderate - 2.8).abs() < 1e-9);
        assert!((high - 3.15).abs() < 1e-9);
        assert!(water_intake_liters(0.0, Activity::Low).is_err());
    }

    #[test]
    fn activity_parses_known_levels() {
        assert_eq!(Activity::parse("Moderate"), Some(Activity::Moderate));
        assert_eq!(Activity::parse("intense"), None);
    }

    #[test]
    fn age_borrows_days_and_months() {
        let (years, months, days) =
            calendar_age(date(2000, 8, 31), date(2026, 8, 7)).expect("age");
        assert_eq!((years, months, days), (25, 11, 7));

        let (years, months, days) =
            calendar_age(date(2000, 8, 7), date(2026, 8, 7)).expect("age");
        assert_eq!((years, months, days), (26, 0, 0));
    }

    #[test]
    fn age_rejects_future_birth_dates() {
        assert!(calendar_age(date(2030, 1, 1), date(2026, 8, 7)).is_err());
    }

    #[test]
    fn sleep_duration_wraps_midnight() {
        assert_eq!(
            sleep_duration_minutes("22:30", "6:15 AM").expect("duration"),
            465
        );
        assert_eq!(sleep_duration_minutes("23:00", "23:00").expect("duration"), 0);
        assert!(sleep_duration_minutes("bedtime", "6:15").is_err());
    }
}
