use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::parsing::ExperienceEntry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalExperience {
    pub years: u32,
    pub months: u32,
    pub formatted: String,
}

struct DurationPatterns {
    years: Regex,
    months: Regex,
    start_year: Regex,
}

fn patterns() -> &'static DurationPatterns {
    static PATTERNS: OnceLock<DurationPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| DurationPatterns {
        years: Regex::new(r"(\d+)\s*(?:year|yr|y)").expect("static regex"),
        months: Regex::new(r"(\d+)\s*(?:month|mo|m)").expect("static regex"),
        start_year: Regex::new(r"(\d{4})").expect("static regex"),
    })
}

fn first_number(re: &Regex, text: &str) -> Option<i64> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Months contributed by one free-text duration such as `"2 years 3 months"` or
/// `"2019 - Present"`. Year and month mentions are counted independently; an ongoing
/// role adds the span from its start year to `today`.
fn duration_months(duration: &str, today: NaiveDate) -> i64 {
    let duration = duration.to_lowercase();
    let p = patterns();

    let mut months = 0;
    if let Some(years) = first_number(&p.years, &duration) {
        months += years * 12;
    }
    if let Some(m) = first_number(&p.months, &duration) {
        months += m;
    }
    if duration.contains("present") || duration.contains("current") {
        if let Some(start) = first_number(&p.start_year, &duration) {
            months += (today.year() as i64 - start) * 12 + today.month() as i64;
        }
    }
    months
}

fn plural(n: u32, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// Sums every entry's duration. Unrecognized durations (including `"N/A"`) add nothing.
pub fn total_experience(entries: &[ExperienceEntry], today: NaiveDate) -> TotalExperience {
    let total: i64 = entries
        .iter()
        .map(|e| duration_months(&e.duration, today))
        .sum();
    let total = total.clamp(0, u32::MAX as i64) as u32;

    let years = total / 12;
    let months = total % 12;
    TotalExperience {
        years,
        months,
        formatted: format!("{} {}", plural(years, "year"), plural(months, "month")),
    }
}
