//! Five-field cron expressions evaluated in UTC.
//!
//! Fields are `minute hour day-of-month month day-of-week`. Each field takes
//! `*`, `n`, `a-b`, `*/s`, `a-b/s`, `n/s` or a comma list of those. Day-of-week
//! accepts 0-7 with both 0 and 7 meaning Sunday. When neither day field starts
//! with `*` a day matches if either one does, otherwise both must match.

use crate::utils::error::{PagesError, Result};
use chrono::{DateTime, Datelike, TimeDelta, TimeZone, Timelike, Utc};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    expression: String,
    minutes: u64,
    hours: u64,
    days_of_month: u64,
    months: u64,
    days_of_week: u64,
    dom_restricted: bool,
    dow_restricted: bool,
}

struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
}

const MINUTE: FieldSpec = FieldSpec { name: "minute", min: 0, max: 59 };
const HOUR: FieldSpec = FieldSpec { name: "hour", min: 0, max: 23 };
const DAY_OF_MONTH: FieldSpec = FieldSpec { name: "day-of-month", min: 1, max: 31 };
const MONTH: FieldSpec = FieldSpec { name: "month", min: 1, max: 12 };
const DAY_OF_WEEK: FieldSpec = FieldSpec { name: "day-of-week", min: 0, max: 7 };

// Leap-day schedules can be up to 8 years apart (e.g. across 2100).
const SEARCH_HORIZON_DAYS: i64 = 366 * 8;

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let error = |reason: String| PagesError::ScheduleError {
            expression: expression.to_string(),
            reason,
        };

        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(error(format!("expected 5 fields, found {}", fields.len())));
        }

        let minutes = parse_field(fields[0], &MINUTE).map_err(error)?;
        let hours = parse_field(fields[1], &HOUR).map_err(error)?;
        let days_of_month = parse_field(fields[2], &DAY_OF_MONTH).map_err(error)?;
        let months = parse_field(fields[3], &MONTH).map_err(error)?;
        let mut days_of_week = parse_field(fields[4], &DAY_OF_WEEK).map_err(error)?;

        // 7 is Sunday as well.
        if days_of_week & (1 << 7) != 0 {
            days_of_week = (days_of_week & !(1 << 7)) | 1;
        }

        Ok(Self {
            expression: fields.join(" "),
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
            dom_restricted: !fields[2].starts_with('*'),
            dow_restricted: !fields[4].starts_with('*'),
        })
    }

    pub fn matches(&self, at: &DateTime<Utc>) -> bool {
        has(self.months, at.month())
            && self.day_matches(at)
            && has(self.hours, at.hour())
            && has(self.minutes, at.minute())
    }

    fn day_matches(&self, at: &DateTime<Utc>) -> bool {
        let dom = has(self.days_of_month, at.day());
        let dow = has(self.days_of_week, at.weekday().num_days_from_sunday());
        // A field written with a leading `*` never widens the other one.
        if self.dom_restricted && self.dow_restricted {
            dom || dow
        } else {
            dom && dow
        }
    }

    /// First matching minute strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut t = after.with_second(0)?.with_nanosecond(0)? + TimeDelta::minutes(1);
        let limit = after + TimeDelta::days(SEARCH_HORIZON_DAYS);

        while t <= limit {
            if !has(self.months, t.month()) {
                let (year, month) = if t.month() == 12 {
                    (t.year() + 1, 1)
                } else {
                    (t.year(), t.month() + 1)
                };
                t = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()?;
                continue;
            }
            if !self.day_matches(&t) {
                t = t.date_naive().succ_opt()?.and_hms_opt(0, 0, 0)?.and_utc();
                continue;
            }
            if !has(self.hours, t.hour()) {
                t = t.with_minute(0)? + TimeDelta::hours(1);
                continue;
            }
            if !has(self.minutes, t.minute()) {
                t += TimeDelta::minutes(1);
                continue;
            }
            return Some(t);
        }

        None
    }

    pub fn upcoming(&self, after: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let mut times = Vec::with_capacity(count);
        let mut cursor = after;
        while times.len() < count {
            match self.next_after(cursor) {
                Some(next) => {
                    times.push(next);
                    cursor = next;
                }
                None => break,
            }
        }
        times
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

fn has(bits: u64, value: u32) -> bool {
    bits & (1u64 << value) != 0
}

fn parse_number(text: &str, spec: &FieldSpec) -> std::result::Result<u32, String> {
    let value: u32 = text
        .parse()
        .map_err(|_| format!("'{}' is not a number in the {} field", text, spec.name))?;
    if value < spec.min || value > spec.max {
        return Err(format!(
            "{} is outside {}-{} in the {} field",
            value, spec.min, spec.max, spec.name
        ));
    }
    Ok(value)
}

fn parse_field(text: &str, spec: &FieldSpec) -> std::result::Result<u64, String> {
    let mut bits = 0u64;

    for part in text.split(',') {
        if part.is_empty() {
            return Err(format!("empty list item in the {} field", spec.name));
        }

        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| format!("invalid step '{}' in the {} field", step, spec.name))?;
                if step == 0 {
                    return Err(format!("step cannot be 0 in the {} field", spec.name));
                }
                (range, Some(step))
            }
            None => (part, None),
        };

        let (low, high) = if range == "*" {
            (spec.min, spec.max)
        } else if let Some((low, high)) = range.split_once('-') {
            (parse_number(low, spec)?, parse_number(high, spec)?)
        } else {
            let value = parse_number(range, spec)?;
            // `n/s` runs from n to the end of the field.
            (value, if step.is_some() { spec.max } else { value })
        };

        if low > high {
            return Err(format!(
                "range {}-{} is reversed in the {} field",
                low, high, spec.name
            ));
        }

        for value in (low..=high).step_by(step.unwrap_or(1) as usize) {
            bits |= 1u64 << value;
        }
    }

    Ok(bits)
}
