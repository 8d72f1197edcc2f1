//! Calendar timestamps and schema-aware arithmetic.
//!
//! Timestamps are plain values tied to a schema only through their month id.
//! Absolute days count from the first day of the epoch year:
//! `(year - epoch.year) * total_days_in_year + day_of_year - 1`. Days before the
//! epoch year map to negative indices (proleptic extension).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{AlmanacError, Result};
use crate::schema::CalendarSchema;

/// How many of a timestamp's fields are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Day,
    Hour,
    Minute,
}

/// A point on a custom calendar.
///
/// Fields beyond `precision` are treated as zero by every comparison and
/// conversion, whether or not they are set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarTimestamp {
    pub calendar_id: String,
    pub year: i64,
    pub month_id: String,
    pub day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
    pub precision: Precision,
}

impl CalendarTimestamp {
    pub fn day(
        calendar_id: impl Into<String>,
        year: i64,
        month_id: impl Into<String>,
        day: u32,
    ) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            year,
            month_id: month_id.into(),
            day,
            hour: None,
            minute: None,
            precision: Precision::Day,
        }
    }

    pub fn hour(
        calendar_id: impl Into<String>,
        year: i64,
        month_id: impl Into<String>,
        day: u32,
        hour: u32,
    ) -> Self {
        Self {
            hour: Some(hour),
            precision: Precision::Hour,
            ..Self::day(calendar_id, year, month_id, day)
        }
    }

    pub fn minute(
        calendar_id: impl Into<String>,
        year: i64,
        month_id: impl Into<String>,
        day: u32,
        hour: u32,
        minute: u32,
    ) -> Self {
        Self {
            hour: Some(hour),
            minute: Some(minute),
            precision: Precision::Minute,
            ..Self::day(calendar_id, year, month_id, day)
        }
    }

    /// Hour of day, zero when the precision does not reach hours.
    pub fn effective_hour(&self) -> u32 {
        match self.precision {
            Precision::Day => 0,
            Precision::Hour | Precision::Minute => self.hour.unwrap_or(0),
        }
    }

    /// Minute of hour, zero when the precision does not reach minutes.
    pub fn effective_minute(&self) -> u32 {
        match self.precision {
            Precision::Minute => self.minute.unwrap_or(0),
            Precision::Day | Precision::Hour => 0,
        }
    }

    /// Same calendar day as `self`, with this timestamp's precision and
    /// time-of-day carried over from `template`.
    fn with_time_of(&self, template: &CalendarTimestamp) -> CalendarTimestamp {
        let calendar_id = template.calendar_id.clone();
        match template.precision {
            Precision::Day => Self::day(calendar_id, self.year, self.month_id.clone(), self.day),
            Precision::Hour => Self::hour(
                calendar_id,
                self.year,
                self.month_id.clone(),
                self.day,
                template.effective_hour(),
            ),
            Precision::Minute => Self::minute(
                calendar_id,
                self.year,
                self.month_id.clone(),
                self.day,
                template.effective_hour(),
                template.effective_minute(),
            ),
        }
    }
}

/// Total order over timestamps of one schema: year, month position, day, hour,
/// minute.
///
/// Month ids unknown to the schema fall back to lexical ordering.
pub fn compare(schema: &CalendarSchema, a: &CalendarTimestamp, b: &CalendarTimestamp) -> Ordering {
    a.year
        .cmp(&b.year)
        .then_with(|| compare_months(schema, &a.month_id, &b.month_id))
        .then_with(|| compare_time_of_day(a, b))
}

/// Schema-less ordering: calendar id, year, month id (lexical), day, hour,
/// minute. Useful only as a deterministic tie-break across calendars.
pub fn compare_unqualified(a: &CalendarTimestamp, b: &CalendarTimestamp) -> Ordering {
    a.calendar_id
        .cmp(&b.calendar_id)
        .then_with(|| a.year.cmp(&b.year))
        .then_with(|| a.month_id.cmp(&b.month_id))
        .then_with(|| compare_time_of_day(a, b))
}

fn compare_months(schema: &CalendarSchema, a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    match (schema.month_index(a), schema.month_index(b)) {
        (Some(ia), Some(ib)) => ia.cmp(&ib),
        _ => a.cmp(b),
    }
}

fn compare_time_of_day(a: &CalendarTimestamp, b: &CalendarTimestamp) -> Ordering {
    a.day
        .cmp(&b.day)
        .then_with(|| a.effective_hour().cmp(&b.effective_hour()))
        .then_with(|| a.effective_minute().cmp(&b.effective_minute()))
}

/// 1-based day of year of `timestamp`.
pub fn day_of_year(schema: &CalendarSchema, timestamp: &CalendarTimestamp) -> Result<i64> {
    let index = schema
        .month_index(&timestamp.month_id)
        .ok_or_else(|| AlmanacError::unknown_month(&schema.id, &timestamp.month_id))?;
    let month = &schema.months[index];
    if timestamp.day < 1 || timestamp.day > month.length {
        return Err(AlmanacError::DayOutOfRange {
            schema_id: schema.id.clone(),
            month_id: month.id.clone(),
            day: timestamp.day,
            length: month.length,
        });
    }
    let preceding: i64 = schema.months[..index]
        .iter()
        .map(|m| i64::from(m.length))
        .sum();
    Ok(preceding + i64::from(timestamp.day))
}

/// Resolve a 1-based day of year into its month id and day of month.
pub fn resolve_day_of_year(schema: &CalendarSchema, day_of_year: i64) -> Result<(&str, u32)> {
    let total_days = schema.total_days_in_year();
    let out_of_range = || AlmanacError::DayOfYearOutOfRange {
        schema_id: schema.id.clone(),
        day_of_year,
        total_days,
    };
    if day_of_year < 1 || day_of_year > total_days {
        return Err(out_of_range());
    }

    let mut remaining = day_of_year;
    for month in &schema.months {
        let length = i64::from(month.length);
        if remaining <= length {
            // remaining is in 1..=length here, which always fits a u32.
            return Ok((month.id.as_str(), remaining as u32));
        }
        remaining -= length;
    }
    Err(out_of_range())
}

/// Build a day-precision timestamp from a year and 1-based day of year.
pub fn timestamp_from_day_of_year(
    schema: &CalendarSchema,
    calendar_id: &str,
    year: i64,
    day_of_year: i64,
) -> Result<CalendarTimestamp> {
    let (month_id, day) = resolve_day_of_year(schema, day_of_year)?;
    Ok(CalendarTimestamp::day(calendar_id, year, month_id, day))
}

/// Day index of `timestamp` relative to the first day of the epoch year.
pub fn timestamp_to_absolute_day(
    schema: &CalendarSchema,
    timestamp: &CalendarTimestamp,
) -> Result<i64> {
    let days_per_year = schema.days_per_year_checked()?;
    let day_index = day_of_year(schema, timestamp)? - 1;
    timestamp
        .year
        .checked_sub(schema.epoch.year)
        .and_then(|years| years.checked_mul(days_per_year))
        .and_then(|days| days.checked_add(day_index))
        .ok_or_else(|| AlmanacError::overflow(&schema.id, "absolute day"))
}

/// Inverse of [`timestamp_to_absolute_day`]; always returns day precision.
pub fn absolute_day_to_timestamp(
    schema: &CalendarSchema,
    calendar_id: &str,
    absolute_day: i64,
) -> Result<CalendarTimestamp> {
    let days_per_year = schema.days_per_year_checked()?;
    let year_offset = absolute_day.div_euclid(days_per_year);
    let day_index = absolute_day.rem_euclid(days_per_year);
    let year = schema
        .epoch
        .year
        .checked_add(year_offset)
        .ok_or_else(|| AlmanacError::overflow(&schema.id, "year"))?;
    timestamp_from_day_of_year(schema, calendar_id, year, day_index + 1)
}

/// Minutes since the start of the epoch year, using the schema's day length.
pub fn to_absolute_minutes(schema: &CalendarSchema, timestamp: &CalendarTimestamp) -> Result<i64> {
    let time = schema.time_definition_checked()?;
    let absolute_day = timestamp_to_absolute_day(schema, timestamp)?;
    let minute_of_day = i64::from(timestamp.effective_hour()) * i64::from(time.minutes_per_hour)
        + i64::from(timestamp.effective_minute());
    absolute_day
        .checked_mul(time.minutes_per_day())
        .and_then(|minutes| minutes.checked_add(minute_of_day))
        .ok_or_else(|| AlmanacError::overflow(&schema.id, "absolute minutes"))
}

/// Unit for [`advance_time`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Day,
    Hour,
    Minute,
}

/// Outcome of [`advance_time`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceResult {
    pub timestamp: CalendarTimestamp,
    /// A boundary was crossed: a year for day steps, a day for hour steps, an
    /// hour or day for minute steps. Diagnostic only.
    pub normalized: bool,
    /// Whole days carried by an hour step, when non-zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carried_days: Option<i64>,
}

/// Move `current` by `amount` units, carrying into days, months and years.
///
/// Day steps keep the timestamp's precision and time of day. Hour steps return
/// hour precision (minute precision is kept if present). Minute steps always
/// return minute precision.
pub fn advance_time(
    schema: &CalendarSchema,
    current: &CalendarTimestamp,
    amount: i64,
    unit: TimeUnit,
) -> Result<AdvanceResult> {
    match unit {
        TimeUnit::Day => advance_by_days(schema, current, amount),
        TimeUnit::Hour => advance_by_hours(schema, current, amount),
        TimeUnit::Minute => advance_by_minutes(schema, current, amount),
    }
}

fn unchanged(current: &CalendarTimestamp) -> AdvanceResult {
    AdvanceResult {
        timestamp: current.clone(),
        normalized: false,
        carried_days: None,
    }
}

fn advance_by_days(
    schema: &CalendarSchema,
    current: &CalendarTimestamp,
    days: i64,
) -> Result<AdvanceResult> {
    if days == 0 {
        return Ok(unchanged(current));
    }

    let target = timestamp_to_absolute_day(schema, current)?
        .checked_add(days)
        .ok_or_else(|| AlmanacError::overflow(&schema.id, "day step"))?;
    let base = absolute_day_to_timestamp(schema, &current.calendar_id, target)?;
    let normalized = base.year != current.year;
    Ok(AdvanceResult {
        timestamp: base.with_time_of(current),
        normalized,
        carried_days: None,
    })
}

fn advance_by_hours(
    schema: &CalendarSchema,
    current: &CalendarTimestamp,
    hours: i64,
) -> Result<AdvanceResult> {
    if hours == 0 {
        return Ok(unchanged(current));
    }

    let time = schema.time_definition_checked()?;
    let hours_per_day = i64::from(time.hours_per_day);
    let total_hours = i64::from(current.effective_hour())
        .checked_add(hours)
        .ok_or_else(|| AlmanacError::overflow(&schema.id, "hour step"))?;
    // rem_euclid against a u32 divisor always fits back into a u32.
    let wrapped_hour = total_hours.rem_euclid(hours_per_day) as u32;
    let day_shift = total_hours.div_euclid(hours_per_day);

    let base_day = advance_by_days(schema, current, day_shift)?;
    let base = &base_day.timestamp;
    let timestamp = match current.precision {
        Precision::Minute => CalendarTimestamp::minute(
            current.calendar_id.clone(),
            base.year,
            base.month_id.clone(),
            base.day,
            wrapped_hour,
            current.effective_minute(),
        ),
        Precision::Day | Precision::Hour => CalendarTimestamp::hour(
            current.calendar_id.clone(),
            base.year,
            base.month_id.clone(),
            base.day,
            wrapped_hour,
        ),
    };

    Ok(AdvanceResult {
        timestamp,
        normalized: day_shift != 0 || base_day.normalized,
        carried_days: (day_shift != 0).then_some(day_shift),
    })
}

fn advance_by_minutes(
    schema: &CalendarSchema,
    current: &CalendarTimestamp,
    minutes: i64,
) -> Result<AdvanceResult> {
    if minutes == 0 {
        return Ok(unchanged(current));
    }

    let time = schema.time_definition_checked()?;
    let minutes_per_hour = i64::from(time.minutes_per_hour);
    let minutes_per_day = time.minutes_per_day();

    let start_day = timestamp_to_absolute_day(schema, current)?;
    let original_hour = i64::from(current.effective_hour());
    let minute_of_day = original_hour * minutes_per_hour + i64::from(current.effective_minute());
    let total = start_day
        .checked_mul(minutes_per_day)
        .and_then(|total| total.checked_add(minute_of_day))
        .and_then(|total| total.checked_add(minutes))
        .ok_or_else(|| AlmanacError::overflow(&schema.id, "minute step"))?;

    let day_index = total.div_euclid(minutes_per_day);
    let minute_of_day = total.rem_euclid(minutes_per_day);
    let hour = minute_of_day / minutes_per_hour;
    let minute = minute_of_day % minutes_per_hour;

    let base = absolute_day_to_timestamp(schema, &current.calendar_id, day_index)?;
    // Both values are bounded by the schema's u32 granularity fields.
    let timestamp = CalendarTimestamp::minute(
        current.calendar_id.clone(),
        base.year,
        base.month_id,
        base.day,
        hour as u32,
        minute as u32,
    );

    Ok(AdvanceResult {
        timestamp,
        normalized: hour != original_hour || day_index != start_day,
        carried_days: None,
    })
}

/// Human-readable rendering, e.g. `Year 1492, Day 3 of Frostmoon, 07:30`.
///
/// Uses the month's display name when the schema knows the month id.
pub fn format_timestamp(schema: &CalendarSchema, timestamp: &CalendarTimestamp) -> String {
    let month = schema
        .month(&timestamp.month_id)
        .map_or(timestamp.month_id.as_str(), |m| m.name.as_str());
    let date = format!("Year {}, Day {} of {}", timestamp.year, timestamp.day, month);
    match timestamp.precision {
        Precision::Day => date,
        Precision::Hour => format!("{}, {:02}:00", date, timestamp.effective_hour()),
        Precision::Minute => format!(
            "{}, {:02}:{:02}",
            date,
            timestamp.effective_hour(),
            timestamp.effective_minute()
        ),
    }
}
