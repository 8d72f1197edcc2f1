//! Repeat rules and the occurrence resolver.
//!
//! `annual_offset`, `monthly_position` and `weekly_dayIndex` are computed
//! natively from the schema. `astronomical` rules are delegated to an injected
//! [`AstronomicalEventCalculator`]; `custom` rules are never resolved here and
//! belong to a host-defined resolver outside the engine.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{AlmanacError, Result};
use crate::schema::CalendarSchema;
use crate::timestamp::{
    absolute_day_to_timestamp, compare, timestamp_from_day_of_year, timestamp_to_absolute_day,
    CalendarTimestamp,
};

/// Default maximum number of occurrences returned by range queries.
pub const DEFAULT_RANGE_LIMIT: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AstronomicalSource {
    Sunrise,
    Sunset,
    MoonPhase,
    Eclipse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AstronomicalRule {
    pub source: AstronomicalSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_calendar_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_minutes: Option<i64>,
}

/// Recurrence pattern of an event or phenomenon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RepeatRule {
    /// Once a year on a fixed day of year. Offsets outside the year wrap.
    #[serde(rename = "annual_offset", rename_all = "camelCase")]
    AnnualOffset { offset_day_of_year: i64 },

    /// Once a year on a month/day pair; the day is clamped into the month.
    #[serde(rename = "monthly_position", rename_all = "camelCase")]
    MonthlyPosition { month_id: String, day: u32 },

    /// On a weekday index every `interval` weeks.
    #[serde(rename = "weekly_dayIndex", rename_all = "camelCase")]
    WeeklyDayIndex {
        day_index: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interval: Option<u32>,
    },

    #[serde(rename = "astronomical")]
    Astronomical(AstronomicalRule),

    #[serde(rename = "custom", rename_all = "camelCase")]
    Custom { custom_rule_id: String },
}

impl RepeatRule {
    /// The rule's wire tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            RepeatRule::AnnualOffset { .. } => "annual_offset",
            RepeatRule::MonthlyPosition { .. } => "monthly_position",
            RepeatRule::WeeklyDayIndex { .. } => "weekly_dayIndex",
            RepeatRule::Astronomical(_) => "astronomical",
            RepeatRule::Custom { .. } => "custom",
        }
    }
}

/// Options for range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeOptions {
    /// Maximum number of occurrences to return. Zero returns nothing.
    pub limit: usize,
    /// Whether an occurrence exactly at the range start is included.
    pub include_start: bool,
}

impl Default for RangeOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_RANGE_LIMIT,
            include_start: false,
        }
    }
}

/// Capability that computes astronomical occurrences on a schema.
///
/// Implementations must be side-effect free and reentrant; the engine calls
/// them synchronously and may call them from several threads at once.
pub trait AstronomicalEventCalculator: Send + Sync {
    fn resolve_next_occurrence(
        &self,
        schema: &CalendarSchema,
        calendar_id: &str,
        rule: &AstronomicalRule,
        start: &CalendarTimestamp,
        include_start: bool,
    ) -> Option<CalendarTimestamp>;

    fn resolve_occurrences_in_range(
        &self,
        schema: &CalendarSchema,
        calendar_id: &str,
        rule: &AstronomicalRule,
        range_start: &CalendarTimestamp,
        range_end: &CalendarTimestamp,
        options: &RangeOptions,
    ) -> Vec<CalendarTimestamp>;
}

/// Per-call capability bundle. The default bundle has no calculator, which
/// disables `astronomical` rules.
#[derive(Clone, Copy, Default)]
pub struct RuleServices<'a> {
    pub astronomical: Option<&'a dyn AstronomicalEventCalculator>,
}

impl<'a> RuleServices<'a> {
    pub fn with_astronomical(calculator: &'a dyn AstronomicalEventCalculator) -> Self {
        Self {
            astronomical: Some(calculator),
        }
    }

    fn calculator(&self) -> Result<&'a dyn AstronomicalEventCalculator> {
        self.astronomical
            .ok_or_else(|| AlmanacError::unsupported("astronomical"))
    }
}

/// Find the first occurrence of `rule` after `start` (or at `start` when
/// `include_start` is set).
///
/// Returns `Ok(None)` only when an astronomical calculator reports no further
/// occurrence; native rules always produce a next date.
pub fn next_occurrence(
    schema: &CalendarSchema,
    calendar_id: &str,
    rule: &RepeatRule,
    start: &CalendarTimestamp,
    include_start: bool,
    services: &RuleServices<'_>,
) -> Result<Option<CalendarTimestamp>> {
    match rule {
        RepeatRule::AnnualOffset { offset_day_of_year } => {
            next_annual(schema, calendar_id, *offset_day_of_year, start, include_start).map(Some)
        }
        RepeatRule::MonthlyPosition { month_id, day } => {
            next_monthly(schema, calendar_id, month_id, *day, start, include_start).map(Some)
        }
        RepeatRule::WeeklyDayIndex {
            day_index,
            interval,
        } => next_weekly(
            schema,
            calendar_id,
            *day_index,
            interval.unwrap_or(1),
            start,
            include_start,
        )
        .map(Some),
        RepeatRule::Astronomical(astronomical) => {
            let calculator = services.calculator()?;
            trace!(source = ?astronomical.source, "delegating to astronomical calculator");
            Ok(calculator.resolve_next_occurrence(
                schema,
                calendar_id,
                astronomical,
                start,
                include_start,
            ))
        }
        RepeatRule::Custom { .. } => Err(AlmanacError::unsupported(rule.type_name())),
    }
}

/// Enumerate occurrences of `rule` between two timestamps, inclusive of the
/// range end.
///
/// Reversed bounds are swapped. Iteration stops at `options.limit`, past the
/// range end, or as soon as the rule stops moving forward.
pub fn occurrences_in_range(
    schema: &CalendarSchema,
    calendar_id: &str,
    rule: &RepeatRule,
    range_start: &CalendarTimestamp,
    range_end: &CalendarTimestamp,
    options: &RangeOptions,
    services: &RuleServices<'_>,
) -> Result<Vec<CalendarTimestamp>> {
    if options.limit == 0 {
        return Ok(Vec::new());
    }

    let (start, end) = match compare(schema, range_start, range_end) {
        Ordering::Greater => (range_end, range_start),
        _ => (range_start, range_end),
    };

    if let RepeatRule::Astronomical(astronomical) = rule {
        let calculator = services.calculator()?;
        let mut occurrences = calculator.resolve_occurrences_in_range(
            schema,
            calendar_id,
            astronomical,
            start,
            end,
            options,
        );
        occurrences.truncate(options.limit);
        return Ok(occurrences);
    }

    let mut occurrences = Vec::new();
    let mut cursor = next_occurrence(
        schema,
        calendar_id,
        rule,
        start,
        options.include_start,
        services,
    )?;

    while let Some(current) = cursor {
        if compare(schema, &current, end) == Ordering::Greater {
            break;
        }
        occurrences.push(current.clone());
        if occurrences.len() >= options.limit {
            break;
        }

        let next = next_occurrence(schema, calendar_id, rule, &current, false, services)?;
        if let Some(candidate) = &next {
            if compare(schema, candidate, &current) != Ordering::Greater {
                debug!(
                    rule = rule.type_name(),
                    year = candidate.year,
                    month = %candidate.month_id,
                    day = candidate.day,
                    "repeat rule stopped advancing; ending range expansion"
                );
                break;
            }
        }
        cursor = next;
    }

    Ok(occurrences)
}

fn is_next(ordering: Ordering, include_start: bool) -> bool {
    ordering == Ordering::Greater || (ordering == Ordering::Equal && include_start)
}

fn next_annual(
    schema: &CalendarSchema,
    calendar_id: &str,
    offset_day_of_year: i64,
    start: &CalendarTimestamp,
    include_start: bool,
) -> Result<CalendarTimestamp> {
    let total_days = schema.total_days_in_year();
    if total_days <= 0 {
        return Err(AlmanacError::InvalidRepeatRule(format!(
            "calendar schema {} has no days configured",
            schema.id
        )));
    }

    let day_of_year = (offset_day_of_year - 1).rem_euclid(total_days) + 1;
    let candidate = timestamp_from_day_of_year(schema, calendar_id, start.year, day_of_year)?;
    if is_next(compare(schema, &candidate, start), include_start) {
        return Ok(candidate);
    }
    timestamp_from_day_of_year(schema, calendar_id, following_year(schema, start)?, day_of_year)
}

fn next_monthly(
    schema: &CalendarSchema,
    calendar_id: &str,
    month_id: &str,
    day: u32,
    start: &CalendarTimestamp,
    include_start: bool,
) -> Result<CalendarTimestamp> {
    let day = schema.clamp_day_to_month(month_id, day)?;
    let candidate = CalendarTimestamp::day(calendar_id, start.year, month_id, day);
    if is_next(compare(schema, &candidate, start), include_start) {
        return Ok(candidate);
    }
    Ok(CalendarTimestamp::day(
        calendar_id,
        following_year(schema, start)?,
        month_id,
        day,
    ))
}

fn following_year(schema: &CalendarSchema, start: &CalendarTimestamp) -> Result<i64> {
    start
        .year
        .checked_add(1)
        .ok_or_else(|| AlmanacError::overflow(&schema.id, "year"))
}

/// Weekly resolution on absolute day indices.
///
/// Hits fall on the target weekday of weeks whose number, counted from the
/// first day of the epoch year, is a multiple of `interval`. The grid is fixed,
/// so every query window sees the same dates for a rule.
fn next_weekly(
    schema: &CalendarSchema,
    calendar_id: &str,
    day_index: i64,
    interval: u32,
    start: &CalendarTimestamp,
    include_start: bool,
) -> Result<CalendarTimestamp> {
    if schema.total_days_in_year() <= 0 {
        return Err(AlmanacError::InvalidRepeatRule(format!(
            "calendar schema {} has no days configured",
            schema.id
        )));
    }
    let days_per_week = i64::from(schema.days_per_week);
    if days_per_week == 0 {
        return Err(AlmanacError::InvalidRepeatRule(format!(
            "calendar schema {} has zero days per week",
            schema.id
        )));
    }
    if day_index < 0 || day_index >= days_per_week {
        return Err(AlmanacError::InvalidRepeatRule(format!(
            "dayIndex {} is out of range 0..{} for schema {}",
            day_index, days_per_week, schema.id
        )));
    }

    let interval = i64::from(interval.max(1));
    let absolute_start = timestamp_to_absolute_day(schema, start)?;
    let weekday = absolute_start.rem_euclid(days_per_week);
    let delta = (day_index - weekday).rem_euclid(days_per_week);
    let step = |day: i64, days: i64| {
        day.checked_add(days)
            .ok_or_else(|| AlmanacError::overflow(&schema.id, "weekly step"))
    };

    let mut candidate = step(absolute_start, delta)?;
    if delta == 0 {
        let same_day = absolute_day_to_timestamp(schema, calendar_id, absolute_start)?;
        if !is_next(compare(schema, &same_day, start), include_start) {
            candidate = step(candidate, days_per_week)?;
        }
    }
    let misalignment = candidate.div_euclid(days_per_week).rem_euclid(interval);
    if misalignment != 0 {
        candidate = step(candidate, (interval - misalignment) * days_per_week)?;
    }

    absolute_day_to_timestamp(schema, calendar_id, candidate)
}
