//! Calendar events and their concrete occurrences.
//!
//! A single event occurs once at its date. A recurring event delegates to its
//! repeat rule, honours optional bounds, and projects each resolved date
//! through its time policy.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::Result;
use crate::hook::{sort_hooks_by_priority, HookDescriptor};
use crate::policy::{
    project_time_policy, window_from, OccurrenceWindow, PolicySettings, TimeOfDay, TimePolicy,
};
use crate::rule::{next_occurrence, occurrences_in_range, RangeOptions, RepeatRule, RuleServices};
use crate::schema::{CalendarSchema, TimeDefinition};
use crate::timestamp::{compare, CalendarTimestamp, Precision};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Single,
    Recurring,
}

/// Inclusive limits on the dates a recurring event may occur on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<CalendarTimestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<CalendarTimestamp>,
}

impl EventBounds {
    pub fn contains(&self, schema: &CalendarSchema, timestamp: &CalendarTimestamp) -> bool {
        let after_start = self
            .start
            .as_ref()
            .is_none_or(|start| compare(schema, timestamp, start) != Ordering::Less);
        let before_end = self
            .end
            .as_ref()
            .is_none_or(|end| compare(schema, timestamp, end) != Ordering::Greater);
        after_start && before_end
    }

    fn is_past_end(&self, schema: &CalendarSchema, timestamp: &CalendarTimestamp) -> bool {
        self.end
            .as_ref()
            .is_some_and(|end| compare(schema, timestamp, end) == Ordering::Greater)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleSchedule {
    pub date: CalendarTimestamp,
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<TimeOfDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<TimeOfDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    pub time_precision: Precision,
}

impl SingleSchedule {
    /// A schedule on `date`, all-day when the date carries no time of day.
    pub fn on(date: CalendarTimestamp) -> Self {
        Self {
            all_day: date.precision == Precision::Day,
            time_precision: date.precision,
            date,
            start_time: None,
            end_time: None,
            duration_minutes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringSchedule {
    pub rule: RepeatRule,
    pub time_policy: TimePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<TimeOfDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<EventBounds>,
}

impl RecurringSchedule {
    pub fn new(rule: RepeatRule, time_policy: TimePolicy) -> Self {
        Self {
            rule,
            time_policy,
            start_time: None,
            offset_minutes: None,
            duration_minutes: None,
            bounds: None,
        }
    }

    fn policy_settings(&self) -> PolicySettings {
        PolicySettings {
            policy: self.time_policy,
            start_time: self.start_time,
            offset_minutes: self.offset_minutes,
            duration_minutes: self.duration_minutes,
        }
    }

    /// Move a search start forward to the lower bound. The flag reports
    /// whether the bound itself must be treated as inclusive.
    fn clamp_search_start<'a>(
        &'a self,
        schema: &CalendarSchema,
        start: &'a CalendarTimestamp,
    ) -> (&'a CalendarTimestamp, bool) {
        match self.bounds.as_ref().and_then(|b| b.start.as_ref()) {
            Some(lower) if compare(schema, start, lower) == Ordering::Less => (lower, true),
            _ => (start, false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventSchedule {
    Single(SingleSchedule),
    Recurring(RecurringSchedule),
}

/// A stored calendar event. The engine only reads events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub calendar_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<HookDescriptor>,
    #[serde(flatten)]
    pub schedule: EventSchedule,
}

impl CalendarEvent {
    pub fn new(
        id: impl Into<String>,
        calendar_id: impl Into<String>,
        title: impl Into<String>,
        schedule: EventSchedule,
    ) -> Self {
        Self {
            id: id.into(),
            calendar_id: calendar_id.into(),
            title: title.into(),
            description: None,
            category: None,
            tags: Vec::new(),
            priority: None,
            hooks: Vec::new(),
            schedule,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self.schedule {
            EventSchedule::Single(_) => EventKind::Single,
            EventSchedule::Recurring(_) => EventKind::Recurring,
        }
    }

    pub fn priority(&self) -> i32 {
        self.priority.unwrap_or(0)
    }

    /// The date a UI would anchor this event on: the single date, or the
    /// lower bound of a recurring event.
    pub fn anchor_timestamp(&self) -> Option<&CalendarTimestamp> {
        match &self.schedule {
            EventSchedule::Single(single) => Some(&single.date),
            EventSchedule::Recurring(recurring) => {
                recurring.bounds.as_ref().and_then(|b| b.start.as_ref())
            }
        }
    }
}

/// A realized instance of a calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventOccurrence {
    pub event_id: String,
    pub calendar_id: String,
    pub event_type: EventKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub start: CalendarTimestamp,
    pub end: CalendarTimestamp,
    pub duration_minutes: i64,
    pub all_day: bool,
    pub priority: i32,
    /// Sorted by descending hook priority.
    pub hooks: Vec<HookDescriptor>,
}

/// Next occurrence of `event` after `start` (or at `start` with
/// `include_start`).
///
/// Recurring searches begin no earlier than `bounds.start` and return `None`
/// once the rule passes `bounds.end`.
pub fn next_event_occurrence(
    event: &CalendarEvent,
    schema: &CalendarSchema,
    calendar_id: &str,
    start: &CalendarTimestamp,
    include_start: bool,
    services: &RuleServices<'_>,
) -> Result<Option<CalendarEventOccurrence>> {
    match &event.schedule {
        EventSchedule::Single(single) => {
            let ordering = compare(schema, &single.date, start);
            if ordering == Ordering::Greater || (ordering == Ordering::Equal && include_start) {
                return build_single(event, single, schema).map(Some);
            }
            Ok(None)
        }
        EventSchedule::Recurring(recurring) => {
            let (search_start, clamped) = recurring.clamp_search_start(schema, start);
            let first = next_occurrence(
                schema,
                calendar_id,
                &recurring.rule,
                search_start,
                include_start || clamped,
                services,
            )?;
            let Some(base) = first_within_bounds(event, recurring, schema, calendar_id, first, services)?
            else {
                return Ok(None);
            };
            build_recurring(event, recurring, schema, calendar_id, &base).map(Some)
        }
    }
}

/// All occurrences of `event` within a range, capped by `options.limit`.
pub fn event_occurrences_in_range(
    event: &CalendarEvent,
    schema: &CalendarSchema,
    calendar_id: &str,
    range_start: &CalendarTimestamp,
    range_end: &CalendarTimestamp,
    options: &RangeOptions,
    services: &RuleServices<'_>,
) -> Result<Vec<CalendarEventOccurrence>> {
    let (start, end) = match compare(schema, range_start, range_end) {
        Ordering::Greater => (range_end, range_start),
        _ => (range_start, range_end),
    };

    match &event.schedule {
        EventSchedule::Single(single) => {
            if options.limit == 0 {
                return Ok(Vec::new());
            }
            let after_start = compare(schema, &single.date, start);
            let start_ok = after_start == Ordering::Greater
                || (after_start == Ordering::Equal && options.include_start);
            if start_ok && compare(schema, &single.date, end) != Ordering::Greater {
                return Ok(vec![build_single(event, single, schema)?]);
            }
            Ok(Vec::new())
        }
        EventSchedule::Recurring(recurring) => {
            let (search_start, clamped) = recurring.clamp_search_start(schema, start);
            let search_end = match recurring.bounds.as_ref().and_then(|b| b.end.as_ref()) {
                Some(upper) if compare(schema, upper, end) == Ordering::Less => upper,
                _ => end,
            };
            if compare(schema, search_start, search_end) == Ordering::Greater {
                return Ok(Vec::new());
            }

            let rule_options = RangeOptions {
                include_start: options.include_start || clamped,
                ..*options
            };
            let bases = occurrences_in_range(
                schema,
                calendar_id,
                &recurring.rule,
                search_start,
                search_end,
                &rule_options,
                services,
            )?;

            let bounds = recurring.bounds.clone().unwrap_or_default();
            bases
                .iter()
                .filter(|base| bounds.contains(schema, base))
                .map(|base| build_recurring(event, recurring, schema, calendar_id, base))
                .collect()
        }
    }
}

/// Walk the rule cursor until it lands inside the event bounds.
fn first_within_bounds(
    event: &CalendarEvent,
    recurring: &RecurringSchedule,
    schema: &CalendarSchema,
    calendar_id: &str,
    first: Option<CalendarTimestamp>,
    services: &RuleServices<'_>,
) -> Result<Option<CalendarTimestamp>> {
    let Some(bounds) = &recurring.bounds else {
        return Ok(first);
    };

    let mut candidate = first;
    while let Some(current) = candidate {
        if bounds.is_past_end(schema, &current) {
            trace!(event = %event.id, "recurring event exhausted its bounds");
            return Ok(None);
        }
        if bounds.contains(schema, &current) {
            return Ok(Some(current));
        }

        let next = next_occurrence(
            schema,
            calendar_id,
            &recurring.rule,
            &current,
            false,
            services,
        )?;
        if next
            .as_ref()
            .is_some_and(|n| compare(schema, n, &current) != Ordering::Greater)
        {
            return Ok(None);
        }
        candidate = next;
    }
    Ok(None)
}

fn build_single(
    event: &CalendarEvent,
    single: &SingleSchedule,
    schema: &CalendarSchema,
) -> Result<CalendarEventOccurrence> {
    let window = single_window(single, schema)?;
    Ok(occurrence_from(
        event,
        &event.calendar_id,
        EventKind::Single,
        single.all_day,
        window,
    ))
}

fn build_recurring(
    event: &CalendarEvent,
    recurring: &RecurringSchedule,
    schema: &CalendarSchema,
    calendar_id: &str,
    base: &CalendarTimestamp,
) -> Result<CalendarEventOccurrence> {
    let window = project_time_policy(schema, calendar_id, base, &recurring.policy_settings())?;
    Ok(occurrence_from(
        event,
        calendar_id,
        EventKind::Recurring,
        recurring.time_policy == TimePolicy::AllDay,
        window,
    ))
}

fn occurrence_from(
    event: &CalendarEvent,
    calendar_id: &str,
    event_type: EventKind,
    all_day: bool,
    window: OccurrenceWindow,
) -> CalendarEventOccurrence {
    CalendarEventOccurrence {
        event_id: event.id.clone(),
        calendar_id: calendar_id.to_string(),
        event_type,
        title: event.title.clone(),
        category: event.category.clone(),
        start: window.start,
        end: window.end,
        duration_minutes: window.duration_minutes,
        all_day,
        priority: event.priority(),
        hooks: sort_hooks_by_priority(&event.hooks),
    }
}

/// Window of a single event.
///
/// An explicit end time wins (wrapping past midnight when it is not after the
/// start time), then `duration_minutes`, then a full schema day for all-day
/// events. Timed events without either are instants.
fn single_window(single: &SingleSchedule, schema: &CalendarSchema) -> Result<OccurrenceWindow> {
    let time = schema.time_definition_checked()?;
    let date = &single.date;

    let start = if single.all_day {
        date.clone()
    } else {
        let clock = single
            .start_time
            .unwrap_or_else(|| TimeOfDay::new(date.effective_hour(), date.effective_minute()));
        CalendarTimestamp::minute(
            date.calendar_id.clone(),
            date.year,
            date.month_id.clone(),
            date.day,
            clock.hour,
            clock.minute,
        )
    };

    let mut duration = match (single.end_time, single.duration_minutes) {
        (Some(end_time), _) => {
            let start_clock = TimeOfDay::new(start.effective_hour(), start.effective_minute());
            duration_between(start_clock, end_time, &time)
        }
        (None, Some(minutes)) => minutes,
        (None, None) => 0,
    };
    if duration <= 0 && single.all_day {
        duration = time.minutes_per_day();
    }

    window_from(schema, start, duration)
}

fn duration_between(start: TimeOfDay, end: TimeOfDay, time: &TimeDefinition) -> i64 {
    let raw = end.minutes_into_day(time) - start.minutes_into_day(time);
    if raw <= 0 {
        time.minutes_per_day() + raw
    } else {
        raw
    }
}
