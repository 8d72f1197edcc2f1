//! Time-of-day policies: turning a bare recurrence date into a start/end window.
//!
//! Shared by recurring events and phenomena so both project dates the same way.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::{CalendarSchema, TimeDefinition};
use crate::timestamp::{advance_time, CalendarTimestamp, TimeUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePolicy {
    /// Starts at the recurrence date and lasts a full schema day by default.
    AllDay,
    /// Starts at a fixed clock time on the recurrence date.
    Fixed,
    /// Starts `offset_minutes` after the recurrence date.
    Offset,
}

/// A clock time on a schema day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    pub fn minutes_into_day(&self, time: &TimeDefinition) -> i64 {
        i64::from(self.hour) * i64::from(time.minutes_per_hour) + i64::from(self.minute)
    }

    /// Pull hour and minute into the schema's valid ranges.
    pub fn clamped(&self, time: &TimeDefinition) -> TimeOfDay {
        TimeOfDay {
            hour: self.hour.min(time.hours_per_day.saturating_sub(1)),
            minute: self.minute.min(time.minutes_per_hour.saturating_sub(1)),
        }
    }
}

/// Concrete start/end of an occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceWindow {
    pub start: CalendarTimestamp,
    pub end: CalendarTimestamp,
    pub duration_minutes: i64,
}

/// The time-related fields of a recurring definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicySettings {
    pub policy: TimePolicy,
    pub start_time: Option<TimeOfDay>,
    pub offset_minutes: Option<i64>,
    pub duration_minutes: Option<i64>,
}

/// Project a rule-resolved base date through a time policy.
pub fn project_time_policy(
    schema: &CalendarSchema,
    calendar_id: &str,
    base: &CalendarTimestamp,
    settings: &PolicySettings,
) -> Result<OccurrenceWindow> {
    let time = schema.time_definition_checked()?;

    match settings.policy {
        TimePolicy::AllDay => {
            let start = CalendarTimestamp {
                calendar_id: calendar_id.to_string(),
                ..base.clone()
            };
            let duration = settings
                .duration_minutes
                .unwrap_or_else(|| time.minutes_per_day());
            window_from(schema, start, duration)
        }
        TimePolicy::Fixed => {
            let clock = settings
                .start_time
                .unwrap_or(TimeOfDay::new(0, 0))
                .clamped(&time);
            let start = CalendarTimestamp::minute(
                calendar_id,
                base.year,
                base.month_id.clone(),
                base.day,
                clock.hour,
                clock.minute,
            );
            window_from(schema, start, settings.duration_minutes.unwrap_or(0))
        }
        TimePolicy::Offset => {
            let anchor = CalendarTimestamp {
                calendar_id: calendar_id.to_string(),
                ..base.clone()
            };
            let offset = settings.offset_minutes.unwrap_or(0);
            let start = advance_time(schema, &anchor, offset, TimeUnit::Minute)?.timestamp;
            window_from(schema, start, settings.duration_minutes.unwrap_or(0))
        }
    }
}

/// Window of `duration` minutes from `start`. Non-positive durations collapse
/// to an instant.
pub(crate) fn window_from(
    schema: &CalendarSchema,
    start: CalendarTimestamp,
    duration: i64,
) -> Result<OccurrenceWindow> {
    let duration = duration.max(0);
    let end = if duration > 0 {
        advance_time(schema, &start, duration, TimeUnit::Minute)?.timestamp
    } else {
        start.clone()
    };
    Ok(OccurrenceWindow {
        start,
        end,
        duration_minutes: duration,
    })
}
