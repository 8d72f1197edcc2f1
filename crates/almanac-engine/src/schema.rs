//! Calendar schema: months, week length, time granularity and epoch.
//!
//! A schema models leap behavior (if any) explicitly through its month lengths;
//! the engine never applies calendar-specific leap rules.

use serde::{Deserialize, Serialize};

use crate::error::{AlmanacError, Result};

pub const DEFAULT_HOURS_PER_DAY: u32 = 24;
pub const DEFAULT_MINUTES_PER_HOUR: u32 = 60;
pub const DEFAULT_SECONDS_PER_MINUTE: u32 = 60;
pub const DEFAULT_MINUTE_STEP: u32 = 1;

/// One month of a calendar year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub id: String,
    pub name: String,
    /// Number of days in the month. Must be greater than zero.
    pub length: u32,
}

impl CalendarMonth {
    pub fn new(id: impl Into<String>, name: impl Into<String>, length: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            length,
        }
    }
}

/// Reference date from which absolute day offsets are measured.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epoch {
    pub year: i64,
    pub month_id: String,
    pub day: u32,
}

/// Structural definition of a calendar.
///
/// The granularity fields are optional; use [`CalendarSchema::time_definition`]
/// to obtain the resolved values instead of reading them directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSchema {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub days_per_week: u32,
    pub months: Vec<CalendarMonth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_per_day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes_per_hour: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds_per_minute: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute_step: Option<u32>,
    pub epoch: Epoch,
}

/// Time granularity of a schema with every default filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeDefinition {
    pub hours_per_day: u32,
    pub minutes_per_hour: u32,
    pub seconds_per_minute: u32,
    pub minute_step: u32,
}

impl Default for TimeDefinition {
    fn default() -> Self {
        Self {
            hours_per_day: DEFAULT_HOURS_PER_DAY,
            minutes_per_hour: DEFAULT_MINUTES_PER_HOUR,
            seconds_per_minute: DEFAULT_SECONDS_PER_MINUTE,
            minute_step: DEFAULT_MINUTE_STEP,
        }
    }
}

impl TimeDefinition {
    pub fn minutes_per_day(&self) -> i64 {
        i64::from(self.hours_per_day) * i64::from(self.minutes_per_hour)
    }
}

impl CalendarSchema {
    /// Merge the schema's optional granularity fields over the defaults.
    pub fn time_definition(&self) -> TimeDefinition {
        let defaults = TimeDefinition::default();
        TimeDefinition {
            hours_per_day: self.hours_per_day.unwrap_or(defaults.hours_per_day),
            minutes_per_hour: self.minutes_per_hour.unwrap_or(defaults.minutes_per_hour),
            seconds_per_minute: self
                .seconds_per_minute
                .unwrap_or(defaults.seconds_per_minute),
            minute_step: self.minute_step.unwrap_or(defaults.minute_step),
        }
    }

    /// Sum of all month lengths.
    pub fn total_days_in_year(&self) -> i64 {
        self.months.iter().map(|m| i64::from(m.length)).sum()
    }

    pub fn month(&self, month_id: &str) -> Option<&CalendarMonth> {
        self.months.iter().find(|m| m.id == month_id)
    }

    /// Position of a month within the year, or `None` for unknown ids.
    pub fn month_index(&self, month_id: &str) -> Option<usize> {
        self.months.iter().position(|m| m.id == month_id)
    }

    pub fn month_by_index(&self, index: usize) -> Option<&CalendarMonth> {
        self.months.get(index)
    }

    pub fn month_length(&self, month_id: &str) -> Option<u32> {
        self.month(month_id).map(|m| m.length)
    }

    /// Clamp `day` into `1..=length` of the given month.
    pub fn clamp_day_to_month(&self, month_id: &str, day: u32) -> Result<u32> {
        let length = self
            .month_length(month_id)
            .ok_or_else(|| AlmanacError::unknown_month(&self.id, month_id))?;
        Ok(day.clamp(1, length.max(1)))
    }

    /// Days per year, rejecting schemas where absolute-day arithmetic would
    /// divide by zero.
    pub(crate) fn days_per_year_checked(&self) -> Result<i64> {
        let total = self.total_days_in_year();
        if total <= 0 {
            return Err(AlmanacError::invalid_schema(
                &self.id,
                "schema has no days configured",
            ));
        }
        Ok(total)
    }

    /// Resolved time definition, rejecting zero-length days or hours.
    pub(crate) fn time_definition_checked(&self) -> Result<TimeDefinition> {
        let time = self.time_definition();
        if time.hours_per_day == 0 || time.minutes_per_hour == 0 {
            return Err(AlmanacError::invalid_schema(
                &self.id,
                format!(
                    "time definition must be positive (hoursPerDay={}, minutesPerHour={})",
                    time.hours_per_day, time.minutes_per_hour
                ),
            ));
        }
        Ok(time)
    }

    /// Check every structural invariant of the schema.
    ///
    /// Engine functions do not call this up front; they fail on the specific
    /// inconsistency they hit. Hosts call it when a schema is loaded or edited.
    pub fn validate(&self) -> Result<()> {
        if self.months.is_empty() {
            return Err(AlmanacError::invalid_schema(&self.id, "months must not be empty"));
        }
        if self.days_per_week == 0 {
            return Err(AlmanacError::invalid_schema(
                &self.id,
                "daysPerWeek must be greater than zero",
            ));
        }
        if let Some(month) = self.months.iter().find(|m| m.length == 0) {
            return Err(AlmanacError::invalid_schema(
                &self.id,
                format!("month {} has zero length", month.id),
            ));
        }
        for (index, month) in self.months.iter().enumerate() {
            if self.months[..index].iter().any(|m| m.id == month.id) {
                return Err(AlmanacError::invalid_schema(
                    &self.id,
                    format!("duplicate month id {}", month.id),
                ));
            }
        }
        self.time_definition_checked()?;

        let epoch_length = self
            .month_length(&self.epoch.month_id)
            .ok_or_else(|| AlmanacError::unknown_month(&self.id, &self.epoch.month_id))?;
        if self.epoch.day < 1 || self.epoch.day > epoch_length {
            return Err(AlmanacError::invalid_schema(
                &self.id,
                format!(
                    "epoch day {} is outside month {} (1..={})",
                    self.epoch.day, self.epoch.month_id, epoch_length
                ),
            ));
        }
        Ok(())
    }
}

