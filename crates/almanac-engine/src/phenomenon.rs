//! Ambient phenomena: seasons, tides, holidays and other rule-driven happenings
//! that carry effects and a priority instead of being scheduled by a user.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AlmanacError, Result};
use crate::hook::{sort_hooks_by_priority, HookDescriptor};
use crate::policy::{project_time_policy, PolicySettings, TimeOfDay, TimePolicy};
use crate::rule::{next_occurrence, occurrences_in_range, RangeOptions, RepeatRule, RuleServices};
use crate::schema::CalendarSchema;
use crate::timestamp::{compare, CalendarTimestamp};

pub const DEFAULT_PHENOMENON_PRIORITY: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhenomenonCategory {
    Season,
    Astronomy,
    Weather,
    Tide,
    Holiday,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhenomenonVisibility {
    #[default]
    AllCalendars,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    Weather,
    Narrative,
    Mechanical,
}

/// Opaque effect forwarded to the host when a phenomenon wins its window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhenomenonEffect {
    #[serde(rename = "type")]
    pub effect_type: EffectType,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applies_to: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phenomenon {
    pub id: String,
    pub name: String,
    pub category: PhenomenonCategory,
    #[serde(default)]
    pub visibility: PhenomenonVisibility,
    #[serde(default)]
    pub applies_to_calendar_ids: Vec<String>,
    pub rule: RepeatRule,
    pub time_policy: TimePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<TimeOfDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<PhenomenonEffect>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<HookDescriptor>,
}

impl Phenomenon {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: PhenomenonCategory,
        rule: RepeatRule,
        time_policy: TimePolicy,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            visibility: PhenomenonVisibility::AllCalendars,
            applies_to_calendar_ids: Vec::new(),
            rule,
            time_policy,
            start_time: None,
            offset_minutes: None,
            duration_minutes: None,
            effects: Vec::new(),
            priority: DEFAULT_PHENOMENON_PRIORITY,
            tags: Vec::new(),
            notes: None,
            hooks: Vec::new(),
        }
    }

    pub fn is_visible_for_calendar(&self, calendar_id: &str) -> bool {
        match self.visibility {
            PhenomenonVisibility::AllCalendars => true,
            PhenomenonVisibility::Selected => {
                self.applies_to_calendar_ids.iter().any(|id| id == calendar_id)
            }
        }
    }

    /// Clock time of a `fixed` phenomenon, midnight when unset. `None` for the
    /// other policies.
    pub fn effective_start_time(&self) -> Option<TimeOfDay> {
        match self.time_policy {
            TimePolicy::Fixed => Some(self.start_time.unwrap_or(TimeOfDay::new(0, 0))),
            TimePolicy::AllDay | TimePolicy::Offset => None,
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
}

/// Free-function form of [`Phenomenon::is_visible_for_calendar`].
pub fn is_visible_for_calendar(phenomenon: &Phenomenon, calendar_id: &str) -> bool {
    phenomenon.is_visible_for_calendar(calendar_id)
}

/// Descending priority, then name.
pub fn compare_by_priority(a: &Phenomenon, b: &Phenomenon) -> Ordering {
    b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name))
}

/// A realized instance of a phenomenon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhenomenonOccurrence {
    pub phenomenon_id: String,
    pub name: String,
    pub calendar_id: String,
    pub category: PhenomenonCategory,
    pub start: CalendarTimestamp,
    pub end: CalendarTimestamp,
    pub duration_minutes: i64,
    pub priority: i32,
    /// Sorted by descending hook priority.
    pub hooks: Vec<HookDescriptor>,
    pub effects: Vec<PhenomenonEffect>,
}

pub fn next_phenomenon_occurrence(
    phenomenon: &Phenomenon,
    schema: &CalendarSchema,
    calendar_id: &str,
    start: &CalendarTimestamp,
    include_start: bool,
    services: &RuleServices<'_>,
) -> Result<Option<PhenomenonOccurrence>> {
    let base = next_occurrence(
        schema,
        calendar_id,
        &phenomenon.rule,
        start,
        include_start,
        services,
    )?;
    base.map(|base| build_occurrence(phenomenon, schema, calendar_id, &base))
        .transpose()
}

pub fn phenomenon_occurrences_in_range(
    phenomenon: &Phenomenon,
    schema: &CalendarSchema,
    calendar_id: &str,
    range_start: &CalendarTimestamp,
    range_end: &CalendarTimestamp,
    options: &RangeOptions,
    services: &RuleServices<'_>,
) -> Result<Vec<PhenomenonOccurrence>> {
    occurrences_in_range(
        schema,
        calendar_id,
        &phenomenon.rule,
        range_start,
        range_end,
        options,
        services,
    )?
    .iter()
    .map(|base| build_occurrence(phenomenon, schema, calendar_id, base))
    .collect()
}

fn build_occurrence(
    phenomenon: &Phenomenon,
    schema: &CalendarSchema,
    calendar_id: &str,
    base: &CalendarTimestamp,
) -> Result<PhenomenonOccurrence> {
    let window = project_time_policy(schema, calendar_id, base, &phenomenon.policy_settings())?;
    Ok(PhenomenonOccurrence {
        phenomenon_id: phenomenon.id.clone(),
        name: phenomenon.name.clone(),
        calendar_id: calendar_id.to_string(),
        category: phenomenon.category,
        start: window.start,
        end: window.end,
        duration_minutes: window.duration_minutes,
        priority: phenomenon.priority,
        hooks: sort_hooks_by_priority(&phenomenon.hooks),
        effects: phenomenon.effects.clone(),
    })
}

/// Occurrences ordered by start.
pub fn sort_occurrences_by_timestamp(
    schema: &CalendarSchema,
    occurrences: &[PhenomenonOccurrence],
) -> Vec<PhenomenonOccurrence> {
    let mut sorted = occurrences.to_vec();
    sorted.sort_by(|a, b| compare(schema, &a.start, &b.start));
    sorted
}

/// Occurrences starting at or after `from`, ordered by start.
pub fn filter_upcoming_occurrences(
    schema: &CalendarSchema,
    occurrences: &[PhenomenonOccurrence],
    from: &CalendarTimestamp,
) -> Vec<PhenomenonOccurrence> {
    let upcoming: Vec<PhenomenonOccurrence> = occurrences
        .iter()
        .filter(|o| compare(schema, &o.start, from) != Ordering::Less)
        .cloned()
        .collect();
    sort_occurrences_by_timestamp(schema, &upcoming)
}

/// Result of [`scan_phenomena`]: what resolved, and what failed.
#[derive(Debug, Clone, Default)]
pub struct PhenomenonScan {
    /// Next occurrences of every visible phenomenon that has one, ordered by
    /// start.
    pub occurrences: Vec<PhenomenonOccurrence>,
    /// Phenomena whose calculation failed, by id.
    pub failures: Vec<(String, AlmanacError)>,
}

/// Next occurrence of each phenomenon visible to `calendar_id`.
///
/// Each phenomenon is resolved independently: a failing rule is reported in
/// [`PhenomenonScan::failures`] and does not stop the others.
pub fn scan_phenomena(
    phenomena: &[Phenomenon],
    schema: &CalendarSchema,
    calendar_id: &str,
    start: &CalendarTimestamp,
    include_start: bool,
    services: &RuleServices<'_>,
) -> PhenomenonScan {
    let mut scan = PhenomenonScan::default();
    for phenomenon in phenomena
        .iter()
        .filter(|p| p.is_visible_for_calendar(calendar_id))
    {
        match next_phenomenon_occurrence(
            phenomenon,
            schema,
            calendar_id,
            start,
            include_start,
            services,
        ) {
            Ok(Some(occurrence)) => scan.occurrences.push(occurrence),
            Ok(None) => {}
            Err(err) => {
                warn!(phenomenon = %phenomenon.id, error = %err, "phenomenon calculation failed");
                scan.failures.push((phenomenon.id.clone(), err));
            }
        }
    }
    scan.occurrences = sort_occurrences_by_timestamp(schema, &scan.occurrences);
    scan
}
