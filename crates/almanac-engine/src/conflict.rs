//! Group overlapping occurrences into conflict windows and pick a winner per
//! window.
//!
//! Events and phenomena are first normalized into [`TemporalOccurrence`]s.
//! Intervals are half-open `[start, end)` in absolute minutes, so an occurrence
//! that ends exactly when another starts does not conflict with it.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::event::{CalendarEventOccurrence, EventKind};
use crate::hook::{sort_hooks_by_priority, HookDescriptor};
use crate::phenomenon::{PhenomenonEffect, PhenomenonOccurrence};
use crate::schema::CalendarSchema;
use crate::timestamp::{compare, compare_unqualified, to_absolute_minutes, CalendarTimestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceSource {
    EventSingle,
    EventRecurring,
    Phenomenon,
}

/// Source-agnostic occurrence as seen by the conflict engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalOccurrence {
    pub source_type: OccurrenceSource,
    pub source_id: String,
    pub calendar_id: String,
    pub label: String,
    pub start: CalendarTimestamp,
    pub end: CalendarTimestamp,
    pub priority: i32,
    #[serde(default)]
    pub hooks: Vec<HookDescriptor>,
    #[serde(default)]
    pub effects: Vec<PhenomenonEffect>,
}

impl From<&CalendarEventOccurrence> for TemporalOccurrence {
    fn from(occurrence: &CalendarEventOccurrence) -> Self {
        let source_type = match occurrence.event_type {
            EventKind::Single => OccurrenceSource::EventSingle,
            EventKind::Recurring => OccurrenceSource::EventRecurring,
        };
        Self {
            source_type,
            source_id: occurrence.event_id.clone(),
            calendar_id: occurrence.calendar_id.clone(),
            label: occurrence.title.clone(),
            start: occurrence.start.clone(),
            end: occurrence.end.clone(),
            priority: occurrence.priority,
            hooks: occurrence.hooks.clone(),
            effects: Vec::new(),
        }
    }
}

impl From<&PhenomenonOccurrence> for TemporalOccurrence {
    fn from(occurrence: &PhenomenonOccurrence) -> Self {
        Self {
            source_type: OccurrenceSource::Phenomenon,
            source_id: occurrence.phenomenon_id.clone(),
            calendar_id: occurrence.calendar_id.clone(),
            label: occurrence.name.clone(),
            start: occurrence.start.clone(),
            end: occurrence.end.clone(),
            priority: occurrence.priority,
            hooks: occurrence.hooks.clone(),
            effects: occurrence.effects.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictWindow {
    pub start: CalendarTimestamp,
    pub end: CalendarTimestamp,
}

/// A maximal run of transitively overlapping occurrences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictGroup {
    pub window: ConflictWindow,
    pub occurrences: Vec<TemporalOccurrence>,
}

impl ConflictGroup {
    /// True when more than one occurrence shares the window.
    pub fn is_conflict(&self) -> bool {
        self.occurrences.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResolution {
    pub window: ConflictWindow,
    /// `active` followed by `suppressed`.
    pub ordered: Vec<TemporalOccurrence>,
    pub active: TemporalOccurrence,
    pub suppressed: Vec<TemporalOccurrence>,
    pub triggered_hooks: Vec<HookDescriptor>,
    pub triggered_effects: Vec<PhenomenonEffect>,
}

/// Sweep the occurrences in start order and merge every one that starts before
/// the running end of the open group.
///
/// Groups of a single occurrence are returned too; use
/// [`ConflictGroup::is_conflict`] to keep only real conflicts.
pub fn detect_conflicts(
    schema: &CalendarSchema,
    occurrences: &[TemporalOccurrence],
) -> Result<Vec<ConflictGroup>> {
    let mut spans = occurrences
        .iter()
        .map(|occurrence| {
            let start = to_absolute_minutes(schema, &occurrence.start)?;
            let end = to_absolute_minutes(schema, &occurrence.end)?.max(start);
            Ok((start, end, occurrence))
        })
        .collect::<Result<Vec<_>>>()?;

    spans.sort_by(|(_, _, a), (_, _, b)| {
        compare(schema, &a.start, &b.start)
            .then_with(|| b.priority.cmp(&a.priority))
            .then_with(|| a.source_id.cmp(&b.source_id))
    });

    let mut groups = Vec::new();
    let mut current: Vec<(i64, &TemporalOccurrence)> = Vec::new();
    let mut running_end = 0;

    for (start, end, occurrence) in spans {
        if !current.is_empty() && start >= running_end {
            groups.push(close_group(&current));
            current.clear();
        }
        if current.is_empty() {
            running_end = end;
        } else {
            running_end = running_end.max(end);
        }
        current.push((end, occurrence));
    }
    if !current.is_empty() {
        groups.push(close_group(&current));
    }

    debug!(
        occurrences = occurrences.len(),
        groups = groups.len(),
        "conflict detection complete"
    );
    Ok(groups)
}

fn close_group(members: &[(i64, &TemporalOccurrence)]) -> ConflictGroup {
    let first = members[0].1;
    // Latest end wins; the first member reaching it keeps its timestamp.
    let latest = members
        .iter()
        .fold(members[0], |best, &candidate| {
            if candidate.0 > best.0 {
                candidate
            } else {
                best
            }
        })
        .1;
    ConflictGroup {
        window: ConflictWindow {
            start: first.start.clone(),
            end: latest.end.clone(),
        },
        occurrences: members.iter().map(|(_, o)| (*o).clone()).collect(),
    }
}

fn by_priority(a: &TemporalOccurrence, b: &TemporalOccurrence) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| compare_unqualified(&a.start, &b.start))
        .then_with(|| a.source_id.cmp(&b.source_id))
}

/// Order each group by descending priority, then start, then source id. The
/// first occurrence is active; only its hooks and effects are triggered.
///
/// Empty groups are skipped.
pub fn resolve_by_priority(groups: &[ConflictGroup]) -> Vec<ConflictResolution> {
    groups
        .iter()
        .filter_map(|group| {
            let mut ordered = group.occurrences.clone();
            ordered.sort_by(by_priority);
            let (active, suppressed) = ordered.split_first()?;
            Some(ConflictResolution {
                window: group.window.clone(),
                active: active.clone(),
                suppressed: suppressed.to_vec(),
                triggered_hooks: sort_hooks_by_priority(&active.hooks),
                triggered_effects: active.effects.clone(),
                ordered,
            })
        })
        .collect()
}

/// [`detect_conflicts`] followed by [`resolve_by_priority`].
pub fn resolve_conflicts(
    schema: &CalendarSchema,
    occurrences: &[TemporalOccurrence],
) -> Result<Vec<ConflictResolution>> {
    let groups = detect_conflicts(schema, occurrences)?;
    Ok(resolve_by_priority(&groups))
}

/// A pair of occurrences whose intervals intersect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlappingPair {
    pub first: TemporalOccurrence,
    pub second: TemporalOccurrence,
    pub overlap_minutes: i64,
}

/// Every pairwise overlap within `occurrences`, in input order.
///
/// Two occurrences overlap when `a.start < b.end && b.start < a.end`; the
/// overlap length is `min(ends) - max(starts)`. Zero-length occurrences never
/// overlap anything.
pub fn overlapping_pairs(
    schema: &CalendarSchema,
    occurrences: &[TemporalOccurrence],
) -> Result<Vec<OverlappingPair>> {
    let spans = occurrences
        .iter()
        .map(|occurrence| {
            let start = to_absolute_minutes(schema, &occurrence.start)?;
            let end = to_absolute_minutes(schema, &occurrence.end)?.max(start);
            Ok((start, end))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut pairs = Vec::new();
    for (i, &(a_start, a_end)) in spans.iter().enumerate() {
        for (j, &(b_start, b_end)) in spans.iter().enumerate().skip(i + 1) {
            if a_start < b_end && b_start < a_end {
                pairs.push(OverlappingPair {
                    first: occurrences[i].clone(),
                    second: occurrences[j].clone(),
                    overlap_minutes: a_end.min(b_end) - a_start.max(b_start),
                });
            }
        }
    }
    Ok(pairs)
}
