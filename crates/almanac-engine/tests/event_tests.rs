//! Tests for event occurrence materialization and time-policy projection.

mod common;

use almanac_engine::{
    event_occurrences_in_range, next_event_occurrence, project_time_policy, CalendarEvent,
    CalendarTimestamp, EventBounds, EventKind, EventSchedule, HookDescriptor, PolicySettings,
    Precision, RangeOptions, RecurringSchedule, RepeatRule, RuleServices, SingleSchedule,
    TimeOfDay, TimePolicy,
};
use common::{at, day, gregorian, CAL};

fn mondays() -> RepeatRule {
    RepeatRule::WeeklyDayIndex {
        day_index: 0,
        interval: None,
    }
}

fn hook(id: &str, priority: Option<i32>) -> HookDescriptor {
    HookDescriptor {
        id: id.to_string(),
        hook_type: "notify".to_string(),
        config: serde_json::Value::Null,
        priority,
    }
}

/// Weekly Monday standup, 09:30 for an hour, bounded to Jan 10 .. Feb 10 2024.
fn standup() -> CalendarEvent {
    let mut schedule = RecurringSchedule::new(mondays(), TimePolicy::Fixed);
    schedule.start_time = Some(TimeOfDay::new(9, 30));
    schedule.duration_minutes = Some(60);
    schedule.bounds = Some(EventBounds {
        start: Some(day(2024, "jan", 10)),
        end: Some(day(2024, "feb", 10)),
    });
    let mut event = CalendarEvent::new(
        "standup",
        CAL,
        "Guild standup",
        EventSchedule::Recurring(schedule),
    );
    event.priority = Some(2);
    event
}

fn single(schedule: SingleSchedule) -> CalendarEvent {
    CalendarEvent::new("feast", CAL, "Feast", EventSchedule::Single(schedule))
}

fn next(event: &CalendarEvent, start: &CalendarTimestamp, include_start: bool) -> Option<CalendarTimestamp> {
    next_event_occurrence(
        event,
        &gregorian(),
        CAL,
        start,
        include_start,
        &RuleServices::default(),
    )
    .unwrap()
    .map(|occurrence| occurrence.start)
}

// ---------------------------------------------------------------------------
// Recurring events
// ---------------------------------------------------------------------------

#[test]
fn recurring_search_starts_at_lower_bound() {
    let occurrence = next_event_occurrence(
        &standup(),
        &gregorian(),
        CAL,
        &day(2024, "jan", 1),
        false,
        &RuleServices::default(),
    )
    .unwrap()
    .unwrap();

    assert_eq!(occurrence.event_type, EventKind::Recurring);
    assert_eq!(occurrence.start, at(2024, "jan", 15, 9, 30));
    assert_eq!(occurrence.end, at(2024, "jan", 15, 10, 30));
    assert_eq!(occurrence.duration_minutes, 60);
    assert!(!occurrence.all_day);
    assert_eq!(occurrence.priority, 2);
}

#[test]
fn recurring_lower_bound_is_inclusive() {
    let mut event = standup();
    if let EventSchedule::Recurring(schedule) = &mut event.schedule {
        schedule.bounds = Some(EventBounds {
            start: Some(day(2024, "jan", 8)),
            end: None,
        });
    }
    assert_eq!(
        next(&event, &day(2024, "jan", 1), false),
        Some(at(2024, "jan", 8, 9, 30))
    );
}

#[test]
fn recurring_returns_none_past_upper_bound() {
    assert_eq!(next(&standup(), &day(2024, "feb", 10), false), None);
    assert_eq!(next(&standup(), &day(2025, "jan", 1), true), None);
}

#[test]
fn recurring_range_is_clipped_to_bounds() {
    let found = event_occurrences_in_range(
        &standup(),
        &gregorian(),
        CAL,
        &day(2024, "jan", 1),
        &day(2024, "mar", 31),
        &RangeOptions::default(),
        &RuleServices::default(),
    )
    .unwrap();
    let starts: Vec<_> = found.iter().map(|o| o.start.clone()).collect();
    assert_eq!(
        starts,
        vec![
            at(2024, "jan", 15, 9, 30),
            at(2024, "jan", 22, 9, 30),
            at(2024, "jan", 29, 9, 30),
            at(2024, "feb", 5, 9, 30),
        ]
    );
}

#[test]
fn recurring_range_outside_bounds_is_empty() {
    let found = event_occurrences_in_range(
        &standup(),
        &gregorian(),
        CAL,
        &day(2024, "jun", 1),
        &day(2024, "jul", 1),
        &RangeOptions::default(),
        &RuleServices::default(),
    )
    .unwrap();
    assert!(found.is_empty());
}

#[test]
fn recurring_occurrence_uses_requested_calendar() {
    let occurrence = next_event_occurrence(
        &standup(),
        &gregorian(),
        "mirror",
        &day(2024, "jan", 1),
        false,
        &RuleServices::default(),
    )
    .unwrap()
    .unwrap();
    assert_eq!(occurrence.calendar_id, "mirror");
    assert_eq!(occurrence.start.calendar_id, "mirror");
}

#[test]
fn recurring_custom_rule_propagates_error() {
    let event = CalendarEvent::new(
        "odd",
        CAL,
        "Odd",
        EventSchedule::Recurring(RecurringSchedule::new(
            RepeatRule::Custom {
                custom_rule_id: "x".to_string(),
            },
            TimePolicy::AllDay,
        )),
    );
    let result = next_event_occurrence(
        &event,
        &gregorian(),
        CAL,
        &day(2024, "jan", 1),
        false,
        &RuleServices::default(),
    );
    assert!(result.is_err());
}

#[test]
fn occurrence_hooks_are_sorted_by_priority() {
    let mut event = standup();
    event.hooks = vec![hook("a", Some(1)), hook("b", Some(5)), hook("a2", Some(5)), hook("z", None)];
    let occurrence = next_event_occurrence(
        &event,
        &gregorian(),
        CAL,
        &day(2024, "jan", 1),
        false,
        &RuleServices::default(),
    )
    .unwrap()
    .unwrap();
    let ids: Vec<_> = occurrence.hooks.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["a2", "b", "a", "z"]);
}

// ---------------------------------------------------------------------------
// Single events
// ---------------------------------------------------------------------------

#[test]
fn single_event_respects_include_start() {
    let event = single(SingleSchedule::on(day(2024, "mar", 5)));
    assert_eq!(next(&event, &day(2024, "mar", 1), false), Some(day(2024, "mar", 5)));
    assert_eq!(next(&event, &day(2024, "mar", 5), false), None);
    assert_eq!(next(&event, &day(2024, "mar", 5), true), Some(day(2024, "mar", 5)));
    assert_eq!(next(&event, &day(2024, "mar", 6), true), None);
}

#[test]
fn single_all_day_lasts_a_schema_day() {
    let event = single(SingleSchedule::on(day(2024, "mar", 5)));
    let occurrence = next_event_occurrence(
        &event,
        &gregorian(),
        CAL,
        &day(2024, "jan", 1),
        false,
        &RuleServices::default(),
    )
    .unwrap()
    .unwrap();
    assert!(occurrence.all_day);
    assert_eq!(occurrence.event_type, EventKind::Single);
    assert_eq!(occurrence.duration_minutes, 1440);
    assert_eq!(occurrence.end, at(2024, "mar", 6, 0, 0));
}

#[test]
fn single_end_time_wraps_past_midnight() {
    let mut schedule = SingleSchedule::on(at(2024, "mar", 5, 0, 0));
    schedule.start_time = Some(TimeOfDay::new(22, 0));
    schedule.end_time = Some(TimeOfDay::new(1, 0));
    let occurrence = next_event_occurrence(
        &single(schedule),
        &gregorian(),
        CAL,
        &day(2024, "jan", 1),
        false,
        &RuleServices::default(),
    )
    .unwrap()
    .unwrap();
    assert_eq!(occurrence.start, at(2024, "mar", 5, 22, 0));
    assert_eq!(occurrence.end, at(2024, "mar", 6, 1, 0));
    assert_eq!(occurrence.duration_minutes, 180);
}

#[test]
fn single_timed_without_duration_is_instant() {
    let event = single(SingleSchedule::on(at(2024, "mar", 5, 14, 15)));
    let occurrence = next_event_occurrence(
        &event,
        &gregorian(),
        CAL,
        &day(2024, "jan", 1),
        false,
        &RuleServices::default(),
    )
    .unwrap()
    .unwrap();
    assert!(!occurrence.all_day);
    assert_eq!(occurrence.start, occurrence.end);
    assert_eq!(occurrence.duration_minutes, 0);
}

#[test]
fn single_range_membership() {
    let event = single(SingleSchedule::on(day(2024, "mar", 5)));
    let in_range = |from: CalendarTimestamp, to: CalendarTimestamp, include_start: bool| {
        event_occurrences_in_range(
            &event,
            &gregorian(),
            CAL,
            &from,
            &to,
            &RangeOptions {
                limit: 12,
                include_start,
            },
            &RuleServices::default(),
        )
        .unwrap()
        .len()
    };
    assert_eq!(in_range(day(2024, "mar", 1), day(2024, "mar", 5), false), 1);
    assert_eq!(in_range(day(2024, "mar", 5), day(2024, "mar", 9), false), 0);
    assert_eq!(in_range(day(2024, "mar", 5), day(2024, "mar", 9), true), 1);
    assert_eq!(in_range(day(2024, "mar", 9), day(2024, "mar", 1), false), 1);
    assert_eq!(in_range(day(2024, "apr", 1), day(2024, "may", 1), true), 0);
}

// ---------------------------------------------------------------------------
// Time policy projection
// ---------------------------------------------------------------------------

fn settings(policy: TimePolicy) -> PolicySettings {
    PolicySettings {
        policy,
        start_time: None,
        offset_minutes: None,
        duration_minutes: None,
    }
}

#[test]
fn all_day_policy_defaults_to_full_day() {
    let window =
        project_time_policy(&gregorian(), CAL, &day(2024, "jun", 30), &settings(TimePolicy::AllDay))
            .unwrap();
    assert_eq!(window.start, day(2024, "jun", 30));
    assert_eq!(window.start.precision, Precision::Day);
    assert_eq!(window.end, at(2024, "jul", 1, 0, 0));
    assert_eq!(window.duration_minutes, 1440);
}

#[test]
fn offset_policy_shifts_from_base() {
    let mut offset = settings(TimePolicy::Offset);
    offset.offset_minutes = Some(90);
    offset.duration_minutes = Some(30);
    let window = project_time_policy(&gregorian(), CAL, &day(2024, "jun", 30), &offset).unwrap();
    assert_eq!(window.start, at(2024, "jun", 30, 1, 30));
    assert_eq!(window.end, at(2024, "jun", 30, 2, 0));
}

#[test]
fn fixed_policy_clamps_clock_time() {
    let mut fixed = settings(TimePolicy::Fixed);
    fixed.start_time = Some(TimeOfDay::new(30, 75));
    let window = project_time_policy(&gregorian(), CAL, &day(2024, "jun", 30), &fixed).unwrap();
    assert_eq!(window.start, at(2024, "jun", 30, 23, 59));
    assert_eq!(window.duration_minutes, 0);
}

#[test]
fn negative_duration_collapses_to_instant() {
    let mut fixed = settings(TimePolicy::Fixed);
    fixed.duration_minutes = Some(-45);
    let window = project_time_policy(&gregorian(), CAL, &day(2024, "jun", 30), &fixed).unwrap();
    assert_eq!(window.start, window.end);
    assert_eq!(window.duration_minutes, 0);
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[test]
fn events_deserialize_with_kind_tag() {
    let json = r#"{
        "id": "market",
        "calendarId": "greg",
        "title": "Market day",
        "kind": "recurring",
        "rule": {"type": "weekly_dayIndex", "dayIndex": 4},
        "timePolicy": "fixed",
        "startTime": {"hour": 8},
        "durationMinutes": 240,
        "priority": 3,
        "hooks": [{"id": "bell", "type": "sound", "config": {"volume": 3}}]
    }"#;
    let event: CalendarEvent = serde_json::from_str(json).unwrap();
    assert_eq!(event.kind(), EventKind::Recurring);
    assert_eq!(event.priority(), 3);
    assert!(event.anchor_timestamp().is_none());

    let occurrence = next_event_occurrence(
        &event,
        &gregorian(),
        CAL,
        &day(2024, "jan", 1),
        false,
        &RuleServices::default(),
    )
    .unwrap()
    .unwrap();
    assert_eq!(occurrence.start, at(2024, "jan", 5, 8, 0));
    assert_eq!(occurrence.end, at(2024, "jan", 5, 12, 0));
}

#[test]
fn single_event_anchor_is_its_date() {
    let json = r#"{
        "id": "coronation",
        "calendarId": "greg",
        "title": "Coronation",
        "kind": "single",
        "date": {"calendarId": "greg", "year": 2024, "monthId": "may", "day": 6, "precision": "day"},
        "allDay": true,
        "timePrecision": "day"
    }"#;
    let event: CalendarEvent = serde_json::from_str(json).unwrap();
    assert_eq!(event.kind(), EventKind::Single);
    assert_eq!(event.priority(), 0);
    assert_eq!(event.anchor_timestamp(), Some(&day(2024, "may", 6)));
}
