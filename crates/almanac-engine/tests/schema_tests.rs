//! Tests for schema helpers and structural validation.

mod common;

use almanac_engine::{AlmanacError, CalendarMonth, CalendarSchema, ErrorKind, TimeDefinition};
use common::{gregorian, tidal};

#[test]
fn time_definition_defaults_when_absent() {
    let schema = gregorian();
    assert_eq!(schema.time_definition(), TimeDefinition::default());
    assert_eq!(schema.time_definition().minutes_per_day(), 1440);
}

#[test]
fn time_definition_merges_partial_overrides() {
    let time = tidal().time_definition();
    assert_eq!(time.hours_per_day, 10);
    assert_eq!(time.minutes_per_hour, 30);
    assert_eq!(time.seconds_per_minute, 60);
    assert_eq!(time.minute_step, 1);
    assert_eq!(time.minutes_per_day(), 300);
}

#[test]
fn total_days_sums_month_lengths() {
    assert_eq!(gregorian().total_days_in_year(), 366);
    assert_eq!(tidal().total_days_in_year(), 43);
}

#[test]
fn month_lookup_helpers() {
    let schema = gregorian();
    assert_eq!(schema.month_index("mar"), Some(2));
    assert_eq!(schema.month_index("smarch"), None);
    assert_eq!(schema.month_length("feb"), Some(29));
    assert_eq!(schema.month_by_index(11).map(|m| m.id.as_str()), Some("dec"));
    assert!(schema.month_by_index(12).is_none());
}

#[test]
fn clamp_day_to_month_pulls_into_range() {
    let schema = gregorian();
    assert_eq!(schema.clamp_day_to_month("feb", 31).unwrap(), 29);
    assert_eq!(schema.clamp_day_to_month("feb", 0).unwrap(), 1);
    assert_eq!(schema.clamp_day_to_month("apr", 15).unwrap(), 15);

    let err = schema.clamp_day_to_month("smarch", 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
}

#[test]
fn valid_fixtures_pass_validation() {
    gregorian().validate().unwrap();
    tidal().validate().unwrap();
}

#[test]
fn validate_rejects_unknown_epoch_month() {
    let mut schema = gregorian();
    schema.epoch.month_id = "smarch".to_string();
    assert!(matches!(
        schema.validate(),
        Err(AlmanacError::UnknownMonth { .. })
    ));
}

#[test]
fn validate_rejects_epoch_day_outside_month() {
    let mut schema = gregorian();
    schema.epoch.month_id = "feb".to_string();
    schema.epoch.day = 30;
    let err = schema.validate().unwrap_err();
    assert!(matches!(err, AlmanacError::InvalidSchema { .. }));
    assert!(err.to_string().contains("epoch day 30"));
}

#[test]
fn validate_rejects_structural_problems() {
    let mut empty = gregorian();
    empty.months.clear();
    assert!(empty.validate().is_err());

    let mut no_week = gregorian();
    no_week.days_per_week = 0;
    assert!(no_week.validate().is_err());

    let mut zero_month = gregorian();
    zero_month.months.push(CalendarMonth::new("void", "Void", 0));
    assert!(zero_month.validate().is_err());

    let mut duplicate = gregorian();
    duplicate.months.push(CalendarMonth::new("jan", "Janus", 3));
    let err = duplicate.validate().unwrap_err();
    assert!(err.to_string().contains("duplicate month id jan"));

    let mut no_hours = gregorian();
    no_hours.hours_per_day = Some(0);
    assert_eq!(no_hours.validate().unwrap_err().kind(), ErrorKind::MalformedInput);
}

#[test]
fn schema_deserializes_from_camel_case_json() {
    let json = r#"{
        "id": "moons",
        "name": "Two Moons",
        "daysPerWeek": 6,
        "months": [
            {"id": "a", "name": "Ashen", "length": 20},
            {"id": "b", "name": "Bright", "length": 25}
        ],
        "hoursPerDay": 20,
        "epoch": {"year": 1, "monthId": "a", "day": 1}
    }"#;
    let schema: CalendarSchema = serde_json::from_str(json).unwrap();
    assert_eq!(schema.days_per_week, 6);
    assert_eq!(schema.time_definition().hours_per_day, 20);
    assert_eq!(schema.time_definition().minutes_per_hour, 60);
    assert_eq!(schema.total_days_in_year(), 45);
    schema.validate().unwrap();
}
