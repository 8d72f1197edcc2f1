//! # almanac-engine
//!
//! Deterministic recurrence, occurrence and conflict resolution for custom
//! calendar schemas.
//!
//! A [`CalendarSchema`] describes an arbitrary calendar: month lengths, week
//! length, hour/minute granularity and an epoch. On top of it the engine answers
//! three questions without I/O or shared state: when does a recurring thing
//! happen next, what happens inside a window, and which of several simultaneous
//! occurrences wins.
//!
//! ## Quick start
//!
//! ```rust
//! use almanac_engine::{
//!     next_occurrence, CalendarMonth, CalendarSchema, CalendarTimestamp, Epoch, RepeatRule,
//!     RuleServices,
//! };
//!
//! let schema = CalendarSchema {
//!     id: "harptos".into(),
//!     name: "Harptos".into(),
//!     description: None,
//!     days_per_week: 10,
//!     months: vec![
//!         CalendarMonth::new("hammer", "Hammer", 30),
//!         CalendarMonth::new("alturiak", "Alturiak", 30),
//!     ],
//!     hours_per_day: None,
//!     minutes_per_hour: None,
//!     seconds_per_minute: None,
//!     minute_step: None,
//!     epoch: Epoch { year: 1490, month_id: "hammer".into(), day: 1 },
//! };
//!
//! let rule = RepeatRule::MonthlyPosition { month_id: "hammer".into(), day: 15 };
//! let start = CalendarTimestamp::day("harptos", 1491, "alturiak", 3);
//! let next = next_occurrence(&schema, "harptos", &rule, &start, false, &RuleServices::default())
//!     .unwrap()
//!     .unwrap();
//! assert_eq!((next.year, next.month_id.as_str(), next.day), (1492, "hammer", 15));
//! ```
//!
//! ## Modules
//!
//! - [`schema`]: calendar structure, time definition and validation
//! - [`timestamp`]: comparison, day-of-year and absolute-day conversion, time arithmetic
//! - [`rule`]: repeat rules and the occurrence resolver
//! - [`policy`]: projecting a recurrence date through a time-of-day policy
//! - [`event`]: single and recurring calendar events
//! - [`phenomenon`]: ambient phenomena with effects and priority
//! - [`conflict`]: overlap detection and priority resolution
//! - [`hook`]: opaque hook descriptors
//! - [`error`]: error types

pub mod conflict;
pub mod error;
pub mod event;
pub mod hook;
pub mod phenomenon;
pub mod policy;
pub mod rule;
pub mod schema;
pub mod timestamp;

pub use conflict::{
    detect_conflicts, overlapping_pairs, resolve_by_priority, resolve_conflicts, ConflictGroup,
    ConflictResolution, ConflictWindow, OccurrenceSource, OverlappingPair, TemporalOccurrence,
};
pub use error::{AlmanacError, ErrorKind};
pub use event::{
    event_occurrences_in_range, next_event_occurrence, CalendarEvent, CalendarEventOccurrence,
    EventBounds, EventKind, EventSchedule, RecurringSchedule, SingleSchedule,
};
pub use hook::{sort_hooks_by_priority, HookDescriptor};
pub use phenomenon::{
    next_phenomenon_occurrence, phenomenon_occurrences_in_range, scan_phenomena,
    sort_occurrences_by_timestamp, Phenomenon, PhenomenonCategory, PhenomenonEffect,
    PhenomenonOccurrence, PhenomenonScan, PhenomenonVisibility,
};
pub use policy::{project_time_policy, OccurrenceWindow, PolicySettings, TimeOfDay, TimePolicy};
pub use rule::{
    next_occurrence, occurrences_in_range, AstronomicalEventCalculator, AstronomicalRule,
    AstronomicalSource, RangeOptions, RepeatRule, RuleServices,
};
pub use schema::{CalendarMonth, CalendarSchema, Epoch, TimeDefinition};
pub use timestamp::{
    advance_time, compare, format_timestamp, AdvanceResult, CalendarTimestamp, Precision,
    TimeUnit,
};
