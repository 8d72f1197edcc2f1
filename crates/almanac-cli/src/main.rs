//! `almanac` CLI: query a custom calendar almanac from the command line.
//!
//! The input document is JSON: `{"schema": {...}, "events": [...], "phenomena": [...]}`.
//! Timestamps are written `YEAR:MONTH_ID:DAY[:HOUR[:MINUTE]]`.
//!
//! ## Usage
//!
//! ```sh
//! # Check the schema
//! almanac validate -i almanac.json
//!
//! # Move a timestamp forward
//! almanac advance -i almanac.json --from 1492:hammer:30:22 --amount 5 --unit hour
//!
//! # Next occurrence of every event and phenomenon
//! almanac next -i almanac.json --from 1492:hammer:1
//!
//! # Everything in a window
//! almanac range -i almanac.json --from 1492:hammer:1 --to 1492:alturiak:30 --limit 50
//!
//! # Which occurrence wins when they overlap
//! RUST_LOG=debug almanac conflicts -i almanac.json --from 1492:hammer:1 --to 1492:hammer:30
//! ```

use std::io::{self, Read};

use almanac_engine::{
    advance_time, compare, event_occurrences_in_range, format_timestamp, next_event_occurrence,
    phenomenon_occurrences_in_range, resolve_by_priority, scan_phenomena,
    sort_occurrences_by_timestamp, AdvanceResult, AlmanacError, CalendarEvent,
    CalendarEventOccurrence, CalendarSchema, CalendarTimestamp, ConflictGroup,
    ConflictResolution, Phenomenon, PhenomenonOccurrence, RangeOptions, RuleServices,
    TemporalOccurrence, TimeDefinition, TimeUnit,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "almanac",
    version,
    about = "Occurrences and conflicts for custom calendar almanacs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Almanac JSON file (reads from stdin if omitted)
    #[arg(short, long, global = true)]
    input: Option<String>,

    /// Output file (writes to stdout if omitted)
    #[arg(short, long, global = true)]
    output: Option<String>,

    /// Calendar id to resolve occurrences for (defaults to the schema id)
    #[arg(long, global = true)]
    calendar: Option<String>,

    /// Log engine decisions to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the schema and print a summary
    Validate,
    /// Advance a timestamp by an amount of days, hours or minutes
    Advance {
        #[arg(long, allow_hyphen_values = true)]
        from: String,
        #[arg(long, allow_hyphen_values = true)]
        amount: i64,
        #[arg(long, value_enum, default_value_t = Unit::Day)]
        unit: Unit,
    },
    /// Next occurrence of every event and visible phenomenon
    Next {
        #[arg(long, allow_hyphen_values = true)]
        from: String,
        /// Count an occurrence exactly at --from
        #[arg(long)]
        include_start: bool,
    },
    /// All occurrences between two timestamps (both ends inclusive)
    Range {
        #[arg(long, allow_hyphen_values = true)]
        from: String,
        #[arg(long, allow_hyphen_values = true)]
        to: String,
        /// Maximum occurrences per event or phenomenon
        #[arg(long, default_value_t = almanac_engine::rule::DEFAULT_RANGE_LIMIT)]
        limit: usize,
    },
    /// Detect overlapping occurrences and resolve them by priority
    Conflicts {
        #[arg(long, allow_hyphen_values = true)]
        from: String,
        #[arg(long, allow_hyphen_values = true)]
        to: String,
        /// Maximum occurrences per event or phenomenon
        #[arg(long, default_value_t = almanac_engine::rule::DEFAULT_RANGE_LIMIT)]
        limit: usize,
        /// Also report windows with a single occurrence
        #[arg(long)]
        all: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Unit {
    Day,
    Hour,
    Minute,
}

impl From<Unit> for TimeUnit {
    fn from(unit: Unit) -> Self {
        match unit {
            Unit::Day => TimeUnit::Day,
            Unit::Hour => TimeUnit::Hour,
            Unit::Minute => TimeUnit::Minute,
        }
    }
}

/// The almanac document read from `--input`.
#[derive(Deserialize)]
struct Almanac {
    schema: CalendarSchema,
    #[serde(default)]
    events: Vec<CalendarEvent>,
    #[serde(default)]
    phenomena: Vec<Phenomenon>,
}

/// One event or phenomenon that could not be computed.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Failure {
    source: &'static str,
    id: String,
    kind: String,
    error: String,
}

impl Failure {
    fn new(source: &'static str, id: &str, err: &AlmanacError) -> Self {
        Self {
            source,
            id: id.to_string(),
            kind: format!("{:?}", err.kind()),
            error: err.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateReport<'a> {
    schema_id: &'a str,
    name: &'a str,
    months: usize,
    days_per_year: i64,
    days_per_week: u32,
    time_definition: TimeDefinition,
}

#[derive(Serialize)]
struct AdvanceReport {
    #[serde(flatten)]
    result: AdvanceResult,
    formatted: String,
}

#[derive(Serialize, Default)]
struct OccurrenceReport {
    events: Vec<CalendarEventOccurrence>,
    phenomena: Vec<PhenomenonOccurrence>,
    failures: Vec<Failure>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConflictReport {
    occurrences: usize,
    windows: usize,
    resolutions: Vec<ConflictResolution>,
    failures: Vec<Failure>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let raw = read_input(cli.input.as_deref())?;
    let almanac: Almanac = serde_json::from_str(&raw).context("Failed to parse almanac JSON")?;
    let calendar_id = cli
        .calendar
        .clone()
        .unwrap_or_else(|| almanac.schema.id.clone());
    debug!(
        schema = %almanac.schema.id,
        calendar = %calendar_id,
        events = almanac.events.len(),
        phenomena = almanac.phenomena.len(),
        "loaded almanac"
    );

    let json = match cli.command {
        Commands::Validate => {
            almanac
                .schema
                .validate()
                .with_context(|| format!("Schema {} is invalid", almanac.schema.id))?;
            serde_json::to_string_pretty(&ValidateReport {
                schema_id: &almanac.schema.id,
                name: &almanac.schema.name,
                months: almanac.schema.months.len(),
                days_per_year: almanac.schema.total_days_in_year(),
                days_per_week: almanac.schema.days_per_week,
                time_definition: almanac.schema.time_definition(),
            })?
        }
        Commands::Advance { from, amount, unit } => {
            let start = parse_timestamp(&from, &calendar_id)?;
            let result = advance_time(&almanac.schema, &start, amount, unit.into())
                .context("Failed to advance timestamp")?;
            let formatted = format_timestamp(&almanac.schema, &result.timestamp);
            serde_json::to_string_pretty(&AdvanceReport { result, formatted })?
        }
        Commands::Next {
            from,
            include_start,
        } => {
            let start = parse_timestamp(&from, &calendar_id)?;
            let report = next_occurrences(&almanac, &calendar_id, &start, include_start);
            serde_json::to_string_pretty(&report)?
        }
        Commands::Range { from, to, limit } => {
            let (start, end) = (
                parse_timestamp(&from, &calendar_id)?,
                parse_timestamp(&to, &calendar_id)?,
            );
            let report = occurrences_between(&almanac, &calendar_id, &start, &end, limit);
            serde_json::to_string_pretty(&report)?
        }
        Commands::Conflicts {
            from,
            to,
            limit,
            all,
        } => {
            let (start, end) = (
                parse_timestamp(&from, &calendar_id)?,
                parse_timestamp(&to, &calendar_id)?,
            );
            let report = occurrences_between(&almanac, &calendar_id, &start, &end, limit);
            let occurrences: Vec<TemporalOccurrence> = report
                .events
                .iter()
                .map(TemporalOccurrence::from)
                .chain(report.phenomena.iter().map(TemporalOccurrence::from))
                .collect();
            let groups: Vec<ConflictGroup> =
                almanac_engine::detect_conflicts(&almanac.schema, &occurrences)
                    .context("Failed to detect conflicts")?
                    .into_iter()
                    .filter(|group| all || group.is_conflict())
                    .collect();
            serde_json::to_string_pretty(&ConflictReport {
                occurrences: occurrences.len(),
                windows: groups.len(),
                resolutions: resolve_by_priority(&groups),
                failures: report.failures,
            })?
        }
    };

    write_output(cli.output.as_deref(), &json)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

/// Parse `YEAR:MONTH_ID:DAY[:HOUR[:MINUTE]]`. Precision follows the number of
/// parts given.
fn parse_timestamp(raw: &str, calendar_id: &str) -> Result<CalendarTimestamp> {
    let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
    let number = |index: usize, what: &str| -> Result<u32> {
        parts[index]
            .parse()
            .with_context(|| format!("Invalid {} '{}' in timestamp '{}'", what, parts[index], raw))
    };

    if !(3..=5).contains(&parts.len()) || parts[1].is_empty() {
        bail!(
            "Invalid timestamp '{}': expected YEAR:MONTH_ID:DAY[:HOUR[:MINUTE]]",
            raw
        );
    }
    let year: i64 = parts[0]
        .parse()
        .with_context(|| format!("Invalid year '{}' in timestamp '{}'", parts[0], raw))?;
    let month_id = parts[1];
    let day = number(2, "day")?;

    Ok(match parts.len() {
        3 => CalendarTimestamp::day(calendar_id, year, month_id, day),
        4 => CalendarTimestamp::hour(calendar_id, year, month_id, day, number(3, "hour")?),
        _ => CalendarTimestamp::minute(
            calendar_id,
            year,
            month_id,
            day,
            number(3, "hour")?,
            number(4, "minute")?,
        ),
    })
}

fn events_for<'a>(
    almanac: &'a Almanac,
    calendar_id: &'a str,
) -> impl Iterator<Item = &'a CalendarEvent> {
    almanac
        .events
        .iter()
        .filter(move |event| event.calendar_id == calendar_id)
}

fn next_occurrences(
    almanac: &Almanac,
    calendar_id: &str,
    start: &CalendarTimestamp,
    include_start: bool,
) -> OccurrenceReport {
    let schema = &almanac.schema;
    let services = RuleServices::default();
    let mut report = OccurrenceReport::default();

    for event in events_for(almanac, calendar_id) {
        match next_event_occurrence(event, schema, calendar_id, start, include_start, &services) {
            Ok(Some(occurrence)) => report.events.push(occurrence),
            Ok(None) => {}
            Err(err) => {
                warn!(event = %event.id, error = %err, "skipping event");
                report.failures.push(Failure::new("event", &event.id, &err));
            }
        }
    }
    report
        .events
        .sort_by(|a, b| compare(schema, &a.start, &b.start));

    let scan = scan_phenomena(
        &almanac.phenomena,
        schema,
        calendar_id,
        start,
        include_start,
        &services,
    );
    report.phenomena = scan.occurrences;
    report.failures.extend(
        scan.failures
            .iter()
            .map(|(id, err)| Failure::new("phenomenon", id, err)),
    );
    report
}

fn occurrences_between(
    almanac: &Almanac,
    calendar_id: &str,
    start: &CalendarTimestamp,
    end: &CalendarTimestamp,
    limit: usize,
) -> OccurrenceReport {
    let schema = &almanac.schema;
    let services = RuleServices::default();
    let options = RangeOptions {
        limit,
        include_start: true,
    };
    let mut report = OccurrenceReport::default();

    for event in events_for(almanac, calendar_id) {
        match event_occurrences_in_range(event, schema, calendar_id, start, end, &options, &services)
        {
            Ok(found) => report.events.extend(found),
            Err(err) => {
                warn!(event = %event.id, error = %err, "skipping event");
                report.failures.push(Failure::new("event", &event.id, &err));
            }
        }
    }

    for phenomenon in almanac
        .phenomena
        .iter()
        .filter(|p| p.is_visible_for_calendar(calendar_id))
    {
        match phenomenon_occurrences_in_range(
            phenomenon,
            schema,
            calendar_id,
            start,
            end,
            &options,
            &services,
        ) {
            Ok(found) => report.phenomena.extend(found),
            Err(err) => {
                warn!(phenomenon = %phenomenon.id, error = %err, "skipping phenomenon");
                report
                    .failures
                    .push(Failure::new("phenomenon", &phenomenon.id, &err));
            }
        }
    }

    report
        .events
        .sort_by(|a, b| compare(schema, &a.start, &b.start));
    report.phenomena = sort_occurrences_by_timestamp(schema, &report.phenomena);
    report
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
