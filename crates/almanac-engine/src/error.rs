//! Error types for almanac-engine operations.

use thiserror::Error;

/// Errors raised by schema arithmetic, rule resolution and occurrence building.
///
/// Every error is raised synchronously by the call that detects it. Nothing in
/// the engine retries or swallows an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlmanacError {
    /// The rule kind has no native resolver and no injected capability.
    #[error("Repeat rule type \"{rule_type}\" is not supported")]
    UnsupportedRepeatRule { rule_type: String },

    /// Schema or rule data is self-inconsistent.
    #[error("Invalid repeat rule: {0}")]
    InvalidRepeatRule(String),

    /// A day-of-year could not be resolved to a month/day pair.
    #[error("Day-of-year {day_of_year} is out of range 1..={total_days} for schema {schema_id}")]
    DayOfYearOutOfRange {
        schema_id: String,
        day_of_year: i64,
        total_days: i64,
    },

    /// A timestamp's day does not exist in its month.
    #[error("Day {day} is outside month {month_id} (1..={length}) in schema {schema_id}")]
    DayOutOfRange {
        schema_id: String,
        month_id: String,
        day: u32,
        length: u32,
    },

    /// Absolute-day or minute arithmetic left the representable range.
    #[error("Timestamp arithmetic out of range for schema {schema_id}: {operation}")]
    ArithmeticOverflow {
        schema_id: String,
        operation: &'static str,
    },

    /// A timestamp or rule referenced a month id absent from the schema.
    #[error("Month with id {month_id} not found in schema {schema_id}")]
    UnknownMonth { schema_id: String, month_id: String },

    /// The schema itself violates a structural invariant.
    #[error("Invalid calendar schema {schema_id}: {message}")]
    InvalidSchema { schema_id: String, message: String },
}

/// Coarse discriminator over [`AlmanacError`] for callers that map errors to
/// user-facing messages or decide whether to skip an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedRepeatRule,
    InvalidRepeatRule,
    OutOfRange,
    MalformedInput,
}

impl AlmanacError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AlmanacError::UnsupportedRepeatRule { .. } => ErrorKind::UnsupportedRepeatRule,
            AlmanacError::InvalidRepeatRule(_) => ErrorKind::InvalidRepeatRule,
            AlmanacError::DayOfYearOutOfRange { .. }
            | AlmanacError::DayOutOfRange { .. }
            | AlmanacError::ArithmeticOverflow { .. } => ErrorKind::OutOfRange,
            AlmanacError::UnknownMonth { .. } | AlmanacError::InvalidSchema { .. } => {
                ErrorKind::MalformedInput
            }
        }
    }

    pub(crate) fn unsupported(rule_type: &str) -> Self {
        AlmanacError::UnsupportedRepeatRule {
            rule_type: rule_type.to_string(),
        }
    }

    pub(crate) fn unknown_month(schema_id: &str, month_id: &str) -> Self {
        AlmanacError::UnknownMonth {
            schema_id: schema_id.to_string(),
            month_id: month_id.to_string(),
        }
    }

    pub(crate) fn overflow(schema_id: &str, operation: &'static str) -> Self {
        AlmanacError::ArithmeticOverflow {
            schema_id: schema_id.to_string(),
            operation,
        }
    }

    pub(crate) fn invalid_schema(schema_id: &str, message: impl Into<String>) -> Self {
        AlmanacError::InvalidSchema {
            schema_id: schema_id.to_string(),
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout almanac-engine.
pub type Result<T> = std::result::Result<T, AlmanacError>;
