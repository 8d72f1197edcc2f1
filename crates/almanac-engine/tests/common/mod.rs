//! Shared fixtures for almanac-engine integration tests.
#![allow(dead_code)]

use almanac_engine::{CalendarMonth, CalendarSchema, CalendarTimestamp, Epoch};

pub const CAL: &str = "greg";

/// Gregorian-shaped fixture: twelve months with a fixed 29-day February and an
/// epoch of 2024-01-01, so 2024 lines up with the real calendar.
pub fn gregorian() -> CalendarSchema {
    let months = [
        ("jan", "January", 31),
        ("feb", "February", 29),
        ("mar", "March", 31),
        ("apr", "April", 30),
        ("may", "May", 31),
        ("jun", "June", 30),
        ("jul", "July", 31),
        ("aug", "August", 31),
        ("sep", "September", 30),
        ("oct", "October", 31),
        ("nov", "November", 30),
        ("dec", "December", 31),
    ];
    CalendarSchema {
        id: "gregorian-2024".to_string(),
        name: "Gregorian 2024".to_string(),
        description: None,
        days_per_week: 7,
        months: months
            .iter()
            .map(|(id, name, len)| CalendarMonth::new(*id, *name, *len))
            .collect(),
        hours_per_day: None,
        minutes_per_hour: None,
        seconds_per_minute: None,
        minute_step: None,
        epoch: Epoch {
            year: 2024,
            month_id: "jan".to_string(),
            day: 1,
        },
    }
}

/// Small irregular schema: 5-day weeks, 10-hour days of 30 minutes.
pub fn tidal() -> CalendarSchema {
    CalendarSchema {
        id: "tidal".to_string(),
        name: "Tidal Reckoning".to_string(),
        description: Some("three uneven months".to_string()),
        days_per_week: 5,
        months: vec![
            CalendarMonth::new("ebb", "Ebb", 17),
            CalendarMonth::new("slack", "Slack", 3),
            CalendarMonth::new("flood", "Flood", 23),
        ],
        hours_per_day: Some(10),
        minutes_per_hour: Some(30),
        seconds_per_minute: None,
        minute_step: None,
        epoch: Epoch {
            year: 100,
            month_id: "slack".to_string(),
            day: 2,
        },
    }
}

pub fn day(year: i64, month: &str, d: u32) -> CalendarTimestamp {
    CalendarTimestamp::day(CAL, year, month, d)
}

pub fn at(year: i64, month: &str, d: u32, hour: u32, minute: u32) -> CalendarTimestamp {
    CalendarTimestamp::minute(CAL, year, month, d, hour, minute)
}
