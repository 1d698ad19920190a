//! Computing the new date taken, and parsing dates/offsets from user input.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

use crate::error::AdjustError;

/// How the new date taken is derived. One is built per invocation and
/// applied to every file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateAdjustment {
    /// Set every file to this date.
    Absolute(NaiveDateTime),
    /// Set every file to `reference + delta`, ignoring its current value.
    Offset {
        delta: TimeDelta,
        reference: NaiveDateTime,
    },
    /// Move each file's own current date by `delta`.
    ShiftExisting { delta: TimeDelta },
}

impl DateAdjustment {
    /// An offset from the current local time.
    ///
    /// "Now" is captured here, once, so every file in a batch gets the same
    /// result no matter how long the batch takes.
    pub fn offset_from_now(delta: TimeDelta) -> Self {
        let now = Local::now().naive_local();
        DateAdjustment::Offset {
            delta,
            reference: now.with_nanosecond(0).unwrap_or(now),
        }
    }

    /// Compute the new date for a file whose current date taken is `old`.
    pub fn compute(&self, old: Option<NaiveDateTime>) -> Result<NaiveDateTime, AdjustError> {
        compute(self, old)
    }
}

/// Compute the new date taken.
///
/// `old` only matters for [`DateAdjustment::ShiftExisting`]; the other modes
/// report it but never use it.
pub fn compute(
    adjustment: &DateAdjustment,
    old: Option<NaiveDateTime>,
) -> Result<NaiveDateTime, AdjustError> {
    let new = match *adjustment {
        DateAdjustment::Absolute(target) => target,
        DateAdjustment::Offset { delta, reference } => reference
            .checked_add_signed(delta)
            .ok_or(AdjustError::OutOfRange)?,
        DateAdjustment::ShiftExisting { delta } => old
            .ok_or(AdjustError::NoExistingDate)?
            .checked_add_signed(delta)
            .ok_or(AdjustError::OutOfRange)?,
    };

    // EXIF dates have a four-digit year.
    if !(0..=9999).contains(&new.year()) {
        return Err(AdjustError::OutOfRange);
    }
    Ok(new)
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y:%m:%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an absolute date/time.
///
/// Accepts ISO-like `2013-08-15T10:30:00` (seconds optional, `T` or space),
/// the EXIF form `2013:08:15 10:30:00`, and a bare date meaning midnight.
pub fn parse_datetime(input: &str) -> Result<NaiveDateTime, AdjustError> {
    let s = input.trim();
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }
    Err(invalid(
        input,
        "expected a date like 2013-08-15T10:30:00, 2013:08:15 10:30:00 or 2013-08-15",
    ))
}

/// Parse a signed offset.
///
/// Two forms are accepted:
/// - unit form: `90s`, `-15m`, `+1d2h30m` (units `d`, `h`, `m`, `s`)
/// - clock form: `-01:30`, `+00:15:30` (`[+-]H:MM[:SS]`)
pub fn parse_offset(input: &str) -> Result<TimeDelta, AdjustError> {
    let s = input.trim();
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    if body.is_empty() {
        return Err(invalid(input, "empty offset"));
    }

    let seconds = if body.contains(':') {
        parse_clock(body).ok_or_else(|| invalid(input, "expected H:MM or H:MM:SS"))?
    } else {
        parse_units(body).ok_or_else(|| invalid(input, "expected a number with unit d, h, m or s"))?
    };

    let seconds = if negative { -seconds } else { seconds };
    TimeDelta::try_seconds(seconds).ok_or_else(|| invalid(input, "offset too large"))
}

fn parse_clock(body: &str) -> Option<i64> {
    let parts: Vec<&str> = body.split(':').collect();
    if !(2..=3).contains(&parts.len()) || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    let hours: i64 = parts[0].parse().ok()?;
    let minutes: i64 = parts[1].parse().ok()?;
    let seconds: i64 = match parts.get(2) {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    if minutes >= 60 || seconds >= 60 || hours < 0 || minutes < 0 || seconds < 0 {
        return None;
    }
    hours
        .checked_mul(3600)?
        .checked_add(minutes * 60 + seconds)
}

fn parse_units(body: &str) -> Option<i64> {
    let mut total: i64 = 0;
    let mut digits = String::new();
    for c in body.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit = match c.to_ascii_lowercase() {
            'd' => 86_400,
            'h' => 3_600,
            'm' => 60,
            's' => 1,
            _ => return None,
        };
        if digits.is_empty() {
            return None;
        }
        let value: i64 = digits.parse().ok()?;
        total = total.checked_add(value.checked_mul(unit)?)?;
        digits.clear();
    }
    // A trailing number without a unit is ambiguous.
    if !digits.is_empty() {
        return None;
    }
    Some(total)
}

fn invalid(input: &str, reason: &str) -> AdjustError {
    AdjustError::InvalidInput {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}
