use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SECONDS_PER_DAY: u64 = 86_400;

// ---------------------------------------------------------------------------
// Grammar selection
// ---------------------------------------------------------------------------

/// Which timestamp encoding the first column of an export uses.
///
/// The two grammars are never mixed inside one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TimeGrammar {
    /// `D:H:M:S.mmm` – an elapsed-day counter plus milliseconds.
    #[default]
    Elapsed,
    /// `DOY:H:M:S.ffffff` – day of year plus a wall-clock time of day.
    DayOfYear,
}

// ---------------------------------------------------------------------------
// Decoded samples
// ---------------------------------------------------------------------------

/// A successfully decoded time token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeSample {
    /// Seconds since an arbitrary epoch.
    Elapsed(f64),
    /// Absolute instant inside an implicit single-year window.
    DayOfYear(DayOfYearInstant),
}

impl TimeSample {
    /// Position of the sample on a common seconds axis.
    ///
    /// Differences between two samples of the same grammar are elapsed time.
    pub fn seconds(&self) -> f64 {
        match self {
            TimeSample::Elapsed(s) => *s,
            TimeSample::DayOfYear(instant) => instant.seconds_into_year(),
        }
    }

    /// Whole microseconds on the same axis as [`TimeSample::seconds`].
    ///
    /// Elapsed time is differenced on this axis so sub-second steps stay
    /// exact far from the epoch.
    pub fn micros(&self) -> i64 {
        match self {
            TimeSample::Elapsed(s) => (s * 1e6).round() as i64,
            TimeSample::DayOfYear(instant) => instant.micros_into_year() as i64,
        }
    }
}

/// `day_of_year` is 1-based; the time of day is kept at microsecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayOfYearInstant {
    pub day_of_year: u16,
    pub micros_of_day: u64,
}

impl DayOfYearInstant {
    pub fn micros_into_year(&self) -> u64 {
        (self.day_of_year as u64 - 1) * SECONDS_PER_DAY * 1_000_000 + self.micros_of_day
    }

    pub fn seconds_into_year(&self) -> f64 {
        self.micros_into_year() as f64 / 1e6
    }
}

impl fmt::Display for DayOfYearInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.micros_of_day / 1_000_000;
        let micros = self.micros_of_day % 1_000_000;
        write!(
            f,
            "{:03}:{:02}:{:02}:{:02}.{:06}",
            self.day_of_year,
            secs / 3600,
            (secs / 60) % 60,
            secs % 60,
            micros
        )
    }
}

// ---------------------------------------------------------------------------
// Decode failures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode timestamp '{token}': {reason}")]
pub struct DecodeError {
    pub token: String,
    pub reason: &'static str,
}

impl DecodeError {
    fn new(token: &str, reason: &'static str) -> Self {
        DecodeError {
            token: token.to_string(),
            reason,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Decode one time token with the given grammar.
pub fn decode(token: &str, grammar: TimeGrammar) -> Result<TimeSample, DecodeError> {
    match grammar {
        TimeGrammar::Elapsed => decode_elapsed(token).map(TimeSample::Elapsed),
        TimeGrammar::DayOfYear => decode_day_of_year(token).map(TimeSample::DayOfYear),
    }
}

/// `D:H:M:S.mmm` → `D*86400 + H*3600 + M*60 + S + mmm/1000`.
///
/// Components are not range-checked: `D` is a day counter and the
/// millisecond field is taken as an integer count, whatever its width.
pub fn decode_elapsed(token: &str) -> Result<f64, DecodeError> {
    let (days, hours, minutes, sec_field) = split_four(token)?;
    let (secs, millis) = split_fraction(token, sec_field)?;

    let whole = [days, hours, minutes, secs]
        .iter()
        .map(|part| parse_digits(part).ok_or_else(|| DecodeError::new(token, "component is not an unsigned integer")))
        .collect::<Result<Vec<u64>, _>>()?;
    let millis = parse_digits(millis).ok_or_else(|| DecodeError::new(token, "milliseconds are not an unsigned integer"))?;

    let total = whole[0]
        .checked_mul(SECONDS_PER_DAY)
        .and_then(|d| d.checked_add(whole[1].checked_mul(3600)?))
        .and_then(|t| t.checked_add(whole[2].checked_mul(60)?))
        .and_then(|t| t.checked_add(whole[3]))
        .ok_or_else(|| DecodeError::new(token, "value overflows"))?;

    Ok(total as f64 + millis as f64 / 1000.0)
}

/// `DOY:H:M:S.ffffff` with calendar range checks on every field.
pub fn decode_day_of_year(token: &str) -> Result<DayOfYearInstant, DecodeError> {
    let (doy, hours, minutes, sec_field) = split_four(token)?;
    let (secs, fraction) = split_fraction(token, sec_field)?;

    let day_of_year = parse_bounded(doy, 3)
        .filter(|d| (1..=366).contains(d))
        .ok_or_else(|| DecodeError::new(token, "day of year must be 1-366"))?;
    let hours = parse_bounded(hours, 2).ok_or_else(|| DecodeError::new(token, "malformed hour"))?;
    let minutes = parse_bounded(minutes, 2).ok_or_else(|| DecodeError::new(token, "malformed minute"))?;
    let secs = parse_bounded(secs, 2).ok_or_else(|| DecodeError::new(token, "malformed second"))?;

    if fraction.is_empty() || fraction.len() > 6 {
        return Err(DecodeError::new(token, "fraction must have 1-6 digits"));
    }
    let padded = format!("{fraction:0<6}");
    let micros = parse_digits(&padded).ok_or_else(|| DecodeError::new(token, "fraction is not numeric"))?;

    let time = NaiveTime::from_hms_micro_opt(hours as u32, minutes as u32, secs as u32, micros as u32)
        .ok_or_else(|| DecodeError::new(token, "time of day out of range"))?;

    Ok(DayOfYearInstant {
        day_of_year: day_of_year as u16,
        micros_of_day: time.num_seconds_from_midnight() as u64 * 1_000_000 + micros,
    })
}

// -- token helpers --

fn split_four(token: &str) -> Result<(&str, &str, &str, &str), DecodeError> {
    let mut parts = token.trim().split(':');
    match (parts.next(), parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), Some(c), Some(d), None) => Ok((a, b, c, d)),
        _ => Err(DecodeError::new(token, "expected 4 colon-separated fields")),
    }
}

fn split_fraction<'a>(token: &str, field: &'a str) -> Result<(&'a str, &'a str), DecodeError> {
    let mut parts = field.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(whole), Some(frac), None) => Ok((whole, frac)),
        _ => Err(DecodeError::new(token, "seconds field needs exactly one '.'")),
    }
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_bounded(s: &str, max_width: usize) -> Option<u64> {
    if s.len() > max_width {
        return None;
    }
    parse_digits(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_grammar_exact_arithmetic() {
        assert_eq!(decode_elapsed("0:00:00:01.500").unwrap(), 1.5);
        assert_eq!(decode_elapsed("2:03:15:30.250").unwrap(), 184530.25);
        // Day counter is not a calendar day.
        assert_eq!(decode_elapsed("400:00:00:00.000").unwrap(), 400.0 * 86400.0);
    }

    #[test]
    fn test_elapsed_grammar_rejects_malformed() {
        for bad in ["bad:token", "1:2:3", "1:2:3:4", "1:2:3:4.5.6", "1:2:x:4.000", "1:2:3:4.", "-1:0:0:0.000"] {
            let err = decode_elapsed(bad).unwrap_err();
            assert_eq!(err.token, bad);
        }
    }

    #[test]
    fn test_day_of_year_grammar() {
        let instant = decode_day_of_year("198:09:40:00.100").unwrap();
        assert_eq!(instant.day_of_year, 198);
        assert_eq!(instant.micros_of_day, (9 * 3600 + 40 * 60) * 1_000_000 + 100_000);
        assert_eq!(instant.to_string(), "198:09:40:00.100000");

        let a = decode("198:09:40:00.100", TimeGrammar::DayOfYear).unwrap();
        let b = decode("198:09:40:01.350000", TimeGrammar::DayOfYear).unwrap();
        assert_eq!(b.micros() - a.micros(), 1_250_000);
    }

    #[test]
    fn test_day_of_year_range_checks() {
        for bad in ["0:00:00:00.0", "367:00:00:00.0", "10:24:00:00.0", "10:00:60:00.0", "10:00:00:60.0", "10:00:00:00.1234567", "10:00:00:00.abc"] {
            assert!(decode_day_of_year(bad).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn test_day_boundary_is_continuous() {
        let before = decode("031:23:59:59.900000", TimeGrammar::DayOfYear).unwrap();
        let after = decode("032:00:00:00.100000", TimeGrammar::DayOfYear).unwrap();
        assert_eq!(after.micros() - before.micros(), 200_000);
    }

    #[test]
    fn test_micros_axis_is_exact() {
        let start = decode("198:09:40:00.000", TimeGrammar::DayOfYear).unwrap();
        let next = decode("198:09:40:00.100", TimeGrammar::DayOfYear).unwrap();
        assert_eq!(start.micros(), (197 * 86_400 + 9 * 3600 + 40 * 60) * 1_000_000);
        assert_eq!((next.micros() - start.micros()) as f64 / 1e6, 0.1);

        let elapsed = decode("0:00:00:01.500", TimeGrammar::Elapsed).unwrap();
        assert_eq!(elapsed.micros(), 1_500_000);
    }
}
