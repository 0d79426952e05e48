use serde::Serialize;

use super::timestamp::{TimeGrammar, TimeSample};
use crate::error::{FlightError, Result};

/// Canonical name of the raw time column (column 0 of every export).
pub const TIMESTAMP_COLUMN: &str = "Timestamp";
/// Canonical name of the derived elapsed-time column.
pub const ELAPSED_COLUMN: &str = "Elapsed Time (s)";

/// Unit token that means "no unit" in dual-header exports (case-sensitive).
pub const UNIT_SENTINEL: &str = "EU";

// ---------------------------------------------------------------------------
// Channel – one numeric series
// ---------------------------------------------------------------------------

/// A named numeric series. `None` marks a cell that failed numeric coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Canonical display name, unique inside a dataset.
    pub name: String,
    pub parameter: String,
    pub unit: Option<String>,
    pub values: Vec<Option<f64>>,
}

impl Channel {
    /// Iterator over the non-missing samples, in row order.
    pub fn present(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().filter_map(|v| *v)
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }
}

/// `"Parameter (Unit)"`, or just `"Parameter"` when the unit is blank or the
/// `EU` sentinel.
pub fn canonical_name(parameter: &str, unit: Option<&str>) -> String {
    match normalize_unit(unit) {
        Some(unit) => format!("{parameter} ({unit})"),
        None => parameter.to_string(),
    }
}

pub(crate) fn normalize_unit(unit: Option<&str>) -> Option<&str> {
    unit.map(str::trim)
        .filter(|u| !u.is_empty() && *u != UNIT_SENTINEL)
}

// ---------------------------------------------------------------------------
// Load report
// ---------------------------------------------------------------------------

/// Where the elapsed-time column came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeAxis {
    /// Decoded from column 0, measured from the earliest valid sample.
    Decoded,
    /// No timestamp decoded at all; elapsed time is the row index.
    RowIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LoadWarning {
    /// Every accepted row had an undecodable timestamp.
    NoValidTimestamps { rows: usize },
    /// Decoded time went backwards between consecutive rows.
    TimeReversals { count: usize },
}

/// Counts of rows kept and dropped by one load attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Non-blank rows after the header block.
    pub input_rows: usize,
    pub dropped_field_count: usize,
    pub dropped_timestamp: usize,
    pub output_rows: usize,
    pub time_axis: TimeAxis,
    pub warnings: Vec<LoadWarning>,
}

impl LoadReport {
    pub fn dropped_rows(&self) -> usize {
        self.dropped_field_count + self.dropped_timestamp
    }
}

// ---------------------------------------------------------------------------
// FlightDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetMetadata {
    /// Data rows seen before any filtering.
    pub source_rows: usize,
    pub time_grammar: TimeGrammar,
    pub time_axis: TimeAxis,
    /// `1 / median(Δt)` over the decoded time axis.
    pub detected_sample_rate_hz: Option<f64>,
    pub declared_sample_rate_hz: Option<f64>,
}

/// Time-indexed table of channels, built once by the loader.
///
/// All row-aligned vectors (`time_tokens`, `timestamps`, `elapsed` and every
/// channel's `values`) have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightDataset {
    /// Raw column-0 tokens, kept for export.
    pub time_tokens: Vec<String>,
    /// Decoded samples; all `None` only when the time axis is `RowIndex`.
    pub timestamps: Vec<Option<TimeSample>>,
    /// Seconds since the earliest decoded sample.
    pub elapsed: Vec<f64>,
    /// Channels in canonical column order.
    pub channels: Vec<Channel>,
    pub metadata: DatasetMetadata,
}

impl FlightDataset {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.elapsed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elapsed.is_empty()
    }

    /// Channel names in column order (time columns excluded).
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    /// Full column order as exported: timestamp, channels, elapsed time.
    pub fn column_names(&self) -> Vec<&str> {
        std::iter::once(TIMESTAMP_COLUMN)
            .chain(self.channels.iter().map(|c| c.name.as_str()))
            .chain(std::iter::once(ELAPSED_COLUMN))
            .collect()
    }

    /// Position of a channel in column order.
    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name == name)
    }

    pub fn channel(&self, name: &str) -> Result<&Channel> {
        self.channels
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| FlightError::UnknownChannel(name.to_string()))
    }

    pub fn duration_s(&self) -> Option<f64> {
        self.elapsed.iter().copied().reduce(f64::max)
    }

    /// Declared rate if present, else the detected one.
    pub fn effective_sample_rate_hz(&self) -> Option<f64> {
        self.metadata
            .declared_sample_rate_hz
            .or(self.metadata.detected_sample_rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_name_with_unit() {
        assert_eq!(canonical_name("ALT", Some("ft")), "ALT (ft)");
        assert_eq!(canonical_name("ALT", Some(" ft ")), "ALT (ft)");
    }

    #[test]
    fn test_canonical_name_suppresses_placeholder_units() {
        assert_eq!(canonical_name("MACH", Some("EU")), "MACH");
        assert_eq!(canonical_name("MACH", Some("  ")), "MACH");
        assert_eq!(canonical_name("MACH", None), "MACH");
        // Sentinel match is case-sensitive.
        assert_eq!(canonical_name("MACH", Some("eu")), "MACH (eu)");
    }

    #[test]
    fn test_channel_present_skips_missing() {
        let ch = Channel {
            name: "N1 (%)".into(),
            parameter: "N1".into(),
            unit: Some("%".into()),
            values: vec![Some(1.0), None, Some(3.0)],
        };
        assert_eq!(ch.present().collect::<Vec<_>>(), vec![1.0, 3.0]);
        assert_eq!(ch.missing_count(), 1);
    }
}
