use std::collections::HashSet;
use std::path::Path;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::model::{
    canonical_name, normalize_unit, Channel, DatasetMetadata, FlightDataset, LoadReport, LoadWarning, TimeAxis,
    ELAPSED_COLUMN, TIMESTAMP_COLUMN,
};
use super::timestamp::{self, TimeGrammar, TimeSample};
use crate::error::{FlightError, Result};

// ---------------------------------------------------------------------------
// Load options
// ---------------------------------------------------------------------------

/// Header convention of a raw export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderMode {
    /// Row 0 names the columns.
    #[default]
    Single,
    /// Row 0 holds parameter names, row 1 their units.
    Dual,
}

impl HeaderMode {
    fn header_rows(self) -> usize {
        match self {
            HeaderMode::Single => 1,
            HeaderMode::Dual => 2,
        }
    }

    fn default_delimiter(self) -> char {
        match self {
            HeaderMode::Single => ',',
            HeaderMode::Dual => '\t',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub header_mode: HeaderMode,
    /// Rows to skip between the header block and the data (e.g. 2 for the
    /// unit and code rows some single-header exports carry).
    pub skip_rows: usize,
    /// Overrides the header mode's default delimiter.
    pub delimiter: Option<char>,
    pub time_grammar: TimeGrammar,
    pub declared_sample_rate_hz: Option<f64>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::single_header()
    }
}

impl LoadOptions {
    /// Comma-separated, one header row, elapsed-time tokens.
    pub fn single_header() -> Self {
        LoadOptions {
            header_mode: HeaderMode::Single,
            skip_rows: 0,
            delimiter: None,
            time_grammar: TimeGrammar::Elapsed,
            declared_sample_rate_hz: None,
        }
    }

    /// Tab-separated, parameter + unit header rows, day-of-year tokens.
    pub fn dual_header() -> Self {
        LoadOptions {
            header_mode: HeaderMode::Dual,
            skip_rows: 0,
            delimiter: None,
            time_grammar: TimeGrammar::DayOfYear,
            declared_sample_rate_hz: None,
        }
    }

    /// Guess the convention from the file extension.
    pub fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "tsv" | "txt" => Self::dual_header(),
            _ => Self::single_header(),
        }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
            .unwrap_or_else(|| self.header_mode.default_delimiter())
    }

    fn delimiter_byte(&self) -> Result<u8> {
        let delimiter = self.delimiter();
        u8::try_from(delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(FlightError::InvalidDelimiter(delimiter))
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Read and load a raw export from disk.
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<(FlightDataset, LoadReport)> {
    let content = std::fs::read_to_string(path)?;
    let loaded = load_str(&content, options)?;
    info!(
        "Loaded {} rows x {} channels from {}",
        loaded.0.len(),
        loaded.0.channels.len(),
        path.display()
    );
    Ok(loaded)
}

/// Parse raw export content into a dataset.
///
/// Steps run in a fixed order: header names, field-count filter, timestamp
/// decode (dropping failures), numeric coercion, elapsed time.
pub fn load_str(content: &str, options: &LoadOptions) -> Result<(FlightDataset, LoadReport)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let records = read_records(content, options.delimiter_byte()?)?;

    // 1. Header row(s) → canonical column names.
    let data_start = options.header_mode.header_rows() + options.skip_rows;
    if records.len() <= data_start {
        return Err(FlightError::EmptyInput);
    }
    let parameters = &records[0].fields;
    let units = match options.header_mode {
        HeaderMode::Single => None,
        HeaderMode::Dual => Some(&records[1].fields),
    };
    let columns = channel_columns(parameters, units.map(Vec::as_slice));
    let expected = parameters.len();

    // 2. Keep rows with exactly the header's field count.
    let data = &records[data_start..];
    let input_rows = data.len();
    let mut accepted = Vec::with_capacity(input_rows);
    let mut dropped_field_count = 0;
    for record in data {
        if record.fields.len() == expected {
            accepted.push(record);
        } else {
            let mismatch = FlightError::FieldCountMismatch {
                line: record.line,
                expected,
                found: record.fields.len(),
            };
            debug!("Skipping row: {mismatch}");
            dropped_field_count += 1;
        }
    }
    if accepted.is_empty() {
        return Err(FlightError::NoValidRows {
            rows: input_rows,
            expected,
        });
    }

    // 3. Decode column 0; drop rows that fail.
    let decoded: Vec<_> = accepted
        .iter()
        .map(|record| timestamp::decode(&record.fields[0], options.time_grammar))
        .collect();
    let mut warnings = Vec::new();
    let mut dropped_timestamp = 0;
    let (rows, timestamps, time_axis) = if decoded.iter().all(|d| d.is_err()) {
        warn!(
            "No valid timestamps in {} rows; using row index as elapsed time",
            accepted.len()
        );
        warnings.push(LoadWarning::NoValidTimestamps {
            rows: accepted.len(),
        });
        let timestamps = vec![None; accepted.len()];
        (accepted, timestamps, TimeAxis::RowIndex)
    } else {
        let mut rows = Vec::with_capacity(accepted.len());
        let mut timestamps = Vec::with_capacity(accepted.len());
        for (record, sample) in accepted.into_iter().zip(decoded) {
            match sample {
                Ok(sample) => {
                    rows.push(record);
                    timestamps.push(Some(sample));
                }
                Err(e) => {
                    debug!("Dropping line {}: {}", record.line, FlightError::from(e));
                    dropped_timestamp += 1;
                }
            }
        }
        (rows, timestamps, TimeAxis::Decoded)
    };

    // 4. Coerce channel cells; failures become missing values.
    let channels: Vec<Channel> = columns
        .into_iter()
        .enumerate()
        .map(|(i, column)| Channel {
            values: rows.iter().map(|r| parse_numeric(&r.fields[i + 1])).collect(),
            name: column.name,
            parameter: column.parameter,
            unit: column.unit,
        })
        .collect();

    // 5. Elapsed time.
    let elapsed = match time_axis {
        TimeAxis::RowIndex => (0..rows.len()).map(|i| i as f64).collect(),
        TimeAxis::Decoded => elapsed_from(&timestamps),
    };
    let reversals = elapsed.windows(2).filter(|w| w[1] < w[0]).count();
    if reversals > 0 {
        warn!("Time axis goes backwards {reversals} times");
        warnings.push(LoadWarning::TimeReversals { count: reversals });
    }
    let detected_sample_rate_hz = match time_axis {
        TimeAxis::Decoded => detect_sample_rate(&timestamps),
        TimeAxis::RowIndex => None,
    };

    let dataset = FlightDataset {
        time_tokens: rows.iter().map(|r| r.fields[0].clone()).collect(),
        timestamps,
        elapsed,
        channels,
        metadata: DatasetMetadata {
            source_rows: input_rows,
            time_grammar: options.time_grammar,
            time_axis,
            detected_sample_rate_hz,
            declared_sample_rate_hz: options.declared_sample_rate_hz,
        },
    };

    // 6. Report.
    let report = LoadReport {
        input_rows,
        dropped_field_count,
        dropped_timestamp,
        output_rows: dataset.len(),
        time_axis,
        warnings,
    };
    debug!("{report:?}");

    Ok((dataset, report))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Record {
    line: u64,
    fields: Vec<String>,
}

struct Column {
    name: String,
    parameter: String,
    unit: Option<String>,
}

fn read_records(content: &str, delimiter: u8) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .quoting(false)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        records.push(Record {
            line: record.position().map(|p| p.line()).unwrap_or(0),
            fields: record.iter().map(str::to_string).collect(),
        });
    }
    Ok(records)
}

/// Columns 1.. of the header, named `"Parameter (Unit)"` and made unique.
fn channel_columns(parameters: &[String], units: Option<&[String]>) -> Vec<Column> {
    let mut taken: HashSet<String> = [TIMESTAMP_COLUMN, ELAPSED_COLUMN]
        .iter()
        .map(|s| s.to_string())
        .collect();

    parameters
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, parameter)| {
            let unit = normalize_unit(units.and_then(|u| u.get(i)).map(String::as_str));
            let base = canonical_name(parameter, unit);
            let name = unique_name(&base, &mut taken);
            Column {
                name,
                parameter: parameter.clone(),
                unit: unit.map(str::to_string),
            }
        })
        .collect()
}

/// `g`, `g.1`, `g.2`, … for repeated names.
fn unique_name(base: &str, taken: &mut HashSet<String>) -> String {
    let mut name = base.to_string();
    let mut suffix = 1;
    while taken.contains(&name) {
        name = format!("{base}.{suffix}");
        suffix += 1;
    }
    taken.insert(name.clone());
    name
}

fn parse_numeric(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Seconds since the earliest sample, so elapsed time is never negative.
fn elapsed_from(timestamps: &[Option<TimeSample>]) -> Vec<f64> {
    let micros: Vec<i64> = timestamps.iter().flatten().map(TimeSample::micros).collect();
    let origin = micros.iter().copied().min().unwrap_or(0);
    micros.iter().map(|m| (m - origin) as f64 / 1e6).collect()
}

/// `1 / median` of the positive steps between consecutive samples.
fn detect_sample_rate(timestamps: &[Option<TimeSample>]) -> Option<f64> {
    let micros: Vec<i64> = timestamps.iter().flatten().map(TimeSample::micros).collect();
    let mut deltas: Vec<i64> = micros
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 0)
        .collect();
    if deltas.is_empty() {
        return None;
    }
    deltas.sort_unstable();
    let mid = deltas.len() / 2;
    let median_micros = if deltas.len() % 2 == 0 {
        (deltas[mid - 1] + deltas[mid]) as f64 / 2.0
    } else {
        deltas[mid] as f64
    };
    Some(1e6 / median_micros)
}
