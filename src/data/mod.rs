/// Data layer: time decoding, loading and export.
///
/// Architecture:
/// ```text
///  raw export (.csv / .tsv / .txt)
///        │
///        ▼
///   ┌──────────┐   ┌───────────┐
///   │  loader   │──▶│ timestamp  │  decode column 0
///   └──────────┘   └───────────┘
///        │
///        ▼
///   ┌───────────────┐
///   │ FlightDataset  │  time axis + channels in column order
///   └───────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  delimited / parquet
///   └──────────┘
/// ```

pub mod export;
pub mod loader;
pub mod model;
pub mod timestamp;
