//! Flight-test time-series ingestion and derived metrics.
//!
//! [`data::loader`] turns a raw instrumentation export into a
//! [`data::model::FlightDataset`]; the [`analysis`] modules derive
//! statistics, spectra, anomaly flags, channel categories and flight
//! performance from it; [`report`] and [`data::export`] serialize the results.

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod report;

pub use error::{FlightError, Result};
