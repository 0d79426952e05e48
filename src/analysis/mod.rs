//! Derived diagnostics over a loaded [`FlightDataset`](crate::data::model::FlightDataset).
//!
//! Every function borrows the dataset read-only and returns a freshly
//! allocated result; none of them depend on each other's output except the
//! performance aggregator, which takes a [`classify::Classification`].

pub mod anomaly;
pub mod classify;
pub mod performance;
pub mod spectrum;
pub mod statistics;
