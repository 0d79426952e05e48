use serde::Serialize;

use super::statistics::mean_and_std;
use crate::error::{FlightError, Result};

pub const DEFAULT_THRESHOLD_STD_DEVS: f64 = 3.0;

/// Per-sample anomaly flags for one channel, aligned to its rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyFlags {
    pub flags: Vec<bool>,
    pub mean: f64,
    pub std_dev: f64,
    pub threshold_std_devs: f64,
}

impl AnomalyFlags {
    pub fn count(&self) -> usize {
        self.flags.iter().filter(|f| **f).count()
    }

    /// Row indices of flagged samples.
    pub fn indices(&self) -> Vec<usize> {
        self.flags
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.then_some(i))
            .collect()
    }
}

/// Flag samples with `|x − mean| > threshold · stddev`.
///
/// Missing samples are never flagged and do not enter mean or stddev.
pub fn detect(values: &[Option<f64>], threshold_std_devs: f64) -> Result<AnomalyFlags> {
    if !(threshold_std_devs.is_finite() && threshold_std_devs > 0.0) {
        return Err(FlightError::InvalidThreshold(threshold_std_devs));
    }

    let present: Vec<f64> = values.iter().filter_map(|v| *v).collect();
    let (mean, std_dev) = mean_and_std(&present).unwrap_or((f64::NAN, f64::NAN));
    let limit = threshold_std_devs * std_dev;

    // NaN limits (fewer than two samples) compare false, so nothing is flagged.
    let flags = values
        .iter()
        .map(|v| v.is_some_and(|x| (x - mean).abs() > limit))
        .collect();

    Ok(AnomalyFlags {
        flags,
        mean,
        std_dev,
        threshold_std_devs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_single_spike_is_flagged() {
        let mut values = vec![0.0; 20];
        values.push(100.0);
        let result = detect(&some(&values), DEFAULT_THRESHOLD_STD_DEVS).unwrap();
        assert_eq!(result.indices(), vec![20]);
    }

    #[test]
    fn test_short_series_needs_lower_threshold() {
        // With five samples the largest attainable z-score is 4/sqrt(5).
        let values = some(&[0.0, 0.0, 0.0, 0.0, 100.0]);
        assert_eq!(detect(&values, 3.0).unwrap().count(), 0);
        assert_eq!(detect(&values, 1.5).unwrap().flags, vec![false, false, false, false, true]);
    }

    #[test]
    fn test_missing_values_never_flagged() {
        let mut values = some(&[0.0; 20]);
        values.push(Some(100.0));
        values.insert(3, None);
        let result = detect(&values, 0.001).unwrap();
        assert!(!result.flags[3]);
        assert_eq!(result.flags.len(), 22);
        assert_eq!(result.mean, 100.0 / 21.0);
    }

    #[test]
    fn test_constant_channel_has_no_anomalies() {
        let result = detect(&some(&[5.0; 10]), 1.0).unwrap();
        assert_eq!(result.count(), 0);
        let result = detect(&[Some(1.0), None], 1.0).unwrap();
        assert_eq!(result.count(), 0);
    }

    #[test]
    fn test_threshold_must_be_positive() {
        for bad in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                detect(&some(&[1.0, 2.0]), bad),
                Err(FlightError::InvalidThreshold(_))
            ));
        }
    }
}
