//! Descriptive statistics and pairwise correlation.
//!
//! Standard deviation is the sample estimate (N−1) everywhere in the crate.

use serde::Serialize;

use crate::data::model::{Channel, FlightDataset};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Mean and sample standard deviation of the present values.
///
/// `None` for an empty input; the deviation is NaN below two values.
pub fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() < 2 {
        f64::NAN
    } else {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1.0)).sqrt()
    };
    Some((mean, std))
}

/// Quantile with linear interpolation between closest ranks.
/// `sorted` must be ascending and non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

// ---------------------------------------------------------------------------
// Per-channel summary
// ---------------------------------------------------------------------------

/// Summary of one channel. Fields are NaN when undefined (no values, or a
/// single value for `std_dev`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelStats {
    pub name: String,
    pub count: usize,
    pub missing: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// Values outside `[q1 − 1.5·IQR, q3 + 1.5·IQR]`.
    pub iqr_outliers: usize,
}

impl ChannelStats {
    pub fn of(channel: &Channel) -> Self {
        let mut values: Vec<f64> = channel.present().collect();
        let missing = channel.values.len() - values.len();

        let Some((mean, std_dev)) = mean_and_std(&values) else {
            return ChannelStats {
                name: channel.name.clone(),
                count: 0,
                missing,
                mean: f64::NAN,
                std_dev: f64::NAN,
                min: f64::NAN,
                q1: f64::NAN,
                median: f64::NAN,
                q3: f64::NAN,
                max: f64::NAN,
                iqr_outliers: 0,
            };
        };

        values.sort_by(f64::total_cmp);
        let q1 = quantile(&values, 0.25);
        let q3 = quantile(&values, 0.75);
        let fence = 1.5 * (q3 - q1);
        let iqr_outliers = values
            .iter()
            .filter(|v| **v < q1 - fence || **v > q3 + fence)
            .count();

        ChannelStats {
            name: channel.name.clone(),
            count: values.len(),
            missing,
            mean,
            std_dev,
            min: values[0],
            q1,
            median: quantile(&values, 0.5),
            q3,
            max: values[values.len() - 1],
            iqr_outliers,
        }
    }
}

/// Statistics for the named channels, in the order given.
pub fn describe(dataset: &FlightDataset, names: &[&str]) -> Result<Vec<ChannelStats>> {
    names
        .iter()
        .map(|name| dataset.channel(name).map(ChannelStats::of))
        .collect()
}

/// Statistics for every channel in column order.
pub fn describe_all(dataset: &FlightDataset) -> Vec<ChannelStats> {
    dataset.channels.iter().map(ChannelStats::of).collect()
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Pearson correlation of every channel pair, pairwise-complete rows only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    /// Row-major, `names.len()` × `names.len()`.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.values[i][j])
    }
}

pub fn correlation_matrix(dataset: &FlightDataset) -> CorrelationMatrix {
    let channels = &dataset.channels;
    let n = channels.len();
    let mut values = vec![vec![f64::NAN; n]; n];

    for i in 0..n {
        for j in i..n {
            let r = if i == j {
                self_correlation(&channels[i])
            } else {
                pearson(&channels[i].values, &channels[j].values)
            };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        names: channels.iter().map(|c| c.name.clone()).collect(),
        values,
    }
}

/// 1.0, unless the channel has no variance to correlate.
fn self_correlation(channel: &Channel) -> f64 {
    let values: Vec<f64> = channel.present().collect();
    match mean_and_std(&values) {
        Some((_, std)) if std > 0.0 => 1.0,
        _ => f64::NAN,
    }
}

fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(name: &str, values: Vec<Option<f64>>) -> Channel {
        Channel {
            name: name.to_string(),
            parameter: name.to_string(),
            unit: None,
            values,
        }
    }

    #[test]
    fn test_stats_skip_missing_values() {
        let ch = channel("A", vec![Some(2.0), None, Some(4.0), Some(6.0), None]);
        let s = ChannelStats::of(&ch);
        assert_eq!(s.count, 3);
        assert_eq!(s.missing, 2);
        assert_eq!(s.mean, 4.0);
        assert_eq!(s.std_dev, 2.0);
        assert_eq!((s.min, s.median, s.max), (2.0, 4.0, 6.0));
        assert_eq!((s.q1, s.q3), (3.0, 5.0));
    }

    #[test]
    fn test_stats_of_empty_and_single_channels() {
        let s = ChannelStats::of(&channel("E", vec![None, None]));
        assert_eq!(s.count, 0);
        assert!(s.mean.is_nan() && s.max.is_nan());

        let s = ChannelStats::of(&channel("S", vec![Some(7.0)]));
        assert_eq!(s.mean, 7.0);
        assert!(s.std_dev.is_nan());
    }

    #[test]
    fn test_iqr_outlier_count() {
        let mut values: Vec<Option<f64>> = (0..20).map(|i| Some(10.0 + (i % 3) as f64)).collect();
        values.push(Some(500.0));
        let s = ChannelStats::of(&channel("A", values));
        assert_eq!(s.iqr_outliers, 1);
    }

    #[test]
    fn test_pearson_pairwise_complete() {
        let a = [Some(1.0), Some(2.0), Some(3.0), None, Some(5.0)];
        let b = [Some(2.0), Some(4.0), Some(6.0), Some(100.0), Some(10.0)];
        assert!((pearson(&a, &b) - 1.0).abs() < 1e-12);
        let c = [Some(5.0), Some(4.0), Some(3.0), Some(2.0), Some(1.0)];
        assert!((pearson(&a, &c) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_variance_correlation_is_nan() {
        let a = [Some(1.0), Some(1.0), Some(1.0)];
        let b = [Some(1.0), Some(2.0), Some(3.0)];
        assert!(pearson(&a, &b).is_nan());
        assert!(self_correlation(&channel("flat", a.to_vec())).is_nan());
        assert_eq!(self_correlation(&channel("ramp", b.to_vec())), 1.0);
    }
}
