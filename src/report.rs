use std::path::Path;

use log::{info, warn};
use serde::Serialize;

use crate::analysis::anomaly::{self, AnomalyFlags};
use crate::analysis::classify::{self, Classification};
use crate::analysis::performance::{self, FlightEnvelope, PerformanceMetrics};
use crate::analysis::spectrum::{self, SpectrumResult};
use crate::analysis::statistics::{self, ChannelStats, CorrelationMatrix};
use crate::config::AnalysisConfig;
use crate::data::model::{DatasetMetadata, FlightDataset, LoadReport};
use crate::error::Result;

/// Fallback when neither a declared nor a detected rate is known.
pub const DEFAULT_SAMPLING_RATE_HZ: f64 = 1.0;

// ---------------------------------------------------------------------------
// Report pieces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total_records: usize,
    pub time_range_start_s: Option<f64>,
    pub time_range_end_s: Option<f64>,
    pub duration_s: Option<f64>,
    pub channels: Vec<String>,
    #[serde(flatten)]
    pub metadata: DatasetMetadata,
}

impl DatasetSummary {
    pub fn of(dataset: &FlightDataset) -> Self {
        let start = dataset.elapsed.iter().copied().reduce(f64::min);
        let end = dataset.elapsed.iter().copied().reduce(f64::max);
        DatasetSummary {
            total_records: dataset.len(),
            time_range_start_s: start,
            time_range_end_s: end,
            duration_s: start.zip(end).map(|(s, e)| e - s),
            channels: dataset.channel_names().into_iter().map(String::from).collect(),
            metadata: dataset.metadata.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSpectrum {
    pub channel: String,
    #[serde(flatten)]
    pub spectrum: SpectrumResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelAnomalies {
    pub channel: String,
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub threshold_std_devs: f64,
    /// Elapsed time of each flagged sample.
    pub at_elapsed_s: Vec<f64>,
}

impl ChannelAnomalies {
    fn new(channel: &str, dataset: &FlightDataset, flags: &AnomalyFlags) -> Self {
        ChannelAnomalies {
            channel: channel.to_string(),
            count: flags.count(),
            mean: flags.mean,
            std_dev: flags.std_dev,
            threshold_std_devs: flags.threshold_std_devs,
            at_elapsed_s: flags.indices().into_iter().map(|i| dataset.elapsed[i]).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Full analysis report
// ---------------------------------------------------------------------------

/// Everything the presentation layer shows for one dataset.
///
/// `generated_at` is export metadata; the dataset itself carries no
/// wall-clock time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub generated_at: String,
    pub source: Option<String>,
    pub load: LoadReport,
    pub summary: DatasetSummary,
    pub categories: Classification,
    pub statistics: Vec<ChannelStats>,
    pub correlation: CorrelationMatrix,
    pub performance: PerformanceMetrics,
    pub envelope: Option<FlightEnvelope>,
    pub spectra: Vec<ChannelSpectrum>,
    pub anomalies: Vec<ChannelAnomalies>,
}

/// Sampling rate used for spectra: config override, then declared, then
/// detected, then 1 Hz.
pub fn sampling_rate_for(dataset: &FlightDataset, config: &AnalysisConfig) -> f64 {
    config
        .sampling_rate_hz
        .or_else(|| dataset.effective_sample_rate_hz())
        .unwrap_or(DEFAULT_SAMPLING_RATE_HZ)
}

impl AnalysisReport {
    pub fn build(dataset: &FlightDataset, load: &LoadReport, config: &AnalysisConfig) -> Result<Self> {
        let categories = classify::classify(dataset.channel_names());
        let performance = performance::performance_metrics(dataset, &categories)?;
        let envelope = performance::flight_envelope(dataset, &categories)?;

        let rate = sampling_rate_for(dataset, config);
        let spectra = config
            .spectrum_channels
            .iter()
            .map(|name| -> Result<ChannelSpectrum> {
                let channel = dataset.channel(name)?;
                Ok(ChannelSpectrum {
                    channel: name.clone(),
                    spectrum: spectrum::analyze(&channel.values, rate)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let anomalies = config
            .anomaly_channels
            .iter()
            .map(|name| -> Result<ChannelAnomalies> {
                let channel = dataset.channel(name)?;
                let flags = anomaly::detect(&channel.values, config.anomaly_threshold)?;
                if flags.count() > 0 {
                    warn!("{} anomalies in {name}", flags.count());
                }
                Ok(ChannelAnomalies::new(name, dataset, &flags))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AnalysisReport {
            generated_at: chrono::Local::now().to_rfc3339(),
            source: None,
            load: load.clone(),
            summary: DatasetSummary::of(dataset),
            categories,
            statistics: statistics::describe_all(dataset),
            correlation: statistics::correlation_matrix(dataset),
            performance,
            envelope,
            spectra,
            anomalies,
        })
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        info!("Wrote analysis report to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{load_str, LoadOptions};

    const INPUT: &str = "Time,ALT (ft),Nz (g)\n\
                         0:00:00:02.000,100,1.0\n\
                         0:00:00:02.500,110,1.1\n\
                         0:00:00:03.000,120,0.9\n\
                         0:00:00:03.500,,1.0\n";

    #[test]
    fn test_sampling_rate_precedence() {
        let (ds, _) = load_str(INPUT, &LoadOptions::single_header()).unwrap();
        let mut config = AnalysisConfig::default();
        assert_eq!(sampling_rate_for(&ds, &config), 2.0);

        let options = LoadOptions {
            declared_sample_rate_hz: Some(4.0),
            ..LoadOptions::single_header()
        };
        let (declared, _) = load_str(INPUT, &options).unwrap();
        assert_eq!(sampling_rate_for(&declared, &config), 4.0);

        config.sampling_rate_hz = Some(8.0);
        assert_eq!(sampling_rate_for(&declared, &config), 8.0);
    }

    #[test]
    fn test_summary_and_anomaly_times() {
        let (ds, load) = load_str(INPUT, &LoadOptions::single_header()).unwrap();
        let config = AnalysisConfig {
            anomaly_channels: vec!["Nz (g)".into()],
            anomaly_threshold: 0.5,
            ..Default::default()
        };
        let report = AnalysisReport::build(&ds, &load, &config).unwrap();

        assert_eq!(report.summary.total_records, 4);
        assert_eq!(report.summary.time_range_start_s, Some(0.0));
        assert_eq!(report.summary.duration_s, Some(1.5));
        assert_eq!(report.summary.channels, vec!["ALT (ft)", "Nz (g)"]);

        let nz = &report.anomalies[0];
        assert_eq!(nz.count, 2);
        assert_eq!(nz.at_elapsed_s, vec![0.5, 1.0]);
        assert!(report.envelope.is_none());
    }
}
