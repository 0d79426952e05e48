use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::anomaly::DEFAULT_THRESHOLD_STD_DEVS;
use crate::data::loader::LoadOptions;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub loader: LoadOptions,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub anomaly_threshold: f64,
    /// Overrides both the declared and the detected rate for spectra.
    pub sampling_rate_hz: Option<f64>,
    /// Channels to transform; empty means none.
    pub spectrum_channels: Vec<String>,
    pub anomaly_channels: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            anomaly_threshold: DEFAULT_THRESHOLD_STD_DEVS,
            sampling_rate_hz: None,
            spectrum_channels: Vec::new(),
            anomaly_channels: Vec::new(),
        }
    }
}

impl AnalyzerConfig {
    /// Read a JSON config file; missing keys take their defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::HeaderMode;
    use crate::data::timestamp::TimeGrammar;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AnalyzerConfig = serde_json::from_str(
            r#"{ "loader": { "header_mode": "dual", "time_grammar": "day-of-year" },
                 "analysis": { "spectrum_channels": ["g"] } }"#,
        )
        .unwrap();
        assert_eq!(config.loader.header_mode, HeaderMode::Dual);
        assert_eq!(config.loader.time_grammar, TimeGrammar::DayOfYear);
        assert_eq!(config.loader.skip_rows, 0);
        assert_eq!(config.analysis.anomaly_threshold, 3.0);
        assert_eq!(config.analysis.spectrum_channels, vec!["g".to_string()]);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: AnalyzerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AnalyzerConfig::default());
    }
}
