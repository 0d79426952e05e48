use serde::Serialize;

use super::classify::{ChannelCategory, Classification};
use crate::data::model::FlightDataset;
use crate::error::Result;

fn is_rate_name(name: &str) -> bool {
    name.to_lowercase().contains("rate")
}

/// Speed channels an envelope can be drawn against; Mach numbers are not.
const ENVELOPE_SPEED_KEYWORDS: [&str; 3] = ["cas", "tas", "speed"];

fn is_envelope_speed(name: &str) -> bool {
    let lower = name.to_lowercase();
    ENVELOPE_SPEED_KEYWORDS.iter().any(|k| lower.contains(k)) && !lower.contains("rate")
}

// ---------------------------------------------------------------------------
// Performance metrics
// ---------------------------------------------------------------------------

/// Derived flight metrics. A metric is `None` when its source channel is
/// absent or has no present values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub altitude_channel: Option<String>,
    pub max_altitude: Option<f64>,
    pub min_altitude: Option<f64>,
    pub altitude_range: Option<f64>,

    pub climb_rate_channel: Option<String>,
    pub max_climb_rate: Option<f64>,
    pub max_descent_rate: Option<f64>,

    pub speed_channel: Option<String>,
    pub max_speed: Option<f64>,
    pub min_speed: Option<f64>,
    pub mean_speed: Option<f64>,

    pub duration_min: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Extent {
    min: f64,
    max: f64,
    mean: f64,
}

fn extent(dataset: &FlightDataset, name: &str) -> Result<Option<Extent>> {
    let channel = dataset.channel(name)?;
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in channel.present() {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    Ok((count > 0).then(|| Extent {
        min,
        max,
        mean: sum / count as f64,
    }))
}

impl PerformanceMetrics {
    /// Display labels and values of the metrics that are present, in a
    /// fixed order.
    pub fn labelled(&self) -> Vec<(&'static str, f64)> {
        [
            ("Max Altitude", self.max_altitude),
            ("Min Altitude", self.min_altitude),
            ("Altitude Range", self.altitude_range),
            ("Max Climb Rate", self.max_climb_rate),
            ("Max Descent Rate", self.max_descent_rate),
            ("Max Speed", self.max_speed),
            ("Min Speed", self.min_speed),
            ("Average Speed", self.mean_speed),
            ("Flight Duration (min)", self.duration_min),
        ]
        .into_iter()
        .filter_map(|(label, value)| Some((label, value?)))
        .collect()
    }
}

/// Aggregate metrics from the first channel of each relevant category.
///
/// Altitude channels whose name contains `rate` feed the climb/descent
/// metrics only, never the plain altitude extent.
pub fn performance_metrics(
    dataset: &FlightDataset,
    classification: &Classification,
) -> Result<PerformanceMetrics> {
    let mut metrics = PerformanceMetrics::default();
    let altitude = classification.channels(ChannelCategory::Altitude);

    if let Some(name) = altitude.iter().find(|n| !is_rate_name(n)) {
        metrics.altitude_channel = Some(name.clone());
        if let Some(e) = extent(dataset, name)? {
            metrics.max_altitude = Some(e.max);
            metrics.min_altitude = Some(e.min);
            metrics.altitude_range = Some(e.max - e.min);
        }
    }

    if let Some(name) = altitude.iter().find(|n| is_rate_name(n)) {
        metrics.climb_rate_channel = Some(name.clone());
        if let Some(e) = extent(dataset, name)? {
            metrics.max_climb_rate = Some(e.max);
            metrics.max_descent_rate = Some(e.min.abs());
        }
    }

    if let Some(name) = classification.channels(ChannelCategory::Speed).first() {
        metrics.speed_channel = Some(name.clone());
        if let Some(e) = extent(dataset, name)? {
            metrics.max_speed = Some(e.max);
            metrics.min_speed = Some(e.min);
            metrics.mean_speed = Some(e.mean);
        }
    }

    // Row-index axes give a span in rows, not seconds.
    metrics.duration_min = dataset.duration_s().map(|s| s / 60.0);

    Ok(metrics)
}

// ---------------------------------------------------------------------------
// Flight envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnvelopePoint {
    pub elapsed_s: f64,
    pub speed: f64,
    pub altitude: f64,
}

/// Altitude against speed over time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightEnvelope {
    pub altitude_channel: String,
    pub speed_channel: String,
    /// Rows where both channels are present.
    pub points: Vec<EnvelopePoint>,
}

/// Pair the first non-rate altitude channel with the first CAS, TAS or
/// speed channel. `None` when either is missing.
pub fn flight_envelope(
    dataset: &FlightDataset,
    classification: &Classification,
) -> Result<Option<FlightEnvelope>> {
    let altitude = classification
        .channels(ChannelCategory::Altitude)
        .iter()
        .find(|n| !is_rate_name(n));
    let speed = classification
        .channels(ChannelCategory::Speed)
        .iter()
        .find(|n| is_envelope_speed(n));
    let (Some(altitude), Some(speed)) = (altitude, speed) else {
        return Ok(None);
    };

    let alt_values = &dataset.channel(altitude)?.values;
    let speed_values = &dataset.channel(speed)?.values;
    let points = dataset
        .elapsed
        .iter()
        .zip(alt_values.iter().zip(speed_values))
        .filter_map(|(t, (a, s))| {
            Some(EnvelopePoint {
                elapsed_s: *t,
                speed: (*s)?,
                altitude: (*a)?,
            })
        })
        .collect();

    Ok(Some(FlightEnvelope {
        altitude_channel: altitude.clone(),
        speed_channel: speed.clone(),
        points,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classify::classify;
    use crate::data::loader::{load_str, LoadOptions};

    const FLIGHT: &str = "Time,ALT (ft),Altitude Rate (ft/min),TAS (kt),CAS (kt),N1\n\
                          0:00:00:00.000,1000,0,100,95,80\n\
                          0:00:01:00.000,1500,600,n/a,100,81\n\
                          0:00:02:00.000,1200,-900,120,110,82\n\
                          0:00:03:00.000,,0,140,115,83\n";

    fn metrics(input: &str) -> PerformanceMetrics {
        let (ds, _) = load_str(input, &LoadOptions::single_header()).unwrap();
        let classes = classify(ds.channel_names());
        performance_metrics(&ds, &classes).unwrap()
    }

    #[test]
    fn test_rate_named_altitude_is_kept_apart() {
        let m = metrics(FLIGHT);
        assert_eq!(m.altitude_channel.as_deref(), Some("ALT (ft)"));
        assert_eq!(m.max_altitude, Some(1500.0));
        assert_eq!(m.min_altitude, Some(1000.0));
        assert_eq!(m.altitude_range, Some(500.0));
        assert_eq!(m.climb_rate_channel.as_deref(), Some("Altitude Rate (ft/min)"));
        assert_eq!(m.max_climb_rate, Some(600.0));
        assert_eq!(m.max_descent_rate, Some(900.0));
    }

    #[test]
    fn test_first_speed_channel_and_duration() {
        let m = metrics(FLIGHT);
        assert_eq!(m.speed_channel.as_deref(), Some("TAS (kt)"));
        assert_eq!(m.max_speed, Some(140.0));
        assert_eq!(m.min_speed, Some(100.0));
        assert_eq!(m.mean_speed, Some(120.0));
        assert_eq!(m.duration_min, Some(3.0));
    }

    #[test]
    fn test_absent_categories_are_omitted() {
        let m = metrics("Time,N1\n0:00:00:00.000,1\n0:00:00:01.000,2\n");
        assert_eq!(m.max_altitude, None);
        assert_eq!(m.max_speed, None);
        assert_eq!(m.max_climb_rate, None);
        assert_eq!(m.labelled(), vec![("Flight Duration (min)", 1.0 / 60.0)]);
    }

    #[test]
    fn test_row_index_axis_still_has_duration() {
        let m = metrics("Time,ALT\nx,1\ny,2\nz,3\n");
        assert_eq!(m.duration_min, Some(2.0 / 60.0));
        assert_eq!(m.max_altitude, Some(3.0));
    }

    #[test]
    fn test_envelope_uses_complete_rows() {
        let (ds, _) = load_str(FLIGHT, &LoadOptions::single_header()).unwrap();
        let classes = classify(ds.channel_names());
        let envelope = flight_envelope(&ds, &classes).unwrap().unwrap();
        assert_eq!(envelope.altitude_channel, "ALT (ft)");
        assert_eq!(envelope.speed_channel, "TAS (kt)");
        assert_eq!(
            envelope.points,
            vec![
                EnvelopePoint { elapsed_s: 0.0, speed: 100.0, altitude: 1000.0 },
                EnvelopePoint { elapsed_s: 120.0, speed: 120.0, altitude: 1200.0 },
            ]
        );
    }

    #[test]
    fn test_envelope_skips_mach() {
        let input = "Time,ALT (ft),MACH,CAS (kt)\n\
                     0:00:00:00.000,1000,0.3,180\n\
                     0:00:00:01.000,1100,0.31,185\n";
        let (ds, _) = load_str(input, &LoadOptions::single_header()).unwrap();
        let classes = classify(ds.channel_names());
        assert_eq!(classes.channels(ChannelCategory::Speed)[0], "MACH");

        let envelope = flight_envelope(&ds, &classes).unwrap().unwrap();
        assert_eq!(envelope.speed_channel, "CAS (kt)");
        assert_eq!(envelope.points[1].speed, 185.0);

        let only_mach = "Time,ALT (ft),MACH\n0:00:00:00.000,1000,0.3\n";
        let (ds, _) = load_str(only_mach, &LoadOptions::single_header()).unwrap();
        let classes = classify(ds.channel_names());
        assert_eq!(flight_envelope(&ds, &classes).unwrap(), None);
    }
}
