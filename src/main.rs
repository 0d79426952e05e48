use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

use flight_analyzer::config::AnalyzerConfig;
use flight_analyzer::data::export;
use flight_analyzer::data::loader::{self, HeaderMode, LoadOptions};
use flight_analyzer::data::model::LoadWarning;
use flight_analyzer::data::timestamp::TimeGrammar;
use flight_analyzer::report::{sampling_rate_for, AnalysisReport};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Raw instrumentation export.
    input: PathBuf,

    /// JSON config file; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    header_mode: Option<HeaderMode>,

    /// Rows to skip after the header block.
    #[arg(long)]
    skip_rows: Option<usize>,

    #[arg(long)]
    delimiter: Option<char>,

    #[arg(long, value_enum)]
    time_grammar: Option<TimeGrammar>,

    /// Declared sampling rate in Hz.
    #[arg(long)]
    sample_rate: Option<f64>,

    /// Anomaly threshold in standard deviations.
    #[arg(long)]
    threshold: Option<f64>,

    /// Channel to transform (repeatable).
    #[arg(long = "spectrum")]
    spectrum_channels: Vec<String>,

    /// Channel to scan for anomalies (repeatable).
    #[arg(long = "anomalies")]
    anomaly_channels: Vec<String>,

    #[arg(long)]
    export_csv: Option<PathBuf>,

    #[arg(long)]
    export_parquet: Option<PathBuf>,

    #[arg(long)]
    report_json: Option<PathBuf>,
}

impl Args {
    fn resolve_config(&self) -> Result<AnalyzerConfig> {
        let mut config = match &self.config {
            Some(path) => AnalyzerConfig::from_path(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => AnalyzerConfig {
                loader: LoadOptions::for_path(&self.input),
                ..Default::default()
            },
        };

        let loader = &mut config.loader;
        if let Some(mode) = self.header_mode {
            loader.header_mode = mode;
            if self.time_grammar.is_none() && self.config.is_none() {
                loader.time_grammar = match mode {
                    HeaderMode::Single => TimeGrammar::Elapsed,
                    HeaderMode::Dual => TimeGrammar::DayOfYear,
                };
            }
        }
        if let Some(rows) = self.skip_rows {
            loader.skip_rows = rows;
        }
        if self.delimiter.is_some() {
            loader.delimiter = self.delimiter;
        }
        if let Some(grammar) = self.time_grammar {
            loader.time_grammar = grammar;
        }
        if self.sample_rate.is_some() {
            loader.declared_sample_rate_hz = self.sample_rate;
        }

        let analysis = &mut config.analysis;
        if let Some(threshold) = self.threshold {
            analysis.anomaly_threshold = threshold;
        }
        analysis.spectrum_channels.extend(self.spectrum_channels.iter().cloned());
        analysis.anomaly_channels.extend(self.anomaly_channels.iter().cloned());

        Ok(config)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    if let Err(e) = run(Args::parse()) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = args.resolve_config()?;
    let (dataset, load_report) = loader::load_file(&args.input, &config.loader)
        .with_context(|| format!("loading {}", args.input.display()))?;

    for warning in &load_report.warnings {
        match warning {
            LoadWarning::NoValidTimestamps { rows } => {
                warn!("{rows} rows have no decodable timestamp; elapsed time is the row index")
            }
            LoadWarning::TimeReversals { count } => warn!("time axis goes backwards {count} times"),
        }
    }

    let report = AnalysisReport::build(&dataset, &load_report, &config.analysis)
        .context("analysing dataset")?
        .with_source(args.input.display().to_string());

    print_report(&report, sampling_rate_for(&dataset, &config.analysis));

    if let Some(path) = &args.export_csv {
        export::export_csv(&dataset, path).with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &args.export_parquet {
        export::export_parquet(&dataset, path)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &args.report_json {
        report
            .write_json(path)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    info!("Done");
    Ok(())
}

// ---------------------------------------------------------------------------
// Console output
// ---------------------------------------------------------------------------

fn print_report(report: &AnalysisReport, sampling_rate_hz: f64) {
    let load = &report.load;
    let summary = &report.summary;

    println!("=== LOAD ===");
    println!(
        "rows: {} read, {} kept, {} dropped ({} field count, {} timestamp)",
        load.input_rows,
        load.output_rows,
        load.dropped_rows(),
        load.dropped_field_count,
        load.dropped_timestamp
    );
    if let Some(duration) = summary.duration_s {
        println!("duration: {duration:.2} s");
    }
    if let Some(rate) = summary.metadata.detected_sample_rate_hz {
        println!("detected sample rate: {rate:.2} Hz");
    }

    println!("\n=== CHANNELS ===");
    for (category, names) in &report.categories.0 {
        if !names.is_empty() {
            println!("{category}: {}", names.join(", "));
        }
    }

    println!("\n=== STATISTICS ===");
    println!(
        "{:<32} {:>7} {:>12} {:>12} {:>12} {:>12} {:>5}",
        "channel", "count", "mean", "std", "min", "max", "iqr!"
    );
    for s in &report.statistics {
        println!(
            "{:<32} {:>7} {:>12.3} {:>12.3} {:>12.3} {:>12.3} {:>5}",
            s.name, s.count, s.mean, s.std_dev, s.min, s.max, s.iqr_outliers
        );
    }

    let metrics = report.performance.labelled();
    if !metrics.is_empty() {
        println!("\n=== PERFORMANCE ===");
        for (label, value) in metrics {
            println!("{label}: {value:.2}");
        }
    }
    if let Some(envelope) = &report.envelope {
        println!(
            "envelope: {} vs {} ({} points)",
            envelope.altitude_channel,
            envelope.speed_channel,
            envelope.points.len()
        );
    }

    if !report.spectra.is_empty() {
        println!("\n=== SPECTRA (fs = {sampling_rate_hz:.3} Hz) ===");
        for s in &report.spectra {
            println!(
                "{}: dominant {:.3} Hz (n = {}, resolution {:.4} Hz)",
                s.channel,
                s.spectrum.dominant_frequency,
                s.spectrum.sample_count,
                s.spectrum.resolution_hz()
            );
        }
    }

    if !report.anomalies.is_empty() {
        println!("\n=== ANOMALIES ===");
        for a in &report.anomalies {
            println!(
                "{}: {} beyond {}σ (mean {:.3}, std {:.3})",
                a.channel, a.count, a.threshold_std_devs, a.mean, a.std_dev
            );
        }
    }
}
