// mmparse: Reconstruction of Traffic and Queue Time Series from Link-Emulator Event Logs
// Copyright (C) 2024-2025 The mmparse authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//! Reconstruct all emulator logs below a result directory and collect their summaries in one
//! table.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{MultiProgress, ParallelProgressIterator, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use itertools::{Either, Itertools};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::Serialize;

use mmparse::{
    export::write_csv_file,
    reconstruct::{DepartureField, ReconstructorConfig, DEFAULT_BIN_WIDTH_MS},
    util::{config_for_log, reconstruct_file, PathBufExt},
};
use mmparse_utils::{
    files::{find_logs, timestamped_name, Link, LogFilter, RunName},
    stats::RateStats,
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Directory to search for logs.
    #[arg(default_value = "./data/")]
    root: PathBuf,
    /// Link direction of the logs to analyze.
    #[arg(short, long, value_enum, default_value_t = Link::Downlink)]
    link: Link,
    /// Only analyze logs whose path contains this string.
    #[arg(short, long, default_value = "")]
    filter: String,
    /// Result table. Defaults to `results_<timestamp>.csv` in the current directory.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Width of a bin in milliseconds.
    #[arg(short, long = "bin-width", default_value_t = DEFAULT_BIN_WIDTH_MS)]
    bin_width: u64,
    /// Ignore the first seconds of every log when summarizing.
    #[arg(short, long = "skip-seconds", default_value_t = 0.0)]
    skip_seconds: f64,
    /// Queue bound in bytes to use for logs that neither state one nor carry `_q<bytes>_` in
    /// their file name.
    #[arg(short, long = "queue-bytes")]
    queue_bytes: Option<u64>,
    /// Departure lines carry the queueing delay (ms) instead of the queue length.
    #[arg(short, long)]
    delays: bool,
    /// Also write the time series of every log next to it, as `<log>_series.csv`.
    #[arg(short, long = "export-series")]
    export_series: bool,
    /// Number of worker threads.
    #[arg(short, long, default_value_t = num_cpus::get())]
    threads: usize,
}

/// One row of the result table. Undefined averages (and delays of logs without delays) are
/// written as `NaN`.
#[derive(Clone, Debug, Serialize)]
struct Record {
    file: String,
    trace: String,
    buffer_bytes: Option<u64>,
    bin_width_ms: u64,
    duration_s: f64,
    capacity_mbps: f64,
    ingress_mbps: f64,
    throughput_mbps: f64,
    utilization: f64,
    mean_queue_bytes: f64,
    max_queue_bytes: Option<u64>,
    delay_min: f64,
    delay_max: f64,
    delay_avg: f64,
    delay_std: f64,
    delay_25: f64,
    delay_50: f64,
    delay_75: f64,
    warnings: usize,
}

fn main() -> Result<()> {
    let logger = pretty_env_logger::formatted_builder()
        .parse_default_env()
        .build();
    let level = logger.filter();
    let multi = MultiProgress::new();
    LogWrapper::new(multi.clone(), logger)
        .try_init()
        .context("Cannot initialize logging")?;
    log::set_max_level(level);

    let args = Args::parse();
    let config = ReconstructorConfig::default()
        .with_bin_width(args.bin_width)
        .with_skip_seconds(args.skip_seconds)
        .with_default_queue_capacity(args.queue_bytes)
        .with_departure_field(if args.delays {
            DepartureField::Delay
        } else {
            DepartureField::QueueLength
        });

    let filter = LogFilter {
        link: args.link,
        contains: args.filter.clone(),
    };
    let logs = find_logs(&args.root, &filter)
        .with_context(|| format!("Cannot search for logs in {:?}", args.root))?;
    log::info!("Analyzing {} logs below {:?}", logs.len(), args.root);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build()?;

    let pb = multi.add(
        ProgressBar::new(logs.len() as u64).with_style(
            ProgressStyle::with_template(
                "[{bar:80}] log: {pos:>7}/{len:7}, elapsed: {elapsed}, eta: {eta}, speed: {per_sec}",
            )?
            .progress_chars("##-"),
        ),
    );

    let results = pool.install(|| {
        logs.into_par_iter()
            .progress_with(pb)
            .map(|path| process_log(&path, config, args.export_series))
            .collect::<Vec<Result<Record>>>()
    });

    let (records, failures): (Vec<Record>, Vec<anyhow::Error>) =
        results.into_iter().partition_map(|r| match r {
            Ok(record) => Either::Left(record),
            Err(e) => Either::Right(e),
        });
    for e in &failures {
        log::warn!("{e:?}");
    }

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(timestamped_name("results", "csv")));
    let mut writer = csv::Writer::from_path(&output)
        .with_context(|| format!("Cannot create {output:?}"))?;
    for record in &records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    log::info!(
        "Wrote {} results to {output:?} ({} logs failed)",
        records.len(),
        failures.len()
    );

    Ok(())
}

fn process_log(path: &Path, config: ReconstructorConfig, export_series: bool) -> Result<Record> {
    let series = reconstruct_file(path, config_for_log(path, config))
        .with_context(|| format!("Error processing {path:?}"))?;

    if export_series {
        let output = path.with_stem_suffix("_series");
        write_csv_file(&series, &output).with_context(|| format!("Cannot write {output:?}"))?;
    }

    let run = RunName::from_path(path);
    let summary = series.summary(config.skip_seconds);
    log::debug!("{path:?}: {summary}");
    let delays = series.delay_stats();
    let delay = |f: fn(&RateStats) -> f64| delays.as_ref().map_or(f64::NAN, f);

    Ok(Record {
        file: path.display().to_string(),
        trace: run.as_ref().map(|r| r.trace.clone()).unwrap_or_default(),
        buffer_bytes: run.and_then(|r| r.buffer_bytes),
        bin_width_ms: series.bin_width_ms,
        duration_s: summary.duration_ms as f64 / 1000.0,
        capacity_mbps: summary.capacity_avg.or_nan(),
        ingress_mbps: summary.ingress_avg.or_nan(),
        throughput_mbps: summary.throughput_avg.or_nan(),
        utilization: summary.utilization.or_nan(),
        mean_queue_bytes: series.mean_queue_bytes().or_nan(),
        max_queue_bytes: series.max_queue_bytes(),
        delay_min: delay(|d| d.min),
        delay_max: delay(|d| d.max),
        delay_avg: delay(|d| d.mean),
        delay_std: delay(|d| d.std_dev),
        delay_25: delay(|d| d.p25),
        delay_50: delay(|d| d.median),
        delay_75: delay(|d| d.p75),
        warnings: series.warnings.len(),
    })
}
