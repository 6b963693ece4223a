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
//! Reconstruct the time series of a single emulator log and print its summary.
use std::path::PathBuf;

use clap::Parser;

use mmparse::{
    export::write_csv_file,
    reconstruct::{DepartureField, ReconstructorConfig, DEFAULT_BIN_WIDTH_MS},
    util::{self, PathBufExt},
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Event log to analyze (optionally gzip-compressed).
    log: PathBuf,
    /// Width of a bin in milliseconds.
    #[arg(short, long = "bin-width", default_value_t = DEFAULT_BIN_WIDTH_MS)]
    bin_width: u64,
    /// Ignore the first seconds of the log when summarizing.
    #[arg(short, long = "skip-seconds", default_value_t = 0.0)]
    skip_seconds: f64,
    /// Queue bound in bytes to use if neither the log nor its file name (`_q<bytes>_`) states
    /// one.
    #[arg(short, long = "queue-bytes")]
    queue_bytes: Option<u64>,
    /// Departure lines carry the queueing delay (ms) instead of the queue length.
    #[arg(short, long)]
    delays: bool,
    /// Write the reconstructed time series to this CSV file.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Write the time series next to the log, as `<log>_series.csv`.
    #[arg(long, conflicts_with = "output")]
    export: bool,
    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
    /// Print every warning raised while reading the log.
    #[arg(short, long)]
    warnings: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    util::init_logging();
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
    let series = util::reconstruct_file(&args.log, util::config_for_log(&args.log, config))?;

    if args.warnings {
        for warning in &series.warnings {
            log::warn!("{warning}");
        }
    } else if !series.warnings.is_empty() {
        log::warn!(
            "{} lines of {:?} could not be used as expected",
            series.warnings.len(),
            args.log
        );
    }

    let output = match (args.output, args.export) {
        (Some(output), _) => Some(output),
        (None, true) => Some(args.log.as_path().with_stem_suffix("_series")),
        (None, false) => None,
    };
    if let Some(output) = output {
        log::info!("Writing {} bins to {output:?}", series.len());
        write_csv_file(&series, &output)?;
    }

    let summary = series.summary(config.skip_seconds);
    let delays = series.delay_stats();
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "summary": summary,
                "delay_ms": delays,
            }))?
        );
    } else {
        println!("{summary}");
        if let Some(d) = delays {
            println!(
                "delay: min {:.1} ms, max {:.1} ms, avg {:.3} ms, median {:.1} ms ({} packets)",
                d.min, d.max, d.mean, d.median, d.count
            );
        } else if args.delays {
            log::warn!("No departure in {:?} carries a delay", args.log);
        }
    }

    Ok(())
}
