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
//! Bandwidth statistics of link traces, i.e., the capacity a trace offers to the emulated link.
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use clap::Parser;
use serde::Serialize;

use mmparse::util::{self, PathBufExt};
use mmparse_utils::{
    stats::{percentile, RateStats},
    trace::{LinkTrace, DEFAULT_PACKET_BYTES},
};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    /// Link traces to analyze.
    #[arg(required = true)]
    traces: Vec<PathBuf>,
    /// Bytes delivered per opportunity.
    #[arg(short, long = "packet-bytes", default_value_t = DEFAULT_PACKET_BYTES)]
    packet_bytes: u64,
    /// Write the per-second bandwidth (Mbit/s, one value per line) of every trace into this
    /// directory, as `<trace>.mbps`.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print the statistics as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct TraceStats {
    trace: String,
    opportunities: usize,
    duration_s: usize,
    avg_mbps: f64,
    max_mbps: f64,
    p70_mbps: f64,
    max70_mbps: f64,
    stats: Option<RateStats>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    util::init_logging();
    let args = Args::parse();

    if let Some(dir) = &args.output {
        std::fs::create_dir_all(dir)?;
    }

    for path in &args.traces {
        log::debug!("Loading trace {path:?}");
        let trace = LinkTrace::from_path(path)?;
        if trace.is_empty() {
            log::warn!("Trace {path:?} has no delivery opportunities");
        }
        let mbps = trace.mbps(args.packet_bytes);
        let stats = RateStats::from_samples(&mbps);
        let max_mbps = stats.map_or(0.0, |s| s.max);

        let result = TraceStats {
            trace: path.display().to_string(),
            opportunities: trace.len(),
            duration_s: mbps.len(),
            avg_mbps: stats.map_or(0.0, |s| s.mean),
            max_mbps,
            p70_mbps: percentile(&mbps, 70).unwrap_or(0.0),
            max70_mbps: 0.7 * max_mbps,
            stats,
        };

        if args.json {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            println!(
                "{}: avg {:.3} Mbps, max {:.3} Mbps, p70 {:.3} Mbps, 70% of max {:.3} Mbps ({} bursts)",
                result.trace,
                result.avg_mbps,
                result.max_mbps,
                result.p70_mbps,
                result.max70_mbps,
                trace.bursts,
            );
        }

        if let (Some(dir), Some(name)) = (&args.output, path.file_name()) {
            let out = dir.as_path().then(format!("{}.mbps", name.to_string_lossy()));
            let mut writer = BufWriter::new(File::create(&out)?);
            for x in &mbps {
                writeln!(writer, "{x:.6}")?;
            }
            writer.flush()?;
            log::info!("Wrote per-second bandwidth of {path:?} to {out:?}");
        }
    }

    Ok(())
}
