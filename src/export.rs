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
//! Header-commented CSV export of a reconstructed time series.
//!
//! ```text
//! # queue: droptail [bytes=150000]
//! # bin width: 500 ms
//! # init timestamp: 1523046016547 (2018-04-06 20:20:16.547 UTC)
//! time_s,capacity_bytes,ingress_bytes,rejected_bytes,egress_bytes,dropped_bytes,queue_bytes
//! 0.000,75200.0,60160.0,0.0,60160.0,0.0,0.0
//! ```
use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::{
    reader::LogMetadata,
    series::{Bin, Column, TimeSeries},
};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("The export does not state its bin width")]
    MissingBinWidth,
}

lazy_static! {
    static ref BIN_WIDTH_RE: Regex = Regex::new(r"^#\s*bin width:\s*(\d+)").unwrap();
}

impl TimeSeries {
    /// Comment line describing the queue that was used for the reconstruction.
    pub fn queue_comment(&self) -> String {
        let name = self.metadata.queue_name.as_deref();
        match self.queue_capacity_bytes {
            Some(bytes) => format!(
                "# queue: {} [bytes={bytes}]",
                name.filter(|n| *n != "infinite").unwrap_or("droptail")
            ),
            None => format!("# queue: {}", name.unwrap_or("infinite")),
        }
    }
}

/// Write the time series as CSV.
pub fn write_csv<W: Write>(series: &TimeSeries, mut out: W) -> Result<(), ExportError> {
    writeln!(out, "{}", series.queue_comment())?;
    writeln!(out, "# bin width: {} ms", series.bin_width_ms)?;
    if let Some(init) = series.metadata.init_timestamp_ms {
        match chrono::DateTime::<chrono::Utc>::from_timestamp_millis(init) {
            Some(t) => writeln!(
                out,
                "# init timestamp: {init} ({})",
                t.format("%Y-%m-%d %H:%M:%S%.3f UTC")
            )?,
            None => writeln!(out, "# init timestamp: {init}")?,
        }
    }

    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    csv.write_record(Column::header())?;
    for bin in &series.bins {
        csv.write_record([
            format!("{:.3}", bin.time_s()),
            format!("{:.1}", bin.capacity_bytes as f64),
            format!("{:.1}", bin.ingress_bytes as f64),
            format!("{:.1}", bin.rejected_bytes as f64),
            format!("{:.1}", bin.egress_bytes as f64),
            format!("{:.1}", bin.dropped_bytes as f64),
            format!("{:.1}", bin.queue_bytes as f64),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_csv_file(series: &TimeSeries, path: impl AsRef<Path>) -> Result<(), ExportError> {
    log::debug!("Writing time series to {:?}", path.as_ref());
    write_csv(series, BufWriter::new(File::create(path)?))
}

/// Contents of an exported CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedSeries {
    /// Queue description and init timestamp, as stated in the header comments.
    pub metadata: LogMetadata,
    pub bin_width_ms: u64,
    pub bins: Vec<Bin>,
}

#[derive(Debug, Deserialize)]
struct Row {
    time_s: f64,
    capacity_bytes: f64,
    ingress_bytes: f64,
    #[serde(default)]
    rejected_bytes: f64,
    egress_bytes: f64,
    dropped_bytes: f64,
    queue_bytes: f64,
}

/// Read an exported time series back.
pub fn read_csv<R: Read>(mut input: R) -> Result<ExportedSeries, ExportError> {
    let mut text = String::new();
    input.read_to_string(&mut text)?;

    let mut metadata = LogMetadata::default();
    let mut bin_width_ms = None;
    for line in text.lines().take_while(|l| l.trim_start().starts_with('#')) {
        if let Some(m) = BIN_WIDTH_RE.captures(line.trim()) {
            bin_width_ms = m.get(1).and_then(|x| x.as_str().parse::<u64>().ok());
        } else {
            metadata.update_from_comment(line);
        }
    }
    let bin_width_ms = bin_width_ms
        .filter(|w| *w > 0)
        .ok_or(ExportError::MissingBinWidth)?;

    let mut csv = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .from_reader(text.as_bytes());
    let mut bins = Vec::new();
    for row in csv.deserialize() {
        let row: Row = row?;
        let start_ms = (row.time_s * 1000.0).round() as i64;
        bins.push(Bin {
            index: start_ms.div_euclid(bin_width_ms as i64),
            start_ms,
            capacity_bytes: row.capacity_bytes as u64,
            ingress_bytes: row.ingress_bytes as u64,
            rejected_bytes: row.rejected_bytes as u64,
            egress_bytes: row.egress_bytes as u64,
            dropped_bytes: row.dropped_bytes as u64,
            queue_bytes: row.queue_bytes as u64,
        });
    }

    Ok(ExportedSeries {
        metadata,
        bin_width_ms,
        bins,
    })
}

pub fn read_csv_file(path: impl AsRef<Path>) -> Result<ExportedSeries, ExportError> {
    read_csv(File::open(path)?)
}
