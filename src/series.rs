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
//! The reconstructed time series and its read accessors.
use mmparse_utils::stats::RateStats;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::{
    reader::{EventKind, LogMetadata, ParseWarning},
    summary::{self, Metric, Summary},
};

/// One row of the reconstructed time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Bin {
    /// `timestamp_ms / bin_width_ms` of all events in this bin.
    pub index: i64,
    /// Start of the bin in milliseconds since the base timestamp.
    pub start_ms: i64,
    pub capacity_bytes: u64,
    /// Bytes of all observed arrivals, including those refused by a full queue.
    pub ingress_bytes: u64,
    /// Part of `ingress_bytes` that arrived while the queue was full.
    pub rejected_bytes: u64,
    pub egress_bytes: u64,
    pub dropped_bytes: u64,
    /// Reconstructed queue occupancy at the end of the bin.
    pub queue_bytes: u64,
}

impl Bin {
    /// A bin without traffic, holding the given queue occupancy.
    pub fn empty(index: i64, bin_width_ms: u64, queue_bytes: u64) -> Self {
        Self {
            index,
            start_ms: index * bin_width_ms as i64,
            queue_bytes,
            ..Default::default()
        }
    }

    /// Arrivals that were actually enqueued.
    pub fn accepted_ingress_bytes(&self) -> u64 {
        self.ingress_bytes - self.rejected_bytes
    }

    /// Bytes accounted for the given event kind.
    pub fn bytes(&self, kind: EventKind) -> u64 {
        match kind {
            EventKind::Capacity => self.capacity_bytes,
            EventKind::Ingress => self.ingress_bytes,
            EventKind::Egress => self.egress_bytes,
            EventKind::Drop => self.dropped_bytes,
            EventKind::Unknown => 0,
        }
    }

    pub fn time_s(&self) -> f64 {
        self.start_ms as f64 / 1000.0
    }

    /// Value of a column of this row.
    pub fn get(&self, column: Column) -> f64 {
        match column {
            Column::TimeS => self.time_s(),
            Column::CapacityBytes => self.capacity_bytes as f64,
            Column::IngressBytes => self.ingress_bytes as f64,
            Column::RejectedBytes => self.rejected_bytes as f64,
            Column::EgressBytes => self.egress_bytes as f64,
            Column::DroppedBytes => self.dropped_bytes as f64,
            Column::QueueBytes => self.queue_bytes as f64,
        }
    }
}

/// Columns of the time series, named as in the CSV export.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Column {
    TimeS,
    CapacityBytes,
    IngressBytes,
    RejectedBytes,
    EgressBytes,
    DroppedBytes,
    QueueBytes,
}

impl Column {
    /// Column header row of the CSV export.
    pub fn header() -> Vec<&'static str> {
        Column::iter().map(<&'static str>::from).collect()
    }

    /// Whether the column counts bytes transferred within a bin (as opposed to a point in time or
    /// a state).
    pub fn is_traffic(&self) -> bool {
        !matches!(self, Self::TimeS | Self::QueueBytes)
    }
}

/// Byte totals over the whole log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Totals {
    pub capacity_bytes: u64,
    pub ingress_bytes: u64,
    pub rejected_bytes: u64,
    pub egress_bytes: u64,
    pub dropped_bytes: u64,
}

impl Totals {
    /// Total bytes of the given event kind.
    pub fn bytes(&self, kind: EventKind) -> u64 {
        match kind {
            EventKind::Capacity => self.capacity_bytes,
            EventKind::Ingress => self.ingress_bytes,
            EventKind::Egress => self.egress_bytes,
            EventKind::Drop => self.dropped_bytes,
            EventKind::Unknown => 0,
        }
    }
}

/// Queueing delay of one departed packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct DelaySample {
    /// Time at which the packet entered the queue, i.e., `departed_ms - delay_ms`.
    pub enqueued_ms: i64,
    pub departed_ms: i64,
    pub delay_ms: i64,
}

/// Number of events seen per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct EventCounts {
    pub capacity: usize,
    pub ingress: usize,
    pub egress: usize,
    pub drop: usize,
    pub unknown: usize,
}

impl EventCounts {
    pub fn count(&mut self, kind: EventKind) {
        match kind {
            EventKind::Capacity => self.capacity += 1,
            EventKind::Ingress => self.ingress += 1,
            EventKind::Egress => self.egress += 1,
            EventKind::Drop => self.drop += 1,
            EventKind::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.capacity + self.ingress + self.egress + self.drop + self.unknown
    }
}

/// Result of reconstructing one log: contiguous bins plus everything needed to summarize them.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TimeSeries {
    /// Metadata as known at the end of the log.
    pub metadata: LogMetadata,
    pub bin_width_ms: u64,
    /// Queue bound that was applied during the reconstruction, if any.
    pub queue_capacity_bytes: Option<u64>,
    /// Bins with strictly increasing, gap-free indices.
    pub bins: Vec<Bin>,
    pub totals: Totals,
    pub event_counts: EventCounts,
    pub first_timestamp_ms: Option<i64>,
    pub last_timestamp_ms: Option<i64>,
    /// Per-departure queueing delays, in log order. Only filled if departure lines carry delays.
    pub delays: Vec<DelaySample>,
    pub warnings: Vec<ParseWarning>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Index of the first bin.
    pub fn first_index(&self) -> Option<i64> {
        self.bins.first().map(|b| b.index)
    }

    /// The bin that covers the given timestamp (in ms since the base timestamp).
    pub fn bin_at(&self, timestamp_ms: i64) -> Option<&Bin> {
        let index = timestamp_ms.div_euclid(self.bin_width_ms.max(1) as i64);
        let offset = index - self.first_index()?;
        usize::try_from(offset).ok().and_then(|i| self.bins.get(i))
    }

    /// All values of a column.
    pub fn column(&self, column: Column) -> Vec<f64> {
        self.bins.iter().map(|b| b.get(column)).collect()
    }

    /// Rate of a traffic column in Mbit/s per bin. Returns `None` for columns that are not traffic.
    pub fn rates_mbps(&self, column: Column) -> Option<Vec<f64>> {
        if !column.is_traffic() {
            return None;
        }
        let bin_s = self.bin_width_ms as f64 / 1000.0;
        Some(
            self.bins
                .iter()
                .map(|b| b.get(column) * 8.0 / bin_s / 1e6)
                .collect(),
        )
    }

    /// Queue occupancy relative to the queue bound, per bin. Returns `None` for unbounded queues.
    pub fn queue_fraction(&self) -> Option<Vec<f64>> {
        let capacity = self.queue_capacity_bytes.filter(|c| *c > 0)? as f64;
        Some(
            self.bins
                .iter()
                .map(|b| b.queue_bytes as f64 / capacity)
                .collect(),
        )
    }

    pub fn max_queue_bytes(&self) -> Option<u64> {
        self.bins.iter().map(|b| b.queue_bytes).max()
    }

    pub fn mean_queue_bytes(&self) -> Metric {
        let sum: u64 = self.bins.iter().map(|b| b.queue_bytes).sum();
        Metric::ratio(sum as f64, self.bins.len() as f64)
    }

    /// Delays in milliseconds, in log order.
    pub fn delay_ms(&self) -> Vec<f64> {
        self.delays.iter().map(|d| d.delay_ms as f64).collect()
    }

    /// Distribution of the queueing delays in milliseconds. `None` if no delays were logged.
    pub fn delay_stats(&self) -> Option<RateStats> {
        RateStats::from_samples(&self.delay_ms())
    }

    /// Scalar summary of the series, ignoring all bins that start before `skip_seconds`.
    pub fn summary(&self, skip_seconds: f64) -> Summary {
        summary::summarize(self, skip_seconds)
    }
}
