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
//! Reconstruction of per-bin traffic counters and queue occupancy from an event stream.
//!
//! The emulator logs a self-reported queue length on arrival, departure, and drop lines, but it
//! updates that field with a lag of one line for some transitions (most notably a departure
//! directly followed by an arrival without a capacity tick in between). The occupancy is therefore
//! rebuilt from the packet sizes, and the reported lengths are only used to decide whether a
//! departure has really left the queue.
use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::{
    reader::{
        EventKind, LogEventReader, LogItem, LogMetadata, ParseWarning, QueueKind, RawEvent,
        ReaderError, WarningKind,
    },
    series::{Bin, DelaySample, EventCounts, TimeSeries, Totals},
};

pub const DEFAULT_BIN_WIDTH_MS: u64 = 500;

/// Longest stretch without events that is filled with empty bins (one hour).
pub const DEFAULT_MAX_GAP_MS: u64 = 3_600_000;

#[derive(Debug, thiserror::Error)]
pub enum ReconstructError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Reader Error: {0}")]
    Reader(#[from] ReaderError),
    #[error("Arrival at {timestamp_ms} ms on a bounded queue, but the log does not state the queue capacity")]
    MissingQueueCapacity { timestamp_ms: i64 },
    #[error("Invalid bin width: {0} ms")]
    InvalidBinWidth(u64),
    #[error("Event at {timestamp_ms} ms leaves a gap of {gap_ms} ms after the bin at {bin_start_ms} ms")]
    GapTooLarge {
        bin_start_ms: i64,
        timestamp_ms: i64,
        gap_ms: i128,
    },
}

/// Meaning of the trailing field of departure lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum DepartureField {
    /// The queue length reported by the emulator.
    #[default]
    QueueLength,
    /// The queueing delay of the departing packet in milliseconds.
    Delay,
}

/// Parameters of a single reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ReconstructorConfig {
    /// Width of a bin in milliseconds. Typical values are 500, 1000, and 1.
    pub bin_width_ms: u64,
    /// Bins starting before this time are ignored when summarizing.
    pub skip_seconds: f64,
    /// Queue bound to apply if the log does not state one.
    pub default_queue_capacity_bytes: Option<u64>,
    pub departure_field: DepartureField,
    /// Longest gap between two events that is filled with empty bins. `None` for no limit.
    pub max_gap_ms: Option<u64>,
}

impl Default for ReconstructorConfig {
    fn default() -> Self {
        Self {
            bin_width_ms: DEFAULT_BIN_WIDTH_MS,
            skip_seconds: 0.0,
            default_queue_capacity_bytes: None,
            departure_field: DepartureField::QueueLength,
            max_gap_ms: Some(DEFAULT_MAX_GAP_MS),
        }
    }
}

impl ReconstructorConfig {
    pub fn with_bin_width(mut self, bin_width_ms: u64) -> Self {
        self.bin_width_ms = bin_width_ms;
        self
    }

    pub fn with_skip_seconds(mut self, skip_seconds: f64) -> Self {
        self.skip_seconds = skip_seconds;
        self
    }

    pub fn with_default_queue_capacity(mut self, capacity_bytes: Option<u64>) -> Self {
        self.default_queue_capacity_bytes = capacity_bytes;
        self
    }

    pub fn with_departure_field(mut self, field: DepartureField) -> Self {
        self.departure_field = field;
        self
    }

    pub fn with_max_gap(mut self, max_gap_ms: Option<u64>) -> Self {
        self.max_gap_ms = max_gap_ms;
        self
    }
}

/// Accumulator of a single-pass fold over the events of one log.
///
/// The reconstructor can be driven incrementally: all state survives between calls to
/// [`TimeSeriesReconstructor::push`], and bins are only closed once an event of a later bin is
/// seen (or [`TimeSeriesReconstructor::finish`] is called).
#[derive(Debug, Clone)]
pub struct TimeSeriesReconstructor {
    config: ReconstructorConfig,
    metadata: LogMetadata,
    /// Bin that is currently being filled.
    current: Option<Bin>,
    /// Closed bins.
    bins: Vec<Bin>,
    /// Estimated queue occupancy in bytes.
    queue_bytes: u64,
    /// Set once an arrival did not fit into the queue. Cleared by the next departure.
    queue_is_full: bool,
    /// Last queue length reported on an arrival, departure, or drop line.
    last_reported_queue: Option<i64>,
    /// Reported queue length at the moment the queue was marked full.
    full_reported_queue: Option<i64>,
    totals: Totals,
    event_counts: EventCounts,
    first_timestamp_ms: Option<i64>,
    last_timestamp_ms: Option<i64>,
    delays: Vec<DelaySample>,
    warnings: Vec<ParseWarning>,
}

impl TimeSeriesReconstructor {
    pub fn new(config: ReconstructorConfig) -> Result<Self, ReconstructError> {
        if config.bin_width_ms == 0 || i64::try_from(config.bin_width_ms).is_err() {
            return Err(ReconstructError::InvalidBinWidth(config.bin_width_ms));
        }
        Ok(Self {
            config,
            metadata: LogMetadata::default(),
            current: None,
            bins: Vec::new(),
            queue_bytes: 0,
            queue_is_full: false,
            last_reported_queue: None,
            full_reported_queue: None,
            totals: Totals::default(),
            event_counts: EventCounts::default(),
            first_timestamp_ms: None,
            last_timestamp_ms: None,
            delays: Vec::new(),
            warnings: Vec::new(),
        })
    }

    pub fn config(&self) -> &ReconstructorConfig {
        &self.config
    }

    /// Bins closed so far.
    pub fn closed_bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn queue_bytes(&self) -> u64 {
        self.queue_bytes
    }

    pub fn queue_is_full(&self) -> bool {
        self.queue_is_full
    }

    /// Replace the log metadata. Events pushed afterwards are interpreted with it.
    pub fn set_metadata(&mut self, metadata: LogMetadata) {
        self.metadata = metadata;
        if let Some(capacity) = self.metadata.queue_capacity_bytes {
            self.queue_bytes = self.queue_bytes.min(capacity);
        }
    }

    pub fn record_warning(&mut self, warning: ParseWarning) {
        self.warnings.push(warning);
    }

    /// Queue bound in bytes, or `None` for an unbounded queue.
    fn queue_bound(&self, timestamp_ms: i64) -> Result<Option<u64>, ReconstructError> {
        if let Some(capacity) = self.metadata.queue_capacity_bytes {
            return Ok(Some(capacity));
        }
        match self.metadata.queue_kind {
            QueueKind::Bounded => self
                .config
                .default_queue_capacity_bytes
                .map(Some)
                .ok_or(ReconstructError::MissingQueueCapacity { timestamp_ms }),
            // the log does not describe its queue at all
            QueueKind::Infinite if self.metadata.queue_name.is_none() => {
                Ok(self.config.default_queue_capacity_bytes)
            }
            QueueKind::Infinite => Ok(None),
        }
    }

    fn bin_width(&self) -> i64 {
        self.config.bin_width_ms as i64
    }

    /// Fail if an event in bin `index` would require filling more than the allowed gap.
    fn check_gap(&self, index: i64, timestamp_ms: i64) -> Result<(), ReconstructError> {
        let (Some(max_gap_ms), Some(current)) = (self.config.max_gap_ms, self.current.as_ref())
        else {
            return Ok(());
        };
        let gap_ms = (i128::from(index) - i128::from(current.index) - 1)
            * i128::from(self.config.bin_width_ms);
        if gap_ms > i128::from(max_gap_ms) {
            return Err(ReconstructError::GapTooLarge {
                bin_start_ms: current.start_ms,
                timestamp_ms,
                gap_ms,
            });
        }
        Ok(())
    }

    /// Reported queue length of an event, if the log has one for this kind of event.
    fn reported_queue(&self, event: &RawEvent) -> Option<i64> {
        match (event.kind, self.config.departure_field) {
            (EventKind::Capacity | EventKind::Unknown, _) => None,
            (EventKind::Egress, DepartureField::Delay) => None,
            _ => event.reported_queue_len,
        }
    }

    fn close_current(&mut self) {
        if let Some(mut bin) = self.current.take() {
            bin.queue_bytes = self.queue_bytes;
            log::trace!("closing bin {bin:?}");
            self.bins.push(bin);
        }
    }

    /// Make sure the current bin is the one with the given index, closing the current one and
    /// filling any gap in between. Returns the bin into which the event must be accounted.
    fn roll_over(&mut self, index: i64) -> &mut Bin {
        let width = self.config.bin_width_ms;
        match self.current.as_ref().map(|b| b.index) {
            None => self.current = Some(Bin::empty(index, width, self.queue_bytes)),
            Some(current) if index > current => {
                self.close_current();
                self.bins.extend(
                    (current + 1..index).map(|gap| Bin::empty(gap, width, self.queue_bytes)),
                );
                self.current = Some(Bin::empty(index, width, self.queue_bytes));
            }
            Some(current) if index < current => {
                log::debug!("event of bin {index} arrived while in bin {current}");
                self.warnings.push(ParseWarning {
                    line: None,
                    kind: WarningKind::OutOfOrder,
                    content: format!("bin {index} after bin {current}"),
                });
            }
            Some(_) => {}
        }
        self.current.get_or_insert_with(|| Bin::empty(index, width, 0))
    }

    /// Fold a single event into the accumulator.
    pub fn push(&mut self, event: &RawEvent) -> Result<(), ReconstructError> {
        if event.kind == EventKind::Unknown {
            self.event_counts.count(event.kind);
            return Ok(());
        }

        // per-bin counters never exceed the totals
        if self.totals.bytes(event.kind).checked_add(event.byte_len).is_none() {
            log::warn!(
                "Skipping {} of {} bytes at {} ms: byte counter overflow",
                event.kind,
                event.byte_len,
                event.timestamp_ms
            );
            self.warnings.push(ParseWarning {
                line: None,
                kind: WarningKind::ByteCountOverflow,
                content: format!("{} {} {}", event.timestamp_ms, event.kind, event.byte_len),
            });
            return Ok(());
        }

        let index = event.timestamp_ms.div_euclid(self.bin_width());
        self.check_gap(index, event.timestamp_ms)?;

        let bound = match event.kind {
            EventKind::Ingress => self.queue_bound(event.timestamp_ms)?,
            _ => None,
        };

        self.first_timestamp_ms = Some(
            self.first_timestamp_ms
                .map_or(event.timestamp_ms, |t| t.min(event.timestamp_ms)),
        );
        self.last_timestamp_ms = Some(
            self.last_timestamp_ms
                .map_or(event.timestamp_ms, |t| t.max(event.timestamp_ms)),
        );
        self.event_counts.count(event.kind);

        let len = event.byte_len;
        let reported_queue = self.reported_queue(event);

        match event.kind {
            EventKind::Capacity => {
                self.roll_over(index).capacity_bytes += len;
                self.totals.capacity_bytes += len;
            }
            EventKind::Ingress => {
                self.totals.ingress_bytes += len;
                let rejected = if self.queue_is_full {
                    true
                } else {
                    match bound {
                        Some(capacity) if self.queue_bytes + len > capacity => {
                            log::trace!(
                                "queue full at {} ms ({} + {len} > {capacity})",
                                event.timestamp_ms,
                                self.queue_bytes
                            );
                            self.queue_is_full = true;
                            self.full_reported_queue =
                                reported_queue.or(self.last_reported_queue);
                            true
                        }
                        _ => {
                            self.queue_bytes += len;
                            false
                        }
                    }
                };
                if rejected {
                    self.totals.rejected_bytes += len;
                }
                let bin = self.roll_over(index);
                bin.ingress_bytes += len;
                if rejected {
                    bin.rejected_bytes += len;
                }
            }
            EventKind::Egress => {
                // The reported length on a departure line may still include the departing packet.
                // Only trust the departure once the reported length actually went down.
                let departed = match reported_queue {
                    None => true,
                    Some(reported) => {
                        self.last_reported_queue.map_or(true, |last| reported < last)
                            || self.full_reported_queue.is_some_and(|full| reported < full)
                    }
                };
                if departed {
                    self.queue_bytes = self.queue_bytes.saturating_sub(len);
                    self.queue_is_full = false;
                    self.full_reported_queue = None;
                }
                if self.config.departure_field == DepartureField::Delay {
                    self.record_delay(event);
                }
                self.totals.egress_bytes += len;
                self.roll_over(index).egress_bytes += len;
            }
            EventKind::Drop => {
                self.totals.dropped_bytes += len;
                self.roll_over(index).dropped_bytes += len;
            }
            EventKind::Unknown => {}
        }

        if let Some(reported) = reported_queue {
            self.last_reported_queue = Some(reported);
        }

        Ok(())
    }

    fn record_delay(&mut self, event: &RawEvent) {
        match event.reported_queue_len {
            Some(delay_ms) if delay_ms >= 0 => self.delays.push(DelaySample {
                enqueued_ms: event.timestamp_ms.saturating_sub(delay_ms),
                departed_ms: event.timestamp_ms,
                delay_ms,
            }),
            Some(delay_ms) => log::debug!(
                "Ignoring negative delay {delay_ms} ms at {} ms",
                event.timestamp_ms
            ),
            None => log::debug!("Departure at {} ms without a delay", event.timestamp_ms),
        }
    }

    /// Close the last bin and return the complete time series.
    pub fn finish(mut self) -> TimeSeries {
        // the queue bound is only known for sure once the whole log is read
        let queue_capacity_bytes = self.queue_bound(0).ok().flatten();
        self.close_current();
        TimeSeries {
            metadata: self.metadata,
            bin_width_ms: self.config.bin_width_ms,
            queue_capacity_bytes,
            bins: self.bins,
            totals: self.totals,
            event_counts: self.event_counts,
            first_timestamp_ms: self.first_timestamp_ms,
            last_timestamp_ms: self.last_timestamp_ms,
            delays: self.delays,
            warnings: self.warnings,
        }
    }
}

/// Drive a reconstructor to completion over all items of a reader.
pub fn fold<R: BufRead>(
    reader: LogEventReader<R>,
    config: ReconstructorConfig,
) -> Result<TimeSeries, ReconstructError> {
    let mut reconstructor = TimeSeriesReconstructor::new(config)?;
    for item in reader {
        match item? {
            LogItem::Event(event) => reconstructor.push(&event)?,
            LogItem::Metadata(metadata) => reconstructor.set_metadata(metadata),
            LogItem::Warning(warning) => reconstructor.record_warning(warning),
        }
    }
    let series = reconstructor.finish();
    if !series.warnings.is_empty() {
        log::info!("{} lines of the log were skipped or reordered", series.warnings.len());
    }
    Ok(series)
}

/// Parse a log and reconstruct its time series.
pub fn reconstruct<R: BufRead>(
    input: R,
    config: ReconstructorConfig,
) -> Result<TimeSeries, ReconstructError> {
    fold(LogEventReader::new(input), config)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    fn run(log: &str, bin_width_ms: u64) -> TimeSeries {
        reconstruct(
            Cursor::new(log),
            ReconstructorConfig::default().with_bin_width(bin_width_ms),
        )
        .unwrap()
    }

    fn event(timestamp_ms: i64, kind: EventKind, byte_len: u64, reported: Option<i64>) -> RawEvent {
        RawEvent {
            timestamp_ms,
            kind,
            byte_len,
            reported_queue_len: reported,
        }
    }

    #[test]
    fn invalid_bin_width() {
        assert!(matches!(
            TimeSeriesReconstructor::new(ReconstructorConfig::default().with_bin_width(0)),
            Err(ReconstructError::InvalidBinWidth(0))
        ));
    }

    #[test]
    fn departure_waits_for_reported_decrease() {
        let s = run(
            "# queue: infinite\n\
             0 + 100 1\n\
             0 + 100 2\n\
             1 - 100 2\n\
             2 - 100 1\n",
            1000,
        );
        // the first departure still reports 2 packets and is not trusted
        assert_eq!(s.bins.len(), 1);
        assert_eq!(s.bins[0].queue_bytes, 100);
        assert_eq!(s.bins[0].egress_bytes, 200);
    }

    #[test]
    fn full_queue_reopens_after_departure() {
        let mut r = TimeSeriesReconstructor::new(ReconstructorConfig::default()).unwrap();
        r.set_metadata(LogMetadata::bounded(200));
        r.push(&event(0, EventKind::Ingress, 150, Some(150))).unwrap();
        r.push(&event(1, EventKind::Ingress, 100, Some(150))).unwrap();
        assert!(r.queue_is_full());
        // rejected even though it would fit
        r.push(&event(2, EventKind::Ingress, 10, Some(150))).unwrap();
        assert_eq!(r.queue_bytes(), 150);
        r.push(&event(3, EventKind::Egress, 150, Some(0))).unwrap();
        assert!(!r.queue_is_full());
        assert_eq!(r.queue_bytes(), 0);
        r.push(&event(4, EventKind::Ingress, 10, Some(10))).unwrap();
        let s = r.finish();
        assert_eq!(s.bins[0].ingress_bytes, 270);
        assert_eq!(s.bins[0].rejected_bytes, 110);
        assert_eq!(s.bins[0].accepted_ingress_bytes(), 160);
        assert_eq!(s.bins[0].queue_bytes, 10);
    }

    #[test]
    fn full_marker_compensates_lagging_report() {
        let mut r = TimeSeriesReconstructor::new(ReconstructorConfig::default()).unwrap();
        r.set_metadata(LogMetadata::bounded(100));
        r.push(&event(0, EventKind::Ingress, 100, Some(2))).unwrap();
        r.push(&event(0, EventKind::Ingress, 100, Some(2))).unwrap();
        assert!(r.queue_is_full());
        // the drop lowers the last reported length; the departure is only below the full mark
        r.push(&event(1, EventKind::Drop, 100, Some(1))).unwrap();
        r.push(&event(2, EventKind::Egress, 100, Some(1))).unwrap();
        assert!(!r.queue_is_full());
        assert_eq!(r.queue_bytes(), 0);
    }

    #[test]
    fn missing_capacity_is_fatal() {
        let err = reconstruct(
            Cursor::new("# queue: droptail\n0 # 1504\n5 + 1504 1504\n"),
            ReconstructorConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ReconstructError::MissingQueueCapacity { timestamp_ms: 5 }
        ));
    }

    #[test]
    fn default_capacity_applies_to_undeclared_queue() {
        let config = ReconstructorConfig::default().with_default_queue_capacity(Some(100));
        let s = reconstruct(Cursor::new("0 + 60\n0 + 60\n"), config).unwrap();
        assert_eq!(s.queue_capacity_bytes, Some(100));
        assert_eq!(s.bins[0].queue_bytes, 60);

        let s = reconstruct(Cursor::new("# queue: droptail\n0 + 60\n0 + 60\n"), config).unwrap();
        assert_eq!(s.bins[0].queue_bytes, 60);

        // an explicitly infinite queue stays unbounded
        let s = reconstruct(Cursor::new("# queue: infinite\n0 + 60\n0 + 60\n"), config).unwrap();
        assert_eq!(s.queue_capacity_bytes, None);
        assert_eq!(s.bins[0].queue_bytes, 120);
    }

    #[test]
    fn out_of_order_events_stay_in_current_bin() {
        let s = run("0 # 10\n1200 # 10\n300 # 10\n1300 # 10\n", 500);
        assert_eq!(
            s.bins.iter().map(|b| (b.index, b.capacity_bytes)).collect::<Vec<_>>(),
            vec![(0, 10), (1, 0), (2, 30)]
        );
        assert_eq!(s.warnings.len(), 1);
        assert_eq!(s.warnings[0].kind, WarningKind::OutOfOrder);
        assert_eq!(s.first_timestamp_ms, Some(0));
        assert_eq!(s.last_timestamp_ms, Some(1300));
    }

    #[test]
    fn unknown_events_do_not_open_bins() {
        let s = run("0 # 10\n5000 x 10\n", 500);
        assert_eq!(s.bins.len(), 1);
        assert_eq!(s.event_counts.unknown, 1);
        assert_eq!(s.warnings.len(), 1);
        assert_eq!(s.last_timestamp_ms, Some(0));
    }

    #[test]
    fn millisecond_bins() {
        let s = run("0 # 1504\n0 # 1504\n3 - 1504\n", 1);
        assert_eq!(s.bins.len(), 4);
        assert_eq!(s.bins[0].capacity_bytes, 3008);
        assert_eq!(s.bins[3].egress_bytes, 1504);
        assert_eq!(s.bins[3].start_ms, 3);
    }

    #[test]
    fn byte_counter_overflow_skips_event() {
        let s = run("# queue: infinite\n0 + 18446744073709551615\n0 + 1\n0 # 10\n", 500);
        assert_eq!(s.totals.ingress_bytes, u64::MAX);
        assert_eq!(s.bins[0].ingress_bytes, u64::MAX);
        assert_eq!(s.bins[0].queue_bytes, u64::MAX);
        assert_eq!(s.bins[0].capacity_bytes, 10);
        assert_eq!(s.event_counts.ingress, 1);
        assert_eq!(s.warnings.len(), 1);
        assert_eq!(s.warnings[0].kind, WarningKind::ByteCountOverflow);

        // the queue estimate cannot overflow on a bounded queue either
        let mut r = TimeSeriesReconstructor::new(ReconstructorConfig::default()).unwrap();
        r.set_metadata(LogMetadata::bounded(u64::MAX));
        r.push(&event(0, EventKind::Ingress, u64::MAX - 1, None)).unwrap();
        r.push(&event(0, EventKind::Ingress, 2, None)).unwrap();
        assert_eq!(r.queue_bytes(), u64::MAX - 1);
        assert!(!r.queue_is_full());
    }

    #[test]
    fn gap_limit() {
        let config = ReconstructorConfig::default().with_bin_width(1);
        let err = reconstruct(Cursor::new("0 # 1\n99999999999999 # 1\n"), config).unwrap_err();
        assert!(matches!(
            err,
            ReconstructError::GapTooLarge {
                bin_start_ms: 0,
                timestamp_ms: 99999999999999,
                ..
            }
        ));

        // a gap of exactly the limit is filled
        let config = config.with_max_gap(Some(10));
        let s = reconstruct(Cursor::new("0 # 1\n11 # 1\n"), config).unwrap();
        assert_eq!(s.bins.len(), 12);
        assert!(reconstruct(Cursor::new("0 # 1\n12 # 1\n"), config).is_err());

        // the first event and events jumping back never count as a gap
        let s = reconstruct(Cursor::new("99999999999999 # 1\n0 # 1\n"), config).unwrap();
        assert_eq!(s.bins.len(), 1);

        // two hours of silence exceed the default limit
        assert!(reconstruct(
            Cursor::new("0 # 1\n7200000 # 1\n"),
            ReconstructorConfig::default().with_bin_width(1000),
        )
        .is_err());
        let s = reconstruct(
            Cursor::new("0 # 1\n7200000 # 1\n"),
            ReconstructorConfig::default()
                .with_bin_width(1000)
                .with_max_gap(None),
        )
        .unwrap();
        assert_eq!(s.bins.len(), 7201);
    }

    #[test]
    fn departure_delays() {
        let log = "# queue: infinite\n\
                   0 + 100 1\n\
                   0 + 100 2\n\
                   30 - 100 30\n\
                   45 - 100 45\n\
                   50 - 100 -1\n\
                   60 - 100\n";
        let config = ReconstructorConfig::default().with_departure_field(DepartureField::Delay);
        let s = reconstruct(Cursor::new(log), config).unwrap();
        assert_eq!(
            s.delays,
            vec![
                DelaySample {
                    enqueued_ms: 0,
                    departed_ms: 30,
                    delay_ms: 30,
                },
                DelaySample {
                    enqueued_ms: 0,
                    departed_ms: 45,
                    delay_ms: 45,
                },
            ]
        );
        // delays are not queue lengths: every departure leaves the queue
        assert_eq!(s.bins[0].queue_bytes, 0);
        assert_eq!(s.delay_stats().map(|d| d.max), Some(45.0));

        // read as queue lengths, growing values never let a departure leave the queue
        let s = run(&log.lines().take(5).collect::<Vec<_>>().join("\n"), 500);
        assert!(s.delays.is_empty());
        assert_eq!(s.bins[0].queue_bytes, 200);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let log = "# base timestamp: 10\n10 # 100\n20 + 100 100\n900 - 100 0\n1700 d 50 0\n";
        let one_shot = run(log, 500);

        let mut r = TimeSeriesReconstructor::new(ReconstructorConfig::default()).unwrap();
        for item in LogEventReader::new(Cursor::new(log)) {
            match item.unwrap() {
                LogItem::Event(e) => r.push(&e).unwrap(),
                LogItem::Metadata(m) => r.set_metadata(m),
                LogItem::Warning(w) => r.record_warning(w),
            }
            // the bin that is still open is never exposed
            assert!(r.closed_bins().iter().all(|b| b.index < 3));
        }
        assert_eq!(r.closed_bins().len(), 3);
        assert_eq!(r.finish(), one_shot);
    }
}
