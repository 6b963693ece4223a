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
//! Streaming classifier for link-emulator event logs.
//!
//! Every line of the log is turned into one of three things: an event ([`RawEvent`]), an update of
//! the log's header information ([`LogMetadata`]), or a recoverable [`ParseWarning`]. Blank lines
//! and free-text comments are skipped. The reader never holds more than one line in memory.
//!
//! The accepted grammar is deliberately tolerant, as several historical variants of the emulator
//! wrote slightly different logs:
//!
//! ```text
//! # base timestamp: 1523000000000
//! # queue: droptail [bytes=150000]
//! 1000 # 1504
//! 1000 + 1504 1504
//! 1001 - 1504~12 0
//! 1001,d,1504,0
//! ```
use std::{fmt, io::BufRead};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Size of a full packet on the emulated link, used to convert packet-denominated queue bounds.
pub const MTU_BYTES: u64 = 1504;

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

/// Kind of an event, as given by the marker in the second column of a log line.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumIter,
    strum_macros::EnumString,
)]
pub enum EventKind {
    /// `#`: the link had an opportunity to deliver a packet.
    Capacity,
    /// `+`: a packet arrived at the queue.
    Ingress,
    /// `-`: a packet left the queue.
    Egress,
    /// `d`: a packet was dropped.
    Drop,
    /// Any other marker.
    Unknown,
}

impl EventKind {
    pub fn from_marker(marker: &str) -> Self {
        match marker {
            "#" => Self::Capacity,
            "+" => Self::Ingress,
            "-" => Self::Egress,
            "d" => Self::Drop,
            _ => Self::Unknown,
        }
    }

    pub fn marker(&self) -> Option<char> {
        match self {
            Self::Capacity => Some('#'),
            Self::Ingress => Some('+'),
            Self::Egress => Some('-'),
            Self::Drop => Some('d'),
            Self::Unknown => None,
        }
    }
}

/// One parsed event line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// Milliseconds since the base timestamp of the log.
    pub timestamp_ms: i64,
    pub kind: EventKind,
    /// Packet size in bytes.
    pub byte_len: u64,
    /// Queue length as written by the emulator on this line. The emulator does not update it
    /// consistently, so it must not be used as the queue occupancy directly.
    ///
    /// Emulators that log per-packet delays write the queueing delay in milliseconds into this
    /// field of departure lines instead (see [`crate::reconstruct::DepartureField`]).
    pub reported_queue_len: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum QueueKind {
    #[default]
    Infinite,
    Bounded,
}

/// Header information of a log, collected from its comment lines.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct LogMetadata {
    /// Offset subtracted from the raw timestamp of every event.
    pub base_timestamp_ms: i64,
    /// Wall-clock time (in ms since the epoch) at which the emulator started. Only used for
    /// presentation.
    pub init_timestamp_ms: Option<i64>,
    pub queue_kind: QueueKind,
    /// Name of the queueing discipline, exactly as written in the header (e.g., `droptail`).
    /// `None` if the log does not describe its queue.
    pub queue_name: Option<String>,
    /// Bound of the queue in bytes. Only present for bounded queues.
    pub queue_capacity_bytes: Option<u64>,
}

lazy_static! {
    static ref BASE_TIMESTAMP_RE: Regex =
        Regex::new(r"^#\s*base timestamp:\s*(-?\d+)").unwrap();
    static ref INIT_TIMESTAMP_RE: Regex =
        Regex::new(r"^#\s*init timestamp:\s*(-?\d+)").unwrap();
    static ref QUEUE_RE: Regex = Regex::new(
        r"^#\s*queue:\s*([A-Za-z_][A-Za-z0-9_]*)(?:\s*\[?\s*([A-Za-z_]+)\s*=\s*(\d+)\s*\]?)?"
    )
    .unwrap();
}

impl LogMetadata {
    /// Metadata of a log with a byte-bounded drop-tail queue.
    pub fn bounded(capacity_bytes: u64) -> Self {
        Self {
            queue_kind: QueueKind::Bounded,
            queue_name: Some("droptail".to_string()),
            queue_capacity_bytes: Some(capacity_bytes),
            ..Default::default()
        }
    }

    /// Update the metadata from a comment line. Returns `true` if the line carried metadata.
    pub fn update_from_comment(&mut self, line: &str) -> bool {
        let line = line.trim();
        if let Some(m) = BASE_TIMESTAMP_RE.captures(line) {
            if let Some(ts) = m.get(1).and_then(|x| x.as_str().parse().ok()) {
                self.base_timestamp_ms = ts;
                return true;
            }
        } else if let Some(m) = INIT_TIMESTAMP_RE.captures(line) {
            if let Some(ts) = m.get(1).and_then(|x| x.as_str().parse().ok()) {
                self.init_timestamp_ms = Some(ts);
                return true;
            }
        } else if let Some(m) = QUEUE_RE.captures(line) {
            let Some(name) = m.get(1).map(|x| x.as_str().to_string()) else {
                return false;
            };
            if name == "infinite" {
                self.queue_kind = QueueKind::Infinite;
                self.queue_capacity_bytes = None;
            } else {
                let value = m.get(3).and_then(|x| x.as_str().parse::<u64>().ok());
                self.queue_kind = QueueKind::Bounded;
                self.queue_capacity_bytes = match (m.get(2).map(|x| x.as_str()), value) {
                    (Some("bytes"), Some(bytes)) => Some(bytes),
                    (Some("packets"), Some(packets)) => Some(packets * MTU_BYTES),
                    _ => None,
                };
            }
            self.queue_name = Some(name);
            return true;
        }
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, strum::Display)]
pub enum WarningKind {
    /// Fewer fields than required for the event.
    MissingFields,
    /// The timestamp is not a number, or is out of range after subtracting the base timestamp.
    InvalidTimestamp,
    /// The byte count is not a non-negative integer.
    InvalidByteCount,
    /// The event marker is none of `#`, `+`, `-`, or `d`.
    UnknownMarker,
    /// The event belongs to a bin that was already closed.
    OutOfOrder,
    /// Accounting the event would overflow a byte counter.
    ByteCountOverflow,
}

/// Recoverable problem found while reading a log.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParseWarning {
    /// Line number (starting at 1), if known.
    pub line: Option<usize>,
    pub kind: WarningKind,
    pub content: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}: {:?}", self.kind, self.content),
            None => write!(f, "{}: {:?}", self.kind, self.content),
        }
    }
}

/// Item produced by the [`LogEventReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogItem {
    Event(RawEvent),
    /// The complete metadata, emitted every time a header line changes it.
    Metadata(LogMetadata),
    Warning(ParseWarning),
}

/// Lazy, forward-only reader over the lines of an event log.
pub struct LogEventReader<R> {
    input: R,
    buf: Vec<u8>,
    line: usize,
    metadata: LogMetadata,
    pending: Option<LogItem>,
}

impl<R: BufRead> LogEventReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            buf: Vec::new(),
            line: 0,
            metadata: LogMetadata::default(),
            pending: None,
        }
    }

    /// Metadata collected from all header lines read so far.
    pub fn metadata(&self) -> &LogMetadata {
        &self.metadata
    }

    /// Number of lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.line
    }

    fn warn(&self, kind: WarningKind, line: &str) -> LogItem {
        log::warn!("Skipping line {}: {kind} ({line:?})", self.line);
        LogItem::Warning(ParseWarning {
            line: Some(self.line),
            kind,
            content: line.to_string(),
        })
    }

    fn classify(&mut self, line: &str) -> Option<LogItem> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if line.starts_with('#') {
            if self.metadata.update_from_comment(line) {
                log::debug!("Log metadata updated (line {}): {:?}", self.line, self.metadata);
                return Some(LogItem::Metadata(self.metadata.clone()));
            }
            return None;
        }

        let mut fields = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|f| !f.is_empty())
            .map(strip_annotation);

        let (Some(timestamp), Some(marker)) = (fields.next(), fields.next()) else {
            return Some(self.warn(WarningKind::MissingFields, line));
        };
        let Some(timestamp) = parse_timestamp(timestamp) else {
            return Some(self.warn(WarningKind::InvalidTimestamp, line));
        };

        let kind = EventKind::from_marker(marker);
        let byte_len = match fields.next().map(str::parse::<u64>) {
            Some(Ok(bytes)) => bytes,
            _ if kind == EventKind::Unknown => 0,
            Some(Err(_)) => return Some(self.warn(WarningKind::InvalidByteCount, line)),
            None => return Some(self.warn(WarningKind::MissingFields, line)),
        };
        // capacity lines never carry a meaningful queue length
        let reported_queue_len = match kind {
            EventKind::Capacity | EventKind::Unknown => None,
            _ => fields.next().and_then(|f| f.parse::<i64>().ok()),
        };

        let Some(timestamp_ms) = timestamp.checked_sub(self.metadata.base_timestamp_ms) else {
            return Some(self.warn(WarningKind::InvalidTimestamp, line));
        };

        let event = RawEvent {
            timestamp_ms,
            kind,
            byte_len,
            reported_queue_len,
        };

        if kind == EventKind::Unknown {
            self.pending = Some(LogItem::Event(event));
            return Some(self.warn(WarningKind::UnknownMarker, line));
        }

        Some(LogItem::Event(event))
    }
}

impl<R: BufRead> Iterator for LogEventReader<R> {
    type Item = Result<LogItem, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.pending.take() {
            return Some(Ok(item));
        }

        loop {
            self.buf.clear();
            match self.input.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line += 1;
                    let line = String::from_utf8_lossy(&self.buf).into_owned();
                    if let Some(item) = self.classify(&line) {
                        return Some(Ok(item));
                    }
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Remove a `~`-separated annotation from a field.
fn strip_annotation(field: &str) -> &str {
    field.split_once('~').map_or(field, |(value, _)| value)
}

/// Parse a millisecond timestamp. Fractional timestamps are truncated.
fn parse_timestamp(field: &str) -> Option<i64> {
    field.parse::<i64>().ok().or_else(|| {
        field
            .parse::<f64>()
            .ok()
            .filter(|t| t.is_finite())
            .map(|t| t.trunc() as i64)
    })
}
