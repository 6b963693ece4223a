//! Link traces: every line is a millisecond timestamp at which the link can deliver one packet.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Line {line}: invalid delivery opportunity {content:?}")]
    InvalidTimestamp { line: usize, content: String },
}

/// Packet size assumed for one delivery opportunity.
pub const DEFAULT_PACKET_BYTES: u64 = 1492;

/// Parsed delivery opportunities of a link trace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkTrace {
    /// Delivery opportunities in milliseconds, in file order.
    pub opportunities_ms: Vec<u64>,
    /// Number of opportunities marked with a trailing `*`.
    pub bursts: usize,
}

impl LinkTrace {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn from_reader<R: BufRead>(input: R) -> Result<Self, TraceError> {
        let mut trace = Self::default();
        for (i, line) in input.lines().enumerate() {
            let line = line?;
            let content = line.trim();
            if content.is_empty() {
                continue;
            }
            let ts = match content.strip_suffix('*') {
                Some(ts) => {
                    trace.bursts += 1;
                    ts.trim()
                }
                None => content,
            };
            let ts = ts.parse().map_err(|_| TraceError::InvalidTimestamp {
                line: i + 1,
                content: content.to_string(),
            })?;
            trace.opportunities_ms.push(ts);
        }
        Ok(trace)
    }

    pub fn len(&self) -> usize {
        self.opportunities_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opportunities_ms.is_empty()
    }

    /// Available bits per second of the trace. Second `k` covers the opportunities in
    /// `(1000 k, 1000 (k + 1)]`; seconds without opportunities are zero.
    pub fn bits_per_second(&self, packet_bytes: u64) -> Vec<u64> {
        let Some(last) = self.opportunities_ms.iter().max() else {
            return Vec::new();
        };
        let mut bits = vec![0; (last.saturating_sub(1) / 1000) as usize + 1];
        for ts in &self.opportunities_ms {
            bits[(ts.saturating_sub(1) / 1000) as usize] += packet_bytes * 8;
        }
        bits
    }

    pub fn mbps(&self, packet_bytes: u64) -> Vec<f64> {
        self.bits_per_second(packet_bytes)
            .into_iter()
            .map(|b| b as f64 / 1e6)
            .collect()
    }
}
