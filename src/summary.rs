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
//! Scalar summary of a reconstructed time series.
use std::fmt;

use serde::{Serialize, Serializer};

use crate::series::{Bin, TimeSeries};

/// A derived quantity that may be undefined (e.g., a ratio with a zero denominator). An undefined
/// metric is never reported as zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Metric {
    Defined(f64),
    #[default]
    Undefined,
}

impl Metric {
    /// `num / den`, undefined if `den` is zero or the result is not finite.
    pub fn ratio(num: f64, den: f64) -> Self {
        if den == 0.0 {
            return Self::Undefined;
        }
        let x = num / den;
        if x.is_finite() {
            Self::Defined(x)
        } else {
            Self::Undefined
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Defined(x) => Some(*x),
            Self::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Defined(_))
    }

    /// The value, or `NaN` if undefined. Used when writing tables.
    pub fn or_nan(&self) -> f64 {
        self.value().unwrap_or(f64::NAN)
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Self::Defined(x) => Self::Defined(f(x)),
            Self::Undefined => Self::Undefined,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defined(x) => write!(f, "{x:.3}"),
            Self::Undefined => write!(f, "undefined"),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

/// Averages over a time series. Rates are in Mbit/s, `utilization` in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Summary {
    pub duration_ms: i64,
    pub capacity_avg: Metric,
    pub ingress_avg: Metric,
    pub throughput_avg: Metric,
    pub utilization: Metric,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "duration: {:.3}s, capacity: {} Mbps, ingress: {} Mbps, throughput: {} Mbps, utilization: {}%",
            self.duration_ms as f64 / 1000.0,
            self.capacity_avg,
            self.ingress_avg,
            self.throughput_avg,
            self.utilization,
        )
    }
}

/// Summarize a time series. Bins starting before `skip_seconds` are ignored; the time series
/// itself is not modified.
pub fn summarize(series: &TimeSeries, skip_seconds: f64) -> Summary {
    let skip_ms = skip_seconds.max(0.0) * 1000.0;
    let kept: &[Bin] = match series.bins.iter().position(|b| b.start_ms as f64 >= skip_ms) {
        Some(i) => &series.bins[i..],
        None => &[],
    };

    let (Some(first_bin), Some(first_ts), Some(last_ts)) = (
        kept.first(),
        series.first_timestamp_ms,
        series.last_timestamp_ms,
    ) else {
        log::debug!("Nothing left to summarize after skipping {skip_seconds}s");
        return Summary::default();
    };

    let duration_ms = last_ts.saturating_sub(first_ts.max(first_bin.start_ms)).max(0);
    let rate = |bytes: u64| Metric::ratio(bytes as f64 * 8.0, duration_ms as f64).map(|x| x / 1000.0);

    let capacity_avg = rate(kept.iter().map(|b| b.capacity_bytes).sum());
    let ingress_avg = rate(kept.iter().map(|b| b.ingress_bytes).sum());
    let throughput_avg = rate(kept.iter().map(|b| b.egress_bytes).sum());
    let utilization = match (throughput_avg, capacity_avg) {
        (Metric::Defined(t), Metric::Defined(c)) => Metric::ratio(t * 100.0, c),
        _ => Metric::Undefined,
    };

    Summary {
        duration_ms,
        capacity_avg,
        ingress_avg,
        throughput_avg,
        utilization,
    }
}
