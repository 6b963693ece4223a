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
//! Library for reconstructing traffic and queue time series from link-emulator event logs.
//!
//! The emulator writes one line per event (delivery opportunity `#`, arrival `+`, departure `-`,
//! drop `d`). The [`reader`] classifies those lines lazily, and the [`reconstruct`] module folds
//! them into contiguous bins of capacity, ingress, egress, and dropped bytes together with an
//! estimate of the queue occupancy.

pub mod export;
pub mod reader;
pub mod reconstruct;
pub mod series;
pub mod summary;
pub mod util;

#[cfg(test)]
mod test;

pub mod prelude {
    pub use super::{
        reader::{EventKind, LogEventReader, LogItem, LogMetadata, QueueKind, RawEvent},
        reconstruct::{reconstruct, ReconstructorConfig, TimeSeriesReconstructor},
        series::{Bin, Column, TimeSeries},
        summary::{Metric, Summary},
    };
}
