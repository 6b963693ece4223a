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
//! Utility module collection of functions

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use flate2::bufread::GzDecoder;
use mmparse_utils::files::RunName;

use crate::{
    reconstruct::{reconstruct, ReconstructError, ReconstructorConfig},
    series::TimeSeries,
};

/// Logging configuration read by [`init_logging`], relative to the working directory.
pub const LOG_CONFIG: &str = "log4rs.yml";

/// Initialize logging from `log4rs.yml` if it exists, and from `RUST_LOG` otherwise.
pub fn init_logging() {
    if Path::new(LOG_CONFIG).exists() {
        match log4rs::init_file(LOG_CONFIG, Default::default()) {
            Ok(()) => return,
            Err(e) => eprintln!("Cannot load {LOG_CONFIG}: {e}"),
        }
    }
    pretty_env_logger::init();
}

/// Open an event log for reading. Files ending in `.gz` are decompressed on the fly.
pub fn open_log(path: impl AsRef<Path>) -> io::Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    let file = BufReader::new(File::open(path)?);
    if path.extension().is_some_and(|ext| ext == "gz") {
        log::trace!("Decompressing {path:?}");
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(file))
    }
}

/// Configuration for one log file. A buffer size in the file name (`..._q<bytes>_<link>.csv`)
/// takes precedence over the configured default queue bound.
pub fn config_for_log(
    path: impl AsRef<Path>,
    config: ReconstructorConfig,
) -> ReconstructorConfig {
    let buffer_bytes = RunName::from_path(path).and_then(|run| run.buffer_bytes);
    config.with_default_queue_capacity(buffer_bytes.or(config.default_queue_capacity_bytes))
}

/// Reconstruct the time series of an event log on disk.
pub fn reconstruct_file(
    path: impl AsRef<Path>,
    config: ReconstructorConfig,
) -> Result<TimeSeries, ReconstructError> {
    log::info!("Loading: {:?}", path.as_ref());
    reconstruct(open_log(path)?, config)
}

pub trait PathBufExt: Sized {
    fn then(self, p: impl AsRef<Path>) -> PathBuf;

    /// Sibling path with `suffix` appended to the file stem (ignoring a trailing `.gz`), e.g.,
    /// `run_downlink.csv.gz` with suffix `_series` becomes `run_downlink_series.csv`.
    fn with_stem_suffix(self, suffix: &str) -> PathBuf;
}

impl PathBufExt for PathBuf {
    fn then(mut self, p: impl AsRef<Path>) -> PathBuf {
        self.push(p);
        self
    }

    fn with_stem_suffix(self, suffix: &str) -> PathBuf {
        self.as_path().with_stem_suffix(suffix)
    }
}

impl PathBufExt for &Path {
    fn then(self, p: impl AsRef<Path>) -> PathBuf {
        let mut path = self.to_path_buf();
        path.push(p);
        path
    }

    fn with_stem_suffix(self, suffix: &str) -> PathBuf {
        let name = self
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        let new_name = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{stem}{suffix}.{ext}"),
            _ => format!("{name}{suffix}"),
        };
        self.with_file_name(new_name)
    }
}
