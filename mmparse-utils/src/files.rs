//! Discovery of emulator logs in result directories.

use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use time::{format_description, OffsetDateTime};

#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("Glob Error: {0}")]
    Glob(#[from] glob::GlobError),
}

/// Direction of the emulated link a log was captured on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize, clap::ValueEnum,
)]
pub enum Link {
    Uplink,
    #[default]
    Downlink,
}

impl Link {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uplink => "uplink",
            Self::Downlink => "downlink",
        }
    }
}

/// Which logs to pick up in a result directory.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub link: Link,
    /// Only keep logs whose path contains this string.
    pub contains: String,
}

/// File extensions under which the emulator logs are stored.
const LOG_EXTENSIONS: [&str; 4] = ["csv", "csv.gz", "log", "log.gz"];

/// Find all logs of the given link below `root`, in natural order.
pub fn find_logs(root: impl AsRef<Path>, filter: &LogFilter) -> Result<Vec<PathBuf>, FilesError> {
    let root = glob::Pattern::escape(&root.as_ref().to_string_lossy());
    let mut logs = Vec::new();
    for ext in LOG_EXTENSIONS {
        let pattern = format!("{root}/**/*_{}.{ext}", filter.link.name());
        log::trace!("Searching for logs matching {pattern}");
        for path in glob::glob(&pattern)? {
            logs.push(path?);
        }
    }

    Ok(logs
        .into_iter()
        .filter(|p| p.to_string_lossy().contains(&filter.contains))
        .unique()
        .sorted_by(|a, b| human_sort::compare(&a.to_string_lossy(), &b.to_string_lossy()))
        .collect())
}

/// Information encoded in the file name of a log, following the
/// `{trace}_{algorithm}_{flows}_q{buffer}_{link}.csv` naming of the measurement runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunName {
    pub trace: String,
    /// Queue bound in bytes, from the `q{bytes}` part of the name.
    pub buffer_bytes: Option<u64>,
    pub link: Option<Link>,
}

impl RunName {
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let name = path.as_ref().file_name()?.to_str()?;
        let name = name.strip_suffix(".gz").unwrap_or(name);
        let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
        let parts = stem.split('_').collect::<Vec<_>>();

        let link = match parts.last() {
            Some(&"uplink") => Some(Link::Uplink),
            Some(&"downlink") => Some(Link::Downlink),
            _ => None,
        };
        let buffer_bytes = parts
            .iter()
            .skip(1)
            .rev()
            .find_map(|p| p.strip_prefix('q').and_then(|b| b.parse().ok()));
        let trace = if parts.len() >= 5 {
            parts[..parts.len() - 4].join("_")
        } else if link.is_some() && parts.len() > 1 {
            parts[..parts.len() - 1].join("_")
        } else {
            stem.to_string()
        };

        Some(Self {
            trace,
            buffer_bytes,
            link,
        })
    }
}

/// Produces a timestamp `String` of the current time in YYYY-MM-DD_HH-mm-SS format.
pub fn get_timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format_description::parse("[year]-[month]-[day]_[hour]-[minute]-[second]")
        .ok()
        .and_then(|format| now.format(&format).ok())
        .unwrap_or_else(|| now.unix_timestamp().to_string())
}

/// File name of the form `{prefix}_{timestamp}.{ext}`.
pub fn timestamped_name(prefix: &str, ext: &str) -> String {
    format!("{prefix}_{}.{ext}", get_timestamp())
}
