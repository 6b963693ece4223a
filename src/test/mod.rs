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
//! End-to-end scenarios and randomized invariant checks of the reconstruction.
//!
//! ```shell
//! cargo test --release -- --nocapture --quiet
//! ```

use std::io::Cursor;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    export::write_csv,
    prelude::*,
    reconstruct::ReconstructError,
};


pub fn run(log: &str, bin_width_ms: u64) -> Result<TimeSeries, ReconstructError> {
    reconstruct(
        Cursor::new(log),
        ReconstructorConfig::default().with_bin_width(bin_width_ms),
    )
}

fn export(series: &TimeSeries) -> Vec<u8> {
    let mut out = Vec::new();
    write_csv(series, &mut out).unwrap();
    out
}

/// A randomly generated log together with the byte totals it contains.
pub struct GeneratedLog {
    pub text: String,
    pub capacity_bytes: Option<u64>,
    pub totals: [u64; 4],
}

/// Generate a log with jumps, repeated and reordered timestamps, garbage lines, and random queue
/// length annotations.
pub fn generate_log(rng: &mut StdRng, num_lines: usize) -> GeneratedLog {
    let mut text = String::new();
    let base: i64 = rng.gen_range(0..1_000_000);
    text.push_str(&format!("# base timestamp: {base}\n"));

    let capacity_bytes = if rng.gen_bool(0.7) {
        let c = rng.gen_range(1..20) * 1504;
        text.push_str(&format!("# queue: droptail [bytes={c}]\n"));
        Some(c)
    } else {
        text.push_str("# queue: infinite\n");
        None
    };

    let mut totals = [0; 4];
    let mut t = base;
    for _ in 0..num_lines {
        t += match rng.gen_range(0..100) {
            0..=49 => 0,
            50..=89 => rng.gen_range(1..20),
            90..=97 => rng.gen_range(20..3000),
            _ => -rng.gen_range(0..700),
        };
        let (slot, marker) = match rng.gen_range(0..4) {
            0 => (0, "#"),
            1 => (1, "+"),
            2 => (2, "-"),
            _ => (3, "d"),
        };
        let bytes: u64 = if rng.gen_bool(0.8) {
            1504
        } else {
            rng.gen_range(40..1504)
        };
        let counted = match rng.gen_range(0..20) {
            0 => {
                text.push_str("garbage\n");
                false
            }
            1 => {
                text.push_str(&format!("{t} ? {bytes}\n"));
                false
            }
            2 => {
                text.push_str(&format!("{t},{marker},{bytes}~annotation\n"));
                true
            }
            _ => {
                let reported: i64 = rng.gen_range(0..30_000);
                text.push_str(&format!("{t} {marker} {bytes} {reported}\n"));
                true
            }
        };
        if counted {
            totals[slot] += bytes;
        }
    }

    GeneratedLog {
        text,
        capacity_bytes,
        totals,
    }
}

#[test]
fn scenario_a() {
    let s = run(
        "# base timestamp: 1000\n1000 # 100~0\n1200 + 100~100\n1500 - 100~0\n",
        500,
    )
    .unwrap();
    assert_eq!(s.bins.len(), 2);
    assert_eq!(s.bins[0].start_ms, 0);
    assert_eq!(s.bins[0].capacity_bytes, 100);
    assert_eq!(s.bins[0].ingress_bytes, 100);
    assert_eq!(s.bins[0].egress_bytes, 0);
    assert_eq!(s.bins[1].start_ms, 500);
    assert_eq!(s.bins[1].capacity_bytes, 0);
    assert_eq!(s.bins[1].egress_bytes, 100);
    assert_eq!(s.bins[1].queue_bytes, 0);
}

#[test]
fn scenario_b_queue_full() {
    let s = run("# queue: droptail [bytes=100]\n0 + 60\n0 + 60\n", 500).unwrap();
    assert_eq!(s.bins.len(), 1);
    assert_eq!(s.bins[0].queue_bytes, 60);
    assert_eq!(s.bins[0].accepted_ingress_bytes(), 60);
    assert_eq!(s.bins[0].rejected_bytes, 60);
    assert_eq!(s.bins[0].ingress_bytes, 120);

    let mut r = TimeSeriesReconstructor::new(ReconstructorConfig::default()).unwrap();
    r.set_metadata(LogMetadata::bounded(100));
    for _ in 0..2 {
        r.push(&RawEvent {
            timestamp_ms: 0,
            kind: EventKind::Ingress,
            byte_len: 60,
            reported_queue_len: None,
        })
        .unwrap();
    }
    assert!(r.queue_is_full());
    assert_eq!(r.queue_bytes(), 60);
}

#[test]
fn drops_leave_queue_unchanged() {
    let mut r = TimeSeriesReconstructor::new(ReconstructorConfig::default()).unwrap();
    r.set_metadata(LogMetadata::bounded(3008));
    let push = |r: &mut TimeSeriesReconstructor, timestamp_ms, kind, reported| {
        r.push(&RawEvent {
            timestamp_ms,
            kind,
            byte_len: 1504,
            reported_queue_len: reported,
        })
        .unwrap()
    };
    push(&mut r, 0, EventKind::Ingress, Some(1504));
    push(&mut r, 1, EventKind::Drop, Some(0));
    assert_eq!(r.queue_bytes(), 1504);
    push(&mut r, 2, EventKind::Drop, None);
    assert_eq!(r.queue_bytes(), 1504);
    assert!(!r.queue_is_full());

    let s = run("0 + 1504 1504
0 d 1504 0
600 d 1504 0
", 500).unwrap();
    assert_eq!(
        s.bins
            .iter()
            .map(|b| (b.dropped_bytes, b.queue_bytes))
            .collect::<Vec<_>>(),
        vec![(1504, 1504), (1504, 1504)]
    );
}

#[test]
fn scenario_c_undefined_utilization() {
    let s = run("0 - 1504\n400 - 1504\n1000 - 1504\n", 500).unwrap();
    let summary = s.summary(0.0);
    assert_eq!(summary.duration_ms, 1000);
    assert_eq!(summary.capacity_avg, Metric::Defined(0.0));
    assert!(summary.throughput_avg.is_defined());
    assert_eq!(summary.utilization, Metric::Undefined);
}

#[test]
fn scenario_d_gap_fill() {
    let s = run("0 + 100\n0 # 1504\n2600 # 1504\n", 500).unwrap();
    assert_eq!(
        s.bins.iter().map(|b| b.index).collect::<Vec<_>>(),
        vec![0, 1, 2, 3, 4, 5]
    );
    for bin in &s.bins[1..5] {
        assert_eq!(bin.queue_bytes, 100);
        assert_eq!(bin.capacity_bytes, 0);
        assert_eq!(bin.ingress_bytes, 0);
        assert_eq!(bin.egress_bytes, 0);
        assert_eq!(bin.dropped_bytes, 0);
    }
    assert_eq!(s.bins[5].capacity_bytes, 1504);
}

#[test]
fn empty_input() {
    for log in ["", "\n\n", "# base timestamp: 10\n# queue: infinite\n"] {
        let s = run(log, 500).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.summary(0.0), Summary::default());
        assert_eq!(s.summary(0.0).utilization, Metric::Undefined);
    }
}

#[test]
fn bin_widths() {
    let log = "0 # 1000\n499 # 1000\n500 # 1000\n999 - 1000\n1000 - 1000\n";
    let half = run(log, 500).unwrap();
    assert_eq!(
        half.column(Column::CapacityBytes),
        vec![2000.0, 1000.0, 0.0]
    );
    let second = run(log, 1000).unwrap();
    assert_eq!(second.column(Column::EgressBytes), vec![1000.0, 1000.0]);
    let milli = run(log, 1).unwrap();
    assert_eq!(milli.len(), 1001);
    // the summary does not depend on the bin width
    assert_eq!(half.summary(0.0), second.summary(0.0));
    assert_eq!(half.summary(0.0), milli.summary(0.0));
}

#[test]
fn reparse_is_identical() {
    let mut rng = StdRng::seed_from_u64(7);
    let log = generate_log(&mut rng, 2000);
    let a = run(&log.text, 500).unwrap();
    let b = run(&log.text, 500).unwrap();
    assert_eq!(a, b);
    assert_eq!(export(&a), export(&b));
}
