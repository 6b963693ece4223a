//! Summary statistics over rate samples.

use serde::Serialize;
use statrs::statistics::{Data, OrderStatistics, Statistics};

/// Distribution of a series of rates. `std_dev` is NaN for a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
}

impl RateStats {
    /// Compute the statistics of all finite samples. Returns `None` if there are none.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let samples = finite(samples);
        if samples.is_empty() {
            return None;
        }
        let mut data = Data::new(samples.clone());
        Some(Self {
            count: samples.len(),
            min: Statistics::min(&samples),
            max: Statistics::max(&samples),
            mean: Statistics::mean(&samples),
            std_dev: Statistics::std_dev(&samples),
            p25: data.lower_quartile(),
            median: data.quantile(0.5),
            p75: data.upper_quartile(),
        })
    }
}

/// The `p`-th percentile (0 to 100) of the finite samples.
pub fn percentile(samples: &[f64], p: usize) -> Option<f64> {
    let samples = finite(samples);
    if samples.is_empty() {
        return None;
    }
    Some(Data::new(samples).percentile(p.min(100)))
}

fn finite(samples: &[f64]) -> Vec<f64> {
    samples.iter().copied().filter(|x| x.is_finite()).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn basic_stats() {
        let stats = RateStats::from_samples(&[3.0, 1.0, f64::NAN, 5.0, 2.0, 4.0]).unwrap();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.median, 3.0);
        assert!((stats.std_dev - 2.5f64.sqrt()).abs() < 1e-9);
        assert!(stats.p25 <= stats.median && stats.median <= stats.p75);
    }

    #[test]
    fn empty() {
        assert_eq!(RateStats::from_samples(&[]), None);
        assert_eq!(RateStats::from_samples(&[f64::INFINITY]), None);
        assert_eq!(percentile(&[], 70), None);
    }

    #[test]
    fn percentiles() {
        let samples = (1..=10).map(f64::from).collect::<Vec<_>>();
        assert_eq!(percentile(&samples, 0), Some(1.0));
        assert_eq!(percentile(&samples, 100), Some(10.0));
        let p70 = percentile(&samples, 70).unwrap();
        assert!((7.0..=8.0).contains(&p70));
    }
}
