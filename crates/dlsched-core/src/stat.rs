//! Transfer statistics (rate, bytes done, total) and their aggregation.
//!
//! Each task reports its own [`TransferStat`]; the scheduler folds them into one
//! combined value with `+`, which is associative and commutative with
//! `TransferStat::default()` as identity.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Snapshot of transfer progress for one task, or the sum over many.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStat {
    /// Current download rate in bytes per second.
    pub bytes_per_sec: u64,
    /// Bytes transferred so far.
    pub bytes_done: u64,
    /// Total size in bytes (0 when unknown).
    pub total_bytes: u64,
}

impl TransferStat {
    /// Estimated seconds remaining (None if rate is 0 and work remains).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        if self.bytes_per_sec == 0 {
            return None;
        }
        Some(remaining as f64 / self.bytes_per_sec as f64)
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }
}

impl Add for TransferStat {
    type Output = TransferStat;

    fn add(self, rhs: TransferStat) -> TransferStat {
        TransferStat {
            bytes_per_sec: self.bytes_per_sec.saturating_add(rhs.bytes_per_sec),
            bytes_done: self.bytes_done.saturating_add(rhs.bytes_done),
            total_bytes: self.total_bytes.saturating_add(rhs.total_bytes),
        }
    }
}

impl AddAssign for TransferStat {
    fn add_assign(&mut self, rhs: TransferStat) {
        *self = *self + rhs;
    }
}

impl Sum for TransferStat {
    fn sum<I: Iterator<Item = TransferStat>>(iter: I) -> Self {
        iter.fold(TransferStat::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(rate: u64, done: u64, total: u64) -> TransferStat {
        TransferStat {
            bytes_per_sec: rate,
            bytes_done: done,
            total_bytes: total,
        }
    }

    #[test]
    fn sum_of_nothing_is_identity() {
        let total: TransferStat = std::iter::empty().sum();
        assert_eq!(total, TransferStat::default());
    }

    #[test]
    fn sum_is_order_independent() {
        let a = stat(10, 100, 1000);
        let b = stat(5, 50, 500);
        let c = stat(1, 1, 1);
        assert_eq!((a + b) + c, a + (b + c));
        assert_eq!(a + b, b + a);
        assert_eq!([a, b, c].into_iter().sum::<TransferStat>(), stat(16, 151, 1501));
    }

    #[test]
    fn eta_and_fraction() {
        let s = stat(100, 500, 1000);
        assert_eq!(s.eta_secs(), Some(5.0));
        assert!((s.fraction() - 0.5).abs() < 1e-9);
        assert_eq!(stat(0, 10, 20).eta_secs(), None);
        assert_eq!(stat(0, 20, 20).eta_secs(), Some(0.0));
        assert!((stat(0, 0, 0).fraction() - 1.0).abs() < 1e-9);
    }
}
