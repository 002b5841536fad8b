//! Small statistics helpers shared by the scoring crates.

use std::cmp::Ordering;

/// Direction of a percentile ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankOrder {
    /// The largest value receives the top percentile.
    Ascending,
    /// The smallest value receives the top percentile.
    Descending,
}

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Compute sample standard deviation.
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

/// Percentile rank of every element of `values`, in (0.0, 1.0].
///
/// Rank `r` (1-based, ties share the average of the positions they occupy) is divided by
/// the population size, so the best element of a population scores 1.0 and a singleton
/// always scores 1.0. With [`RankOrder::Ascending`] the largest value is best; with
/// [`RankOrder::Descending`] the smallest value is best.
///
/// The result is positionally aligned with `values` and does not depend on input order.
/// Callers must filter out NaN before ranking.
pub fn percentile_ranks(values: &[f64], order: RankOrder) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&a, &b| {
        let ord = values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal);
        match order {
            RankOrder::Ascending => ord,
            RankOrder::Descending => ord.reverse(),
        }
    });

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[indices[end]] == values[indices[start]] {
            end += 1;
        }
        // sorted positions start..end hold the 1-based ranks start+1..=end
        let average_rank = (start + 1 + end) as f64 / 2.0;
        for &i in &indices[start..end] {
            ranks[i] = average_rank / n as f64;
        }
        start = end;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_std_dev() {
        let data = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&data), 5.0);
        assert_relative_eq!(std_dev(&data), 2.138089935299395, epsilon = 1e-12);
        assert_eq!(std_dev(&[1.0]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_percentile_ranks_ascending() {
        let ranks = percentile_ranks(&[0.30, 0.10, 0.20], RankOrder::Ascending);
        assert_relative_eq!(ranks[0], 1.0);
        assert_relative_eq!(ranks[1], 1.0 / 3.0);
        assert_relative_eq!(ranks[2], 2.0 / 3.0);
    }

    #[test]
    fn test_percentile_ranks_descending_inverts() {
        let ranks = percentile_ranks(&[10.0, 20.0, 30.0], RankOrder::Descending);
        assert_relative_eq!(ranks[0], 1.0);
        assert_relative_eq!(ranks[1], 2.0 / 3.0);
        assert_relative_eq!(ranks[2], 1.0 / 3.0);
    }

    #[test]
    fn test_percentile_ranks_ties_share_average_rank() {
        // sorted: 1, 2, 2, 3 -> ranks 1, 2.5, 2.5, 4
        let ranks = percentile_ranks(&[2.0, 1.0, 3.0, 2.0], RankOrder::Ascending);
        assert_relative_eq!(ranks[0], 2.5 / 4.0);
        assert_relative_eq!(ranks[3], 2.5 / 4.0);
        assert_relative_eq!(ranks[1], 0.25);
        assert_relative_eq!(ranks[2], 1.0);
    }

    #[test]
    fn test_percentile_ranks_singleton_and_empty() {
        assert_eq!(percentile_ranks(&[42.0], RankOrder::Ascending), vec![1.0]);
        assert_eq!(percentile_ranks(&[42.0], RankOrder::Descending), vec![1.0]);
        assert!(percentile_ranks(&[], RankOrder::Ascending).is_empty());
    }

    #[test]
    fn test_percentile_ranks_order_independent() {
        let a = percentile_ranks(&[5.0, 1.0, 3.0, 3.0], RankOrder::Ascending);
        let b = percentile_ranks(&[3.0, 3.0, 1.0, 5.0], RankOrder::Ascending);
        assert_eq!(a[0], b[3]);
        assert_eq!(a[1], b[2]);
        assert_eq!(a[2], b[0]);
        assert_eq!(a[3], b[1]);
    }
}
