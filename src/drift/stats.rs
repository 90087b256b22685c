//! Two-sample hypothesis tests used for univariate drift detection.
use crate::constants::KS_EXACT_MAX_N;
use hashbrown::HashMap;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Outcome of a hypothesis test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
}

/// Count occurrences of every non-missing label.
pub fn value_counts(labels: &[Option<String>]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for l in labels.iter().flatten() {
        *counts.entry(l.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Contingency table with one row per category and one column per sample.
///
/// Categories are the union of both samples, sorted, and a category missing
/// from one sample is counted as zero there. Returns `None` if either sample
/// has no labels.
pub fn contingency_table(reference: &[Option<String>], analysis: &[Option<String>]) -> Option<Vec<[f64; 2]>> {
    let ref_counts = value_counts(reference);
    let ana_counts = value_counts(analysis);
    if ref_counts.is_empty() || ana_counts.is_empty() {
        return None;
    }
    let mut categories: Vec<&str> = ref_counts.keys().chain(ana_counts.keys()).copied().collect();
    categories.sort_unstable();
    categories.dedup();
    Some(
        categories
            .iter()
            .map(|c| {
                [
                    *ref_counts.get(c).unwrap_or(&0) as f64,
                    *ana_counts.get(c).unwrap_or(&0) as f64,
                ]
            })
            .collect(),
    )
}

/// Chi-squared test of independence on an r x 2 contingency table.
///
/// With one degree of freedom and `correction` set, Yates' continuity
/// correction moves every observed count 0.5 towards its expected count.
/// A table with a single category has no degrees of freedom and yields a
/// statistic of 0 with a p-value of 1.
pub fn chi2_contingency(observed: &[[f64; 2]], correction: bool) -> TestResult {
    let no_evidence = TestResult {
        statistic: 0.0,
        p_value: 1.0,
    };
    let dof = observed.len().saturating_sub(1);
    let col_totals = [
        observed.iter().map(|r| r[0]).sum::<f64>(),
        observed.iter().map(|r| r[1]).sum::<f64>(),
    ];
    let n = col_totals[0] + col_totals[1];
    if dof == 0 || n == 0.0 {
        return no_evidence;
    }

    let mut statistic = 0.0;
    for row in observed {
        let row_total = row[0] + row[1];
        for (o, col_total) in row.iter().zip(col_totals.iter()) {
            let expected = row_total * col_total / n;
            if expected == 0.0 {
                continue;
            }
            let mut diff = (o - expected).abs();
            if correction && dof == 1 {
                diff -= diff.min(0.5);
            }
            statistic += diff * diff / expected;
        }
    }

    let p_value = match ChiSquared::new(dof as f64) {
        Ok(dist) => dist.sf(statistic),
        Err(_) => f64::NAN,
    };
    TestResult {
        statistic,
        p_value: p_value.clamp(0.0, 1.0),
    }
}

/// Chi-squared test comparing the category distribution of two samples.
pub fn chi2_test(reference: &[Option<String>], analysis: &[Option<String>]) -> Option<TestResult> {
    contingency_table(reference, analysis).map(|table| chi2_contingency(&table, true))
}

/// Largest distance between the empirical CDFs of two sorted samples.
pub fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n1 - j as f64 / n2).abs());
    }
    d
}

/// Survival function of the Kolmogorov distribution.
///
/// Small arguments use the complementary series of the CDF, which converges
/// quickly where the alternating series does not.
pub fn kolmogorov_sf(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    if lambda < 1.18 {
        let w = (2.0 * std::f64::consts::PI).sqrt() / lambda;
        let v = -std::f64::consts::PI * std::f64::consts::PI / (8.0 * lambda * lambda);
        let cdf: f64 = (1..=6)
            .map(|k| {
                let odd = f64::from(2 * k - 1);
                (v * odd * odd).exp()
            })
            .sum::<f64>()
            * w;
        return (1.0 - cdf).clamp(0.0, 1.0);
    }
    let a2 = -2.0 * lambda * lambda;
    let sum: f64 = (1..=10)
        .map(|k| {
            let k = f64::from(k);
            let sign = if k % 2.0 == 1.0 { 1.0 } else { -1.0 };
            sign * (a2 * k * k).exp()
        })
        .sum();
    (2.0 * sum).clamp(0.0, 1.0)
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Exact probability that two samples of sizes `n1` and `n2` drawn from the
/// same distribution are at least `statistic` apart.
///
/// Each ordering of the pooled sample is a lattice path from `(0, 0)` to
/// `(n1, n2)`, all equally likely. The path stays strictly inside the band
/// `|i/n1 - j/n2| < statistic` exactly when the test statistic is smaller,
/// so the p-value is one minus the probability mass of those paths. Mass is
/// propagated row by row with the hypergeometric step probabilities, which
/// keeps every value within `[0, 1]`.
pub fn ks_exact_sf(n1: usize, n2: usize, statistic: f64) -> f64 {
    if n1 == 0 || n2 == 0 {
        return 1.0;
    }
    let g = gcd(n1, n2);
    // i/n1 - j/n2 = (i * step_i - j * step_j) / lcm
    let (step_i, step_j) = ((n2 / g) as i64, (n1 / g) as i64);
    let lcm = (n1 / g) as f64 * n2 as f64;
    let h = (statistic * lcm).round() as i64;
    if h <= 0 {
        return 1.0;
    }

    let total = (n1 + n2) as f64;
    let mut prev = vec![0.0; n2 + 1];
    let mut cur = vec![0.0; n2 + 1];
    for i in 0..=n1 {
        cur.fill(0.0);
        let offset = i as i64 * step_i;
        // j * step_j must lie strictly between offset - h and offset + h
        let low = offset - h;
        let j_min = if low < 0 { 0 } else { (low / step_j + 1) as usize };
        let j_max = (((offset + h - 1) / step_j) as usize).min(n2);
        for j in j_min..=j_max {
            let mass = if i == 0 && j == 0 {
                1.0
            } else {
                let from_left = if i > 0 {
                    prev[j] * (n1 - i + 1) as f64 / (total - (i - 1 + j) as f64)
                } else {
                    0.0
                };
                let from_below = if j > 0 {
                    cur[j - 1] * (n2 - j + 1) as f64 / (total - (i + j - 1) as f64)
                } else {
                    0.0
                };
                from_left + from_below
            };
            cur[j] = mass;
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    (1.0 - prev[n2]).clamp(0.0, 1.0)
}

/// Two-sample Kolmogorov-Smirnov test.
///
/// Inputs must be sorted and free of missing values. The p-value is exact
/// while both samples hold at most `KS_EXACT_MAX_N` values, and otherwise
/// uses the asymptotic distribution with Stephens' small sample correction.
/// Returns `None` if either sample is empty.
pub fn ks_2samp(reference: &[f64], analysis: &[f64]) -> Option<TestResult> {
    if reference.is_empty() || analysis.is_empty() {
        return None;
    }
    let statistic = ks_statistic(reference, analysis);
    let (n1, n2) = (reference.len(), analysis.len());
    let p_value = if n1.max(n2) <= KS_EXACT_MAX_N {
        ks_exact_sf(n1, n2, statistic)
    } else {
        let (n1, n2) = (n1 as f64, n2 as f64);
        let en = (n1 * n2 / (n1 + n2)).sqrt();
        kolmogorov_sf((en + 0.12 + 0.11 / en) * statistic)
    };
    Some(TestResult { statistic, p_value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{precision_round, sorted_finite};

    /// Closed form for a 2x2 table:
    /// (a+b+c+d) * (ad - bc)^2 / ((a+b)(c+d)(a+c)(b+d))
    fn chi2_contingency_2x2(a: f64, b: f64, c: f64, d: f64) -> f64 {
        let n = a + b + c + d;
        let numerator = n * (a * d - b * c).powi(2);
        let denominator = (a + b) * (c + d) * (a + c) * (b + d);
        numerator / denominator
    }

    fn labels(v: &[&str]) -> Vec<Option<String>> {
        v.iter().map(|s| Some(s.to_string())).collect()
    }

    #[test]
    fn test_chi2_contingency_matches_closed_form() {
        // Table: [[10, 5], [10, 20]]
        let res = chi2_contingency(&[[10.0, 5.0], [10.0, 20.0]], false);
        assert!((res.statistic - chi2_contingency_2x2(10.0, 5.0, 10.0, 20.0)).abs() < 1e-9);
        assert!((res.statistic - 4.5).abs() < 1e-7);
        // 1 - chi2.cdf(4.5, 1)
        assert!((res.p_value - 0.03389).abs() < 1e-4);
    }

    #[test]
    fn test_chi2_contingency_yates() {
        // scipy.stats.chi2_contingency([[10, 10], [5, 20]])
        let res = chi2_contingency(&[[10.0, 5.0], [10.0, 20.0]], true);
        assert!((res.statistic - 3.25125).abs() < 1e-9);
        assert!((res.p_value - 0.07137).abs() < 1e-4);
    }

    #[test]
    fn test_chi2_contingency_three_categories() {
        // scipy.stats.chi2_contingency([[30, 20], [30, 30], [40, 50]])
        let res = chi2_contingency(&[[30.0, 20.0], [30.0, 30.0], [40.0, 50.0]], true);
        assert!((res.statistic - 28.0 / 9.0).abs() < 1e-9);
        // two degrees of freedom: sf(x) = exp(-x / 2)
        assert!((res.p_value - (-14.0_f64 / 9.0).exp()).abs() < 1e-9);
    }

    #[test]
    fn test_chi2_degenerate_table() {
        let res = chi2_contingency(&[[10.0, 12.0]], true);
        assert_eq!(res.statistic, 0.0);
        assert_eq!(res.p_value, 1.0);
    }

    #[test]
    fn test_chi2_identical_distributions() {
        let a = labels(&["A", "B", "C", "A", "B", "C"]);
        let res = chi2_test(&a, &a).unwrap();
        assert_eq!(res.statistic, 0.0);
        assert!((res.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_contingency_table_fills_missing_categories() {
        let a = labels(&["A", "A", "B"]);
        let mut b = labels(&["C", "A"]);
        b.push(None);
        let table = contingency_table(&a, &b).unwrap();
        assert_eq!(table, vec![[2.0, 1.0], [1.0, 0.0], [0.0, 1.0]]);
        assert!(contingency_table(&a, &[None]).is_none());
    }

    #[test]
    fn test_ks_identical_samples() {
        let a: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let res = ks_2samp(&a, &a).unwrap();
        assert_eq!(res.statistic, 0.0);
        assert_eq!(res.p_value, 1.0);
    }

    #[test]
    fn test_ks_disjoint_samples() {
        let a: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let b: Vec<f64> = (200..300).map(|i| i as f64).collect();
        let res = ks_2samp(&a, &b).unwrap();
        assert_eq!(res.statistic, 1.0);
        assert!(res.p_value < 1e-10);
    }

    #[test]
    fn test_ks_exact_reference_values() {
        // scipy.stats.ks_2samp(..., method="exact") for equal sample sizes
        assert_eq!(precision_round(ks_exact_sf(100, 100, 0.20), 3), 0.036);
        assert_eq!(precision_round(ks_exact_sf(100, 100, 0.21), 3), 0.024);
        assert_eq!(precision_round(ks_exact_sf(500, 500, 0.088), 3), 0.042);
        assert_eq!(precision_round(ks_exact_sf(500, 500, 0.102), 3), 0.011);
    }

    #[test]
    fn test_ks_exact_unequal_sizes() {
        // scipy.stats.ks_2samp([1, 2, 3], [4, 5]): 2 of the 10 orderings separate fully
        let res = ks_2samp(&[1.0, 2.0, 3.0], &[4.0, 5.0]).unwrap();
        assert_eq!(res.statistic, 1.0);
        assert!((res.p_value - 0.2).abs() < 1e-12);
        for d in [0.1, 0.35, 0.5, 0.8] {
            assert!((ks_exact_sf(7, 12, d) - ks_exact_sf(12, 7, d)).abs() < 1e-12);
        }
        assert_eq!(ks_exact_sf(7, 12, 0.0), 1.0);
    }

    #[test]
    fn test_ks_exact_close_to_asymptotic_for_large_samples() {
        let exact = ks_exact_sf(2000, 2000, 0.045);
        let en = (1000.0_f64).sqrt();
        let asymptotic = kolmogorov_sf((en + 0.12 + 0.11 / en) * 0.045);
        assert!((exact - asymptotic).abs() < 0.005);
    }

    #[test]
    fn test_ks_statistic_with_ties() {
        let a = sorted_finite(&[1.0, 2.0, 2.0, 3.0]);
        let b = sorted_finite(&[2.0, 3.0, 3.0, f64::NAN, 4.0]);
        // F_a(2) = 0.75, F_b(2) = 0.25
        assert_eq!(ks_statistic(&a, &b), 0.5);
    }

    #[test]
    fn test_ks_shifted_samples() {
        let a: Vec<f64> = (0..1000).map(|i| i as f64 / 1000.0).collect();
        let b: Vec<f64> = (0..1000).map(|i| i as f64 / 1000.0 + 0.1).collect();
        let res = ks_2samp(&a, &b).unwrap();
        assert!((res.statistic - 0.1).abs() < 0.0011);
        assert!(res.p_value < 0.001);
        assert!(ks_2samp(&a, &[]).is_none());
    }

    #[test]
    fn test_kolmogorov_sf() {
        assert_eq!(kolmogorov_sf(0.0), 1.0);
        assert_eq!(kolmogorov_sf(0.1), 1.0);
        // Q_KS(1.0) = 0.2700
        assert_eq!(precision_round(kolmogorov_sf(1.0), 4), 0.27);
        // both series agree where they meet
        assert!((kolmogorov_sf(1.179_999) - kolmogorov_sf(1.18)).abs() < 1e-5);
        assert!(kolmogorov_sf(3.0) < 1e-6);
    }
}
