//! Metrics
//!
//! Realized metrics computed from targets, and their confidence-based
//! estimates computed from predicted probabilities alone.
use crate::utils::sorted_finite;

fn trapezoid_area(x0: f64, x1: f64, y0: f64, y1: f64) -> f64 {
    (x1 - x0).abs() * (y0 + y1) * 0.5
}

/// Area under the ROC curve of scores `yhat` against binary targets `y`.
///
/// Rows with a missing score, target or weight are skipped, as are targets
/// other than 0 and 1. Tied scores form a single curve point. Returns `NaN`
/// when fewer than two classes remain.
pub fn roc_auc_score(y: &[f64], yhat: &[f64], sample_weight: &[f64]) -> f64 {
    // (score, positive weight, negative weight)
    let mut rows: Vec<(f64, f64, f64)> = y
        .iter()
        .zip(yhat)
        .zip(sample_weight)
        .filter(|((t, p), w)| (**t == 0.0 || **t == 1.0) && p.is_finite() && w.is_finite())
        .map(|((&t, &p), &w)| (p, t * w, (1.0 - t) * w))
        .collect();
    rows.sort_unstable_by(|a, b| b.0.total_cmp(&a.0));

    let positives: f64 = rows.iter().map(|r| r.1).sum();
    let negatives: f64 = rows.iter().map(|r| r.2).sum();
    if positives <= 0.0 || negatives <= 0.0 {
        return f64::NAN;
    }

    let mut auc = 0.0;
    let (mut tp, mut fp) = (0.0, 0.0);
    let (mut tp_prev, mut fp_prev) = (0.0, 0.0);
    let mut i = 0;
    while i < rows.len() {
        let score = rows[i].0;
        while i < rows.len() && rows[i].0 == score {
            tp += rows[i].1;
            fp += rows[i].2;
            i += 1;
        }
        auc += trapezoid_area(fp_prev, fp, tp_prev, tp);
        tp_prev = tp;
        fp_prev = fp;
    }
    auc / (positives * negatives)
}

/// Estimate ROC AUC without targets, treating each calibrated probability as
/// the expected value of its label.
///
/// For every distinct threshold the expected confusion matrix is the sum of
/// probabilities (true positives) and of their complements (false positives)
/// over the rows scored at or above it. Returns `NaN` when there are no finite
/// probabilities or the expected counts of either class are zero.
pub fn estimated_roc_auc(y_pred_proba: &[f64]) -> f64 {
    let thresholds = sorted_finite(y_pred_proba);
    if thresholds.is_empty() {
        return f64::NAN;
    }
    let positives: f64 = thresholds.iter().sum();
    let negatives: f64 = thresholds.iter().map(|t| 1.0 - t).sum();
    if positives <= 0.0 || negatives <= 0.0 {
        return f64::NAN;
    }

    // Walk from the highest threshold down, adding whole runs of ties at once.
    let mut auc = 0.0;
    let (mut tp, mut fp) = (0.0, 0.0);
    let (mut tpr_prev, mut fpr_prev) = (0.0, 0.0);
    let mut i = thresholds.len();
    while i > 0 {
        let t = thresholds[i - 1];
        while i > 0 && thresholds[i - 1] == t {
            tp += thresholds[i - 1];
            fp += 1.0 - thresholds[i - 1];
            i -= 1;
        }
        let (tpr, fpr) = (tp / positives, fp / negatives);
        auc += trapezoid_area(fpr_prev, fpr, tpr_prev, tpr);
        tpr_prev = tpr;
        fpr_prev = fpr;
    }
    auc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::precision_round;

    #[test]
    fn test_auc_real_data() {
        let y = vec![1., 0., 1., 0., 0., 0., 0.];
        let yhat = vec![0.5, 0.01, -0., 1.05, 0., -4., 0.];
        let sample_weight = vec![1., 1., 1., 1., 1., 2., 2.];
        let res = roc_auc_score(&y, &yhat, &sample_weight);
        assert_eq!(precision_round(res, 5), 0.67857);
    }

    #[test]
    fn test_auc_generic() {
        let sample_weight: Vec<f64> = vec![1.; 2];

        let y: Vec<f64> = vec![0., 1.];
        let yhat: Vec<f64> = vec![0., 1.];
        assert_eq!(roc_auc_score(&y, &yhat, &sample_weight), 1.);

        let y: Vec<f64> = vec![0., 1.];
        let yhat: Vec<f64> = vec![1., 0.];
        assert_eq!(roc_auc_score(&y, &yhat, &sample_weight), 0.);

        let y: Vec<f64> = vec![1., 0.];
        let yhat: Vec<f64> = vec![0.5, 0.5];
        assert_eq!(roc_auc_score(&y, &yhat, &sample_weight), 0.5);

        let y: Vec<f64> = vec![1., 1.];
        let yhat: Vec<f64> = vec![0.25, 0.75];
        assert!(roc_auc_score(&y, &yhat, &sample_weight).is_nan());

        assert!(roc_auc_score(&[], &[], &[]).is_nan());
    }

    #[test]
    fn test_auc_skips_unusable_rows() {
        let y = vec![0., 1., f64::NAN, 1., 2., 0.];
        let yhat = vec![0.2, 0.8, 0.5, f64::NAN, 0.1, 0.3];
        let w = vec![1.; 6];
        // only rows 0, 1 and 5 remain, and they separate perfectly
        assert_eq!(roc_auc_score(&y, &yhat, &w), 1.);

        let w = vec![1., 1., 1., 1., 1., f64::NAN];
        assert_eq!(roc_auc_score(&y, &yhat, &w), 1.);
        assert!(roc_auc_score(&[1., f64::NAN], &[0.3, 0.4], &[1., 1.]).is_nan());
    }

    #[test]
    fn test_estimated_auc_uninformative_scores() {
        assert_eq!(estimated_roc_auc(&[0.5, 0.5, 0.5, 0.5]), 0.5);
    }

    #[test]
    fn test_estimated_auc_confident_scores() {
        // Two certain negatives and two certain positives separate perfectly.
        assert_eq!(estimated_roc_auc(&[0.0, 0.0, 1.0, 1.0]), 1.0);
    }

    #[test]
    fn test_estimated_auc_by_hand() {
        // thresholds 0.2 and 0.8; P = 1.0, N = 1.0
        // at 0.8: tpr 0.8, fpr 0.2; at 0.2: tpr 1.0, fpr 1.0
        // area = 0.2 * 0.8 / 2 + 0.8 * (0.8 + 1.0) / 2 = 0.08 + 0.72
        let auc = estimated_roc_auc(&[0.8, 0.2]);
        assert!((auc - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_estimated_auc_degenerate() {
        assert!(estimated_roc_auc(&[]).is_nan());
        assert!(estimated_roc_auc(&[f64::NAN]).is_nan());
        assert!(estimated_roc_auc(&[1.0, 1.0]).is_nan());
        assert!(estimated_roc_auc(&[0.0, 0.0]).is_nan());
    }

    #[test]
    fn test_estimated_auc_matches_realized_in_expectation() {
        // Targets drawn exactly in proportion to the probabilities.
        let proba = vec![0.1; 10].into_iter().chain(vec![0.9; 10]).collect::<Vec<f64>>();
        let mut y = vec![0.0; 20];
        y[0] = 1.0;
        for v in y.iter_mut().skip(10).take(9) {
            *v = 1.0;
        }
        let w = vec![1.0; 20];
        let realized = roc_auc_score(&y, &proba, &w);
        let estimated = estimated_roc_auc(&proba);
        assert!((realized - estimated).abs() < 1e-9);
    }
}
