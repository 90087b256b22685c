use serde::{Deserialize, Serialize};

/// Monotone mapping from predicted probabilities to observed event rates.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct IsotonicCalibrator {
    /// Thresholds (input probabilities)
    pub thresholds: Vec<f64>,
    /// Calibrated values (output probabilities)
    pub values: Vec<f64>,
}

impl IsotonicCalibrator {
    /// Fit on pairs of predicted probability and binary target.
    ///
    /// Pairs with a non-finite prediction or target are ignored. Rows sharing
    /// a prediction are merged into one weighted point, so thresholds are
    /// strictly increasing.
    pub fn new(y_pred: &[f64], y_true: &[f64]) -> Self {
        let mut data: Vec<(f64, f64)> = y_pred
            .iter()
            .zip(y_true.iter())
            .filter(|(p, t)| p.is_finite() && t.is_finite())
            .map(|(&p, &t)| (p, t))
            .collect();
        if data.is_empty() {
            return Self::default();
        }
        data.sort_by(|a, b| a.0.total_cmp(&b.0));

        // (prediction, sum_y, weight) per distinct prediction
        let mut points: Vec<(f64, f64, f64)> = Vec::with_capacity(data.len());
        for (pred, target) in data {
            if let Some(last) = points.last_mut().filter(|last| last.0 == pred) {
                last.1 += target;
                last.2 += 1.0;
                continue;
            }
            points.push((pred, target, 1.0));
        }

        // Pool adjacent violators.
        // Each block holds (sum_y, weight, sum_xw).
        let mut blocks: Vec<(f64, f64, f64)> = Vec::with_capacity(points.len());
        for (pred, sum_target, count) in points {
            let mut sum_y = sum_target;
            let mut weight = count;
            let mut sum_x = pred * count;

            while let Some(&(prev_sum_y, prev_weight, prev_sum_x)) = blocks.last() {
                if prev_sum_y / prev_weight > sum_y / weight {
                    sum_y += prev_sum_y;
                    weight += prev_weight;
                    sum_x += prev_sum_x;
                    blocks.pop();
                } else {
                    break;
                }
            }
            blocks.push((sum_y, weight, sum_x));
        }

        let (thresholds, values) = blocks
            .into_iter()
            .map(|(sum_y, weight, sum_x)| (sum_x / weight, sum_y / weight))
            .unzip();
        IsotonicCalibrator { thresholds, values }
    }

    pub fn is_fitted(&self) -> bool {
        !self.thresholds.is_empty()
    }

    /// Map predictions through the calibration curve, interpolating linearly
    /// between thresholds and clamping outside them. Missing values stay missing.
    pub fn transform(&self, y_pred: &[f64]) -> Vec<f64> {
        let (first, last) = match (self.thresholds.first(), self.thresholds.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return y_pred.to_vec(),
        };

        y_pred
            .iter()
            .map(|&p| {
                if p.is_nan() {
                    p
                } else if p <= first {
                    self.values[0]
                } else if p >= last {
                    self.values[self.values.len() - 1]
                } else {
                    let idx = match self.thresholds.binary_search_by(|t| t.total_cmp(&p)) {
                        Ok(i) => i,
                        Err(i) => i - 1,
                    };
                    if idx + 1 >= self.thresholds.len() {
                        return self.values[idx];
                    }
                    let (x0, x1) = (self.thresholds[idx], self.thresholds[idx + 1]);
                    if x1 <= x0 {
                        return self.values[idx];
                    }
                    let (y0, y1) = (self.values[idx], self.values[idx + 1]);
                    y0 + (y1 - y0) / (x1 - x0) * (p - x0)
                }
            })
            .collect()
    }
}
