use crate::errors::MonitorError;

/// Create a string of all available items.
pub fn items_to_strings(items: Vec<&str>) -> String {
    let mut s = String::new();
    for i in items {
        s.push_str(i);
        s.push_str(&String::from(", "));
    }
    s
}

// Validation
pub fn validate_probability_parameter(value: f64, parameter: &str) -> Result<(), MonitorError> {
    validate_float_parameter(value, 0.0, 1.0, parameter)
}

pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), MonitorError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(MonitorError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

#[inline]
pub fn precision_round(n: f64, precision: i32) -> f64 {
    let p = (10.0_f64).powi(precision);
    (n * p).round() / p
}

/// Arithmetic mean, NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (zero degrees of freedom), NaN for an empty slice.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Copy out the finite values of a slice, sorted ascending.
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    v.sort_unstable_by(|a, b| a.total_cmp(b));
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round() {
        assert_eq!(0.3, precision_round(0.3333, 1));
        assert_eq!(0.2343, precision_round(0.2343123123123, 4));
        assert_eq!(0.046, precision_round(0.04551, 3));
    }

    #[test]
    fn test_items_to_strings() {
        assert_eq!(items_to_strings(vec!["H", "D"]), "H, D, ");
    }

    #[test]
    fn test_validate_probability_parameter() {
        assert!(validate_probability_parameter(0.05, "alpha").is_ok());
        assert!(validate_probability_parameter(1.0, "alpha").is_ok());
        assert!(matches!(
            validate_probability_parameter(1.5, "alpha"),
            Err(MonitorError::InvalidParameter(..))
        ));
        assert!(validate_probability_parameter(f64::NAN, "alpha").is_err());
    }

    #[test]
    fn test_mean_std() {
        let v = vec![2., 4., 4., 4., 5., 5., 7., 9.];
        assert_eq!(mean(&v), 5.0);
        assert_eq!(std_dev(&v), 2.0);
        assert!(mean(&[]).is_nan());
        assert!(std_dev(&[]).is_nan());
    }

    #[test]
    fn test_sorted_finite() {
        let v = vec![3., f64::NAN, 1., f64::INFINITY, 2.];
        assert_eq!(sorted_finite(&v), vec![1., 2., 3.]);
    }
}
