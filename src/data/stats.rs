//! Descriptive statistics over `f64` samples.
//!
//! Every function ignores NaN inputs and returns `None` when too few values
//! remain, matching how a dataframe library skips missing values.

pub fn mean(values: &[f64]) -> Option<f64> {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Sample standard deviation (ddof = 1). Needs at least two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let clean: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if clean.len() < 2 {
        return None;
    }
    let m = clean.iter().sum::<f64>() / clean.len() as f64;
    let ss: f64 = clean.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (clean.len() - 1) as f64).sqrt())
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_std_of_known_sample() {
        let v = [10.0, 20.0, 30.0, 100.0];
        assert_eq!(mean(&v), Some(40.0));
        let std = sample_std(&v).unwrap();
        // Squared deviations sum to 5000.
        assert!((std - (5000.0_f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((std - 40.8248).abs() < 1e-4);
    }

    #[test]
    fn nan_is_skipped() {
        let v = [1.0, f64::NAN, 3.0];
        assert_eq!(mean(&v), Some(2.0));
        assert_eq!(median(&v), Some(2.0));
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(mean(&[]), None);
        assert_eq!(median(&[f64::NAN]), None);
        assert_eq!(sample_std(&[5.0]), None);
    }

    #[test]
    fn median_even_count_averages_middle_pair() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn quartiles_interpolate() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&v, 0.25), Some(2.0));
        assert_eq!(quantile(&v, 0.75), Some(4.0));
        assert_eq!(quantile(&[1.0, 2.0], 0.25), Some(1.25));
    }
}
