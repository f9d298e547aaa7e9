pub fn mean(data: &[f64]) -> Option<f64> {
    match data.len() {
        0 => None,
        count => Some(data.iter().sum::<f64>() / count as f64),
    }
}

/// Population standard deviation
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let data_mean = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = data_mean - *value;

            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;

    Some(variance.sqrt())
}

pub fn max(data: &[f64]) -> Option<f64> {
    data.iter().copied().reduce(f64::max)
}

/// Scales values so the largest becomes 1. Leaves all-zero input untouched.
pub fn normalize_to_max(data: &mut [f64]) {
    if let Some(top) = max(data) {
        if top > 0.0 {
            data.iter_mut().for_each(|v| *v /= top);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[10., 20., 30., 15., 22.]), Some(19.4));
        assert_eq!(mean(&[-10.0, 0.0, 10.0]), Some(0.0));
    }

    #[test]
    fn test_mean_empty_slice() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[2.0, 4.0]), Some(1.0));
        assert_eq!(std_dev(&[5.0, 5.0, 5.0]), Some(0.0));
        assert_eq!(std_dev(&[]), None);
    }

    #[test]
    fn test_max() {
        assert_eq!(max(&[1.0, 7.5, -3.0]), Some(7.5));
        assert_eq!(max(&[]), None);
    }

    #[test]
    fn test_normalize_to_max() {
        let mut v = [1.0, 2.0, 4.0];
        normalize_to_max(&mut v);
        assert_eq!(v, [0.25, 0.5, 1.0]);

        let mut zeros = [0.0, 0.0];
        normalize_to_max(&mut zeros);
        assert_eq!(zeros, [0.0, 0.0]);
    }
}
