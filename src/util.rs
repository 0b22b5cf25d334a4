/// Round to one decimal place, the precision every displayed percentage and rate uses
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `part / whole × 100`, or 0 when `whole` is 0
pub fn percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_tenth() {
        assert_eq!(round_tenth(66.666), 66.7);
        assert_eq!(round_tenth(12.34), 12.3);
        assert_eq!(round_tenth(0.05), 0.1);
        assert_eq!(round_tenth(100.0), 100.0);
    }

    #[test]
    fn test_percent_of_zero_is_zero() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(3, 0), 0.0);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 4), 25.0);
        assert_eq!(percent(4, 4), 100.0);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[10., 20., 30., 15., 22.]), Some(19.4));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[5.0, 5.0, 5.0]), Some(0.0));
        assert_eq!(std_dev(&[2., 4., 4., 4., 5., 5., 7., 9.]), Some(2.0));
        assert_eq!(std_dev(&[]), None);
    }
}
