//! Summary statistics over reaction-time samples (milliseconds).

pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(samples: &[f64]) -> Option<f64> {
    let centre = mean(samples)?;
    let variance = samples
        .iter()
        .map(|sample| (sample - centre).powi(2))
        .sum::<f64>()
        / samples.len() as f64;
    Some(variance.sqrt())
}

pub fn fastest(samples: &[f64]) -> Option<f64> {
    samples.iter().copied().reduce(f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_reaction() {
        assert_eq!(mean(&[250., 300., 350.]), Some(300.0));
        assert_eq!(mean(&[412.0]), Some(412.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_std_dev_reaction() {
        let sd = std_dev(&[200., 300., 400.]).unwrap();
        assert!((sd - 81.64965809277261).abs() < 1e-9);
        assert_eq!(std_dev(&[280.0, 280.0]), Some(0.0));
        assert_eq!(std_dev(&[]), None);
    }

    #[test]
    fn test_fastest() {
        assert_eq!(fastest(&[310.0, 251.4, 402.0]), Some(251.4));
        assert_eq!(fastest(&[]), None);
    }
}
