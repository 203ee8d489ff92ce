use crate::error::{Result, StatsPlotError};
use crate::stats::resample::mean;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Jarque–Bera normality check, reported as a diagnostic next to the dot chart.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalityCheck {
    pub statistic: f64,
    pub p_value: f64,
    pub skewness: f64,
    pub excess_kurtosis: f64,
    pub n: usize,
}

pub fn jarque_bera(values: &[f64]) -> Result<NormalityCheck> {
    let n = values.len();
    if n < 3 {
        return Err(StatsPlotError::test("normality check needs at least 3 observations"));
    }

    let m = mean(values);
    let nf = n as f64;
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / nf;
    if m2 == 0.0 {
        return Err(StatsPlotError::test("normality check needs non-constant data"));
    }
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / nf;
    let m4 = values.iter().map(|v| (v - m).powi(4)).sum::<f64>() / nf;

    let skewness = m3 / m2.powf(1.5);
    let excess_kurtosis = m4 / (m2 * m2) - 3.0;
    let statistic = nf / 6.0 * (skewness.powi(2) + excess_kurtosis.powi(2) / 4.0);

    let dist = ChiSquared::new(2.0).map_err(|e| StatsPlotError::test(e.to_string()))?;
    let p_value = 1.0 - dist.cdf(statistic);

    Ok(NormalityCheck {
        statistic,
        p_value,
        skewness,
        excess_kurtosis,
        n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_sample_has_zero_skew() {
        let check = jarque_bera(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(check.skewness.abs() < 1e-12);
        // m2 = 2, m4 = 6.8
        assert!((check.excess_kurtosis - (6.8 / 4.0 - 3.0)).abs() < 1e-12);
        assert!(check.p_value > 0.5);
    }

    #[test]
    fn test_skewed_sample_is_flagged() {
        let mut values = vec![0.0; 40];
        values.extend([50.0, 60.0, 80.0]);
        let check = jarque_bera(&values).unwrap();
        assert!(check.skewness > 2.0);
        assert!(check.p_value < 0.001);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(jarque_bera(&[1.0, 2.0]).is_err());
        assert!(jarque_bera(&[3.0, 3.0, 3.0]).is_err());
    }
}
