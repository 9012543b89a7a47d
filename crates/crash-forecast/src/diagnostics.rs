//! Identification diagnostics for the yearly series.
//!
//! Plain vectors only; nothing here touches the fitted model.

use serde::{Deserialize, Serialize};

/// Default number of lags inspected.
pub const DEFAULT_MAX_LAG: usize = 20;

/// First differences of the series and their correlograms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub differenced: Vec<f64>,
    /// Autocorrelations, `acf[0] == 1.0`
    pub acf: Vec<f64>,
    /// Partial autocorrelations, `pacf[0] == 1.0`
    pub pacf: Vec<f64>,
}

/// Lag-1 differences. One element shorter than the input.
pub fn difference(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    values.iter().sum::<f64>() / n
}

/// Sample autocorrelation for lags `0..=max_lag`.
///
/// Lags beyond the series length are dropped. A constant series has no
/// defined correlation; its lags past 0 are reported as 0.
pub fn acf(values: &[f64], max_lag: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let max_lag = max_lag.min(values.len() - 1);
    let m = mean(values);
    let centered: Vec<f64> = values.iter().map(|v| v - m).collect();
    let c0: f64 = centered.iter().map(|v| v * v).sum();

    (0..=max_lag)
        .map(|lag| {
            if lag == 0 {
                1.0
            } else if c0 == 0.0 {
                0.0
            } else {
                centered
                    .iter()
                    .zip(&centered[lag..])
                    .map(|(a, b)| a * b)
                    .sum::<f64>()
                    / c0
            }
        })
        .collect()
}

/// Sample partial autocorrelation for lags `0..=max_lag` (Durbin-Levinson).
pub fn pacf(values: &[f64], max_lag: usize) -> Vec<f64> {
    let rho = acf(values, max_lag);
    if rho.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(rho.len());
    out.push(1.0);

    // phi[j] holds the lag-(j+1) coefficient of the current AR(k) fit
    let mut phi: Vec<f64> = Vec::with_capacity(rho.len());
    let mut v = 1.0_f64;
    for k in 1..rho.len() {
        let num = rho[k] - phi.iter().enumerate().map(|(j, p)| p * rho[k - 1 - j]).sum::<f64>();
        let phi_kk = if v.abs() < f64::EPSILON { 0.0 } else { num / v };

        let previous = phi.clone();
        for (j, p) in phi.iter_mut().enumerate() {
            *p = previous[j] - phi_kk * previous[k - 2 - j];
        }
        phi.push(phi_kk);
        v *= 1.0 - phi_kk * phi_kk;
        out.push(phi_kk);
    }
    out
}

/// Difference the series once and compute both correlograms.
pub fn diagnose(values: &[f64], max_lag: usize) -> Diagnostics {
    let differenced = difference(values);
    Diagnostics {
        acf: acf(&differenced, max_lag),
        pacf: pacf(&differenced, max_lag),
        differenced,
    }
}
