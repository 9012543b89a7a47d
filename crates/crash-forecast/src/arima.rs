//! ARIMA(1,1,1) on yearly counts, fitted by conditional sum of squares.
//!
//! The differenced series `w_t = y_t - y_{t-1}` follows
//! `w_t = phi * w_{t-1} + e_t + theta * e_{t-1}` with no constant.

use std::fmt;
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use crash_domain::{ForecastPoint, YearlyCount, YearlySeries};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, info};
use uuid::Uuid;

use crate::diagnostics::{acf, difference};
use crate::error::{ForecastError, Result};
use crate::optimizer::{Bounds, nelder_mead};

/// (p, d, q) of the only model kind supported.
pub const ORDER: [usize; 3] = [1, 1, 1];

/// Fewest distinct years a fit accepts.
pub const MIN_OBSERVATIONS: usize = 5;

/// Confidence level of `ForecastModel::forecast` intervals.
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Display error as a fraction of each point estimate.
pub const ERROR_BAND_RATIO: f64 = 0.10;

/// Longest forecast horizon, in years, a model will answer.
pub const MAX_HORIZON: usize = 1_000;

const COEFFICIENT_BOUND: f64 = 0.99;
const MAX_ITERATIONS: usize = 2_000;
const TOLERANCE: f64 = 1e-8;

// =============================================================================
// TYPES
// =============================================================================

/// Provenance and fit statistics of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: Uuid,
    pub fitted_at: DateTime<Utc>,
    pub order: [usize; 3],
    pub first_year: i32,
    pub last_year: i32,
    pub observations: usize,
    pub sse: f64,
    pub sigma2: f64,
    pub aic: f64,
}

/// Multi-step forecast with per-step variance and interval bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDistribution {
    /// Year of the first forecasted value
    pub start_year: i32,
    pub mean: Vec<f64>,
    pub variance: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub confidence: f64,
}

impl ForecastDistribution {
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        (0..self.mean.len()).map_while(|i| {
            i32::try_from(i)
                .ok()
                .and_then(|i| self.start_year.checked_add(i))
        })
    }
}

/// A fitted model that can produce forecasts.
///
/// Anything loaded from storage is handed out as a `Box<dyn ForecastModel>`,
/// so holding one means forecasting is available.
pub trait ForecastModel: fmt::Debug + Send + Sync {
    fn metadata(&self) -> &ModelMetadata;

    /// Native multi-step prediction with variance and interval bounds.
    fn get_forecast(&self, steps: usize, confidence: f64) -> Result<ForecastDistribution>;

    /// Point estimates only.
    fn forecast(&self, steps: usize) -> Result<Vec<f64>> {
        Ok(self.get_forecast(steps, DEFAULT_CONFIDENCE)?.mean)
    }
}

/// Symmetric display error for a point estimate.
#[must_use]
pub fn display_error(estimate: f64) -> f64 {
    (estimate * ERROR_BAND_RATIO).abs()
}

/// Years covered by a `steps`-year forecast after `last_year`.
///
/// # Errors
///
/// `InvalidHorizon` unless `1 <= steps <= MAX_HORIZON` and the last
/// forecast year fits in an `i32`.
pub fn forecast_years(last_year: i32, steps: usize) -> Result<RangeInclusive<i32>> {
    if steps == 0 || steps > MAX_HORIZON {
        return Err(ForecastError::InvalidHorizon(steps));
    }
    let offset = i32::try_from(steps).map_err(|_| ForecastError::InvalidHorizon(steps))?;
    let end = last_year
        .checked_add(offset)
        .ok_or(ForecastError::InvalidHorizon(steps))?;
    Ok(end - offset + 1..=end)
}

/// Point forecasts for the `horizon` years after the last observed year,
/// each with its display error.
pub fn forecast_points(model: &dyn ForecastModel, horizon: usize) -> Result<Vec<ForecastPoint>> {
    let years = forecast_years(model.metadata().last_year, horizon)?;
    let estimates = model.forecast(horizon)?;
    Ok(estimates
        .into_iter()
        .zip(years)
        .map(|(estimate, year)| ForecastPoint {
            year,
            estimate,
            error: display_error(estimate),
        })
        .collect())
}

// =============================================================================
// MODEL
// =============================================================================

/// Fitted ARIMA(1,1,1) model.
#[derive(Debug, Clone, PartialEq)]
pub struct ArimaModel {
    metadata: ModelMetadata,
    phi: f64,
    theta: f64,
    history: Vec<YearlyCount>,
    last_diff: f64,
    last_residual: f64,
}

impl ArimaModel {
    /// Fit the model to a gap-free yearly series.
    ///
    /// # Errors
    ///
    /// `ModelFit` when the series is shorter than [`MIN_OBSERVATIONS`], its
    /// differences are constant, or the optimizer does not converge.
    pub fn fit(series: &YearlySeries) -> Result<Self> {
        let n = series.len();
        if n < MIN_OBSERVATIONS {
            return Err(ForecastError::ModelFit(format!(
                "need at least {MIN_OBSERVATIONS} years of data, got {n}"
            )));
        }

        let levels = series.values();
        let diffs = difference(&levels);
        if diffs.iter().all(|w| (w - diffs[0]).abs() < f64::EPSILON) {
            return Err(ForecastError::ModelFit(
                "differenced series is constant".to_string(),
            ));
        }

        let initial_phi = acf(&diffs, 1)
            .get(1)
            .copied()
            .unwrap_or(0.0)
            .clamp(-COEFFICIENT_BOUND, COEFFICIENT_BOUND);
        let bounds = Bounds {
            lower: vec![-COEFFICIENT_BOUND; 2],
            upper: vec![COEFFICIENT_BOUND; 2],
        };

        let minimum = nelder_mead(
            |p| {
                let sse = sum_of_squares(&conditional_residuals(&diffs, p[0], p[1]));
                if sse.is_finite() { sse } else { f64::MAX }
            },
            &[initial_phi, 0.0],
            &bounds,
            MAX_ITERATIONS,
            TOLERANCE,
        );

        if !minimum.converged {
            return Err(ForecastError::ModelFit(format!(
                "optimizer did not converge within {MAX_ITERATIONS} iterations"
            )));
        }
        if !minimum.value.is_finite() || minimum.value >= f64::MAX {
            return Err(ForecastError::ModelFit(
                "objective is not finite".to_string(),
            ));
        }

        let (phi, theta) = (minimum.point[0], minimum.point[1]);
        let residuals = conditional_residuals(&diffs, phi, theta);
        let sse = sum_of_squares(&residuals);
        let effective = residuals.len() - 1;
        #[allow(clippy::cast_precision_loss)]
        let n_eff = effective as f64;
        let sigma2 = sse / n_eff;
        if !sigma2.is_finite() || sigma2 <= 0.0 {
            return Err(ForecastError::ModelFit(
                "residual variance is zero".to_string(),
            ));
        }

        // Gaussian conditional likelihood; phi, theta and sigma2 are estimated
        let log_likelihood = -0.5 * n_eff * ((2.0 * std::f64::consts::PI).ln() + sigma2.ln() + 1.0);
        let aic = 2.0f64.mul_add(3.0, -2.0 * log_likelihood);

        let points = series.points().to_vec();
        let metadata = ModelMetadata {
            model_id: Uuid::new_v4(),
            fitted_at: Utc::now(),
            order: ORDER,
            first_year: points.first().map_or(0, |p| p.year),
            last_year: points.last().map_or(0, |p| p.year),
            observations: n,
            sse,
            sigma2,
            aic,
        };

        debug!(iterations = minimum.iterations, "Optimizer converged");
        info!(
            model_id = %metadata.model_id,
            phi,
            theta,
            sigma2,
            aic,
            observations = n,
            "ARIMA(1,1,1) fitted"
        );

        Ok(Self {
            metadata,
            phi,
            theta,
            history: points,
            last_diff: diffs[diffs.len() - 1],
            last_residual: residuals[residuals.len() - 1],
        })
    }

    /// Rebuild a model from persisted parts, checking every field.
    pub(crate) fn from_parts(
        metadata: ModelMetadata,
        phi: f64,
        theta: f64,
        history: Vec<YearlyCount>,
    ) -> std::result::Result<Self, String> {
        if metadata.order != ORDER {
            return Err(format!("unsupported order {:?}", metadata.order));
        }
        for (name, value) in [("phi", phi), ("theta", theta)] {
            if !value.is_finite() || value.abs() >= 1.0 {
                return Err(format!("coefficient {name} = {value} is outside (-1, 1)"));
            }
        }
        if !metadata.sigma2.is_finite() || metadata.sigma2 <= 0.0 {
            return Err(format!("residual variance {} is not positive", metadata.sigma2));
        }
        if history.is_empty() {
            return Err("empty history".to_string());
        }
        let series = YearlySeries::new(history).map_err(|e| e.to_string())?;
        if series.len() < MIN_OBSERVATIONS {
            return Err(format!("history holds only {} years", series.len()));
        }
        if series.last_year() != Some(metadata.last_year) {
            return Err(format!(
                "history ends in {:?} but metadata says {}",
                series.last_year(),
                metadata.last_year
            ));
        }

        let diffs = difference(&series.values());
        let residuals = conditional_residuals(&diffs, phi, theta);
        Ok(Self {
            metadata,
            phi,
            theta,
            last_diff: diffs[diffs.len() - 1],
            last_residual: residuals[residuals.len() - 1],
            history: series.points().to_vec(),
        })
    }

    pub const fn phi(&self) -> f64 {
        self.phi
    }

    pub const fn theta(&self) -> f64 {
        self.theta
    }

    pub fn history(&self) -> &[YearlyCount] {
        &self.history
    }

    #[allow(clippy::cast_precision_loss)]
    fn last_level(&self) -> f64 {
        self.history.last().map_or(0.0, |p| p.count as f64)
    }
}

impl ForecastModel for ArimaModel {
    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn get_forecast(&self, steps: usize, confidence: f64) -> Result<ForecastDistribution> {
        let years = forecast_years(self.metadata.last_year, steps)?;
        let z = z_score(confidence)?;

        let mut mean = Vec::with_capacity(steps);
        let mut variance = Vec::with_capacity(steps);

        let mut diff = self.phi.mul_add(self.last_diff, self.theta * self.last_residual);
        let mut level = self.last_level();
        let mut psi = 1.0;
        let mut cumulative_psi = 0.0;
        let mut accumulated = 0.0;

        for step in 0..steps {
            if step > 0 {
                diff *= self.phi;
            }
            level += diff;
            mean.push(level);

            // integrated psi weights: Psi_j = psi_0 + ... + psi_j
            cumulative_psi += psi;
            accumulated += cumulative_psi * cumulative_psi;
            variance.push(self.metadata.sigma2 * accumulated);
            psi = if step == 0 { self.phi + self.theta } else { psi * self.phi };
        }

        let lower = mean
            .iter()
            .zip(&variance)
            .map(|(m, v)| z.mul_add(-v.sqrt(), *m))
            .collect();
        let upper = mean
            .iter()
            .zip(&variance)
            .map(|(m, v)| z.mul_add(v.sqrt(), *m))
            .collect();

        Ok(ForecastDistribution {
            start_year: *years.start(),
            mean,
            variance,
            lower,
            upper,
            confidence,
        })
    }
}

/// Two-sided standard normal quantile for a confidence level.
fn z_score(confidence: f64) -> Result<f64> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(ForecastError::InvalidConfidence(confidence));
    }
    let normal = Normal::new(0.0, 1.0).map_err(|_| ForecastError::InvalidConfidence(confidence))?;
    Ok(normal.inverse_cdf(0.5 + confidence / 2.0))
}

/// Residuals of the ARMA(1,1) recursion, conditioned on `e_0 = 0`.
fn conditional_residuals(diffs: &[f64], phi: f64, theta: f64) -> Vec<f64> {
    let mut residuals = Vec::with_capacity(diffs.len());
    residuals.push(0.0);
    for t in 1..diffs.len() {
        let e = diffs[t] - phi * diffs[t - 1] - theta * residuals[t - 1];
        residuals.push(e);
    }
    residuals
}

fn sum_of_squares(residuals: &[f64]) -> f64 {
    residuals.iter().skip(1).map(|e| e * e).sum()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn synthetic_series(years: i32) -> YearlySeries {
        let points = (0..years)
            .map(|t| YearlyCount {
                year: 1970 + t,
                count: i64::from(100 + 3 * t + (t * 37) % 11 - 5),
            })
            .collect();
        YearlySeries::new(points).unwrap()
    }

    fn series_from(start: i32, counts: &[i64]) -> YearlySeries {
        let points = counts
            .iter()
            .zip(start..)
            .map(|(&count, year)| YearlyCount { year, count })
            .collect();
        YearlySeries::new(points).unwrap()
    }

    fn metadata_for(series: &YearlySeries, sigma2: f64) -> ModelMetadata {
        ModelMetadata {
            model_id: Uuid::new_v4(),
            fitted_at: Utc::now(),
            order: ORDER,
            first_year: series.first_year().unwrap(),
            last_year: series.last_year().unwrap(),
            observations: series.len(),
            sse: 0.0,
            sigma2,
            aic: 0.0,
        }
    }

    #[test]
    fn test_fit_rejects_short_series() {
        let series = series_from(2000, &[4, 9, 2]);
        assert!(matches!(
            ArimaModel::fit(&series),
            Err(ForecastError::ModelFit(_))
        ));
    }

    #[test]
    fn test_fit_rejects_constant_differences() {
        let series = series_from(2000, &[1, 3, 5, 7, 9, 11]);
        assert!(matches!(
            ArimaModel::fit(&series),
            Err(ForecastError::ModelFit(_))
        ));
    }

    #[test]
    fn test_fit_synthetic_series() {
        let series = synthetic_series(30);
        let model = ArimaModel::fit(&series).unwrap();

        assert!(model.phi().abs() < 1.0);
        assert!(model.theta().abs() < 1.0);
        let meta = model.metadata();
        assert_eq!(meta.order, [1, 1, 1]);
        assert_eq!(meta.first_year, 1970);
        assert_eq!(meta.last_year, 1999);
        assert_eq!(meta.observations, 30);
        assert!(meta.sigma2 > 0.0);
        assert!(meta.aic.is_finite());
    }

    #[test]
    fn test_forecast_points_years_and_band() {
        let model = ArimaModel::fit(&synthetic_series(30)).unwrap();
        let points = forecast_points(&model, 10).unwrap();

        assert_eq!(points.len(), 10);
        for (i, point) in points.iter().enumerate() {
            assert_eq!(point.year, 2000 + i32::try_from(i).unwrap());
            assert!((point.error - 0.1 * point.estimate.abs()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let model = ArimaModel::fit(&synthetic_series(12)).unwrap();
        assert!(matches!(
            model.forecast(0),
            Err(ForecastError::InvalidHorizon(0))
        ));
        assert!(matches!(
            model.get_forecast(3, 1.5),
            Err(ForecastError::InvalidConfidence(_))
        ));
    }

    #[test]
    fn test_oversized_horizon_rejected() {
        let model = ArimaModel::fit(&synthetic_series(30)).unwrap();
        for steps in [usize::MAX, MAX_HORIZON + 1] {
            assert!(matches!(
                forecast_points(&model, steps),
                Err(ForecastError::InvalidHorizon(s)) if s == steps
            ));
            assert!(matches!(
                model.get_forecast(steps, 0.95),
                Err(ForecastError::InvalidHorizon(_))
            ));
        }

        let points = forecast_points(&model, MAX_HORIZON).unwrap();
        assert_eq!(points.len(), MAX_HORIZON);
        assert_eq!(points[MAX_HORIZON - 1].year, 1999 + 1_000);
    }

    #[test]
    fn test_forecast_years_stop_at_last_representable_year() {
        assert_eq!(forecast_years(i32::MAX - 2, 2).unwrap(), i32::MAX - 1..=i32::MAX);
        assert!(matches!(
            forecast_years(i32::MAX - 2, 3),
            Err(ForecastError::InvalidHorizon(3))
        ));
        assert!(matches!(
            forecast_years(2000, 0),
            Err(ForecastError::InvalidHorizon(0))
        ));
    }

    #[test]
    fn test_forecast_recursion_with_known_coefficients() {
        // diffs [2, 1, 2, -1]; residuals [0, 0, 1.5, -2.6]
        let series = series_from(2000, &[10, 12, 13, 15, 14]);
        let model =
            ArimaModel::from_parts(metadata_for(&series, 2.0), 0.5, 0.4, series.points().to_vec())
                .unwrap();

        let dist = model.get_forecast(3, 0.95).unwrap();
        assert_eq!(dist.start_year, 2005);
        assert_eq!(dist.years().collect::<Vec<_>>(), vec![2005, 2006, 2007]);
        assert!((dist.mean[0] - 12.46).abs() < 1e-9);
        assert!((dist.mean[1] - (12.46 - 0.77)).abs() < 1e-9);
        assert!((dist.variance[0] - 2.0).abs() < 1e-9);
        assert!((dist.variance[1] - 2.0 * (1.0 + 1.9 * 1.9)).abs() < 1e-9);

        let half_width = dist.upper[0] - dist.mean[0];
        assert!((half_width - 1.959_964 * 2.0_f64.sqrt()).abs() < 1e-4);
        assert!((dist.mean[0] - dist.lower[0] - half_width).abs() < 1e-9);
    }

    #[test]
    fn test_intervals_widen_with_horizon() {
        let model = ArimaModel::fit(&synthetic_series(30)).unwrap();
        let dist = model.get_forecast(10, DEFAULT_CONFIDENCE).unwrap();
        assert_eq!(dist.len(), 10);
        for pair in dist.variance.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert!(dist.lower.iter().zip(&dist.upper).all(|(l, u)| l < u));
        assert_eq!(model.forecast(10).unwrap(), dist.mean);
    }

    #[test]
    fn test_from_parts_rejects_bad_fields() {
        let series = series_from(2000, &[10, 12, 13, 15, 14]);
        let history = series.points().to_vec();

        let mut wrong_order = metadata_for(&series, 1.0);
        wrong_order.order = [2, 1, 1];
        assert!(ArimaModel::from_parts(wrong_order, 0.1, 0.1, history.clone()).is_err());
        assert!(ArimaModel::from_parts(metadata_for(&series, 1.0), f64::NAN, 0.1, history.clone()).is_err());
        assert!(ArimaModel::from_parts(metadata_for(&series, 0.0), 0.1, 0.1, history.clone()).is_err());
        assert!(ArimaModel::from_parts(metadata_for(&series, 1.0), 0.1, 0.1, Vec::new()).is_err());
        assert!(ArimaModel::from_parts(metadata_for(&series, 1.0), 0.1, 0.1, history).is_ok());
    }
}
