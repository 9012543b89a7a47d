//! Bounded Nelder-Mead simplex minimizer.

use std::cmp::Ordering;

/// Box constraints, one `(lower, upper)` pair per dimension.
#[derive(Debug, Clone)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    fn clamp(&self, point: &mut [f64]) {
        for (i, v) in point.iter_mut().enumerate() {
            *v = v.clamp(self.lower[i], self.upper[i]);
        }
    }
}

/// Best point found by [`nelder_mead`].
#[derive(Debug, Clone)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    /// `false` when the iteration budget ran out first
    pub converged: bool,
}

fn order_by_value(values: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
    indices
}

/// Minimize `f` inside `bounds`, starting from `initial`.
///
/// Stops once the simplex diameter drops below `tol` or the spread of
/// vertex values is negligible.
#[allow(clippy::cast_precision_loss)]
pub fn nelder_mead<F>(f: F, initial: &[f64], bounds: &Bounds, max_iter: usize, tol: f64) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let dim = initial.len();
    let n = dim + 1;

    let mut start = initial.to_vec();
    bounds.clamp(&mut start);
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n);
    simplex.push(start.clone());

    for i in 0..dim {
        let mut vertex = start.clone();
        let step = (bounds.upper[i] - bounds.lower[i]) * 0.1;
        vertex[i] = (vertex[i] + step).min(bounds.upper[i]);
        if (vertex[i] - start[i]).abs() < 1e-12 {
            vertex[i] = (vertex[i] - step).max(bounds.lower[i]);
        }
        simplex.push(vertex);
    }

    let mut values: Vec<f64> = simplex.iter().map(|v| f(v)).collect();

    for iteration in 0..max_iter {
        let indices = order_by_value(&values);
        let best_idx = indices[0];
        let worst_idx = indices[n - 1];
        let second_worst_idx = indices[n - 2];

        let diameter = simplex[best_idx]
            .iter()
            .zip(&simplex[worst_idx])
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f64, f64::max);
        let spread = (values[worst_idx] - values[best_idx]).abs();
        if diameter < tol || spread <= f64::EPSILON * values[best_idx].abs().max(1.0) {
            return Minimum {
                point: simplex[best_idx].clone(),
                value: values[best_idx],
                iterations: iteration,
                converged: true,
            };
        }

        // Centroid of all but the worst vertex
        let mut centroid = vec![0.0; dim];
        for &idx in &indices[..n - 1] {
            for (c, x) in centroid.iter_mut().zip(&simplex[idx]) {
                *c += x;
            }
        }
        for c in &mut centroid {
            *c /= (n - 1) as f64;
        }

        let mut reflected: Vec<f64> = centroid
            .iter()
            .zip(&simplex[worst_idx])
            .map(|(&c, &w)| 2.0 * c - w)
            .collect();
        bounds.clamp(&mut reflected);
        let f_reflected = f(&reflected);

        if f_reflected < values[best_idx] {
            let mut expanded: Vec<f64> = centroid
                .iter()
                .zip(&reflected)
                .map(|(&c, &r)| 2.0 * r - c)
                .collect();
            bounds.clamp(&mut expanded);
            let f_expanded = f(&expanded);

            if f_expanded < f_reflected {
                simplex[worst_idx] = expanded;
                values[worst_idx] = f_expanded;
            } else {
                simplex[worst_idx] = reflected;
                values[worst_idx] = f_reflected;
            }
        } else if f_reflected < values[second_worst_idx] {
            simplex[worst_idx] = reflected;
            values[worst_idx] = f_reflected;
        } else {
            let (from, f_from) = if f_reflected < values[worst_idx] {
                (reflected, f_reflected)
            } else {
                (simplex[worst_idx].clone(), values[worst_idx])
            };

            let mut contracted: Vec<f64> = centroid
                .iter()
                .zip(&from)
                .map(|(&c, &w)| 0.5 * (c + w))
                .collect();
            bounds.clamp(&mut contracted);
            let f_contracted = f(&contracted);

            if f_contracted < f_from {
                simplex[worst_idx] = contracted;
                values[worst_idx] = f_contracted;
            } else {
                // Shrink towards the best vertex
                let best_point = simplex[best_idx].clone();
                for &idx in &indices[1..] {
                    for (x, b) in simplex[idx].iter_mut().zip(&best_point) {
                        *x = 0.5 * (*x + b);
                    }
                    bounds.clamp(&mut simplex[idx]);
                    values[idx] = f(&simplex[idx]);
                }
            }
        }
    }

    let best_idx = order_by_value(&values)[0];
    Minimum {
        point: simplex[best_idx].clone(),
        value: values[best_idx],
        iterations: max_iter,
        converged: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_bounds(lo: f64, hi: f64) -> Bounds {
        Bounds {
            lower: vec![lo, lo],
            upper: vec![hi, hi],
        }
    }

    #[test]
    fn test_nelder_mead_quadratic() {
        let result = nelder_mead(
            |p| (p[0] - 3.0).powi(2) + (p[1] - 5.0).powi(2),
            &[0.0, 0.0],
            &square_bounds(-10.0, 10.0),
            500,
            1e-8,
        );
        assert!(result.converged);
        assert!((result.point[0] - 3.0).abs() < 0.01, "x = {}", result.point[0]);
        assert!((result.point[1] - 5.0).abs() < 0.01, "y = {}", result.point[1]);
    }

    #[test]
    fn test_nelder_mead_respects_bounds() {
        let result = nelder_mead(
            |p| (p[0] - 3.0).powi(2) + (p[1] - 5.0).powi(2),
            &[1.0, 1.0],
            &square_bounds(0.0, 2.0),
            500,
            1e-8,
        );
        assert!(result.point.iter().all(|v| (0.0..=2.0).contains(v)));
        assert!((result.point[0] - 2.0).abs() < 0.05);
        assert!((result.point[1] - 2.0).abs() < 0.05);
    }

    #[test]
    fn test_nelder_mead_reports_exhausted_budget() {
        let result = nelder_mead(
            |p| (p[0] - 0.5).powi(2) + (p[1] + 0.25).powi(2),
            &[-0.9, 0.9],
            &square_bounds(-1.0, 1.0),
            1,
            1e-12,
        );
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
    }
}
