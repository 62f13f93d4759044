//! Trajectory model - expected cumulative progress as a polynomial of elapsed
//! periods.
//!
//! A rate schedule `[r_1, .., r_n]` over a period of `p` days becomes
//!
//! ```text
//! P(t) = sum_k r_k * t^k / (k * p^k)
//! ```
//!
//! Each rate contributes its running total over `t` periods. The divisor is
//! `k`, not `k!`; goal definitions are calibrated against exactly this form.

use goaltrack_core::{validate_schedule, GoalSpec, Result};
use nalgebra::DMatrix;
use serde::Serialize;

/// Relative size of the imaginary part below which an eigenvalue counts as a
/// real root.
pub const DEFAULT_ROOT_TOLERANCE: f64 = 1e-6;

const NEWTON_STEPS: usize = 16;

/// Polynomial in elapsed periods `t`.
///
/// Coefficients are stored lowest order first: `coefficients()[k]` multiplies
/// `t^k`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

impl Polynomial {
    /// Wrap coefficients given lowest order first. No coefficients is the
    /// zero polynomial.
    pub fn new(coefficients: Vec<f64>) -> Self {
        if coefficients.is_empty() {
            return Self {
                coefficients: vec![0.0],
            };
        }
        Self { coefficients }
    }

    /// Build the expected-progress curve for a rate schedule.
    pub fn trajectory(period: u32, rate_coefficients: &[f64]) -> Result<Self> {
        validate_schedule(period, rate_coefficients)?;
        Ok(integrate_rates(period, rate_coefficients))
    }

    /// Expected-progress curve of a goal.
    pub fn for_goal(goal: &GoalSpec) -> Self {
        integrate_rates(goal.period(), goal.rate_coefficients())
    }

    /// Coefficients, lowest order first.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Nominal degree (number of coefficients minus one).
    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Value at `t`. Any real `t` is accepted, including negative ones.
    pub fn evaluate(&self, t: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * t + c)
    }

    /// First derivative.
    pub fn derivative(&self) -> Polynomial {
        let coefficients = self
            .coefficients
            .iter()
            .enumerate()
            .skip(1)
            .map(|(k, &c)| c * k as f64)
            .collect();
        Polynomial::new(coefficients)
    }

    /// Value of the first derivative at `t`.
    pub fn evaluate_derivative(&self, t: f64) -> f64 {
        self.derivative().evaluate(t)
    }

    /// Every real `t` with `P(t) = y`, ascending.
    pub fn real_roots(&self, y: f64) -> Vec<f64> {
        self.real_roots_with_tolerance(y, DEFAULT_ROOT_TOLERANCE)
    }

    /// Every real `t` with `P(t) = y`, ascending, accepting eigenvalues whose
    /// imaginary part is within `tolerance` (relative to their magnitude).
    ///
    /// Roots are the eigenvalues of the companion matrix of `P(t) - y`, so the
    /// same path serves every degree. A polynomial that is constant after
    /// dropping vanishing leading terms has no roots.
    pub fn real_roots_with_tolerance(&self, y: f64, tolerance: f64) -> Vec<f64> {
        let mut shifted = self.coefficients.clone();
        shifted[0] -= y;

        let scale = shifted.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
        while shifted.len() > 1 {
            match shifted.last() {
                Some(lead) if lead.abs() <= f64::EPSILON * scale => {
                    shifted.pop();
                }
                _ => break,
            }
        }

        let n = shifted.len() - 1;
        if n == 0 {
            return Vec::new();
        }

        let lead = shifted[n];
        let mut companion = DMatrix::<f64>::zeros(n, n);
        for i in 1..n {
            companion[(i, i - 1)] = 1.0;
        }
        for i in 0..n {
            companion[(i, n - 1)] = -shifted[i] / lead;
        }

        let target = Polynomial::new(shifted);
        let mut roots: Vec<f64> = companion
            .complex_eigenvalues()
            .iter()
            .filter(|z| z.re.is_finite() && z.im.abs() <= tolerance * z.re.abs().max(1.0))
            .map(|z| target.polish_root(z.re))
            .collect();

        roots.sort_by(f64::total_cmp);
        roots.dedup_by(|a, b| (*a - *b).abs() <= 1e-12 * a.abs().max(1.0));
        roots
    }

    /// Newton refinement of an eigenvalue estimate; keeps the estimate if
    /// refinement does not reduce the residual.
    fn polish_root(&self, estimate: f64) -> f64 {
        let slope = self.derivative();
        let mut x = estimate;
        for _ in 0..NEWTON_STEPS {
            let d = slope.evaluate(x);
            if d == 0.0 || !d.is_finite() {
                break;
            }
            let step = self.evaluate(x) / d;
            if !step.is_finite() {
                break;
            }
            x -= step;
            if step.abs() <= f64::EPSILON * x.abs().max(1.0) {
                break;
            }
        }
        if self.evaluate(x).abs() <= self.evaluate(estimate).abs() {
            x
        } else {
            estimate
        }
    }

    /// Rate schedule that reproduces this polynomial through
    /// [`Polynomial::trajectory`] for the given period.
    ///
    /// The constant term has no rate counterpart and is dropped.
    pub fn rate_coefficients(&self, period: u32) -> Vec<f64> {
        let p = f64::from(period);
        self.coefficients
            .iter()
            .enumerate()
            .skip(1)
            .map(|(k, &c)| c * k as f64 * p.powi(k as i32))
            .collect()
    }
}

fn integrate_rates(period: u32, rate_coefficients: &[f64]) -> Polynomial {
    let p = f64::from(period);
    let coefficients = std::iter::once(0.0)
        .chain(rate_coefficients.iter().enumerate().map(|(i, &rate)| {
            let k = (i + 1) as f64;
            rate / (k * p.powi(i as i32 + 1))
        }))
        .collect();
    Polynomial::new(coefficients)
}

impl std::fmt::Display for Polynomial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut wrote = false;
        for (k, &c) in self.coefficients.iter().enumerate().rev() {
            if c == 0.0 {
                continue;
            }
            let magnitude = c.abs();
            match (wrote, c < 0.0) {
                (false, true) => write!(f, "-")?,
                (true, true) => write!(f, " - ")?,
                (true, false) => write!(f, " + ")?,
                (false, false) => {}
            }
            match k {
                0 => write!(f, "{magnitude}")?,
                1 => write!(f, "{magnitude} t")?,
                _ => write!(f, "{magnitude} t^{k}")?,
            }
            wrote = true;
        }
        if !wrote {
            write!(f, "0")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use goaltrack_core::TrackError;

    #[test]
    fn test_starts_at_zero() {
        for period in 1..=7 {
            for rates in [vec![20.0], vec![20.0, 1.0], vec![-3.0, 0.5, 2.0], vec![0.0]] {
                let p = Polynomial::trajectory(period, &rates).unwrap();
                assert_eq!(p.evaluate(0.0), 0.0);
                assert_eq!(p.degree(), rates.len());
            }
        }
    }

    #[test]
    fn test_daily_increasing_goal() {
        let p = Polynomial::trajectory(1, &[20.0, 1.0]).unwrap();
        assert_eq!(p.coefficients(), &[0.0, 20.0, 0.5]);
        assert_eq!(p.evaluate(0.0), 0.0);
        assert_relative_eq!(p.evaluate(1.0), 20.5);
        assert_relative_eq!(p.evaluate(2.0), 42.0);
        assert_relative_eq!(p.evaluate(-1.0), -19.5);
    }

    #[test]
    fn test_divides_by_order_not_factorial() {
        let p = Polynomial::trajectory(2, &[4.0, 8.0, 24.0]).unwrap();
        // 4/(1*2), 8/(2*4), 24/(3*8)
        assert_eq!(p.coefficients(), &[0.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_rate_tracks_period() {
        let (initial, increase) = (20.0, 1.0);
        for period in 1..5 {
            let p = Polynomial::trajectory(period, &[initial, increase]).unwrap();
            let pf = f64::from(period);
            for t in 0..5 {
                let t = f64::from(t);
                let expected = (initial + t * increase / pf) / pf;
                assert_relative_eq!(p.evaluate_derivative(t), expected, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn test_non_negative_rates_never_decrease() {
        let grid = [0.0, 1e-6, 0.25, 1.0, 3.5, 20.0, 1e3];
        let mut schedules: Vec<Vec<f64>> = grid.iter().map(|&a| vec![a]).collect();
        for &a in &grid {
            for &b in &grid {
                schedules.push(vec![a, b]);
                for &c in &grid {
                    schedules.push(vec![a, b, c]);
                }
            }
        }
        // higher orders, cycling through the grid with co-prime strides
        for i in 0..grid.len() * 5 {
            schedules.push((0..5).map(|k| grid[(i * (k + 2) + k) % grid.len()]).collect());
        }

        // elapsed periods are never negative; sample fine steps near zero
        // and geometrically wider ones out to several years of periods
        let mut samples = vec![0.0];
        samples.extend((1..=50).map(|i| f64::from(i) * 1e-3));
        samples.extend((0..60).map(|i| 0.05 * 1.15_f64.powi(i)));
        samples.extend((1..=40).map(f64::from));
        samples.sort_by(f64::total_cmp);
        samples.dedup();

        for period in [1, 2, 7, 30, 365] {
            for rates in &schedules {
                let p = Polynomial::trajectory(period, rates).unwrap();
                let mut previous = p.evaluate(0.0);
                for &t in &samples[1..] {
                    let value = p.evaluate(t);
                    assert!(
                        value >= previous,
                        "{rates:?} over {period} days decreases before t = {t}"
                    );
                    assert!(p.evaluate_derivative(t) >= 0.0);
                    previous = value;
                }
            }
        }
    }

    #[test]
    fn test_growing_schedule_can_fall_before_start() {
        // negative t lies outside the elapsed-period domain
        let p = Polynomial::trajectory(1, &[20.0, 1.0]).unwrap();
        assert!(p.evaluate(-50.0) > p.evaluate(-40.0));
    }

    #[test]
    fn test_rejects_invalid_schedule() {
        assert!(matches!(
            Polynomial::trajectory(0, &[1.0]),
            Err(TrackError::InvalidSpec(_))
        ));
        assert!(matches!(
            Polynomial::trajectory(1, &[]),
            Err(TrackError::InvalidSpec(_))
        ));
        assert!(matches!(
            Polynomial::trajectory(1, &[20.0, f64::NAN]),
            Err(TrackError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_linear_roots_use_general_solver() {
        let p = Polynomial::trajectory(1, &[5.0]).unwrap();
        let roots = p.real_roots(10.0);
        assert_eq!(roots.len(), 1);
        assert_relative_eq!(roots[0], 2.0, max_relative = 1e-12);
    }

    #[test]
    fn test_quadratic_roots() {
        let p = Polynomial::trajectory(1, &[20.0, 1.0]).unwrap();

        let at_zero = p.real_roots(0.0);
        assert_eq!(at_zero.len(), 2);
        assert_abs_diff_eq!(at_zero[0], -40.0, epsilon = 1e-9);
        assert_abs_diff_eq!(at_zero[1], 0.0, epsilon = 1e-9);

        // 0.5 t^2 + 20 t - 25 = 0
        let at_25 = p.real_roots(25.0);
        assert_eq!(at_25.len(), 2);
        assert_relative_eq!(at_25[1], -20.0 + 450.0_f64.sqrt(), max_relative = 1e-10);
        assert_relative_eq!(at_25[0], -20.0 - 450.0_f64.sqrt(), max_relative = 1e-10);
    }

    #[test]
    fn test_cubic_roots() {
        // (t - 1)(t - 2)(t - 3)
        let p = Polynomial::new(vec![-6.0, 11.0, -6.0, 1.0]);
        let roots = p.real_roots(0.0);
        assert_eq!(roots.len(), 3);
        for (root, expected) in roots.iter().zip([1.0, 2.0, 3.0]) {
            assert_abs_diff_eq!(*root, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_no_real_roots() {
        // t^2 + 1 never reaches zero
        let p = Polynomial::new(vec![1.0, 0.0, 1.0]);
        assert!(p.real_roots(0.0).is_empty());

        let flat = Polynomial::trajectory(1, &[0.0]).unwrap();
        assert!(flat.real_roots(5.0).is_empty());
    }

    #[test]
    fn test_vanishing_leading_term_is_ignored() {
        let p = Polynomial::trajectory(1, &[4.0, 0.0]).unwrap();
        let roots = p.real_roots(8.0);
        assert_eq!(roots.len(), 1);
        assert_relative_eq!(roots[0], 2.0, max_relative = 1e-12);
    }

    #[test]
    fn test_rate_coefficients_invert_trajectory() {
        let rates = [20.0, 1.0, 0.5];
        let p = Polynomial::trajectory(3, &rates).unwrap();
        let back = p.rate_coefficients(3);
        assert_eq!(back.len(), 3);
        for (got, want) in back.iter().zip(rates) {
            assert_relative_eq!(*got, want, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_display() {
        let p = Polynomial::trajectory(1, &[20.0, 1.0]).unwrap();
        assert_eq!(p.to_string(), "0.5 t^2 + 20 t");
        assert_eq!(Polynomial::new(vec![-1.0, 0.0, -2.0]).to_string(), "-2 t^2 - 1");
        assert_eq!(Polynomial::new(vec![]).to_string(), "0");
    }
}
