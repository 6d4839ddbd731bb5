//! Bivariate Gaussian emitted by the predictor for every agent and step.
//!
//! The predictor's raw output is `(mu_x, mu_y, log_sx, log_sy, corr_raw)`.
//! Standard deviations are recovered with `exp`, the correlation with
//! `tanh`, so the covariance is positive semi-definite by construction.
//!
//! Sampling uses the Cholesky factor of the covariance driven by a
//! Box-Muller normal pair, which keeps the RNG contract identical to the
//! rest of the workspace (any `rand::Rng`, typically a seeded ChaCha8).

use ndarray::{Array4, ArrayView3, Axis};
use rand::Rng;

use crate::error::CoreError;

/// Number of raw parameters per agent per step.
pub const PARAMS_PER_STEP: usize = 5;

/// A decoded bivariate Gaussian.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bivariate {
    /// Mean along x.
    pub mu_x: f32,
    /// Mean along y.
    pub mu_y: f32,
    /// Standard deviation along x (`exp(log_sx)`).
    pub sx: f32,
    /// Standard deviation along y (`exp(log_sy)`).
    pub sy: f32,
    /// Correlation coefficient (`tanh(corr_raw)`).
    pub corr: f32,
}

impl Bivariate {
    /// Decode `(mu_x, mu_y, log_sx, log_sy, corr_raw)`.
    pub fn from_raw(raw: [f32; PARAMS_PER_STEP]) -> Self {
        Self {
            mu_x: raw[0],
            mu_y: raw[1],
            sx: raw[2].exp(),
            sy: raw[3].exp(),
            corr: raw[4].tanh(),
        }
    }

    /// Covariance matrix `[[sx², ρ·sx·sy], [ρ·sx·sy, sy²]]`.
    pub fn covariance(&self) -> [[f32; 2]; 2] {
        let off = self.corr * self.sx * self.sy;
        [[self.sx * self.sx, off], [off, self.sy * self.sy]]
    }

    /// Determinant `sx²·sy²·(1 − ρ²)`.
    pub fn determinant(&self) -> f32 {
        let c = self.covariance();
        c[0][0] * c[1][1] - c[0][1] * c[1][0]
    }

    /// Draw one point.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> [f32; 2] {
        let (z1, z2) = standard_normal_pair(rng);
        let (z1, z2) = (z1 as f32, z2 as f32);
        let residual = (1.0 - self.corr * self.corr).max(0.0).sqrt();
        [
            self.mu_x + self.sx * z1,
            self.mu_y + self.sy * (self.corr * z1 + residual * z2),
        ]
    }
}

/// Two independent standard normals via the Box-Muller transform.
pub fn standard_normal_pair<R: Rng + ?Sized>(rng: &mut R) -> (f64, f64) {
    let u1: f64 = rng.random::<f64>().max(1e-300); // avoid ln(0)
    let u2: f64 = rng.random();
    let r = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * std::f64::consts::PI * u2;
    (r * theta.cos(), r * theta.sin())
}

/// Draw `k` independent trajectories from per-step parameters.
///
/// `params` is `[T, N, 5]`; the result is `[K, T, N, 2]`. Every step is
/// sampled independently, matching one draw of the joint distribution
/// over the whole horizon.
pub fn sample_trajectories<R: Rng + ?Sized>(
    params: ArrayView3<'_, f32>,
    k: usize,
    rng: &mut R,
) -> Result<Array4<f32>, CoreError> {
    let (t, n, p) = params.dim();
    if p != PARAMS_PER_STEP {
        return Err(CoreError::shape("bivariate params", &[t, n, PARAMS_PER_STEP], params.shape()));
    }

    let decoded: Vec<Bivariate> = params
        .lanes(Axis(2))
        .into_iter()
        .map(|lane| Bivariate::from_raw([lane[0], lane[1], lane[2], lane[3], lane[4]]))
        .collect();

    let mut out = Array4::zeros((k, t, n, 2));
    for draw in 0..k {
        for (idx, dist) in decoded.iter().enumerate() {
            let [x, y] = dist.sample(rng);
            let (step, agent) = (idx / n, idx % n);
            out[[draw, step, agent, 0]] = x;
            out[[draw, step, agent, 1]] = y;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array3;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn zero_raw_is_isotropic_unit() {
        let g = Bivariate::from_raw([0.5, -0.5, 0.0, 0.0, 0.0]);
        assert_eq!(g.covariance(), [[1.0, 0.0], [0.0, 1.0]]);
        assert_abs_diff_eq!(g.determinant(), 1.0);
    }

    #[test]
    fn sample_moments_track_parameters() {
        let g = Bivariate::from_raw([1.0, 2.0, (0.5f32).ln(), (0.25f32).ln(), 0.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let n = 20_000;
        let (mut sx, mut sy) = (0.0f64, 0.0f64);
        for _ in 0..n {
            let [x, y] = g.sample(&mut rng);
            sx += x as f64;
            sy += y as f64;
        }
        assert_abs_diff_eq!(sx / n as f64, 1.0, epsilon = 0.02);
        assert_abs_diff_eq!(sy / n as f64, 2.0, epsilon = 0.02);
    }

    #[test]
    fn trajectories_have_requested_shape() {
        let params = Array3::zeros((12, 3, PARAMS_PER_STEP));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let out = sample_trajectories(params.view(), 20, &mut rng).unwrap();
        assert_eq!(out.dim(), (20, 12, 3, 2));
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn trajectories_reject_wrong_param_width() {
        let params = Array3::zeros((12, 3, 4));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(sample_trajectories(params.view(), 2, &mut rng).is_err());
    }

    proptest! {
        #[test]
        fn covariance_is_psd(
            log_sx in -4.0f32..4.0,
            log_sy in -4.0f32..4.0,
            corr_raw in -20.0f32..20.0,
        ) {
            let g = Bivariate::from_raw([0.0, 0.0, log_sx, log_sy, corr_raw]);
            let c = g.covariance();
            prop_assert!(c[0][0] > 0.0);
            prop_assert!(c[1][1] > 0.0);
            prop_assert!(g.determinant() >= -1e-6 * c[0][0] * c[1][1]);
        }
    }
}
