//! Bivariate Gaussian negative log-likelihood.

use std::f64::consts::PI;

use candle_core::{Result, Tensor, D};

/// Lower bound on the density before taking the log.
const DENSITY_FLOOR: f64 = 1e-20;

/// Mean negative log-likelihood of `target` under `params`.
///
/// `params` is `[T, N, 5]` raw bivariate parameters and `target` is
/// `[T, N, 2]`. The density is floored at `1e-20`, which caps the
/// per-point loss at about 46.
pub fn bivariate_nll(params: &Tensor, target: &Tensor) -> Result<Tensor> {
    let last = params.rank().saturating_sub(1);
    let mu_x = params.narrow(last, 0, 1)?.squeeze(D::Minus1)?;
    let mu_y = params.narrow(last, 1, 1)?.squeeze(D::Minus1)?;
    let sx = params.narrow(last, 2, 1)?.squeeze(D::Minus1)?.exp()?;
    let sy = params.narrow(last, 3, 1)?.squeeze(D::Minus1)?.exp()?;
    let corr = params.narrow(last, 4, 1)?.squeeze(D::Minus1)?.tanh()?;

    let dx = (target.narrow(last, 0, 1)?.squeeze(D::Minus1)? - mu_x)?;
    let dy = (target.narrow(last, 1, 1)?.squeeze(D::Minus1)? - mu_y)?;
    let sxsy = (&sx * &sy)?;

    let z = ((dx.broadcast_div(&sx)?.sqr()? + dy.broadcast_div(&sy)?.sqr()?)?
        - ((&corr * &dx)? * &dy)?.broadcast_div(&sxsy)?.affine(2.0, 0.0)?)?;
    let neg_rho = corr.sqr()?.affine(-1.0, 1.0)?;

    let numerator = (z.neg()? / neg_rho.affine(2.0, 0.0)?)?.exp()?;
    let denominator = (sxsy * neg_rho.sqrt()?)?.affine(2.0 * PI, 0.0)?;
    let density = (numerator / denominator)?;

    density.maximum(DENSITY_FLOOR)?.log()?.neg()?.mean_all()
}
