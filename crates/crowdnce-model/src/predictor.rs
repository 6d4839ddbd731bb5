//! Contract for the external trajectory predictor.

use candle_core::{Result, Tensor};

/// Output of one predictor call.
#[derive(Clone, Debug)]
pub struct PredictorOutput {
    /// Raw bivariate parameters `(mu_x, mu_y, log_sx, log_sy, corr_raw)`,
    /// `[T, N, 5]`, one step per frame of the decoder input.
    pub params: Tensor,
    /// Per-agent embedding `[N, D]`, present only when requested.
    pub embedding: Option<Tensor>,
}

/// A spatio-temporal graph predictor.
///
/// All tensors are time-major. `observed` is `[T_obs, N, 2]`, `adjacency`
/// is `[T_obs, N, N]` and `future` is the decoder input `[T_f, N, 2]`
/// whose first frame is the last observed relative step. Implementations
/// must emit `T_f` steps of parameters so that autoregressive decoding can
/// grow `future` one frame at a time.
pub trait TrajectoryPredictor {
    /// Run the predictor. `want_embedding` is only set during training.
    fn forward(
        &self,
        observed: &Tensor,
        adjacency: &Tensor,
        future: &Tensor,
        want_embedding: bool,
    ) -> Result<PredictorOutput>;

    /// Width `D` of the embedding returned with `want_embedding`.
    fn embedding_dim(&self) -> usize;
}
