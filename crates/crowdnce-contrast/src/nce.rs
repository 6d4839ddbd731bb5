//! The SocialNCE objective.

use std::fmt;

use candle_core::{DType, Device, Tensor, D};
use candle_nn::VarBuilder;
use crowdnce_model::{
    mask_tensor, tensor_from_array, EventEncoder, ProjHead, ProjectionHead, SampleEncoder,
    SpatialEncoder,
};
use crowdnce_sampler::{ContrastSamples, EventSampler, SamplingStrategy};
use ndarray::{Array2, ArrayView2, ArrayView3, ArrayView4};
use rand::Rng;

use crate::config::ContrastConfig;
use crate::error::ContrastError;

/// Hidden width of the projection head.
const HEAD_HIDDEN: usize = 32;
/// Shared query/key width.
const EMBEDDING_DIM: usize = 8;
/// Hidden width of the sample encoders.
const ENCODER_HIDDEN: usize = 8;
/// Logit assigned to invalid negatives. Finite so that rows without any
/// valid negative stay NaN-free before they are masked out.
const MASKED_LOGIT: f32 = -1e9;

/// Social contrastive loss with its sampler, encoder and projection head.
pub struct SocialNce {
    config: ContrastConfig,
    sampler: EventSampler,
    head: Box<dyn ProjectionHead>,
    encoder: Box<dyn SampleEncoder>,
    device: Device,
}

impl fmt::Debug for SocialNce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocialNce")
            .field("config", &self.config)
            .field("embedding_dim", &self.head.embedding_dim())
            .finish_non_exhaustive()
    }
}

impl SocialNce {
    /// Assemble from explicit parts.
    pub fn new(
        config: ContrastConfig,
        head: Box<dyn ProjectionHead>,
        encoder: Box<dyn SampleEncoder>,
        device: Device,
    ) -> Result<Self, ContrastError> {
        config.validate()?;
        if head.embedding_dim() != encoder.embedding_dim() {
            return Err(ContrastError::EmbeddingMismatch {
                query: head.embedding_dim(),
                key: encoder.embedding_dim(),
            });
        }
        let sampler = EventSampler::new(config.sampler.clone(), config.sampling)?;
        Ok(Self {
            config,
            sampler,
            head,
            encoder,
            device,
        })
    }

    /// Build the default head and encoder under `vb`.
    ///
    /// `feat_dim` is the width of `[features ‖ history]`: the predictor
    /// embedding plus `2 × T_obs`. The event strategy gets a time-aware
    /// encoder, the local strategy a position-only one.
    pub fn build(
        config: ContrastConfig,
        vb: VarBuilder<'_>,
        feat_dim: usize,
        device: &Device,
    ) -> Result<Self, ContrastError> {
        let head = ProjHead::new(vb.pp("head"), feat_dim, HEAD_HIDDEN, EMBEDDING_DIM)?;
        let encoder: Box<dyn SampleEncoder> = match config.sampling {
            SamplingStrategy::Event => Box::new(EventEncoder::new(
                vb.pp("encoder"),
                ENCODER_HIDDEN,
                EMBEDDING_DIM,
            )?),
            SamplingStrategy::Local => Box::new(SpatialEncoder::new(
                vb.pp("encoder"),
                ENCODER_HIDDEN,
                EMBEDDING_DIM,
            )?),
        };
        Self::new(config, Box::new(head), encoder, device.clone())
    }

    /// The validated configuration.
    pub fn config(&self) -> &ContrastConfig {
        &self.config
    }

    /// The bound sampler.
    pub fn sampler(&self) -> &EventSampler {
        &self.sampler
    }

    /// Contrastive loss for one scene.
    ///
    /// `robot` is `[N, 2]`, `neighbor_mask` `[N, N-1]`, `pos_seeds`
    /// `[N, H, 2]`, `neg_seeds` `[N, H, N-1, 2]`, `features` `[N, D]` and
    /// `history` `[N, 2·T_obs]`. Returns a scalar averaged over the
    /// `(agent, step)` rows holding at least one valid negative, or an
    /// exact zero when there are none.
    #[allow(clippy::too_many_arguments)]
    pub fn loss<R: Rng + ?Sized>(
        &self,
        robot: ArrayView2<'_, f32>,
        neighbor_mask: ArrayView2<'_, bool>,
        pos_seeds: ArrayView3<'_, f32>,
        neg_seeds: ArrayView4<'_, f32>,
        features: &Tensor,
        history: &Tensor,
        rng: &mut R,
    ) -> Result<Tensor, ContrastError> {
        let samples = self
            .sampler
            .sample(robot, neighbor_mask, pos_seeds, neg_seeds, rng)?;

        let rows = samples.valid_rows();
        let active = rows.iter().filter(|&&v| v).count();
        if active == 0 {
            tracing::debug!("no valid negatives in scene, contrastive loss is zero");
            return Ok(Tensor::zeros((), DType::F32, &self.device)?);
        }

        let query = l2_normalize(&self.head.project(&Tensor::cat(&[features, history], 1)?)?)?;
        let (key_pos, key_neg) = self.encode_samples(&samples)?;

        let (n, h, m) = (samples.num_agents(), samples.horizon(), samples.num_negatives());
        let e = query.dim(1)?;
        let inv_temp = 1.0 / self.config.temperature;

        let sim_pos = key_pos
            .broadcast_mul(&query.reshape((n, 1, e))?)?
            .sum(D::Minus1)?
            .affine(inv_temp, 0.0)?;
        let sim_neg = key_neg
            .broadcast_mul(&query.reshape((n, 1, 1, e))?)?
            .sum(D::Minus1)?
            .affine(inv_temp, 0.0)?;

        let valid = mask_tensor(&samples.valid, &self.device)?;
        let fill = Tensor::full(MASKED_LOGIT, (n, h, m), &self.device)?;
        let sim_neg = valid.where_cond(&sim_neg, &fill)?;

        let logits = Tensor::cat(&[&sim_pos.unsqueeze(2)?, &sim_neg], 2)?;
        let row_loss = candle_nn::ops::log_softmax(&logits, D::Minus1)?
            .narrow(2, 0, 1)?
            .squeeze(2)?
            .neg()?;

        let row_weight = tensor_from_array(&rows.mapv(|v| if v { 1.0f32 } else { 0.0 }), &self.device)?;
        let total = (row_loss * row_weight)?.sum_all()?;
        Ok(total.affine(1.0 / active as f64, 0.0)?)
    }

    fn encode_samples(&self, samples: &ContrastSamples) -> Result<(Tensor, Tensor), ContrastError> {
        let (n, h, m) = (samples.num_agents(), samples.horizon(), samples.num_negatives());
        let e = self.encoder.embedding_dim();

        let pos_time = centred_time(n, h, 1);
        let neg_time = centred_time(n, h, m);

        let pos = tensor_from_array(&samples.positive, &self.device)?.reshape((n * h, 2))?;
        let neg = tensor_from_array(&samples.negative, &self.device)?.reshape((n * h * m, 2))?;
        let pos_time = tensor_from_array(&pos_time, &self.device)?;
        let neg_time = tensor_from_array(&neg_time, &self.device)?;

        let key_pos = l2_normalize(&self.encoder.encode(&pos, &pos_time)?)?.reshape((n, h, e))?;
        let key_neg = l2_normalize(&self.encoder.encode(&neg, &neg_time)?)?.reshape((n, h, m, e))?;
        Ok((key_pos, key_neg))
    }
}

/// Time index `t − (H−1)/2` for every flattened `[N, H, per_step]` sample.
fn centred_time(n: usize, h: usize, per_step: usize) -> Array2<f32> {
    let centre = (h as f32 - 1.0) / 2.0;
    let per_agent = h * per_step;
    Array2::from_shape_fn((n * per_agent, 1), |(row, _)| {
        ((row % per_agent) / per_step) as f32 - centre
    })
}

fn l2_normalize(x: &Tensor) -> candle_core::Result<Tensor> {
    let norm = x.sqr()?.sum_keepdim(D::Minus1)?.affine(1.0, 1e-12)?.sqrt()?;
    x.broadcast_div(&norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use candle_nn::VarMap;
    use crowdnce_core::{negative_seeds, positive_seeds};
    use ndarray::{array, Array3};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn build(weight: f64, sampling: SamplingStrategy) -> (VarMap, SocialNce) {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let config = ContrastConfig {
            weight,
            sampling,
            horizon: 2,
            ..ContrastConfig::default()
        };
        let nce = SocialNce::build(config, vb.pp("contrast"), 4 + 6, &Device::Cpu).unwrap();
        (varmap, nce)
    }

    fn scene_seeds(spacing: f32) -> (Array2<f32>, Array3<f32>, ndarray::Array4<f32>) {
        // Three agents walking in parallel along x.
        let mut future = Array3::zeros((2, 3, 2));
        for t in 0..2 {
            for a in 0..3 {
                future[[t, a, 0]] = t as f32 * 0.4;
                future[[t, a, 1]] = a as f32 * spacing;
            }
        }
        let robot = array![[0.0f32, 0.0], [0.0, spacing], [0.0, 2.0 * spacing]];
        let pos = positive_seeds(future.view(), 2).unwrap();
        let neg = negative_seeds(future.view(), 2).unwrap();
        (robot, pos, neg)
    }

    fn features() -> (Tensor, Tensor) {
        let f = Tensor::arange(0f32, 12.0, &Device::Cpu).unwrap().reshape((3, 4)).unwrap();
        let h = Tensor::ones((3, 6), DType::F32, &Device::Cpu).unwrap();
        (f, h)
    }

    #[test]
    fn mismatched_embeddings_rejected() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let head = ProjHead::new(vb.pp("h"), 10, 32, 8).unwrap();
        let enc = SpatialEncoder::new(vb.pp("e"), 8, 4).unwrap();
        let err = SocialNce::new(
            ContrastConfig::default(),
            Box::new(head),
            Box::new(enc),
            Device::Cpu,
        )
        .unwrap_err();
        assert!(matches!(err, ContrastError::EmbeddingMismatch { query: 8, key: 4 }));
    }

    #[test]
    fn event_loss_is_finite_and_positive() {
        let (_vm, nce) = build(0.05, SamplingStrategy::Event);
        let (robot, pos, neg) = scene_seeds(1.0);
        let mask = Array2::from_elem((3, 2), true);
        let (f, h) = features();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let loss = nce
            .loss(robot.view(), mask.view(), pos.view(), neg.view(), &f, &h, &mut rng)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(loss.is_finite());
        assert!(loss > 0.0);
    }

    #[test]
    fn isolated_agents_give_exact_zero() {
        let (_vm, nce) = build(0.05, SamplingStrategy::Event);
        // Neighbours far beyond max_separation.
        let (robot, pos, neg) = scene_seeds(10.0);
        let mask = Array2::from_elem((3, 2), true);
        let (f, h) = features();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let loss = nce
            .loss(robot.view(), mask.view(), pos.view(), neg.view(), &f, &h, &mut rng)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert_eq!(loss, 0.0);
    }

    #[test]
    fn masked_neighbours_do_not_change_the_loss() {
        let (_vm, nce) = build(0.05, SamplingStrategy::Event);
        let (robot, pos, neg) = scene_seeds(1.0);
        let (f, h) = features();

        // Agent 2 loses every neighbour; the loss then only averages over
        // agents 0 and 1, and must stay finite.
        let mut mask = Array2::from_elem((3, 2), true);
        mask[[2, 0]] = false;
        mask[[2, 1]] = false;
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let loss = nce
            .loss(robot.view(), mask.view(), pos.view(), neg.view(), &f, &h, &mut rng)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(loss.is_finite() && loss > 0.0);
    }

    #[test]
    fn local_strategy_runs_on_first_step() {
        let (_vm, nce) = build(0.05, SamplingStrategy::Local);
        assert_eq!(nce.sampler().config().num_boundary, 1);
        let (robot, pos, neg) = scene_seeds(1.0);
        let mask = Array2::from_elem((3, 2), true);
        let (f, h) = features();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let loss = nce
            .loss(robot.view(), mask.view(), pos.view(), neg.view(), &f, &h, &mut rng)
            .unwrap();
        assert!(loss.to_scalar::<f32>().unwrap().is_finite());
    }

    #[test]
    fn time_index_is_centred() {
        let t = centred_time(2, 4, 3);
        assert_eq!(t.dim(), (24, 1));
        assert_abs_diff_eq!(t[[0, 0]], -1.5);
        assert_abs_diff_eq!(t[[3, 0]], -0.5);
        assert_abs_diff_eq!(t[[11, 0]], 1.5);
        assert_abs_diff_eq!(t[[12, 0]], -1.5);
    }
}
