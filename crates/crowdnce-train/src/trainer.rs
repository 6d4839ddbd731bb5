//! Optimisation loop.
//!
//! One call to [`Trainer::train_batch`] runs the predictor with teacher
//! forcing, fuses the bivariate task loss with the weighted social
//! contrastive loss, back-propagates and steps AdamW. Predictor and
//! contrastive parameters live in separate [`VarMap`]s: only the
//! predictor's gradients are clipped, and only the predictor's weights are
//! checkpointed.

use std::time::Instant;

use candle_core::backprop::GradStore;
use candle_core::{DType, Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use crowdnce_contrast::SocialNce;
use crowdnce_core::{negative_seeds, positive_seeds, SceneBatch};
use crowdnce_model::{bivariate_nll, tensor_from_array, TrajectoryPredictor};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::TrainConfig;
use crate::error::TrainError;

/// Losses of one optimiser step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchLosses {
    /// `task + weight × contrast`.
    pub total: f32,
    /// Bivariate negative log-likelihood over the kept agents.
    pub task: f32,
    /// Unweighted contrastive loss (0 when the path is disabled).
    pub contrast: f32,
}

/// Averages over the optimised batches of one epoch.
///
/// Batches skipped by the safety filter add nothing to the sums and are
/// left out of the divisor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EpochLosses {
    /// Epoch index.
    pub epoch: usize,
    /// Mean total loss.
    pub total: f64,
    /// Mean task loss.
    pub task: f64,
    /// Mean unweighted contrastive loss.
    pub contrast: f64,
    /// Batches that produced an optimiser step.
    pub batches: usize,
    /// Batches skipped by the safety filter.
    pub skipped: usize,
}

/// Owns the predictor, the contrastive head and the optimiser.
pub struct Trainer<P: TrajectoryPredictor> {
    config: TrainConfig,
    predictor: P,
    contrast: Option<SocialNce>,
    optimizer: AdamW,
    predictor_vars: VarMap,
    contrast_vars: VarMap,
    device: Device,
    rng: ChaCha8Rng,
}

impl<P: TrajectoryPredictor> std::fmt::Debug for Trainer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trainer")
            .field("config", &self.config)
            .field("contrast", &self.contrast)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl<P: TrajectoryPredictor> Trainer<P> {
    /// Build the predictor through `make_predictor`, the contrastive head
    /// when the path is enabled, and an AdamW optimiser over both.
    pub fn build<F>(config: TrainConfig, device: &Device, make_predictor: F) -> Result<Self, TrainError>
    where
        F: FnOnce(VarBuilder<'_>) -> candle_core::Result<P>,
    {
        config.validate()?;

        let predictor_vars = VarMap::new();
        let predictor = make_predictor(VarBuilder::from_varmap(&predictor_vars, DType::F32, device))?;

        let contrast_vars = VarMap::new();
        let contrast = if config.contrast.enabled() {
            let feat_dim = predictor.embedding_dim() + 2 * config.obs_len;
            let vb = VarBuilder::from_varmap(&contrast_vars, DType::F32, device);
            Some(SocialNce::build(config.contrast.clone(), vb, feat_dim, device)?)
        } else {
            None
        };

        let mut vars = predictor_vars.all_vars();
        vars.extend(contrast_vars.all_vars());
        let params = ParamsAdamW {
            lr: config.learning_rate,
            weight_decay: 0.0,
            ..ParamsAdamW::default()
        };
        let optimizer = AdamW::new(vars, params)?;

        tracing::info!(
            contrast = config.contrast.enabled(),
            sampling = %config.contrast.sampling,
            weight = config.contrast.weight,
            safe_traj = config.safe_traj,
            "trainer ready"
        );

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            predictor,
            contrast,
            optimizer,
            predictor_vars,
            contrast_vars,
            device: device.clone(),
        })
    }

    /// The validated configuration.
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// The predictor being trained.
    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    /// The predictor's parameters.
    pub fn predictor_vars(&self) -> &VarMap {
        &self.predictor_vars
    }

    /// Parameters of the contrastive head and encoder.
    pub fn contrast_vars(&self) -> &VarMap {
        &self.contrast_vars
    }

    /// The contrastive loss, if enabled.
    pub fn contrast(&self) -> Option<&SocialNce> {
        self.contrast.as_ref()
    }

    /// Device all tensors are placed on.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// One optimiser step on `scene`.
    ///
    /// Returns `None` without touching any parameter when the safety
    /// filter leaves no agent.
    pub fn train_batch(&mut self, scene: &SceneBatch) -> Result<Option<BatchLosses>, TrainError> {
        scene.validate()?;
        let keep = scene.safe_agents(self.config.safe_traj);
        if keep.is_empty() {
            tracing::debug!(agents = scene.num_agents(), "no collision-free agent, batch skipped");
            return Ok(None);
        }

        let observed = tensor_from_array(&scene.v_obs, &self.device)?;
        let adjacency = tensor_from_array(&scene.a_obs, &self.device)?;
        let future = tensor_from_array(&scene.teacher_forced_future(), &self.device)?;
        let target = tensor_from_array(&scene.v_tr, &self.device)?;

        let output = self
            .predictor
            .forward(&observed, &adjacency, &future, self.contrast.is_some())?;

        let task = if keep.len() < scene.num_agents() {
            let index = Tensor::new(keep.as_slice(), &self.device)?;
            bivariate_nll(
                &output.params.index_select(&index, 1)?,
                &target.index_select(&index, 1)?,
            )?
        } else {
            bivariate_nll(&output.params, &target)?
        };

        let (total, contrast) = match &self.contrast {
            Some(nce) => {
                let features = output.embedding.as_ref().ok_or(TrainError::MissingEmbedding)?;
                let horizon = nce.config().horizon;
                let robot = scene.last_observed();
                let neighbours = scene.neighbor_mask(self.config.adjacency_frame)?;
                let pos = positive_seeds(scene.pred_traj_gt.view(), horizon)?;
                let neg = negative_seeds(scene.pred_traj_gt.view(), horizon)?;
                let history = tensor_from_array(&scene.history_descriptor(), &self.device)?;

                let contrast = nce.loss(
                    robot.view(),
                    neighbours.view(),
                    pos.view(),
                    neg.view(),
                    features,
                    &history,
                    &mut self.rng,
                )?;
                let total = (&task + contrast.affine(self.config.contrast.weight, 0.0)?)?;
                (total, Some(contrast))
            }
            None => (task.clone(), None),
        };

        let mut grads = total.backward()?;
        if let Some(max_norm) = self.config.clip_grad {
            let norm = clip_grad_norm(&self.predictor_vars, &mut grads, max_norm)?;
            tracing::trace!(norm, max_norm, "gradient norm");
        }
        self.optimizer.step(&grads)?;

        let contrast = match contrast {
            Some(c) => c.to_scalar::<f32>()?,
            None => 0.0,
        };
        Ok(Some(BatchLosses {
            total: total.to_scalar::<f32>()?,
            task: task.to_scalar::<f32>()?,
            contrast,
        }))
    }

    /// One pass over `scenes`.
    pub fn train_epoch(&mut self, epoch: usize, scenes: &[SceneBatch]) -> Result<EpochLosses, TrainError> {
        let start = Instant::now();
        let mut sums = EpochLosses {
            epoch,
            ..EpochLosses::default()
        };

        for (index, scene) in scenes.iter().enumerate() {
            match self.train_batch(scene)? {
                Some(losses) => {
                    sums.total += f64::from(losses.total);
                    sums.task += f64::from(losses.task);
                    sums.contrast += f64::from(losses.contrast);
                    sums.batches += 1;
                    tracing::debug!(
                        epoch,
                        batch = index,
                        total = losses.total,
                        task = losses.task,
                        contrast = losses.contrast,
                        "train batch"
                    );
                }
                None => sums.skipped += 1,
            }
        }

        if sums.batches > 0 {
            let n = sums.batches as f64;
            sums.total /= n;
            sums.task /= n;
            sums.contrast /= n;
        }

        tracing::info!(
            epoch,
            total = sums.total,
            task = sums.task,
            contrast = sums.contrast,
            batches = sums.batches,
            skipped = sums.skipped,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "train epoch"
        );
        Ok(sums)
    }
}

/// Rescale the gradients of `vars` so that their global L2 norm is at most
/// `max_norm`. Returns the norm before clipping.
fn clip_grad_norm(vars: &VarMap, grads: &mut GradStore, max_norm: f64) -> Result<f64, TrainError> {
    let vars = vars.all_vars();
    let mut sq = 0.0f64;
    for var in &vars {
        if let Some(g) = grads.get(var.as_tensor()) {
            sq += f64::from(g.sqr()?.sum_all()?.to_scalar::<f32>()?);
        }
    }
    let norm = sq.sqrt();
    if norm > max_norm {
        let scale = max_norm / (norm + 1e-6);
        for var in &vars {
            if let Some(g) = grads.get(var.as_tensor()) {
                let scaled = g.affine(scale, 0.0)?;
                grads.insert(var.as_tensor(), scaled);
            }
        }
    }
    Ok(norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use candle_core::Var;

    fn store_with(value: f32) -> (VarMap, Var, GradStore) {
        let map = VarMap::new();
        let vb = VarBuilder::from_varmap(&map, DType::F32, &Device::Cpu);
        let _ = vb.get_with_hints(2, "w", candle_nn::Init::Const(1.0)).unwrap();
        let var = map.all_vars().remove(0);
        let loss = var.as_tensor().affine(f64::from(value), 0.0).unwrap().sum_all().unwrap();
        let grads = loss.backward().unwrap();
        (map, var, grads)
    }

    #[test]
    fn clipping_bounds_global_norm() {
        let (map, var, mut grads) = store_with(3.0);
        let before = clip_grad_norm(&map, &mut grads, 1.0).unwrap();
        // d/dw sum(3w) = [3, 3]
        assert_abs_diff_eq!(before, 18f64.sqrt(), epsilon = 1e-5);
        let g = grads.get(var.as_tensor()).unwrap().to_vec1::<f32>().unwrap();
        let after = (g[0] * g[0] + g[1] * g[1]).sqrt();
        assert_abs_diff_eq!(after, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn small_gradients_are_untouched() {
        let (map, var, mut grads) = store_with(0.1);
        clip_grad_norm(&map, &mut grads, 1.0).unwrap();
        let g = grads.get(var.as_tensor()).unwrap().to_vec1::<f32>().unwrap();
        assert_abs_diff_eq!(g[0], 0.1, epsilon = 1e-6);
    }
}
