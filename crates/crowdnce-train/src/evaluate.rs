//! Validation and test evaluation.

use std::time::Instant;

use candle_core::Device;
use crowdnce_core::{sample_trajectories, SceneBatch};
use crowdnce_metrics::{summarize, EvalSummary, MetricsPool, PoolConfig, SceneRollout, TruthCache};
use crowdnce_model::{array3_from_tensor, bivariate_nll, tensor_from_array, TrajectoryPredictor};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::TrainError;
use crate::rollout::{one_shot_params, oracle_decode, to_absolute, RolloutMode};

/// Result of one evaluation pass.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalReport {
    /// How the rollouts were produced.
    pub mode: RolloutMode,
    /// Mean bivariate NLL of the evaluated parameters.
    pub loss: f64,
    /// Pooled metrics.
    pub summary: EvalSummary,
}

/// Rolls out K samples per scene and scores them on the metrics pool.
#[derive(Debug)]
pub struct Evaluator {
    pool: MetricsPool,
    k_samples: usize,
    adjacency_frame: usize,
    device: Device,
    rng: ChaCha8Rng,
    truth: TruthCache,
}

impl Evaluator {
    /// Create an evaluator with its own seeded RNG.
    pub fn new(pool: &PoolConfig, k_samples: usize, adjacency_frame: usize, device: &Device, seed: u64) -> Self {
        Self {
            pool: MetricsPool::new(pool),
            k_samples,
            adjacency_frame,
            device: device.clone(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            truth: TruthCache::new(),
        }
    }

    /// Ground-truth collision curves cached by the first test pass.
    pub fn truth_cache(&self) -> &TruthCache {
        &self.truth
    }

    /// One-shot rollout from teacher-forced parameters.
    pub fn validate<P: TrajectoryPredictor>(
        &mut self,
        predictor: &P,
        scenes: &[SceneBatch],
    ) -> Result<EvalReport, TrainError> {
        self.run(predictor, scenes, RolloutMode::OneShot)
    }

    /// Oracle rollout. Ground-truth curves are computed on the first call
    /// only and reused afterwards.
    pub fn test<P: TrajectoryPredictor>(
        &mut self,
        predictor: &P,
        scenes: &[SceneBatch],
    ) -> Result<EvalReport, TrainError> {
        self.run(predictor, scenes, RolloutMode::Oracle)
    }

    fn run<P: TrajectoryPredictor>(
        &mut self,
        predictor: &P,
        scenes: &[SceneBatch],
        mode: RolloutMode,
    ) -> Result<EvalReport, TrainError> {
        let start = Instant::now();
        let include_truth = mode == RolloutMode::Oracle && self.truth.needs_truth();

        let mut loss = 0.0f64;
        let mut rollouts = Vec::with_capacity(scenes.len());
        for (scene_index, scene) in scenes.iter().enumerate() {
            scene.validate()?;
            let (params, tensor) = match mode {
                RolloutMode::OneShot => {
                    let tensor = one_shot_params(predictor, scene, &self.device)?;
                    (array3_from_tensor(&tensor)?, tensor)
                }
                RolloutMode::Oracle => {
                    let params = oracle_decode(predictor, scene, self.k_samples, &self.device, &mut self.rng)?;
                    let tensor = tensor_from_array(&params, &self.device)?;
                    (params, tensor)
                }
            };
            let target = tensor_from_array(&scene.v_tr, &self.device)?;
            loss += f64::from(bivariate_nll(&tensor, &target)?.to_scalar::<f32>()?);

            let rel = sample_trajectories(params.view(), self.k_samples, &mut self.rng)?;
            rollouts.push(SceneRollout {
                scene_index,
                predictions: to_absolute(rel.view(), scene.last_observed().view())?,
                truth: scene.pred_traj_gt.clone(),
                neighbours: scene.adjacency_mask(self.adjacency_frame)?,
            });
        }

        let results = self.pool.evaluate(&rollouts, include_truth)?;
        let mut summary = summarize(&results)?;
        if mode == RolloutMode::Oracle {
            if let Some(curves) = summary.truth.take() {
                self.truth.fill(curves);
            }
            summary.truth = self.truth.get().cloned();
        }
        let loss = loss / scenes.len().max(1) as f64;

        tracing::info!(
            ?mode,
            scenes = scenes.len(),
            loss,
            ade = summary.ade,
            fde = summary.fde,
            coll = summary.coll,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "evaluation finished"
        );
        Ok(EvalReport { mode, loss, summary })
    }
}
