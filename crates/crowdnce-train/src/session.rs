//! Epoch driver tying training, evaluation, logging and checkpoints.

use std::time::Instant;

use crowdnce_core::SceneBatch;
use crowdnce_model::TrajectoryPredictor;

use crate::checkpoint::{CheckpointStore, ConstantMetrics, TrainingMetrics};
use crate::config::SessionConfig;
use crate::error::TrainError;
use crate::evaluate::{EvalReport, Evaluator};
use crate::log::{EpochRecord, TrainingLog};
use crate::selection::{pick_best_epoch, Dataset, Targets};
use crate::trainer::{EpochLosses, Trainer};

/// Best test metrics seen so far.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunningBests {
    /// Lowest ADE.
    pub ade: f64,
    /// Lowest FDE.
    pub fde: f64,
    /// Lowest joint cumulative collision rate.
    pub coll: f64,
}

impl Default for RunningBests {
    fn default() -> Self {
        Self {
            ade: 99_999.0,
            fde: 99_999.0,
            coll: 99_999.0,
        }
    }
}

impl RunningBests {
    fn update(&mut self, ade: f64, fde: f64, coll: f64) {
        self.ade = self.ade.min(ade);
        self.fde = self.fde.min(fde);
        self.coll = self.coll.min(coll);
    }
}

/// Everything produced by one epoch.
#[derive(Clone, Debug, PartialEq)]
pub struct EpochOutcome {
    /// Training losses.
    pub losses: EpochLosses,
    /// One-shot validation report.
    pub validation: EvalReport,
    /// Oracle test report.
    pub test: EvalReport,
    /// Distance to the conservative targets plus the collision rate.
    pub total_error: f64,
    /// Epoch promoted after this one, if any.
    pub best_epoch: Option<usize>,
}

/// A full training run.
#[derive(Debug)]
pub struct Session<P: TrajectoryPredictor> {
    config: SessionConfig,
    dataset: Dataset,
    trainer: Trainer<P>,
    evaluator: Evaluator,
    store: CheckpointStore,
    log: TrainingLog,
    metrics: TrainingMetrics,
    constant: ConstantMetrics,
    bests: RunningBests,
    saved: usize,
}

impl<P: TrajectoryPredictor> Session<P> {
    /// Validate `config`, prepare the checkpoint directory and write
    /// `args.json`.
    pub fn new(config: SessionConfig, trainer: Trainer<P>) -> Result<Self, TrainError> {
        config.validate()?;
        let dataset: Dataset = config.dataset.parse()?;
        let store = CheckpointStore::create(&config.checkpoint_dir)?;
        store.write_args(&config)?;
        let log = TrainingLog::new(store.log_path());
        let evaluator = Evaluator::new(
            &config.pool,
            config.train.k_samples,
            config.train.adjacency_frame,
            trainer.device(),
            config.train.seed.wrapping_add(1),
        );
        let saved = store.weight_count()?;

        tracing::info!(
            %dataset,
            epochs = config.num_epochs,
            dir = %store.root().display(),
            "session ready"
        );
        Ok(Self {
            config,
            dataset,
            trainer,
            evaluator,
            store,
            log,
            metrics: TrainingMetrics::default(),
            constant: ConstantMetrics::default(),
            bests: RunningBests::default(),
            saved,
        })
    }

    /// The trainer.
    pub fn trainer(&self) -> &Trainer<P> {
        &self.trainer
    }

    /// The checkpoint store.
    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// The training log.
    pub fn log(&self) -> &TrainingLog {
        &self.log
    }

    /// Loss histories so far.
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Best validation loss so far.
    pub fn constant_metrics(&self) -> &ConstantMetrics {
        &self.constant
    }

    /// Best test metrics so far.
    pub fn bests(&self) -> &RunningBests {
        &self.bests
    }

    /// Dataset targets lowered by the configured margin.
    pub fn conservative_targets(&self) -> Targets {
        let t = self.dataset.targets();
        Targets {
            ade: t.ade - self.config.margin,
            fde: t.fde - self.config.margin,
            coll: t.coll,
        }
    }

    /// Train, validate, test, log and checkpoint one epoch.
    pub fn run_epoch(
        &mut self,
        epoch: usize,
        train: &[SceneBatch],
        val: &[SceneBatch],
        test: &[SceneBatch],
    ) -> Result<EpochOutcome, TrainError> {
        let start = Instant::now();
        let losses = self.trainer.train_epoch(epoch, train)?;
        let validation = self.evaluator.validate(self.trainer.predictor(), val)?;
        let test = self.evaluator.test(self.trainer.predictor(), test)?;

        self.metrics.train_loss.push(losses.total);
        self.metrics.task_loss.push(losses.task);
        self.metrics.contrast_loss.push(losses.contrast);
        self.metrics.val_loss.push(validation.loss);
        self.constant.observe(epoch, validation.loss);

        let (ade, fde) = (test.summary.ade, test.summary.fde);
        let coll = test.summary.col_joint_c4();
        self.bests.update(ade, fde, coll);
        let targets = self.conservative_targets();
        let total_error = (ade - targets.ade).max(0.0) + (fde - targets.fde).max(0.0) + coll;

        self.log.append(&EpochRecord {
            epoch,
            total_loss: losses.total,
            task_loss: losses.task,
            contrast_loss: losses.contrast,
            validation_loss: validation.loss,
            ade,
            fde,
            coll,
        })?;
        self.store
            .save_epoch(epoch, &self.metrics, &self.constant, self.trainer.predictor_vars())?;
        self.saved += 1;

        let records = self.log.read()?;
        let best_epoch = pick_best_epoch(
            &records,
            self.dataset,
            self.config.min_epochs,
            self.saved,
            self.config.tolerance,
        );
        match best_epoch {
            Some(best) => self.store.promote(best)?,
            None => tracing::debug!(epoch, saved = self.saved, "no epoch selected yet"),
        }

        tracing::info!(
            epoch,
            ade,
            fde,
            coll,
            best_ade = self.bests.ade,
            best_fde = self.bests.fde,
            best_coll = self.bests.coll,
            total_error,
            best_epoch = ?best_epoch,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "epoch finished"
        );
        Ok(EpochOutcome {
            losses,
            validation,
            test,
            total_error,
            best_epoch,
        })
    }

    /// Run every configured epoch.
    pub fn run(
        &mut self,
        train: &[SceneBatch],
        val: &[SceneBatch],
        test: &[SceneBatch],
    ) -> Result<Vec<EpochOutcome>, TrainError> {
        (0..self.config.num_epochs)
            .map(|epoch| self.run_epoch(epoch, train, val, test))
            .collect()
    }
}
