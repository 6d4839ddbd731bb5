//! Per-scene worker pool.
//!
//! ```text
//!   caller ──(pos, &scene)──► [task_tx: bounded(W*4)] ──► crowdnce-metrics-{0..W}
//!                                                              │ evaluate_scene
//!   caller ◄──(pos, result)── [result_tx: unbounded] ◄─────────┘
//! ```
//!
//! Workers borrow scenes from the caller through [`std::thread::scope`],
//! so no scene data is copied or shared mutably. The caller blocks until
//! every worker has been joined, then restores submission order.

use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::error::MetricsError;
use crate::scene::{evaluate_scene, SceneMetrics, SceneRollout};

/// Worker pool sizing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of worker threads. `None` = one per available core.
    pub worker_count: Option<usize>,
}

impl PoolConfig {
    /// Resolve the worker count. Explicit values are clamped to `[1, 256]`.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, 256),
            None => thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

type Task<'a> = (usize, &'a SceneRollout);
type Reply = (usize, Result<SceneMetrics, MetricsError>);

/// Fixed-size pool evaluating scenes in parallel.
#[derive(Clone, Debug)]
pub struct MetricsPool {
    worker_count: usize,
}

impl MetricsPool {
    /// Create a pool from its configuration.
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            worker_count: config.resolved_worker_count(),
        }
    }

    /// Number of worker threads used per evaluation.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Evaluate every scene, returning results in input order.
    ///
    /// Any failing scene aborts the whole evaluation with that scene's
    /// error; partial results are never returned.
    pub fn evaluate(
        &self,
        scenes: &[SceneRollout],
        include_truth: bool,
    ) -> Result<Vec<SceneMetrics>, MetricsError> {
        if scenes.is_empty() {
            return Ok(Vec::new());
        }
        let workers = self.worker_count.min(scenes.len());
        let start = Instant::now();

        let mut replies = thread::scope(|scope| -> Result<Vec<Reply>, MetricsError> {
            let (task_tx, task_rx) = crossbeam_channel::bounded::<Task<'_>>(workers * 4);
            let (reply_tx, reply_rx) = crossbeam_channel::unbounded::<Reply>();

            let mut handles = Vec::with_capacity(workers);
            for i in 0..workers {
                let task_rx = task_rx.clone();
                let reply_tx = reply_tx.clone();
                let handle = thread::Builder::new()
                    .name(format!("crowdnce-metrics-{i}"))
                    .spawn_scoped(scope, move || worker_loop(task_rx, reply_tx, include_truth))
                    .map_err(|e| MetricsError::ThreadSpawnFailed {
                        reason: e.to_string(),
                    })?;
                handles.push(handle);
            }
            // Workers hold the only remaining ends.
            drop(task_rx);
            drop(reply_tx);

            for task in scenes.iter().enumerate() {
                if task_tx.send(task).is_err() {
                    break;
                }
            }
            drop(task_tx);

            let replies: Vec<Reply> = reply_rx.iter().collect();
            let joined: Vec<bool> = handles.into_iter().map(|h| h.join().is_ok()).collect();
            if let Some(worker) = joined.iter().position(|ok| !ok) {
                return Err(MetricsError::WorkerPanicked { worker });
            }
            Ok(replies)
        })?;

        replies.sort_by_key(|(pos, _)| *pos);
        let results = replies
            .into_iter()
            .map(|(_, result)| result)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            scenes = scenes.len(),
            workers,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "evaluated scene metrics"
        );
        Ok(results)
    }
}

fn worker_loop(task_rx: Receiver<Task<'_>>, reply_tx: Sender<Reply>, include_truth: bool) {
    while let Ok((pos, scene)) = task_rx.recv() {
        let result = evaluate_scene(scene, include_truth);
        if reply_tx.send((pos, result)).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3, Array4};

    fn scene(index: usize, offset: f32) -> SceneRollout {
        let truth = Array3::from_shape_fn((12, 3, 2), |(t, a, c)| {
            if c == 0 { t as f32 * 0.3 } else { a as f32 * 1.5 }
        });
        let predictions = Array4::from_shape_fn((4, 12, 3, 2), |(_, t, a, c)| truth[[t, a, c]] + offset);
        SceneRollout {
            scene_index: index,
            predictions,
            truth,
            neighbours: Array2::from_elem((3, 3), true),
        }
    }

    #[test]
    fn results_come_back_in_scene_order() {
        let scenes: Vec<_> = (0..17).map(|i| scene(i, i as f32 * 0.01)).collect();
        let pool = MetricsPool::new(&PoolConfig { worker_count: Some(4) });
        let results = pool.evaluate(&scenes, false).unwrap();
        assert_eq!(results.len(), 17);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.scene_index, i);
        }
    }

    #[test]
    fn matches_sequential_evaluation() {
        let scenes: Vec<_> = (0..5).map(|i| scene(i, 0.05)).collect();
        let pool = MetricsPool::new(&PoolConfig { worker_count: Some(3) });
        let pooled = pool.evaluate(&scenes, true).unwrap();
        let sequential: Vec<_> = scenes.iter().map(|s| evaluate_scene(s, true).unwrap()).collect();
        assert_eq!(pooled, sequential);
    }

    #[test]
    fn failing_scene_aborts_with_its_index() {
        let mut scenes: Vec<_> = (0..8).map(|i| scene(i, 0.0)).collect();
        scenes[5].predictions[[0, 0, 0, 0]] = f32::INFINITY;
        let pool = MetricsPool::new(&PoolConfig { worker_count: Some(2) });
        assert_eq!(
            pool.evaluate(&scenes, false),
            Err(MetricsError::NonFinite { scene_index: 5 })
        );
    }

    #[test]
    fn worker_count_resolution() {
        assert_eq!(PoolConfig { worker_count: Some(0) }.resolved_worker_count(), 1);
        assert!(PoolConfig::default().resolved_worker_count() >= 1);
        let pool = MetricsPool::new(&PoolConfig { worker_count: Some(8) });
        assert!(pool.evaluate(&[], false).unwrap().is_empty());
    }
}
