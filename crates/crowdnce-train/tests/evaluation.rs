//! Integration test: one-shot and oracle evaluation through the metrics
//! pool, including the ground-truth curve cache.

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use crowdnce_metrics::PoolConfig;
use crowdnce_test_utils::{synthetic_scene, LinearPredictor};
use crowdnce_train::{oracle_decode, Evaluator, RolloutMode};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn predictor() -> (VarMap, LinearPredictor) {
    let map = VarMap::new();
    let vb = VarBuilder::from_varmap(&map, DType::F32, &Device::Cpu);
    let p = LinearPredictor::new(vb, 8, 16).unwrap();
    (map, p)
}

fn evaluator() -> Evaluator {
    let pool = PoolConfig {
        worker_count: Some(2),
    };
    Evaluator::new(&pool, 5, 1, &Device::Cpu, 9)
}

#[test]
fn oracle_decode_returns_full_horizon() {
    let (_map, p) = predictor();
    let scene = synthetic_scene(4, 8, 12, 3);
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let params = oracle_decode(&p, &scene, 20, &Device::Cpu, &mut rng).unwrap();
    assert_eq!(params.dim(), (12, 4, 5));
    assert!(params.iter().all(|v| v.is_finite()));
}

#[test]
fn validation_reports_joint_metrics_without_truth() {
    let (_map, p) = predictor();
    let scenes: Vec<_> = (0..3).map(|s| synthetic_scene(3, 8, 12, s)).collect();
    let mut eval = evaluator();

    let report = eval.validate(&p, &scenes).unwrap();
    assert_eq!(report.mode, RolloutMode::OneShot);
    assert!(report.loss.is_finite());
    assert!(report.summary.ade.is_finite() && report.summary.fde >= 0.0);
    assert_eq!(report.summary.joint.step.len(), 11);
    assert!(report.summary.truth.is_none());
    assert!(eval.truth_cache().needs_truth());
}

#[test]
fn truth_curves_are_computed_once_and_reused() {
    let (_map, p) = predictor();
    let scenes: Vec<_> = (0..2).map(|s| synthetic_scene(3, 8, 12, s)).collect();
    let mut eval = evaluator();

    let first = eval.test(&p, &scenes).unwrap();
    assert_eq!(first.mode, RolloutMode::Oracle);
    let truth = first.summary.truth.clone().unwrap();
    // parallel lanes never come within the collision threshold
    assert!(truth.step.iter().all(|&v| v == 0.0));
    assert!(truth.cumulative.iter().all(|&v| v == 0.0));
    assert!(!eval.truth_cache().needs_truth());

    let second = eval.test(&p, &scenes).unwrap();
    assert_eq!(second.summary.truth, Some(truth));
}

#[test]
fn empty_evaluation_set_is_an_error() {
    let (_map, p) = predictor();
    let mut eval = evaluator();
    assert!(eval.validate(&p, &[]).is_err());
}
