use super::*;
use crate::automl::observation_log::ObservationRecord;
use std::collections::BTreeMap;

fn config(dir: &Path) -> SearchConfig {
    SearchConfig {
        init_points: 3,
        n_iter: 4,
        seed: Some(5),
        log_dir: dir.join("log"),
        model_dir: dir.join("models"),
        ..SearchConfig::default()
    }
}

fn controller(config: &SearchConfig) -> (SearchController<TPE<FlyParam>>, RunPaths) {
    let paths = config.run_paths("test", "2024-01-01_00-00-00");
    (SearchController::from_config(config, &paths).unwrap(), paths)
}

/// Objective that prefers larger hidden layers.
fn kc_objective(point: &HyperparameterPoint, _: &mut SearchState) -> Result<f64> {
    Ok(point.kc_size as f64 / 15000.0)
}

fn write_prior(path: &Path, n: usize) {
    let mut writer = ObservationWriter::create(path).unwrap();
    for i in 0..n {
        let mut values = BTreeMap::new();
        values.insert(FlyParam::TopWord, 400.05);
        values.insert(FlyParam::KcSize, 1000.0 + 500.0 * i as f64);
        values.insert(FlyParam::ProjSize, 5.0);
        values.insert(FlyParam::C, 1.02);
        writer.record(&Trial { values }, 0.1 * i as f64).unwrap();
    }
}

#[test]
fn test_full_run_merges_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let (mut controller, paths) = controller(&config);
    assert_eq!(controller.phase(), SearchPhase::Idle);

    let report = controller.run(&mut kc_objective).unwrap();

    assert_eq!(controller.phase(), SearchPhase::Done);
    assert_eq!(report.evaluated, 7);
    assert_eq!(report.prior_observations, 0);
    assert_eq!(controller.optimizer().n_observations(), 7);
    assert_eq!(read_observations(&paths.temp_log).unwrap().len(), 7);
    assert_eq!(
        read_observations(&paths.master_log).unwrap(),
        read_observations(&paths.temp_log).unwrap()
    );
    assert_eq!(report.master_log, paths.master_log);

    let best = report.best.unwrap();
    let records = read_observations(&paths.temp_log).unwrap();
    let max = records.iter().map(|r| r.target).fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(best.target, max);
    assert_eq!(best.target, best.point.kc_size as f64 / 15000.0);
}

#[test]
fn test_points_are_rounded_with_fixed_settings() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let (mut controller, paths) = controller(&config);
    let mut seen = Vec::new();
    let mut objective = |point: &HyperparameterPoint, _: &mut SearchState| -> Result<f64> {
        seen.push(point.clone());
        Ok(0.5)
    };

    controller.run(&mut objective).unwrap();

    assert_eq!(seen.len(), 7);
    for point in &seen {
        assert_eq!(point.top_word, 400);
        assert!((300..=15000).contains(&point.kc_size));
        assert!((2..=20).contains(&point.proj_size));
        assert!(point.c >= 1.0 && point.c <= 1.1);
        assert_eq!(point.num_nonzero, 300);
        assert_eq!(point.num_iter, 2000);
        assert_eq!(point.num_trials, 3);
    }

    // the log keeps the raw proposals, C passes through unrounded
    let records = read_observations(&paths.temp_log).unwrap();
    for (record, point) in records.iter().zip(&seen) {
        assert_eq!(record.params["KC_size"].round() as usize, point.kc_size);
        assert_eq!(record.params["C"], point.c);
    }
}

#[test]
fn test_prior_log_is_visible_before_first_trial() {
    let dir = tempfile::tempdir().unwrap();
    let prior = dir.path().join("prior.json");
    write_prior(&prior, 5);
    let config = config(dir.path());
    let (mut controller, _) = controller(&config);

    assert_eq!(controller.load_prior(&prior).unwrap(), 5);
    assert_eq!(controller.phase(), SearchPhase::LoadingPriorLog);
    assert_eq!(controller.optimizer().n_observations(), 5);

    let report = controller.run(&mut kc_objective).unwrap();
    assert_eq!(report.prior_observations, 5);
    assert_eq!(controller.optimizer().n_observations(), 5 + report.evaluated);
    // prior targets are not part of this run's best
    assert!(report.best.unwrap().target > 0.0);
}

#[test]
fn test_master_log_is_appended_not_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let (mut controller, paths) = controller(&config);
    write_prior(&paths.master_log, 2);
    let before = read_observations(&paths.master_log).unwrap();

    let report = controller.run(&mut kc_objective).unwrap();

    let after = read_observations(&paths.master_log).unwrap();
    assert_eq!(after.len(), 2 + report.evaluated);
    assert_eq!(&after[..2], before.as_slice());
    assert_eq!(&after[2..], read_observations(&paths.temp_log).unwrap().as_slice());
}

#[test]
fn test_failure_keeps_run_log_unmerged() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let (mut controller, paths) = controller(&config);
    let mut calls = 0;
    let mut objective = |_: &HyperparameterPoint, _: &mut SearchState| -> Result<f64> {
        calls += 1;
        if calls == 3 {
            return Err(FlyError::ConvergenceFailure {
                iterations: 1,
                final_loss: f64::INFINITY,
            });
        }
        Ok(0.4)
    };

    let err = controller.run(&mut objective).unwrap_err();

    assert!(matches!(err, FlyError::ConvergenceFailure { .. }));
    assert_eq!(controller.phase(), SearchPhase::Exploring);
    assert_eq!(read_observations(&paths.temp_log).unwrap().len(), 2);
    assert_eq!(std::fs::metadata(&paths.master_log).unwrap().len(), 0);
}

#[test]
fn test_resume_from_failed_run_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let (mut first, paths) = controller(&config);
    let mut calls = 0;
    let mut flaky = |_: &HyperparameterPoint, _: &mut SearchState| -> Result<f64> {
        calls += 1;
        if calls > 2 {
            return Err(FlyError::Config("interrupted".to_string()));
        }
        Ok(0.3)
    };
    assert!(first.run(&mut flaky).is_err());

    let resumed_paths = config.run_paths("test", "2024-01-01_01-00-00");
    let mut second = SearchController::from_config(&config, &resumed_paths).unwrap();
    assert_eq!(second.load_prior(&paths.temp_log).unwrap(), 2);
    let report = second.run(&mut kc_objective).unwrap();
    assert_eq!(report.prior_observations, 2);
    assert_eq!(report.evaluated, 7);
}

#[test]
fn test_cannot_run_twice_or_load_late() {
    let dir = tempfile::tempdir().unwrap();
    let prior = dir.path().join("prior.json");
    write_prior(&prior, 1);
    let config = config(dir.path());
    let (mut controller, _) = controller(&config);

    controller.run(&mut kc_objective).unwrap();

    assert!(matches!(controller.run(&mut kc_objective), Err(FlyError::Config(_))));
    assert!(matches!(controller.load_prior(&prior), Err(FlyError::Config(_))));
}

#[test]
fn test_prior_with_unknown_parameter() {
    let dir = tempfile::tempdir().unwrap();
    let prior = dir.path().join("prior.json");
    let record = ObservationRecord {
        target: 0.5,
        params: BTreeMap::from([("num_iter".to_string(), 50.0)]),
        datetime: None,
    };
    std::fs::write(&prior, serde_json::to_string(&record).unwrap() + "\n").unwrap();
    let config = config(dir.path());
    let (mut controller, _) = controller(&config);

    let err = controller.load_prior(&prior).unwrap_err();
    assert!(matches!(err, FlyError::Parse { .. }));
    assert_eq!(controller.optimizer().n_observations(), 0);
}

#[test]
fn test_guided_only_budget() {
    let dir = tempfile::tempdir().unwrap();
    let config = SearchConfig {
        init_points: 0,
        n_iter: 2,
        ..config(dir.path())
    };
    let (mut controller, _) = controller(&config);
    let report = controller.run(&mut kc_objective).unwrap();
    assert_eq!(report.evaluated, 2);
}

#[test]
fn test_invalid_bounds_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.bounds.kc_size = (500.0, 100.0);
    let paths = config.run_paths("test", "now");
    assert!(SearchController::from_config(&config, &paths).is_err());
}

#[test]
fn test_state_is_threaded_through() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let (mut controller, _) = controller(&config);
    let mut objective = |point: &HyperparameterPoint, state: &mut SearchState| -> Result<f64> {
        let score = point.kc_size as f64 / 15000.0;
        if state.improves(score) {
            state.record_best(score, PathBuf::from(point.artifact_stem(score)));
        }
        Ok(score)
    };

    let report = controller.run(&mut objective).unwrap();

    let best = report.best.unwrap();
    assert_eq!(controller.state().best_score(), best.target);
    assert_eq!(
        report.best_artifact,
        Some(PathBuf::from(best.point.artifact_stem(best.target)))
    );
}

#[test]
fn test_phase_display() {
    assert_eq!(SearchPhase::MergingLog.to_string(), "merging log");
    assert_eq!(SearchPhase::Idle.to_string(), "idle");
}

#[test]
fn test_prior_missing_a_dimension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let prior = dir.path().join("prior.json");
    write_prior(&prior, 2);
    let partial = ObservationRecord {
        target: 0.5,
        params: BTreeMap::from([("C".to_string(), 1.0)]),
        datetime: None,
    };
    let mut text = std::fs::read_to_string(&prior).unwrap();
    text.push_str(&(serde_json::to_string(&partial).unwrap() + "\n"));
    std::fs::write(&prior, text).unwrap();
    let config = config(dir.path());
    let (mut controller, _) = controller(&config);

    let err = controller.load_prior(&prior).unwrap_err();

    match err {
        FlyError::Parse { cause, .. } => {
            assert!(cause.starts_with("record 3"), "{cause}");
            assert!(cause.contains("KC_size"), "{cause}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(controller.optimizer().n_observations(), 0);
}

#[test]
fn test_loaded_prior_is_fully_usable_by_optimizer() {
    let dir = tempfile::tempdir().unwrap();
    let prior = dir.path().join("prior.json");
    write_prior(&prior, 4);
    let config = config(dir.path());
    let (mut controller, _) = controller(&config);

    let loaded = controller.load_prior(&prior).unwrap();

    let space = controller.space();
    assert_eq!(space.len(), 4);
    let usable = controller
        .optimizer()
        .history()
        .iter()
        .filter(|r| space.normalize(&r.trial).is_some())
        .count();
    assert_eq!(usable, loaded);
}
