// Integration tests for schoolrec
use schoolrec::{
    Engine, EngineConfig, EngineState, Error, FeatureWeights, FitOutcome, JsonFileSource,
    ModelStore, RetrainWorker, SchoolRecord, StaticSource,
};
use schoolrec_storage::{METADATA_FILE, PCA_FILE, SCHOOLS_FILE};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn school(
    name: &str,
    rating: f64,
    tuition: f64,
    ratio: f64,
    scores: f64,
    kind: &str,
    curriculum: &str,
    focus: &str,
) -> SchoolRecord {
    SchoolRecord::new(name)
        .with("rating", rating)
        .with("tuition", tuition)
        .with("student_teacher_ratio", ratio)
        .with("test_scores", scores)
        .with("type", kind)
        .with("curriculum", curriculum)
        .with("focus", focus)
        .with("facilities", "standard")
        .with("address", format!("{name} road"))
}

fn corpus() -> Vec<SchoolRecord> {
    vec![
        school("A", 4.5, 1000.0, 12.0, 85.0, "public", "national", "stem"),
        school("B", 4.4, 1100.0, 12.5, 84.0, "public", "national", "stem"),
        school("C", 2.0, 9500.0, 28.0, 55.0, "private", "international", "arts"),
        school("D", 3.2, 5000.0, 18.0, 70.0, "private", "national", "sports"),
        school("E", 3.8, 2500.0, 15.0, 78.0, "public", "international", "stem"),
    ]
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn trained_engine(dir: &Path) -> (Engine, Arc<StaticSource>) {
    let source = Arc::new(StaticSource::new(corpus()));
    let engine = Engine::new(EngineConfig::new(dir), source.clone()).unwrap();
    engine.retrain(false).unwrap();
    (engine, source)
}

#[test]
fn test_near_duplicate_outranks_distant_school() {
    let dir = tempfile::tempdir().unwrap();
    let source = StaticSource::new(vec![
        school("A", 4.5, 1000.0, 12.0, 85.0, "public", "national", "stem"),
        school("B", 4.4, 1100.0, 12.5, 84.0, "public", "national", "stem"),
        school("C", 2.0, 9500.0, 28.0, 55.0, "private", "international", "arts"),
    ]);
    let engine = Engine::new(EngineConfig::new(dir.path()), source).unwrap();
    engine.retrain(false).unwrap();

    let recs = engine.get_recommendations(&names(&["A"]), 2).unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0].record.name, "B");
    assert_eq!(recs[1].record.name, "C");
    assert!(recs[0].similarity_score > recs[1].similarity_score);
}

#[test]
fn test_result_invariants() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = trained_engine(dir.path());

    for input in [names(&["A"]), names(&["A", "D"]), names(&["C", "E", "B"])] {
        let recs = engine.get_recommendations(&input, 3).unwrap();
        assert!(recs.len() <= 3);
        for rec in &recs {
            assert!(!input.contains(&rec.record.name));
            assert!(rec.similarity_score > 0.0 && rec.similarity_score <= 1.0);
        }
        assert!(recs
            .windows(2)
            .all(|w| w[0].similarity_score >= w[1].similarity_score));
    }
}

#[test]
fn test_large_n_returns_everything_else() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = trained_engine(dir.path());
    let recs = engine.get_recommendations(&names(&["A"]), 100).unwrap();
    assert_eq!(recs.len(), 4);
}

#[test]
fn test_query_errors() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = trained_engine(dir.path());

    assert!(matches!(
        engine.get_recommendations(&[], 5),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        engine.get_recommendations(&names(&["Unknown School"]), 5),
        Err(Error::SchoolsNotFound(_))
    ));
    let err = engine.get_recommendations(&[], 5).unwrap_err();
    assert!(err.is_input_error());
}

#[test]
fn test_fit_is_idempotent_across_engines() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = trained_engine(dir.path());
    let trained_at = engine.last_training_time().unwrap();

    assert_eq!(engine.retrain(false).unwrap(), FitOutcome::Reused);
    assert_eq!(engine.last_training_time(), Some(trained_at));

    // a fresh process over the same data reuses the persisted model
    let other = Engine::new(EngineConfig::new(dir.path()), StaticSource::new(corpus())).unwrap();
    assert_eq!(other.retrain(false).unwrap(), FitOutcome::Reused);
    assert_eq!(other.last_training_time(), Some(trained_at));
}

#[test]
fn test_changed_data_triggers_retrain() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, source) = trained_engine(dir.path());
    let trained_at = engine.last_training_time().unwrap();

    thread::sleep(Duration::from_millis(5));
    source.push(school("F", 3.0, 3000.0, 16.0, 72.0, "public", "national", "arts"));
    assert_eq!(engine.retrain(false).unwrap(), FitOutcome::Trained);
    let appended_at = engine.last_training_time().unwrap();
    assert!(appended_at > trained_at);
    assert_eq!(engine.record_count(), 6);

    thread::sleep(Duration::from_millis(5));
    let mut mutated = corpus();
    mutated[3] = mutated[3].clone().with("rating", 3.3);
    source.replace(mutated);
    assert_eq!(engine.retrain(false).unwrap(), FitOutcome::Trained);
    assert!(engine.last_training_time().unwrap() > appended_at);
}

#[test]
fn test_round_trip_on_fresh_engine() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = trained_engine(dir.path());
    let query = names(&["A", "C"]);
    let expected = engine.get_recommendations(&query, 4).unwrap();

    let fresh = Engine::new(EngineConfig::new(dir.path()), StaticSource::new(Vec::new())).unwrap();
    assert_eq!(fresh.state(), EngineState::Uninitialized);
    assert!(fresh.load_model());
    assert_eq!(fresh.state(), EngineState::ModelReady);
    assert_eq!(fresh.get_recommendations(&query, 4).unwrap(), expected);
    assert_eq!(fresh.last_training_time(), engine.last_training_time());
    assert_eq!(fresh.feature_weights(), FeatureWeights::default());
}

#[test]
fn test_unknown_category_projects_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = trained_engine(dir.path());

    let unseen = school("Z", 4.0, 2000.0, 14.0, 80.0, "boarding", "montessori", "music");
    let projected = engine.transform(&[unseen]).unwrap();
    let model = engine.model().unwrap();
    assert_eq!(projected.dim(), (1, model.dim()));
    assert!(projected.iter().all(|v| v.is_finite()));
}

#[test]
fn test_missing_column_keeps_prior_model() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, source) = trained_engine(dir.path());
    let generation = engine.model().unwrap().generation();

    let mut broken = corpus();
    broken[1].fields.remove("tuition");
    source.replace(broken);

    match engine.retrain(false).unwrap_err() {
        Error::Training(cause) => match *cause {
            Error::MissingColumns(columns) => assert_eq!(columns, vec!["tuition".to_string()]),
            other => panic!("unexpected cause: {other}"),
        },
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(engine.model().unwrap().generation(), generation);
    assert!(engine.get_recommendations(&names(&["A"]), 2).is_ok());
}

#[test]
fn test_load_rejects_missing_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = trained_engine(dir.path());
    let generation = engine.model().unwrap().generation();

    std::fs::remove_file(dir.path().join(PCA_FILE)).unwrap();
    assert!(!engine.load_model());
    assert_eq!(engine.model().unwrap().generation(), generation);

    let fresh = Engine::new(EngineConfig::new(dir.path()), StaticSource::new(corpus())).unwrap();
    assert!(!fresh.load_model());
    assert_eq!(fresh.state(), EngineState::Uninitialized);
}

#[test]
fn test_load_rejects_inconsistent_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = trained_engine(dir.path());
    let generation = engine.model().unwrap().generation();

    // Artifacts from two different trainings must not be mixed.
    let other_dir = tempfile::tempdir().unwrap();
    trained_engine(other_dir.path());
    std::fs::copy(other_dir.path().join(SCHOOLS_FILE), dir.path().join(SCHOOLS_FILE)).unwrap();

    assert!(!engine.load_model());
    assert_eq!(engine.model().unwrap().generation(), generation);
    assert!(ModelStore::new(dir.path()).load().is_err());
}

#[test]
fn test_corrupt_metadata_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (_engine, _) = trained_engine(dir.path());
    std::fs::write(dir.path().join(METADATA_FILE), b"{ not json").unwrap();

    let fresh = Engine::new(EngineConfig::new(dir.path()), StaticSource::new(corpus())).unwrap();
    assert!(!fresh.load_model());
    // an unreadable model is simply retrained
    assert_eq!(fresh.retrain(false).unwrap(), FitOutcome::Trained);
}

#[test]
fn test_json_file_source() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("schools.json");
    std::fs::write(&data, serde_json::to_vec_pretty(&corpus()).unwrap()).unwrap();

    let engine = Engine::new(
        EngineConfig::new(dir.path().join("models")),
        JsonFileSource::new(&data),
    )
    .unwrap();
    assert!(engine.load_data());
    assert_eq!(engine.state(), EngineState::DataLoaded);
    assert_eq!(engine.retrain(false).unwrap(), FitOutcome::Trained);

    let recs = engine.get_recommendations(&names(&["A"]), 1).unwrap();
    assert_eq!(recs[0].record.name, "B");
    assert_eq!(recs[0].record.get("address").unwrap(), "B road");
}

#[test]
fn test_custom_weights_are_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let mut weights = FeatureWeights::default();
    weights.set("tuition", 4.0);
    let config = EngineConfig::new(dir.path()).with_feature_weights(weights.clone());
    let engine = Engine::new(config, StaticSource::new(corpus())).unwrap();
    engine.retrain(false).unwrap();

    let fresh = Engine::new(EngineConfig::new(dir.path()), StaticSource::new(Vec::new())).unwrap();
    assert!(fresh.load_model());
    assert_eq!(fresh.feature_weights(), weights);
}

#[test]
fn test_reads_during_background_retrain() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, source) = trained_engine(dir.path());
    let engine = Arc::new(engine);
    let worker = RetrainWorker::start().unwrap();

    thread::scope(|scope| {
        for _ in 0..4 {
            let engine = engine.clone();
            scope.spawn(move || {
                for _ in 0..50 {
                    let recs = engine.get_recommendations(&names(&["A"]), 3).unwrap();
                    assert_eq!(recs.len(), 3);
                }
            });
        }

        for i in 0..3 {
            source.push(school(
                &format!("New {i}"),
                3.0,
                4000.0 + 100.0 * i as f64,
                20.0,
                65.0,
                "private",
                "national",
                "arts",
            ));
            let ticket = worker.schedule(engine.clone(), false);
            assert_eq!(
                ticket.wait_timeout(Duration::from_secs(60)).unwrap(),
                FitOutcome::Trained
            );
        }
    });

    assert_eq!(engine.record_count(), 8);
    worker.shutdown();
    assert_eq!(worker.jobs_processed(), 3);
}
