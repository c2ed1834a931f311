// Diagnosis pipeline tests over the bundled data/ files
//
// Run with: cargo test --test diagnosis_pipeline_tests

use approx::assert_relative_eq;
use plant_diagnosis_rust::diagnosis::rank_alternatives;
use plant_diagnosis_rust::labels::plant_token;
use plant_diagnosis_rust::{
    normalize, AppConfig, Anonymous, DiagnosisContext, Diagnoser, DisplayTables, HistoryStore, KnowledgeBase,
    LabelSet, Locale, MemoryHistoryStore, PersistenceStatus, PredictionVector, Presenter, RemediationResolver,
    UserSession,
};
use std::path::PathBuf;
use std::sync::Arc;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

fn labels() -> LabelSet {
    LabelSet::from_class_indices(&data_dir().join("class_indices.json")).unwrap()
}

fn resolver() -> RemediationResolver {
    let kb = KnowledgeBase::load(&data_dir().join("solutions.json")).unwrap();
    RemediationResolver::new(kb, Default::default())
}

fn diagnoser(store: Arc<MemoryHistoryStore>) -> Diagnoser {
    let mut config = AppConfig::default();
    config.data.data_dir = data_dir();
    Diagnoser::new(Arc::new(config.load_context().unwrap()), store)
}

fn vector_for(labels: &LabelSet, weights: &[(&str, f64)]) -> Vec<f64> {
    labels
        .iter()
        .map(|l| weights.iter().find(|(w, _)| *w == l).map(|(_, p)| *p).unwrap_or(0.0))
        .collect()
}

#[test]
fn test_every_label_has_display_names() {
    let labels = labels();
    for locale in [Locale::En, Locale::Vi] {
        let presenter = Presenter::new(DisplayTables::for_locale(locale));
        for raw in labels.iter() {
            let display = presenter.present(&normalize(raw));
            assert!(!display.plant_name.is_empty(), "{:?} empty plant name for {}", locale, raw);
            assert!(!display.disease_name.is_empty(), "{:?} empty disease name for {}", locale, raw);
        }
    }
}

#[test]
fn test_every_disease_label_has_remediation() {
    let resolver = resolver();
    for raw in labels().iter() {
        let record = resolver.resolve(raw);
        if normalize(raw).is_healthy() {
            assert!(record.is_none(), "healthy label {} should have no remediation", raw);
        } else {
            let record = record.unwrap_or_else(|| panic!("no remediation for {}", raw));
            assert!(!record.treatment.is_empty());
        }
    }
}

#[test]
fn test_tomato_early_blight_scenario() {
    let labels = labels();
    let vector = vector_for(&labels, &[("Tomato_Early_blight", 0.82), ("Tomato_Late_blight", 0.18)]);
    let outcome = diagnoser(Arc::new(MemoryHistoryStore::new()))
        .diagnose_probabilities(&vector, &Anonymous)
        .unwrap();

    let result = outcome.result().unwrap();
    assert_eq!(result.display_label.plant_name, "Tomato");
    assert_eq!(result.display_label.disease_name, "Early blight");
    assert!(!result.is_healthy);
    assert!(result.caveat.is_none());
    assert_relative_eq!(result.confidence, 82.0, epsilon = 1e-9);
}

#[test]
fn test_pepper_healthy_scenario() {
    let labels = labels();
    let vector = vector_for(&labels, &[("Pepper__bell___healthy", 0.91), ("Pepper__bell___Bacterial_spot", 0.09)]);
    let outcome = diagnoser(Arc::new(MemoryHistoryStore::new()))
        .diagnose_probabilities(&vector, &Anonymous)
        .unwrap();

    let result = outcome.result().unwrap();
    assert_eq!(result.display_label.plant_name, "Pepper");
    assert_eq!(result.display_label.disease_name, "Healthy");
    assert!(result.is_healthy);
    assert!(result.remediation.is_none());
}

#[test]
fn test_rejected_prediction_is_not_persisted() {
    let labels = labels();
    let store = Arc::new(MemoryHistoryStore::new());
    let vector = vector_for(
        &labels,
        &[("Potato___Late_blight", 0.35), ("Potato___Early_blight", 0.33), ("Potato___healthy", 0.32)],
    );

    let outcome = diagnoser(store.clone())
        .diagnose_probabilities(&vector, &UserSession::new("u1"))
        .unwrap();

    let rejected = outcome.rejected().unwrap();
    assert_relative_eq!(rejected.top_probability, 0.35);
    assert!(store.is_empty());
}

#[test]
fn test_alternatives_fallback_scenario() {
    let labels = labels();
    let vector = vector_for(
        &labels,
        &[
            ("Tomato_Late_blight", 0.55),
            ("Tomato_Leaf_Mold", 0.30),
            ("Tomato_Early_blight", 0.20),
            ("Tomato__Target_Spot", 0.05),
        ],
    );
    let prediction = PredictionVector::new(&labels, &vector).unwrap();

    let ranked = rank_alternatives(&prediction, "Tomato");
    let probabilities: Vec<f64> = ranked.iter().map(|(_, p)| *p).collect();
    assert_eq!(probabilities, vec![0.55, 0.30, 0.20]);
    assert!(ranked.iter().all(|(l, _)| plant_token(l) == "Tomato"));
}

#[test]
fn test_signed_in_diagnosis_is_saved() {
    let labels = labels();
    let store = Arc::new(MemoryHistoryStore::new());
    let vector = vector_for(&labels, &[("Tomato__Tomato_mosaic_virus", 0.7), ("Tomato_healthy", 0.3)]);

    let outcome = diagnoser(store.clone())
        .diagnose_probabilities(&vector, &UserSession::new("u1"))
        .unwrap();

    let record_id = match outcome.persistence() {
        Some(PersistenceStatus::Saved { record_id }) => record_id.clone(),
        other => panic!("expected saved record, got {:?}", other),
    };
    let records = store.query("u1", 10).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, record_id);
    assert_eq!(records[0].display_label.disease_name, "Tomato mosaic virus");
    assert_eq!(records[0].alternatives.len(), 3);
    assert_eq!(records[0].alternatives[1].raw_label, "Tomato_healthy");
}

#[test]
fn test_vietnamese_context() {
    let labels = labels();
    let context = DiagnosisContext {
        labels: labels.clone(),
        presenter: Presenter::new(DisplayTables::for_locale(Locale::Vi)),
        remediation: Arc::new(resolver()),
        gate: Default::default(),
        ranker: Default::default(),
    };
    let diagnoser = Diagnoser::new(Arc::new(context), Arc::new(MemoryHistoryStore::new()));
    let vector = vector_for(&labels, &[("Tomato_Spider_mites_Two_spotted_spider_mite", 0.35), ("Tomato_healthy", 0.65)]);

    let outcome = diagnoser.diagnose_probabilities(&vector, &Anonymous).unwrap();
    let result = outcome.result().unwrap();
    assert_eq!(result.display_label.plant_name, "Cà chua");
    assert_eq!(result.display_label.disease_name, "Khỏe mạnh");
    assert!(result.caveat.is_none());
}
