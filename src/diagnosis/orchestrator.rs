//! Diagnosis Orchestrator
//!
//! One entry point for every input source. Holds only the shared read-only
//! context and the history collaborator, so a single `Diagnoser` can serve
//! concurrent requests.

use super::gate::{rejection_guidance, GateConfig};
use super::input::{Classifier, ImageInput};
use super::ranker::RankerConfig;
use super::types::{
    AlternativeEntry, DiagnosisOutcome, DiagnosisResult, PersistenceStatus, PredictionVector, RejectedResult,
};
use crate::error::DiagnosisError;
use crate::history::{HistoryStore, ImageArchive, NewHistoryRecord};
use crate::labels::{normalize, LabelSet, Presenter};
use crate::remediation::RemediationLookup;
use chrono::Utc;
use rayon::prelude::*;
use std::sync::Arc;

/// Supplies the signed-in user, if any
pub trait Session: Send + Sync {
    fn current_user_id(&self) -> Option<&str>;
}

/// No user; results are shown but never persisted
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl Session for Anonymous {
    fn current_user_id(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct UserSession {
    user_id: String,
}

impl UserSession {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into() }
    }
}

impl Session for UserSession {
    fn current_user_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

/// Immutable tables and policies built once at startup
pub struct DiagnosisContext {
    pub labels: LabelSet,
    pub presenter: Presenter,
    pub remediation: Arc<dyn RemediationLookup>,
    pub gate: GateConfig,
    pub ranker: RankerConfig,
}

pub struct Diagnoser {
    context: Arc<DiagnosisContext>,
    store: Arc<dyn HistoryStore>,
    archive: Option<ImageArchive>,
}

impl Diagnoser {
    pub fn new(context: Arc<DiagnosisContext>, store: Arc<dyn HistoryStore>) -> Self {
        Self {
            context,
            store,
            archive: None,
        }
    }

    /// Save images of persisted diagnoses under `archive`
    pub fn with_image_archive(mut self, archive: ImageArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn context(&self) -> &DiagnosisContext {
        &self.context
    }

    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }

    pub fn diagnose(&self, vector: &PredictionVector<'_>, session: &dyn Session) -> DiagnosisOutcome {
        self.run(vector, session, None)
    }

    /// Validate raw classifier output against the label set, then diagnose
    pub fn diagnose_probabilities(
        &self,
        probabilities: &[f64],
        session: &dyn Session,
    ) -> Result<DiagnosisOutcome, DiagnosisError> {
        let vector = PredictionVector::new(&self.context.labels, probabilities)?;
        Ok(self.diagnose(&vector, session))
    }

    pub fn diagnose_image(
        &self,
        classifier: &dyn Classifier,
        image: &ImageInput,
        session: &dyn Session,
    ) -> Result<DiagnosisOutcome, DiagnosisError> {
        let probabilities = classifier
            .predict(image)
            .map_err(|e| DiagnosisError::Classifier(format!("{:#}", e)))?;
        let vector = PredictionVector::new(&self.context.labels, &probabilities)?;
        Ok(self.run(&vector, session, Some(image)))
    }

    /// Diagnose several vectors in parallel; results keep input order
    pub fn diagnose_batch(
        &self,
        vectors: &[Vec<f64>],
        session: &dyn Session,
    ) -> Vec<Result<DiagnosisOutcome, DiagnosisError>> {
        vectors
            .par_iter()
            .map(|probabilities| self.diagnose_probabilities(probabilities, session))
            .collect()
    }

    fn run(&self, vector: &PredictionVector<'_>, session: &dyn Session, image: Option<&ImageInput>) -> DiagnosisOutcome {
        let ctx = &*self.context;
        let locale = ctx.presenter.tables().locale;

        let (raw_label, top_probability) = vector.argmax();
        let confidence = top_probability * 100.0;
        let tier = ctx.gate.gate(confidence);
        let top = normalize(raw_label);
        let display_label = ctx.presenter.present(&top);

        if !tier.proceeds() {
            tracing::debug!("Rejected '{}' at {:.2}% confidence", raw_label, confidence);
            return DiagnosisOutcome::Rejected(RejectedResult {
                top_probability,
                confidence,
                suspected_label: raw_label.to_string(),
                suspected_display: display_label,
                guidance: rejection_guidance(locale).to_string(),
            });
        }

        let is_healthy =
            top.is_healthy() || display_label.disease_name.to_lowercase() == ctx.presenter.healthy_name().to_lowercase();

        let remediation = ctx.remediation.lookup(raw_label);

        let alternatives: Vec<AlternativeEntry> = ctx
            .ranker
            .rank(vector, &top.plant_token)
            .into_iter()
            .map(|(label, probability)| AlternativeEntry {
                raw_label: label.to_string(),
                display_label: ctx.presenter.present(&normalize(label)),
                confidence: probability * 100.0,
            })
            .collect();

        let result = DiagnosisResult {
            raw_label: raw_label.to_string(),
            display_label,
            confidence,
            tier,
            is_healthy,
            caveat: tier.caveat(locale).map(str::to_string),
            advice: tier.advice(locale).to_string(),
            alternatives,
            remediation,
        };

        let persistence = self.persist(&result, session, image);
        DiagnosisOutcome::Diagnosed { result, persistence }
    }

    fn persist(&self, result: &DiagnosisResult, session: &dyn Session, image: Option<&ImageInput>) -> PersistenceStatus {
        let Some(user_id) = session.current_user_id() else {
            return PersistenceStatus::Anonymous;
        };

        let image_path = match (&self.archive, image) {
            (Some(archive), Some(image)) => match archive.save(user_id, image) {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!("Failed to archive diagnosis image for {}: {:#}", user_id, e);
                    None
                }
            },
            _ => None,
        };

        let record = NewHistoryRecord {
            user_id: user_id.to_string(),
            display_label: result.display_label.clone(),
            confidence: result.confidence,
            is_healthy: result.is_healthy,
            alternatives: result.alternatives.clone(),
            image_path,
            created_at: Utc::now(),
        };

        match self.store.append(record) {
            Ok(record_id) => PersistenceStatus::Saved { record_id },
            Err(e) => {
                tracing::warn!("Failed to save diagnosis for {}: {}", user_id, e);
                PersistenceStatus::Failed { message: e.to_string() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::gate::ConfidenceTier;
    use crate::diagnosis::input::UploadedImage;
    use crate::error::StoreError;
    use crate::history::{HistoryRecord, MemoryHistoryStore};
    use crate::labels::{DisplayTables, Locale};
    use crate::remediation::RemediationRecord;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LABELS: &[&str] = &[
        "Pepper__bell___Bacterial_spot",
        "Pepper__bell___healthy",
        "Tomato___Early_blight",
        "Tomato___Late_blight",
        "Tomato_Leaf_Mold",
        "Tomato__Target_Spot",
        "Tomato_Septoria_leaf_spot",
    ];

    #[derive(Default)]
    struct CountingLookup {
        calls: AtomicUsize,
    }

    impl RemediationLookup for CountingLookup {
        fn lookup(&self, raw_label: &str) -> Option<RemediationRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (raw_label == "Tomato___Early_blight").then(|| RemediationRecord {
                cause: "Alternaria solani".to_string(),
                ..Default::default()
            })
        }
    }

    /// Counts appends and optionally fails them
    #[derive(Default)]
    struct CountingStore {
        appends: AtomicUsize,
        fail: bool,
        inner: MemoryHistoryStore,
    }

    impl HistoryStore for CountingStore {
        fn append(&self, record: NewHistoryRecord) -> Result<String, StoreError> {
            self.appends.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Backend("disk full".to_string()));
            }
            self.inner.append(record)
        }

        fn query(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryRecord>, StoreError> {
            self.inner.query(user_id, limit)
        }

        fn get(&self, record_id: &str, user_id: &str) -> Result<HistoryRecord, StoreError> {
            self.inner.get(record_id, user_id)
        }

        fn delete(&self, record_id: &str, user_id: &str) -> Result<(), StoreError> {
            self.inner.delete(record_id, user_id)
        }
    }

    struct Fixture {
        diagnoser: Diagnoser,
        lookup: Arc<CountingLookup>,
        store: Arc<CountingStore>,
    }

    fn fixture_with(store: CountingStore, locale: Locale) -> Fixture {
        let lookup = Arc::new(CountingLookup::default());
        let store = Arc::new(store);
        let context = DiagnosisContext {
            labels: LabelSet::new(LABELS.iter().map(|l| l.to_string()).collect()).unwrap(),
            presenter: Presenter::new(DisplayTables::for_locale(locale)),
            remediation: lookup.clone(),
            gate: GateConfig::default(),
            ranker: RankerConfig::default(),
        };
        Fixture {
            diagnoser: Diagnoser::new(Arc::new(context), store.clone()),
            lookup,
            store,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(CountingStore::default(), Locale::En)
    }

    fn one_hot(label: &str, top: f64) -> Vec<f64> {
        let rest = (1.0 - top) / (LABELS.len() - 1) as f64;
        LABELS.iter().map(|l| if *l == label { top } else { rest }).collect()
    }

    #[test]
    fn test_early_blight_high_confidence() {
        let f = fixture();
        let outcome = f
            .diagnoser
            .diagnose_probabilities(&one_hot("Tomato___Early_blight", 0.82), &UserSession::new("u1"))
            .unwrap();

        let result = outcome.result().unwrap();
        assert_eq!(result.display_label.plant_name, "Tomato");
        assert_eq!(result.display_label.disease_name, "Early blight");
        assert!(!result.is_healthy);
        assert!(result.caveat.is_none());
        assert_eq!(result.tier, ConfidenceTier::High);
        assert_relative_eq!(result.confidence, 82.0, epsilon = 1e-9);
        assert_eq!(result.remediation.as_ref().unwrap().cause, "Alternaria solani");
        assert!(matches!(outcome.persistence(), Some(PersistenceStatus::Saved { .. })));
        assert_eq!(f.store.appends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_healthy_pepper() {
        let f = fixture();
        let outcome = f
            .diagnoser
            .diagnose_probabilities(&one_hot("Pepper__bell___healthy", 0.91), &Anonymous)
            .unwrap();

        let result = outcome.result().unwrap();
        assert_eq!(result.display_label.plant_name, "Pepper");
        assert_eq!(result.display_label.disease_name, "Healthy");
        assert!(result.is_healthy);
    }

    #[test]
    fn test_low_confidence_is_rejected_without_side_effects() {
        let f = fixture();
        let outcome = f
            .diagnoser
            .diagnose_probabilities(&one_hot("Tomato___Late_blight", 0.35), &UserSession::new("u1"))
            .unwrap();

        let rejected = outcome.rejected().unwrap();
        assert_relative_eq!(rejected.top_probability, 0.35);
        assert_eq!(rejected.suspected_label, "Tomato___Late_blight");
        assert!(!rejected.guidance.is_empty());
        assert_eq!(f.store.appends.load(Ordering::SeqCst), 0);
        assert_eq!(f.lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_alternatives_fall_back_below_floor() {
        let f = fixture();
        let probabilities = [0.0, 0.0, 0.20, 0.55, 0.30, 0.05, 0.0];
        let outcome = f.diagnoser.diagnose_probabilities(&probabilities, &Anonymous).unwrap();

        let result = outcome.result().unwrap();
        assert!(result.caveat.is_some());
        assert_eq!(result.tier, ConfidenceTier::Low);
        let labels: Vec<&str> = result.alternatives.iter().map(|a| a.raw_label.as_str()).collect();
        assert_eq!(labels, vec!["Tomato___Late_blight", "Tomato_Leaf_Mold", "Tomato___Early_blight"]);
        let confidences: Vec<f64> = result.alternatives.iter().map(|a| a.confidence).collect();
        assert_relative_eq!(confidences[1], 30.0, epsilon = 1e-9);
        assert_relative_eq!(confidences[2], 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_caveat_boundary() {
        let f = fixture();
        let at_sixty = f
            .diagnoser
            .diagnose_probabilities(&one_hot("Tomato_Leaf_Mold", 0.60), &Anonymous)
            .unwrap();
        assert!(at_sixty.result().unwrap().caveat.is_none());

        let at_forty = f
            .diagnoser
            .diagnose_probabilities(&one_hot("Tomato_Leaf_Mold", 0.40), &Anonymous)
            .unwrap();
        assert!(at_forty.result().unwrap().caveat.is_some());
    }

    #[test]
    fn test_anonymous_never_persists() {
        let f = fixture();
        let outcome = f
            .diagnoser
            .diagnose_probabilities(&one_hot("Tomato___Early_blight", 0.9), &Anonymous)
            .unwrap();
        assert_eq!(outcome.persistence(), Some(&PersistenceStatus::Anonymous));
        assert_eq!(f.store.appends.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_store_failure_still_returns_result() {
        let f = fixture_with(
            CountingStore {
                fail: true,
                ..Default::default()
            },
            Locale::En,
        );
        let outcome = f
            .diagnoser
            .diagnose_probabilities(&one_hot("Tomato___Early_blight", 0.9), &UserSession::new("u1"))
            .unwrap();

        assert!(outcome.result().is_some());
        match outcome.persistence() {
            Some(PersistenceStatus::Failed { message }) => assert!(message.contains("disk full")),
            other => panic!("unexpected persistence status: {:?}", other),
        }
    }

    #[test]
    fn test_missing_remediation_is_none() {
        let f = fixture();
        let outcome = f
            .diagnoser
            .diagnose_probabilities(&one_hot("Tomato__Target_Spot", 0.7), &Anonymous)
            .unwrap();
        assert!(outcome.result().unwrap().remediation.is_none());
        assert_eq!(f.lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_malformed_vector_is_an_error() {
        let f = fixture();
        assert!(matches!(
            f.diagnoser.diagnose_probabilities(&[0.5, 0.5], &Anonymous),
            Err(DiagnosisError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_localized_output() {
        let f = fixture_with(CountingStore::default(), Locale::Vi);
        let outcome = f
            .diagnoser
            .diagnose_probabilities(&one_hot("Pepper__bell___healthy", 0.95), &Anonymous)
            .unwrap();
        let result = outcome.result().unwrap();
        assert_eq!(result.display_label.disease_name, "Khỏe mạnh");
        assert!(result.is_healthy);
    }

    #[test]
    fn test_batch_keeps_order() {
        let f = fixture();
        let vectors = vec![
            one_hot("Tomato___Early_blight", 0.9),
            one_hot("Tomato___Late_blight", 0.2),
            vec![1.0],
        ];
        let outcomes = f.diagnoser.diagnose_batch(&vectors, &Anonymous);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes[0].as_ref().unwrap().result().unwrap().raw_label,
            "Tomato___Early_blight"
        );
        assert!(outcomes[1].as_ref().unwrap().is_rejected());
        assert!(outcomes[2].is_err());
    }

    struct FixedClassifier(anyhow::Result<Vec<f64>>);

    impl Classifier for FixedClassifier {
        fn predict(&self, _image: &ImageInput) -> anyhow::Result<Vec<f64>> {
            match &self.0 {
                Ok(p) => Ok(p.clone()),
                Err(e) => Err(anyhow::anyhow!("{}", e)),
            }
        }
    }

    fn upload() -> ImageInput {
        ImageInput::Uploaded(UploadedImage {
            filename: "leaf.jpg".into(),
            content_type: Some("image/jpeg".into()),
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
        })
    }

    #[test]
    fn test_image_diagnosis_archives_for_signed_in_users() {
        let dir = tempfile::tempdir().unwrap();
        let f = fixture();
        let diagnoser = Diagnoser::new(f.diagnoser.context.clone(), f.store.clone())
            .with_image_archive(ImageArchive::new(dir.path()));
        let classifier = FixedClassifier(Ok(one_hot("Tomato___Early_blight", 0.9)));

        let outcome = diagnoser
            .diagnose_image(&classifier, &upload(), &UserSession::new("u1"))
            .unwrap();
        assert!(matches!(outcome.persistence(), Some(PersistenceStatus::Saved { .. })));

        let records = f.store.query("u1", 10).unwrap();
        let path = records[0].image_path.as_deref().unwrap();
        assert!(path.ends_with("_leaf.jpg"));
        assert!(std::path::Path::new(path).exists());
    }

    #[test]
    fn test_classifier_failure_is_surfaced() {
        let f = fixture();
        let classifier = FixedClassifier(Err(anyhow::anyhow!("model unavailable")));
        let err = f
            .diagnoser
            .diagnose_image(&classifier, &upload(), &Anonymous)
            .unwrap_err();
        assert!(matches!(err, DiagnosisError::Classifier(msg) if msg.contains("model unavailable")));
    }
}
