// Extraction pipeline: read postings → classify in batches → build the
// taxonomy tree → write it back. All classifier calls go through the
// `Classifier` held by the `BatchRunner`.

pub mod batch;
pub mod rate_limit;
pub mod taxonomy;

use tracing::info;

use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::models::posting::JobPosting;
use crate::pipeline::batch::{validate_batch_size, BatchRunner, RunReport};
use crate::pipeline::taxonomy::{build_tree, TaxonomyTree};
use crate::storage::{generated_document_name, DocumentStore, StoreError};

/// Everything a finished run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub report: RunReport,
    pub tree: TaxonomyTree,
    /// Name the flat result list was written under, when persisted.
    pub results_document: Option<String>,
}

/// Runs the whole pipeline once. Any error aborts the run; the tree document
/// is only written after every posting has been classified.
pub async fn run_pipeline(
    store: &dyn DocumentStore,
    runner: &BatchRunner,
    config: &PipelineConfig,
) -> Result<PipelineOutcome, PipelineError> {
    validate_batch_size(config.batch_size)?;

    let document = store.read_document(&config.jobs_document).await?;
    let postings: Vec<JobPosting> = serde_json::from_value(document).map_err(|e| {
        PipelineError::InvalidDocument(format!("{}: {e}", config.jobs_document))
    })?;
    info!(
        "Loaded {} postings from {}",
        postings.len(),
        config.jobs_document
    );

    let report = runner.run_all(&postings, config.batch_size).await?;
    let tree = build_tree(&report.results);

    let tree_value = serde_json::to_value(&tree).map_err(StoreError::from)?;
    store
        .write_document(&config.tree_document, &tree_value)
        .await?;
    info!(
        extracted = report.results.len(),
        dropped = report.dropped,
        leaves = tree.leaves().count(),
        "Taxonomy tree written to {}",
        config.tree_document
    );

    let results_document = if config.persist_results {
        let name = generated_document_name();
        let value = serde_json::to_value(&report.results).map_err(StoreError::from)?;
        store.write_document(&name, &value).await?;
        Some(name)
    } else {
        None
    };

    Ok(PipelineOutcome {
        report,
        tree,
        results_document,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::llm_client::{Classifier, ClassifierError};
    use crate::models::posting::{ExtractedAttributes, ExtractionResult, JobPosting};

    /// Returns the same attributes for every posting, or fails every call.
    pub struct FixedClassifier {
        pub attributes: Option<ExtractedAttributes>,
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    impl FixedClassifier {
        pub fn returning(industry: &str, function: &str, domain: &str) -> Self {
            Self {
                attributes: Some(ExtractedAttributes {
                    industry: industry.to_string(),
                    function: function.to_string(),
                    domain: domain.to_string(),
                    company_type: None,
                }),
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                attributes: None,
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(
            &self,
            posting: &JobPosting,
        ) -> Result<Option<ExtractionResult>, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ClassifierError::Api {
                    status: 500,
                    message: "internal".to_string(),
                });
            }
            Ok(self
                .attributes
                .clone()
                .map(|attrs| ExtractionResult::from_parts(attrs, posting)))
        }
    }

    pub fn bridge_jobs() -> serde_json::Value {
        serde_json::json!([{
            "title": "Engineer",
            "description": "builds bridges",
            "seniority": "Senior",
            "company_name": "Acme",
            "employment_type": "FT"
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{bridge_jobs, FixedClassifier};
    use super::*;
    use crate::config::MalformedOutputPolicy;
    use crate::pipeline::batch::Throttle;
    use crate::storage::FsDocumentStore;
    use serde_json::json;
    use std::sync::Arc;

    fn runner(classifier: Arc<FixedClassifier>) -> BatchRunner {
        BatchRunner::new(
            classifier,
            1,
            Throttle::Unthrottled,
            MalformedOutputPolicy::Abort,
        )
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_run_future_is_send_for_http_handlers() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let runner = BatchRunner::new(
            Arc::new(FixedClassifier::returning("A", "B", "C")),
            4,
            Throttle::Unthrottled,
            MalformedOutputPolicy::Abort,
        );
        let config = PipelineConfig::default();
        let run = run_pipeline(&store, &runner, &config);
        assert_send(&run);
    }

    #[tokio::test]
    async fn test_end_to_end_builds_and_writes_tree() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        store.write_document("jobs.json", &bridge_jobs()).await.unwrap();

        let classifier = Arc::new(FixedClassifier::returning(
            "Construction",
            "Engineering",
            "Structural",
        ));
        let outcome = run_pipeline(&store, &runner(classifier), &PipelineConfig::default())
            .await
            .unwrap();

        let expected = json!({
            "Construction": { "Engineering": { "Structural": { "Senior": ["builds bridges"] } } }
        });
        assert_eq!(serde_json::to_value(&outcome.tree).unwrap(), expected);
        assert_eq!(store.read_document("tree.json").await.unwrap(), expected);
        assert_eq!(outcome.report.results.len(), 1);
        assert!(outcome.results_document.is_none());
    }

    #[tokio::test]
    async fn test_persist_results_writes_generated_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        store.write_document("jobs.json", &bridge_jobs()).await.unwrap();

        let classifier = Arc::new(FixedClassifier::returning("Retail", "Sales", "B2C"));
        let config = PipelineConfig {
            persist_results: true,
            ..PipelineConfig::default()
        };
        let outcome = run_pipeline(&store, &runner(classifier), &config)
            .await
            .unwrap();

        let name = outcome.results_document.expect("results document name");
        let saved = store.read_document(&name).await.unwrap();
        assert_eq!(saved[0]["industry"], "Retail");
        assert_eq!(saved[0]["description"], "builds bridges");
    }

    #[tokio::test]
    async fn test_zero_extractions_still_writes_empty_tree() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        store.write_document("jobs.json", &bridge_jobs()).await.unwrap();

        let classifier = Arc::new(FixedClassifier {
            attributes: None,
            fail: false,
            calls: Default::default(),
        });
        let outcome = run_pipeline(&store, &runner(classifier), &PipelineConfig::default())
            .await
            .unwrap();

        assert_eq!(outcome.report.dropped, 1);
        assert!(outcome.tree.is_empty());
        assert_eq!(store.read_document("tree.json").await.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_missing_jobs_document_is_store_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let classifier = Arc::new(FixedClassifier::returning("A", "B", "C"));

        let err = run_pipeline(&store, &runner(classifier.clone()), &PipelineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Store(StoreError::NotFound(_))));
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_jobs_document_must_be_posting_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        store
            .write_document("jobs.json", &json!({ "jobs": [] }))
            .await
            .unwrap();
        let classifier = Arc::new(FixedClassifier::returning("A", "B", "C"));

        let err = run_pipeline(&store, &runner(classifier), &PipelineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidDocument(_)));
    }

    #[tokio::test]
    async fn test_invalid_batch_size_rejected_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let classifier = Arc::new(FixedClassifier::returning("A", "B", "C"));
        let config = PipelineConfig {
            batch_size: 0,
            ..PipelineConfig::default()
        };

        // jobs.json does not exist, so reaching the store would be NotFound.
        let err = run_pipeline(&store, &runner(classifier.clone()), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArgument(_)));
        assert_eq!(classifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_classifier_failure_writes_no_tree() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        store.write_document("jobs.json", &bridge_jobs()).await.unwrap();
        let classifier = Arc::new(FixedClassifier::failing());

        let err = run_pipeline(&store, &runner(classifier), &PipelineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Classifier(_)));
        assert!(matches!(
            store.read_document("tree.json").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
