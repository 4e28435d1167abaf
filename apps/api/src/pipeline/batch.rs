//! Batch Runner: classifies postings batch by batch.
//!
//! Batches run strictly one after another. Inside a batch, postings go
//! through a worker pool of `max_concurrency` in-flight classifier calls;
//! with the default width of one this is the plain sequential loop. Output
//! order always follows input order, minus postings that produced no
//! extraction.

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{MalformedOutputPolicy, PipelineConfig};
use crate::errors::PipelineError;
use crate::llm_client::{Classifier, ClassifierError};
use crate::models::posting::{ExtractionResult, JobPosting};
use crate::pipeline::rate_limit::RateLimiter;

/// How classifier calls are paced.
#[derive(Debug, Clone)]
pub enum Throttle {
    Unthrottled,
    /// Pause `delay` before each posting whose index within its batch is a
    /// multiple of `every`. The counter restarts with every batch.
    FixedPacing { every: usize, delay: Duration },
    /// One token per call from a bucket shared by all workers and batches.
    RateLimited(Arc<RateLimiter>),
}

/// What a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub results: Vec<ExtractionResult>,
    pub postings: usize,
    pub batches: usize,
    /// Postings that yielded no extraction (empty response, or skipped
    /// malformed output).
    pub dropped: usize,
}

pub struct BatchRunner {
    classifier: Arc<dyn Classifier>,
    max_concurrency: usize,
    throttle: Throttle,
    malformed_output: MalformedOutputPolicy,
}

impl BatchRunner {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        max_concurrency: usize,
        throttle: Throttle,
        malformed_output: MalformedOutputPolicy,
    ) -> Self {
        Self {
            classifier,
            max_concurrency: max_concurrency.max(1),
            throttle,
            malformed_output,
        }
    }

    /// Builds a runner from pipeline settings. A configured rate limit
    /// replaces the per-batch pacing.
    pub fn from_config(classifier: Arc<dyn Classifier>, config: &PipelineConfig) -> Self {
        let throttle = match config.rate_limit_per_sec {
            Some(per_second) => Throttle::RateLimited(Arc::new(RateLimiter::new(
                per_second,
                config.rate_limit_burst,
            ))),
            None if config.pacing_every > 0 && !config.pacing_delay.is_zero() => {
                Throttle::FixedPacing {
                    every: config.pacing_every,
                    delay: config.pacing_delay,
                }
            }
            None => Throttle::Unthrottled,
        };
        Self::new(
            classifier,
            config.max_concurrency,
            throttle,
            config.malformed_output,
        )
    }

    /// Classifies every posting. `batch_size` must be positive; otherwise the
    /// run fails before any classifier call is made.
    pub async fn run_all(
        &self,
        postings: &[JobPosting],
        batch_size: i64,
    ) -> Result<RunReport, PipelineError> {
        let batch_size = validate_batch_size(batch_size)?;

        let batches = plan_batches(postings.len(), batch_size);
        info!(
            postings = postings.len(),
            batch_size,
            batches = batches.len(),
            max_concurrency = self.max_concurrency,
            "Starting classification run"
        );

        let mut results = Vec::with_capacity(postings.len());
        for (batch_number, range) in batches.iter().enumerate() {
            let extracted = self.process_batch(&postings[range.clone()]).await?;
            results.extend(extracted.into_iter().flatten());
            info!("Batch {batch_number} processing completed.");
        }

        let dropped = postings.len() - results.len();
        Ok(RunReport {
            results,
            postings: postings.len(),
            batches: batches.len(),
            dropped,
        })
    }

    async fn process_batch(
        &self,
        batch: &[JobPosting],
    ) -> Result<Vec<Option<ExtractionResult>>, PipelineError> {
        // Futures are built up front; a borrowing `map` closure makes the
        // handler future fail the `Send` bound.
        let calls: Vec<_> = batch
            .iter()
            .enumerate()
            .map(|(index, posting)| self.classify_one(index, posting))
            .collect();
        stream::iter(calls)
            .buffered(self.max_concurrency)
            .try_collect()
            .await
    }

    async fn classify_one(
        &self,
        index: usize,
        posting: &JobPosting,
    ) -> Result<Option<ExtractionResult>, PipelineError> {
        match &self.throttle {
            Throttle::FixedPacing { every, delay } if *every > 0 && index % every == 0 => {
                tokio::time::sleep(*delay).await;
            }
            Throttle::RateLimited(limiter) => limiter.acquire().await,
            _ => {}
        }

        match self.classifier.classify(posting).await {
            Ok(Some(result)) => Ok(Some(result)),
            Ok(None) => {
                debug!(title = %posting.title, "no extraction produced; dropping posting");
                Ok(None)
            }
            Err(ClassifierError::MalformedArguments(e))
                if self.malformed_output == MalformedOutputPolicy::Skip =>
            {
                warn!(title = %posting.title, error = %e, "skipping posting with malformed model output");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

pub fn validate_batch_size(batch_size: i64) -> Result<usize, PipelineError> {
    usize::try_from(batch_size)
        .ok()
        .filter(|size| *size > 0)
        .ok_or_else(|| {
            PipelineError::InvalidArgument(format!(
                "batch size must be a positive integer, got {batch_size}"
            ))
        })
}

/// Splits `len` items into consecutive ranges of `batch_size`; the last one
/// may be shorter. `batch_size` must be non-zero.
pub fn plan_batches(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    (0..len)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(len))
        .collect()
}
