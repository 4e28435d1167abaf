use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub classifier: ClassifierConfig,
    pub store: StoreConfig,
    pub pipeline: PipelineConfig,
    /// Access key required by the trigger endpoint, if any.
    pub function_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

/// Connection settings for the LLM chat-completions deployment.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub enum StoreConfig {
    S3 {
        bucket: String,
        endpoint: String,
        region: String,
        access_key_id: String,
        secret_access_key: String,
    },
    Local {
        root: PathBuf,
    },
}

/// Slowest accepted rate limit: one call per hour.
pub const MIN_RATE_PER_SEC: f64 = 1.0 / 3600.0;

/// What to do when the model's function-call arguments are not valid JSON
/// or lack a required field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedOutputPolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Drop the posting and keep going.
    Skip,
}

/// Knobs for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub jobs_document: String,
    pub tree_document: String,
    /// Signed so that zero and negative values reach the runner and are
    /// rejected there.
    pub batch_size: i64,
    pub max_concurrency: usize,
    pub pacing_every: usize,
    pub pacing_delay: Duration,
    /// Requests per second; replaces per-batch pacing when set.
    pub rate_limit_per_sec: Option<f64>,
    pub rate_limit_burst: u32,
    pub malformed_output: MalformedOutputPolicy,
    /// Also write the flat result list under a generated document name.
    pub persist_results: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            jobs_document: "jobs.json".to_string(),
            tree_document: "tree.json".to_string(),
            batch_size: 20,
            max_concurrency: 1,
            pacing_every: 100,
            pacing_delay: Duration::from_secs(1),
            rate_limit_per_sec: None,
            rate_limit_burst: 1,
            malformed_output: MalformedOutputPolicy::Abort,
            persist_results: false,
        }
    }
}

impl PipelineConfig {
    /// Rejects settings that would stall or panic a run. Batch size is left
    /// to the runner, which reports it as an invalid argument.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            bail!("MAX_CONCURRENCY must be at least 1");
        }
        if let Some(rate) = self.rate_limit_per_sec {
            if !rate.is_finite() || rate < MIN_RATE_PER_SEC {
                bail!("RATE_LIMIT_PER_SEC must be a finite number of at least {MIN_RATE_PER_SEC}, got {rate}");
            }
        }
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let classifier = ClassifierConfig {
            endpoint: require_env("CLASSIFIER_ENDPOINT")?,
            api_key: require_env("CLASSIFIER_API_KEY")?,
            timeout: Duration::from_secs(parse_env("CLASSIFIER_TIMEOUT_SECS", 120u64)?),
        };

        let store = match optional_env("STORE_BACKEND").as_deref() {
            None | Some("s3") => StoreConfig::S3 {
                bucket: require_env("S3_BUCKET")?,
                endpoint: require_env("S3_ENDPOINT")?,
                region: optional_env("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            },
            Some("local") => StoreConfig::Local {
                root: optional_env("LOCAL_STORE_DIR")
                    .unwrap_or_else(|| "./data".to_string())
                    .into(),
            },
            Some(other) => bail!("STORE_BACKEND must be 's3' or 'local', got '{other}'"),
        };

        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            jobs_document: optional_env("JOBS_DOCUMENT").unwrap_or(defaults.jobs_document),
            tree_document: optional_env("TREE_DOCUMENT").unwrap_or(defaults.tree_document),
            batch_size: parse_env("BATCH_SIZE", defaults.batch_size)?,
            max_concurrency: parse_env("MAX_CONCURRENCY", defaults.max_concurrency)?,
            pacing_every: parse_env("PACING_EVERY", defaults.pacing_every)?,
            pacing_delay: Duration::from_millis(parse_env("PACING_DELAY_MS", 1000u64)?),
            rate_limit_per_sec: optional_env("RATE_LIMIT_PER_SEC")
                .map(|v| {
                    v.parse::<f64>()
                        .context("RATE_LIMIT_PER_SEC must be a number")
                })
                .transpose()?,
            rate_limit_burst: parse_env("RATE_LIMIT_BURST", defaults.rate_limit_burst)?,
            malformed_output: parse_policy(optional_env("MALFORMED_OUTPUT_POLICY").as_deref())?,
            persist_results: parse_env("PERSIST_RESULTS", defaults.persist_results)?,
        };

        pipeline.validate()?;

        Ok(Config {
            classifier,
            store,
            pipeline,
            function_key: optional_env("FUNCTION_KEY"),
            port: parse_env("PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn parse_policy(raw: Option<&str>) -> Result<MalformedOutputPolicy> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None | Some("abort") => Ok(MalformedOutputPolicy::Abort),
        Some("skip") => Ok(MalformedOutputPolicy::Skip),
        Some(other) => bail!("MALFORMED_OUTPUT_POLICY must be 'abort' or 'skip', got '{other}'"),
    }
}
