//! Batch Scheduler: runs an upload through a per-file pipeline in fixed-size groups.
//!
//! Files within a group run concurrently and the group settles when every file has
//! either produced a result or failed. Groups are spaced so the provider call rate stays
//! under the configured per-minute ceiling. Every file ends up in exactly one of
//! `results`, `errors` or `skipped`, and every artifact is released exactly once.

pub mod upload;

use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::BatchSettings;
use crate::errors::AppError;

pub use upload::UploadedFile;

/// What to do with the remaining groups once a group has a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchErrorPolicy {
    /// Finish the failing group, then skip every later group.
    #[default]
    StopAfterFailedGroup,
    /// Keep going; failures only affect their own file.
    ContinueAll,
}

impl FromStr for BatchErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop" | "stop_after_failed_group" => Ok(BatchErrorPolicy::StopAfterFailedGroup),
            "continue" | "continue_all" => Ok(BatchErrorPolicy::ContinueAll),
            other => Err(format!("expected 'stop' or 'continue', got '{other}'")),
        }
    }
}

impl Display for BatchErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchErrorPolicy::StopAfterFailedGroup => f.write_str("stop"),
            BatchErrorPolicy::ContinueAll => f.write_str("continue"),
        }
    }
}

/// A file that was attempted and failed, with the failure's display message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFailure {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub error: String,
}

#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub results: Vec<T>,
    pub errors: Vec<FileFailure>,
    /// Files never dispatched because an earlier group failed.
    pub skipped: Vec<String>,
}

impl<T> BatchOutcome<T> {
    fn new() -> Self {
        Self {
            results: Vec::new(),
            errors: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty() && self.skipped.is_empty()
    }

    /// `Ok(results)` when every file succeeded, otherwise the partial-failure error.
    /// Results of the files that did succeed are persisted but not returned.
    pub fn into_result(self) -> Result<Vec<T>, AppError> {
        if self.all_succeeded() {
            Ok(self.results)
        } else {
            Err(AppError::BatchFailed {
                errors: self.errors,
                skipped: self.skipped,
            })
        }
    }
}

/// The per-file unit of work driven by the scheduler.
#[async_trait]
pub trait FilePipeline: Send + Sync {
    type Output: Send;
    type Error: Display + Send;

    async fn process(&self, file: &UploadedFile) -> Result<Self::Output, Self::Error>;
}

#[derive(Debug, Clone)]
pub struct BatchScheduler {
    batch_size: usize,
    group_delay: Duration,
    policy: BatchErrorPolicy,
}

impl BatchScheduler {
    pub fn new(settings: &BatchSettings) -> Self {
        let batch_size = settings.batch_size.max(1);
        let rate = settings.rate_limit_per_minute.max(1);
        // Each group issues up to `batch_size` provider calls.
        let group_delay = Duration::from_secs(60) * batch_size as u32 / rate;

        Self {
            batch_size,
            group_delay,
            policy: settings.error_policy,
        }
    }

    pub fn group_delay(&self) -> Duration {
        self.group_delay
    }

    pub async fn run<P: FilePipeline>(
        &self,
        pipeline: &P,
        files: Vec<UploadedFile>,
    ) -> BatchOutcome<P::Output> {
        let total = files.len();
        let mut outcome = BatchOutcome::new();
        let mut remaining = files.into_iter();
        let mut group_index = 0usize;

        loop {
            let group: Vec<UploadedFile> = remaining.by_ref().take(self.batch_size).collect();
            if group.is_empty() {
                break;
            }
            if group_index > 0 {
                info!(
                    "Waiting {:?} before group {} to respect the rate ceiling",
                    self.group_delay,
                    group_index + 1
                );
                tokio::time::sleep(self.group_delay).await;
            }

            let settled = join_all(group.iter().map(|file| pipeline.process(file))).await;

            let mut group_failed = false;
            for (file, result) in group.into_iter().zip(settled) {
                match result {
                    Ok(output) => outcome.results.push(output),
                    Err(e) => {
                        warn!("Processing '{}' failed: {e}", file.file_name());
                        group_failed = true;
                        outcome.errors.push(FileFailure {
                            file_name: file.file_name().to_string(),
                            error: e.to_string(),
                        });
                    }
                }
                file.release();
            }

            if group_failed && self.policy == BatchErrorPolicy::StopAfterFailedGroup {
                for file in remaining.by_ref() {
                    outcome.skipped.push(file.file_name().to_string());
                    file.release();
                }
                if !outcome.skipped.is_empty() {
                    warn!(
                        "Group {} had failures; skipped {} remaining file(s)",
                        group_index + 1,
                        outcome.skipped.len()
                    );
                }
                break;
            }
            group_index += 1;
        }

        info!(
            "Batch finished: {} of {total} succeeded, {} failed, {} skipped",
            outcome.results.len(),
            outcome.errors.len(),
            outcome.skipped.len()
        );
        outcome
    }
}
