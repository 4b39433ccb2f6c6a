use crate::config::UploadSettings;
use crate::lead::LeadRecord;
use crate::parser::{parse_leads, ParseError, ParseMode};
use crate::store::{LeadBatch, LeadStore};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No valid leads found in CSV file")]
    NoValidLeads,
    #[error("Failed to upload any leads")]
    NothingUploaded,
    #[error("upload cancelled before any lead was stored")]
    Cancelled,
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub batch_size: usize,
    /// Batches in flight at once; 1 keeps the run strictly sequential.
    pub concurrency: usize,
    /// A batch that takes longer than this counts as failed.
    pub batch_timeout: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadSettings::default().into()
    }
}

impl From<UploadSettings> for UploadConfig {
    fn from(settings: UploadSettings) -> Self {
        Self {
            batch_size: settings.batch_size,
            concurrency: settings.concurrency,
            batch_timeout: settings.batch_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadProgress {
    pub current: usize,
    pub total: usize,
    pub percentage: u32,
}

impl UploadProgress {
    pub fn new(current: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            (current as f64 / total as f64 * 100.0).round() as u32
        };
        Self {
            current,
            total,
            percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub index: usize,
    pub size: usize,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    /// Leads in batches the store accepted.
    pub count: usize,
    pub total: usize,
    /// Batches actually sent (cancelled ones are not counted).
    pub batches: usize,
    pub failed_batches: Vec<BatchFailure>,
    pub cancelled: bool,
}

enum BatchOutcome {
    Stored,
    Failed(String),
    NotStarted,
}

/// Sends leads to a [`LeadStore`] in fixed-size batches.
///
/// A failing batch is logged and recorded, never fatal: the run goes on and
/// earlier batches stay stored. Batches start in partition order; with
/// `concurrency > 1` up to that many are in flight, and results are still
/// reported in order.
pub struct BatchUploader<S> {
    store: S,
    config: UploadConfig,
}

impl<S: LeadStore> BatchUploader<S> {
    pub fn new(store: S, config: UploadConfig) -> Self {
        let config = UploadConfig {
            batch_size: config.batch_size.max(1),
            concurrency: config.concurrency.max(1),
            ..config
        };
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Parse `text` and upload what survives validation.
    pub async fn upload_csv<F>(
        &self,
        project_id: &str,
        text: &str,
        mode: ParseMode,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<UploadSummary, UploadError>
    where
        F: FnMut(UploadProgress),
    {
        let outcome = parse_leads(text, mode)?;
        if !outcome.skipped.is_empty() {
            tracing::warn!(
                skipped = outcome.skipped.len(),
                "rows without client name or phone were not uploaded"
            );
        }
        self.upload(project_id, &outcome.records, cancel, on_progress)
            .await
    }

    pub async fn upload<F>(
        &self,
        project_id: &str,
        leads: &[LeadRecord],
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<UploadSummary, UploadError>
    where
        F: FnMut(UploadProgress),
    {
        if leads.is_empty() {
            return Err(UploadError::NoValidLeads);
        }

        let total = leads.len();
        let batches: Vec<LeadBatch<'_>> = leads
            .chunks(self.config.batch_size)
            .enumerate()
            .map(|(index, chunk)| LeadBatch::new(project_id, index, chunk))
            .collect();
        tracing::info!(
            project_id,
            total,
            batches = batches.len(),
            "starting lead upload"
        );
        on_progress(UploadProgress::new(0, total));

        let mut results = stream::iter(batches.iter())
            .map(|batch| async move { (batch, self.send_batch(project_id, batch, cancel).await) })
            .buffered(self.config.concurrency);

        let mut summary = UploadSummary {
            count: 0,
            total,
            batches: 0,
            failed_batches: Vec::new(),
            cancelled: false,
        };
        while let Some((batch, outcome)) = results.next().await {
            match outcome {
                BatchOutcome::Stored => {
                    summary.batches += 1;
                    summary.count += batch.len();
                }
                BatchOutcome::Failed(error) => {
                    tracing::warn!(
                        batch = batch.index + 1,
                        size = batch.len(),
                        %error,
                        "lead batch failed, continuing"
                    );
                    summary.batches += 1;
                    summary.failed_batches.push(BatchFailure {
                        index: batch.index,
                        size: batch.len(),
                        error,
                    });
                }
                BatchOutcome::NotStarted => {
                    summary.cancelled = true;
                    continue;
                }
            }
            on_progress(UploadProgress::new(summary.count, total));
        }

        if summary.count == 0 {
            return Err(if summary.cancelled {
                UploadError::Cancelled
            } else {
                UploadError::NothingUploaded
            });
        }
        tracing::info!(
            project_id,
            uploaded = summary.count,
            failed_batches = summary.failed_batches.len(),
            cancelled = summary.cancelled,
            "lead upload finished"
        );
        Ok(summary)
    }

    async fn send_batch(
        &self,
        project_id: &str,
        batch: &LeadBatch<'_>,
        cancel: &CancellationToken,
    ) -> BatchOutcome {
        if cancel.is_cancelled() {
            return BatchOutcome::NotStarted;
        }
        tracing::debug!(
            batch = batch.index + 1,
            size = batch.len(),
            key = %batch.idempotency_key,
            "uploading lead batch"
        );
        let call = self.store.upload_leads(project_id, batch);
        match tokio::time::timeout(self.config.batch_timeout, call).await {
            Ok(Ok(receipt)) if receipt.success => BatchOutcome::Stored,
            Ok(Ok(receipt)) => BatchOutcome::Failed(
                receipt
                    .error
                    .or(receipt.message)
                    .unwrap_or_else(|| "rejected by lead store".to_string()),
            ),
            Ok(Err(err)) => BatchOutcome::Failed(err.to_string()),
            Err(_) => BatchOutcome::Failed(format!(
                "timed out after {}s",
                self.config.batch_timeout.as_secs_f64()
            )),
        }
    }
}
