//! Analysis Service - runs the single-image and batch flows against a session
//!
//! Single flow:
//! 1. Upload into the session (non-images are rejected here)
//! 2. Start a run, receiving a request id
//! 3. Call the model
//! 4. Report success or failure tagged with the request id
//!
//! Batch flow:
//! 1. Start the batch (fails on an empty session)
//! 2. Run the bounded worker pool over a snapshot of the items
//! 3. Apply each finished record to the session as it arrives
//! 4. Mark the batch done, or failed when no image could be analyzed

use crate::config::Config;
use crate::session::{
    BatchAction, BatchSession, SingleAction, SingleSession, SingleStatus, MSG_BATCH_FAILED,
    MSG_EMPTY_BATCH, MSG_INVALID_IMAGE, MSG_NO_IMAGE,
};
use insight_types::{AccidentRecord, AnalysisType, ConfigError, Error, ImageTask, RecordStatus};
use insight_vision::{
    analyze_batch, analyze_image, BatchEvent, BatchOptions, BatchProgress, InferenceClient,
    OpenAiClient,
};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{info, warn};

/// Errors specific to the analysis service
#[derive(Debug, Error)]
pub enum AnalysisServiceError {
    #[error("Image validation failed: {0}")]
    InvalidImage(String),

    #[error("{0}")]
    EmptyBatch(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
}

impl From<Error> for AnalysisServiceError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidImage(msg) | Error::FileNotFound(msg) => {
                AnalysisServiceError::InvalidImage(msg)
            }
            Error::Validation(msg) => AnalysisServiceError::EmptyBatch(msg),
            Error::Config(e) => AnalysisServiceError::ConfigError(e),
            Error::Inference(msg) => AnalysisServiceError::AnalysisFailed(msg),
            _ => AnalysisServiceError::AnalysisFailed(err.to_string()),
        }
    }
}

pub struct AnalysisService {
    client: Box<dyn InferenceClient>,
    jobs: usize,
}

impl AnalysisService {
    /// Build a service talking to the configured endpoint.
    /// Reads the API key from the environment once.
    pub fn from_config(config: &Config) -> Result<Self, AnalysisServiceError> {
        let api_key = config.api_key()?;
        let client = OpenAiClient::new(api_key, config.analyzer_config())?;
        Ok(Self::with_client(Box::new(client), config.effective_jobs()))
    }

    pub fn with_client(client: Box<dyn InferenceClient>, jobs: usize) -> Self {
        Self {
            client,
            jobs: jobs.max(1),
        }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Upload `task` into the session and analyze it with the prompt pair for
    /// `analysis_type`. The session ends in `Done` or `Failed`.
    pub fn analyze_single(
        &self,
        session: &mut SingleSession,
        task: ImageTask,
        analysis_type: AnalysisType,
    ) -> Result<String, AnalysisServiceError> {
        let label = task.label.clone();
        session.dispatch(SingleAction::Upload(task, analysis_type));

        if session.image().is_none() {
            let message = match session.status() {
                SingleStatus::Failed(msg) => msg.clone(),
                _ => MSG_INVALID_IMAGE.to_string(),
            };
            return Err(AnalysisServiceError::InvalidImage(format!("{}: {}", label, message)));
        }

        let Some((id, _cancel)) = session.begin() else {
            return Err(AnalysisServiceError::InvalidImage(MSG_NO_IMAGE.to_string()));
        };

        let bytes = session
            .image()
            .map(|image| image.bytes.clone())
            .unwrap_or_default();

        match analyze_image(self.client.as_ref(), &bytes, analysis_type) {
            Ok(text) => {
                session.dispatch(SingleAction::AnalyzeSuccess(id, text.clone()));
                Ok(text)
            }
            Err(e) => {
                warn!(error = %e, "Single image analysis failed");
                session.dispatch(SingleAction::AnalyzeError(id, e.user_message().to_string()));
                Err(e.into())
            }
        }
    }

    /// Analyze every pending image in the session with at most `jobs`
    /// requests in flight. Records are applied to the session as they finish
    /// and `on_event` sees every progress event.
    pub fn analyze_batch(
        &self,
        session: &mut BatchSession,
        on_event: Option<BatchProgress<'_>>,
    ) -> Result<Vec<AccidentRecord>, AnalysisServiceError> {
        session.dispatch(BatchAction::AnalyzeStart);
        if !session.is_loading() {
            return Err(AnalysisServiceError::EmptyBatch(
                session.error().unwrap_or(MSG_EMPTY_BATCH).to_string(),
            ));
        }

        let items = session.items().to_vec();
        let options = BatchOptions::default()
            .with_jobs(self.jobs)
            .with_cancel(session.cancel_token());

        info!(images = items.len(), jobs = options.jobs, "Starting batch analysis");

        let records = {
            let shared = Mutex::new(&mut *session);
            let forward = |event: BatchEvent| {
                if let BatchEvent::Finished { id, ref record, .. } = event {
                    shared
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .dispatch(BatchAction::ItemFinished(id, record.clone()));
                }
                if let Some(cb) = on_event {
                    cb(event);
                }
            };

            analyze_batch(self.client.as_ref(), &items, &options, Some(&forward))
        };

        if records.iter().all(|r| r.status == RecordStatus::Error) {
            warn!(images = records.len(), "Every image in the batch failed");
            session.dispatch(BatchAction::AnalyzeError(MSG_BATCH_FAILED.to_string()));
        } else {
            session.dispatch(BatchAction::AnalyzeDone);
        }
        Ok(records)
    }
}
