//! Session state for the single-image and batch flows
//!
//! Each flow is a small reducer: callers send an action and read the state
//! back. Every analysis run gets a fresh [`RequestId`] and [`CancelToken`], and
//! a result tagged with an outdated id is dropped, so a slow response can never
//! overwrite the state of a newer upload.

use insight_types::{AccidentRecord, AnalysisType, ImageTask};
use insight_vision::{sniff_mime, BatchItem, CancelToken};
use tracing::debug;
use uuid::Uuid;

pub type RequestId = Uuid;

pub const MSG_INVALID_IMAGE: &str = "Please upload a valid image file";
pub const MSG_NO_IMAGE: &str = "Please upload an image first";
pub const MSG_EMPTY_BATCH: &str = "Please upload at least one image";
pub const MSG_BATCH_FAILED: &str = "Error analyzing images. Please try again.";

// ============================================================================
// Single-image flow
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingleStatus {
    Idle,
    Loading(RequestId),
    Done(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum SingleAction {
    Upload(ImageTask, AnalysisType),
    AnalyzeStart(RequestId),
    AnalyzeSuccess(RequestId, String),
    AnalyzeError(RequestId, String),
    Remove,
    Reset,
}

#[derive(Debug)]
pub struct SingleSession {
    image: Option<ImageTask>,
    analysis_type: AnalysisType,
    status: SingleStatus,
    cancel: CancelToken,
}

impl Default for SingleSession {
    fn default() -> Self {
        Self {
            image: None,
            analysis_type: AnalysisType::default(),
            status: SingleStatus::Idle,
            cancel: CancelToken::new(),
        }
    }
}

impl SingleSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self) -> Option<&ImageTask> {
        self.image.as_ref()
    }

    pub fn analysis_type(&self) -> AnalysisType {
        self.analysis_type
    }

    pub fn status(&self) -> &SingleStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, SingleStatus::Loading(_))
    }

    /// Token of the run currently in flight
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn is_current(&self, id: RequestId) -> bool {
        self.status == SingleStatus::Loading(id)
    }

    fn abandon_in_flight(&mut self) {
        if self.is_loading() {
            self.cancel.cancel();
        }
    }

    /// Start a run for the current image; `None` if there is nothing to analyze
    pub fn begin(&mut self) -> Option<(RequestId, CancelToken)> {
        let id = Uuid::new_v4();
        self.dispatch(SingleAction::AnalyzeStart(id));
        self.is_current(id).then(|| (id, self.cancel_token()))
    }

    pub fn dispatch(&mut self, action: SingleAction) {
        match action {
            SingleAction::Upload(task, analysis_type) => {
                self.abandon_in_flight();
                self.analysis_type = analysis_type;
                if sniff_mime(&task.bytes).is_ok() {
                    self.image = Some(task);
                    self.status = SingleStatus::Idle;
                } else {
                    self.image = None;
                    self.status = SingleStatus::Failed(MSG_INVALID_IMAGE.to_string());
                }
            }
            SingleAction::AnalyzeStart(id) => {
                if self.image.is_none() {
                    self.status = SingleStatus::Failed(MSG_NO_IMAGE.to_string());
                    return;
                }
                self.abandon_in_flight();
                self.cancel = CancelToken::new();
                self.status = SingleStatus::Loading(id);
            }
            SingleAction::AnalyzeSuccess(id, text) => {
                if self.is_current(id) {
                    self.status = SingleStatus::Done(text);
                } else {
                    debug!(%id, "Dropping stale analysis result");
                }
            }
            SingleAction::AnalyzeError(id, message) => {
                if self.is_current(id) {
                    self.status = SingleStatus::Failed(message);
                } else {
                    debug!(%id, "Dropping stale analysis error");
                }
            }
            SingleAction::Remove | SingleAction::Reset => {
                self.abandon_in_flight();
                self.image = None;
                self.status = SingleStatus::Idle;
            }
        }
    }
}

// ============================================================================
// Batch flow
// ============================================================================

#[derive(Debug, Clone)]
pub enum BatchAction {
    Upload(Vec<ImageTask>),
    AnalyzeStart,
    ItemFinished(Uuid, AccidentRecord),
    AnalyzeDone,
    AnalyzeError(String),
    Remove(usize),
    Reset,
}

#[derive(Debug, Default)]
pub struct BatchSession {
    items: Vec<BatchItem>,
    loading: bool,
    error: Option<String>,
    cancel: CancelToken,
}

impl BatchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn records(&self) -> Vec<AccidentRecord> {
        self.items.iter().map(|item| item.record.clone()).collect()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn dispatch(&mut self, action: BatchAction) {
        match action {
            BatchAction::Upload(tasks) => {
                let offered = tasks.len();
                let accepted: Vec<BatchItem> = tasks
                    .into_iter()
                    .filter(|task| sniff_mime(&task.bytes).is_ok())
                    .map(BatchItem::new)
                    .collect();

                self.error = (accepted.len() < offered).then(|| MSG_INVALID_IMAGE.to_string());
                self.items.extend(accepted);
            }
            BatchAction::AnalyzeStart => {
                if self.items.is_empty() {
                    self.error = Some(MSG_EMPTY_BATCH.to_string());
                    return;
                }
                self.cancel.cancel();
                self.cancel = CancelToken::new();
                self.loading = true;
                self.error = None;
            }
            BatchAction::ItemFinished(id, record) => {
                if !self.loading {
                    debug!(%id, "Dropping result outside of a running batch");
                    return;
                }
                match self.items.iter_mut().find(|item| item.task.id == id) {
                    Some(item) => item.record = record,
                    None => debug!(%id, "Dropping result for removed image"),
                }
            }
            BatchAction::AnalyzeDone => {
                self.loading = false;
            }
            BatchAction::AnalyzeError(message) => {
                self.loading = false;
                self.error = Some(message);
            }
            BatchAction::Remove(index) => {
                if index < self.items.len() {
                    self.items.remove(index);
                }
            }
            BatchAction::Reset => {
                self.cancel.cancel();
                *self = Self::default();
            }
        }
    }
}
