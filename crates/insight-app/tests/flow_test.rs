//! End-to-end tests for the single-image and batch flows with a scripted model

use insight_app::app::{AnalysisService, AnalysisServiceError};
use insight_app::session::{
    BatchAction, BatchSession, SingleSession, SingleStatus, MSG_BATCH_FAILED, MSG_EMPTY_BATCH,
};
use insight_types::{AnalysisType, Error, ImageTask, RecordStatus, Result, NOT_AVAILABLE};
use insight_vision::{
    encode_image, BatchEvent, ChatMessage, ContentPart, InferenceClient, MessageContent,
    PRESCRIPTION_PROMPT,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const ACCIDENT_REPLY: &str = "**Vehicles Involved:** 2 sedans\n\
                              Accident Details: rear-end collision\n\
                              Surroundings: wet road at night\n\
                              ## Condition: rear bumper crushed\n\
                              Overall Assessment: moderate";

fn png(index: u8) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec();
    bytes.push(index);
    bytes
}

fn data_uri(bytes: &[u8]) -> String {
    encode_image(bytes).unwrap().data_uri()
}

#[derive(Default)]
struct Recorder {
    calls: AtomicUsize,
    systems: Mutex<Vec<String>>,
}

/// Scripted model: fails for chosen images, optionally slower for others
struct ScriptedClient {
    reply: String,
    failing: HashSet<String>,
    slow: HashSet<String>,
    recorder: Arc<Recorder>,
}

impl ScriptedClient {
    fn new(reply: &str, recorder: Arc<Recorder>) -> Self {
        Self {
            reply: reply.to_string(),
            failing: HashSet::new(),
            slow: HashSet::new(),
            recorder,
        }
    }

    fn failing_on(mut self, bytes: &[u8]) -> Self {
        self.failing.insert(data_uri(bytes));
        self
    }

    fn slow_on(mut self, bytes: &[u8]) -> Self {
        self.slow.insert(data_uri(bytes));
        self
    }
}

impl InferenceClient for ScriptedClient {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.recorder.calls.fetch_add(1, Ordering::SeqCst);

        if let MessageContent::Text(system) = &messages[0].content {
            self.recorder.systems.lock().unwrap().push(system.clone());
        }

        let uri = match &messages[1].content {
            MessageContent::Parts(parts) => parts.iter().find_map(|p| match p {
                ContentPart::ImageUrl { image_url } => Some(image_url.url.clone()),
                _ => None,
            }),
            _ => None,
        }
        .unwrap_or_default();

        if self.slow.contains(&uri) {
            std::thread::sleep(Duration::from_millis(50));
        }
        if self.failing.contains(&uri) {
            return Err(Error::Inference("503 Service Unavailable".to_string()));
        }
        Ok(self.reply.clone())
    }
}

fn service(client: ScriptedClient, jobs: usize) -> AnalysisService {
    AnalysisService::with_client(Box::new(client), jobs)
}

#[test]
fn test_single_prescription_flow() {
    let recorder = Arc::new(Recorder::default());
    let service = service(ScriptedClient::new("# Patient\nJane Roe", recorder.clone()), 1);
    let mut session = SingleSession::new();

    let text = service
        .analyze_single(&mut session, ImageTask::new("rx.png", png(1)), AnalysisType::Prescription)
        .unwrap();

    assert_eq!(text, " Patient\nJane Roe");
    assert_eq!(session.status(), &SingleStatus::Done(text));
    assert_eq!(
        recorder.systems.lock().unwrap().as_slice(),
        [PRESCRIPTION_PROMPT.system.to_string()]
    );
}

#[test]
fn test_single_non_image_never_calls_model() {
    let recorder = Arc::new(Recorder::default());
    let service = service(ScriptedClient::new("unused", recorder.clone()), 1);
    let mut session = SingleSession::new();

    let err = service
        .analyze_single(
            &mut session,
            ImageTask::new("report.pdf", b"%PDF-1.7".to_vec()),
            AnalysisType::Accident,
        )
        .unwrap_err();

    assert!(matches!(err, AnalysisServiceError::InvalidImage(_)));
    assert_eq!(
        session.status(),
        &SingleStatus::Failed("Please upload a valid image file".to_string())
    );
    assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_single_remote_failure_shows_retry_message() {
    let recorder = Arc::new(Recorder::default());
    let client = ScriptedClient::new("unused", recorder).failing_on(&png(9));
    let service = service(client, 1);
    let mut session = SingleSession::new();

    let err = service
        .analyze_single(&mut session, ImageTask::new("a.png", png(9)), AnalysisType::Accident)
        .unwrap_err();

    assert!(matches!(err, AnalysisServiceError::AnalysisFailed(_)));
    assert_eq!(
        session.status(),
        &SingleStatus::Failed("Error analyzing image. Please try again.".to_string())
    );
}

#[test]
fn test_batch_second_call_fails() {
    let recorder = Arc::new(Recorder::default());
    // The first image is slow so completion order differs from upload order
    let client = ScriptedClient::new(ACCIDENT_REPLY, recorder.clone())
        .failing_on(&png(2))
        .slow_on(&png(1));
    let service = service(client, 3);

    let mut session = BatchSession::new();
    session.dispatch(BatchAction::Upload(vec![
        ImageTask::new("1.png", png(1)),
        ImageTask::new("2.png", png(2)),
        ImageTask::new("3.png", png(3)),
    ]));

    let records = service.analyze_batch(&mut session, None).unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].status, RecordStatus::Completed);
    assert_eq!(records[1].status, RecordStatus::Error);
    assert_eq!(records[2].status, RecordStatus::Completed);

    assert_eq!(records[0].vehicles_involved, "2 sedans");
    assert_eq!(records[0].condition, "rear bumper crushed");
    assert_eq!(records[0].overall_assessment, "moderate");
    assert_ne!(records[2].accident_details, NOT_AVAILABLE);

    assert_eq!(session.records(), records);
    assert!(!session.is_loading());
    assert_eq!(session.error(), None);
    assert_eq!(recorder.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_batch_every_call_fails() {
    let recorder = Arc::new(Recorder::default());
    let client = ScriptedClient::new(ACCIDENT_REPLY, recorder.clone())
        .failing_on(&png(1))
        .failing_on(&png(2));
    let service = service(client, 2);

    let mut session = BatchSession::new();
    session.dispatch(BatchAction::Upload(vec![
        ImageTask::new("1.png", png(1)),
        ImageTask::new("2.png", png(2)),
    ]));

    let records = service.analyze_batch(&mut session, None).unwrap();

    assert!(records.iter().all(|r| r.status == RecordStatus::Error));
    assert!(!session.is_loading());
    assert_eq!(session.error(), Some(MSG_BATCH_FAILED));
}

#[test]
fn test_batch_progress_reaches_caller() {
    let recorder = Arc::new(Recorder::default());
    let service = service(ScriptedClient::new(ACCIDENT_REPLY, recorder), 2);

    let mut session = BatchSession::new();
    session.dispatch(BatchAction::Upload((0..5).map(|i| ImageTask::new(format!("{}.png", i), png(i))).collect()));

    let finished = AtomicUsize::new(0);
    let on_event = |event: BatchEvent| {
        if matches!(event, BatchEvent::Finished { .. }) {
            finished.fetch_add(1, Ordering::SeqCst);
        }
    };

    service.analyze_batch(&mut session, Some(&on_event)).unwrap();
    assert_eq!(finished.load(Ordering::SeqCst), 5);
}

#[test]
fn test_batch_empty_session() {
    let recorder = Arc::new(Recorder::default());
    let service = service(ScriptedClient::new(ACCIDENT_REPLY, recorder.clone()), 2);
    let mut session = BatchSession::new();

    let err = service.analyze_batch(&mut session, None).unwrap_err();

    assert!(matches!(err, AnalysisServiceError::EmptyBatch(ref msg) if msg == MSG_EMPTY_BATCH));
    assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_batch_rerun_skips_finished_records() {
    let recorder = Arc::new(Recorder::default());
    let service = service(ScriptedClient::new(ACCIDENT_REPLY, recorder.clone()), 2);

    let mut session = BatchSession::new();
    session.dispatch(BatchAction::Upload(vec![ImageTask::new("1.png", png(1))]));
    service.analyze_batch(&mut session, None).unwrap();

    session.dispatch(BatchAction::Upload(vec![ImageTask::new("2.png", png(2))]));
    let records = service.analyze_batch(&mut session, None).unwrap();

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.status == RecordStatus::Completed));
    assert_eq!(recorder.calls.load(Ordering::SeqCst), 2);
}
