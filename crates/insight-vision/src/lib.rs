//! Vision module - multimodal model analysis of accident and prescription images

pub mod ai;
pub mod batch;
pub mod cancel;
pub mod encoder;
pub mod response;

// Re-export main types for convenience
pub use ai::client::{ChatMessage, ContentPart, InferenceClient, MessageContent, OpenAiClient, Role};
pub use ai::prompts::{
    build_messages, prompt_for, PromptPair, ACCIDENT_PROMPT, BATCH_ACCIDENT_PROMPT,
    PRESCRIPTION_PROMPT,
};
pub use batch::{analyze_batch, BatchEvent, BatchItem, BatchOptions, BatchProgress, DEFAULT_JOBS};
pub use cancel::CancelToken;
pub use encoder::{encode_image, read_image, sniff_mime, EncodedImage};
pub use response::{extract_accident_fields, extract_field, sanitize_response, ACCIDENT_FIELD_LABELS};

use insight_types::{AccidentRecord, AnalysisType, Result};
use tracing::info;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Analyzer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    pub model: String,
    pub base_url: String,
    /// Output-token ceiling
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs.max(1);
        self
    }
}

/// Run `prompt` against one image and return the sanitized reply
fn run_prompt(client: &dyn InferenceClient, bytes: &[u8], prompt: &PromptPair) -> Result<String> {
    let image = encode_image(bytes)?;
    let messages = build_messages(prompt, &image);
    let raw = client.complete(&messages)?;
    Ok(sanitize_response(&raw))
}

/// Single-image flow: analyze with the prompt pair for `analysis_type`.
///
/// Non-image payloads are rejected before the client is called.
pub fn analyze_image(
    client: &dyn InferenceClient,
    bytes: &[u8],
    analysis_type: AnalysisType,
) -> Result<String> {
    info!(%analysis_type, bytes = bytes.len(), "Analyzing image");
    run_prompt(client, bytes, prompt_for(analysis_type))
}

/// One batch-flow image: analyze with the batch accident prompt and extract the
/// five fields into a completed record
pub fn analyze_accident_record(client: &dyn InferenceClient, bytes: &[u8]) -> Result<AccidentRecord> {
    let text = run_prompt(client, bytes, &BATCH_ACCIDENT_PROMPT)?;
    Ok(AccidentRecord::completed(extract_accident_fields(&text)))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use insight_types::Error;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    pub const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    /// A distinct valid-looking PNG payload per index
    pub fn png(index: u8) -> Vec<u8> {
        let mut bytes = PNG_HEADER.to_vec();
        bytes.push(index);
        bytes
    }

    pub fn user_image_uri(messages: &[ChatMessage]) -> Option<String> {
        messages.iter().find_map(|m| match &m.content {
            MessageContent::Parts(parts) => parts.iter().find_map(|p| match p {
                ContentPart::ImageUrl { image_url } => Some(image_url.url.clone()),
                _ => None,
            }),
            _ => None,
        })
    }

    /// Replies with a fixed text, failing for selected payloads
    pub struct FakeClient {
        pub reply: String,
        pub failing: HashSet<String>,
        pub delay: Duration,
        pub calls: AtomicUsize,
        in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
        pub systems: Mutex<Vec<String>>,
    }

    impl FakeClient {
        pub fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                failing: HashSet::new(),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                systems: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_on(mut self, bytes: &[u8]) -> Self {
            if let Ok(image) = encode_image(bytes) {
                self.failing.insert(image.data_uri());
            }
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    impl InferenceClient for FakeClient {
        fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(ChatMessage {
                content: MessageContent::Text(system),
                ..
            }) = messages.first()
            {
                self.systems.lock().unwrap().push(system.clone());
            }

            std::thread::sleep(self.delay);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match user_image_uri(messages) {
                Some(uri) if self.failing.contains(&uri) => {
                    Err(Error::Inference("connection reset".to_string()))
                }
                _ => Ok(self.reply.clone()),
            }
        }
    }
}
