//! Prompt constants for image analysis
//!
//! Prompts are static configuration. The single-image flow picks a pair by
//! [`AnalysisType`]; the batch flow always uses [`BATCH_ACCIDENT_PROMPT`], whose
//! system instruction pins the `Label: value` line format the field extractor
//! depends on.

use crate::ai::client::{ChatMessage, ContentPart};
use crate::encoder::EncodedImage;
use insight_types::AnalysisType;

/// A fixed system instruction and the human instruction sent with the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptPair {
    pub system: &'static str,
    pub human: &'static str,
}

const HUMAN_INSTRUCTION: &str = "Please analyze this image and provide detailed observations.";

pub const ACCIDENT_PROMPT: PromptPair = PromptPair {
    system: "You are an expert image analyzer. Describe the image and provide insights about \
             what you see. Like vehicles involved, seriousness of the accident, etc. No need of \
             detailed sentences instead just give the details like heading and data no need of \
             explanation of each datapoint.  Give the output without * and # symbols.",
    human: HUMAN_INSTRUCTION,
};

pub const PRESCRIPTION_PROMPT: PromptPair = PromptPair {
    system: "Read the text in the image and print the text below. Give patient details and then \
             give medication details and dosage if available. Give the output without * and # \
             symbols.",
    human: HUMAN_INSTRUCTION,
};

pub const BATCH_ACCIDENT_PROMPT: PromptPair = PromptPair {
    system: "You are an expert accident scene analyzer for insurance claims. Look at the image and \
             report exactly these five lines, each on its own line, in this order and with these \
             labels:\n\
             Vehicles Involved: <number and types of vehicles>\n\
             Accident Details: <type of collision and visible damage>\n\
             Surroundings: <road, weather, lighting and location details>\n\
             Condition: <severity of damage and whether vehicles look drivable>\n\
             Overall Assessment: <one sentence summary of seriousness>\n\
             Keep every value on a single line. If something cannot be determined write Unknown. \
             Give the output without * and # symbols.",
    human: "Analyze this accident image and fill in the five labeled lines.",
};

/// Prompt pair used by the single-image flow
pub fn prompt_for(analysis_type: AnalysisType) -> &'static PromptPair {
    match analysis_type {
        AnalysisType::Accident => &ACCIDENT_PROMPT,
        AnalysisType::Prescription => &PRESCRIPTION_PROMPT,
    }
}

/// Build the two-message sequence: system instruction, then image plus human instruction
pub fn build_messages(prompt: &PromptPair, image: &EncodedImage) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(prompt.system),
        ChatMessage::user(vec![
            ContentPart::image_url(image.data_uri()),
            ContentPart::text(prompt.human),
        ]),
    ]
}
