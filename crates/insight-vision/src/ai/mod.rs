//! Remote model access: prompt constants and the chat-completion client

pub mod client;
pub mod prompts;
