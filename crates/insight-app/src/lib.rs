//! Application service layer - config, input scanning, session state

pub mod app;
pub mod config;
pub mod scanner;
pub mod session;
