//! Utility modules shared across the pipeline

pub mod config;
pub mod logger;
pub mod quote;
