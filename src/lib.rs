pub mod classify;
pub mod cli;
pub mod config;
pub mod dedupe;
pub mod diff;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod render;
pub mod report;
pub mod rules;
pub mod scope;
pub mod sink;
pub mod taxonomy;
