pub mod analyzer;
pub mod categorize;
pub mod cli;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod error;
pub mod output;
pub mod probe;
pub mod process;
pub mod review;
pub mod sanitize;
pub mod worker;
