pub mod config;
pub mod logging;

pub mod engine;
pub mod progress_file;
pub mod scheduler;
pub mod stat;
pub mod task;
