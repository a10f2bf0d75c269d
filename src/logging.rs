//! Logging utilities for error tracking and debugging

use crate::errors::CareerEngineError;
use log::LevelFilter;
use simplelog::{CombinedLogger, Config, WriteLogger};
use std::error::Error;
use std::fs::File;
use std::path::Path;

static LOG_INITIALIZED: std::sync::Once = std::sync::Once::new();

/// Initialize logging to a file under `data_dir`. Safe to call more than
/// once; only the first call takes effect.
pub fn init_logging(data_dir: &Path) {
    LOG_INITIALIZED.call_once(|| {
        let log_path = data_dir.join("careerengine.log");

        match File::options().create(true).append(true).open(&log_path) {
            Ok(log_file) => {
                let config = Config::default();
                if let Err(e) = CombinedLogger::init(vec![WriteLogger::new(
                    LevelFilter::Debug,
                    config,
                    log_file,
                )]) {
                    eprintln!("Failed to initialize logger: {}", e);
                } else {
                    log::info!("=== CareerEngine logging initialized ===");
                    log::info!("Log file: {}", log_path.display());
                }
            }
            Err(e) => {
                eprintln!("Failed to open log file at {}: {}", log_path.display(), e);
            }
        }
    });
}

/// Log an error with its source chain.
pub fn log_error(context: &str, error: &dyn Error) {
    log::error!("[{}] Error: {}", context, error);
    let mut current: Option<&dyn Error> = error.source();
    let mut depth = 1;
    while let Some(err) = current {
        log::error!("[{}] Caused by (level {}): {}", context, depth, err);
        current = err.source();
        depth += 1;
        if depth > 10 {
            log::warn!("[{}] Error chain too deep, truncating", context);
            break;
        }
    }
}

/// Log a `CareerEngineError` with variant-specific detail.
pub fn log_engine_error(context: &str, error: &CareerEngineError) {
    log::error!("[{}] {}", context, error);
    match error {
        CareerEngineError::ExtractionFailed(_) | CareerEngineError::VectorIndexUnavailable(_) => {
            log::error!("[{}] transient/permanent fault detail: {:?}", context, error);
        }
        CareerEngineError::InvalidOverride(_) | CareerEngineError::NoDefaultResume => {
            log::warn!("[{}] input error: {:?}", context, error);
        }
        _ => {}
    }
}

pub fn log_info(context: &str, message: &str) {
    log::info!("[{}] {}", context, message);
}

pub fn log_warning(context: &str, message: &str) {
    log::warn!("[{}] {}", context, message);
}

pub fn log_debug(context: &str, message: &str) {
    log::debug!("[{}] {}", context, message);
}

/// Log with elapsed timing, used by pipeline stages to record latency.
pub fn log_stage_timing(stage: &str, duration_ms: u64) {
    log::info!("[stage:{}] completed in {}ms", stage, duration_ms);
}
