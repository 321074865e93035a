//! Error definitions for the drift subsystem

use thiserror::Error;

/// Errors raised inside the drift controller
///
/// None of these reach the page. Callers log them and fall back to a no-op.
#[derive(Debug, Error)]
pub enum DriftError {
    /// Duration was zero, negative, NaN or infinite
    #[error("Invalid drift duration: {0}")]
    InvalidDuration(f64),

    /// Container or track missing at mount time
    #[error("Missing banner element: {0}")]
    MissingElement(&'static str),

    /// Communication with the banner task failed
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// The banner task terminated abnormally
    #[error("Task error: {0}")]
    TaskError(String),
}
