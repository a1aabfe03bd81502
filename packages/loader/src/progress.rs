//! Progress reporting trait for the loaders.
//!
//! Defines a [`ProgressCallback`] trait that decouples row-count reporting
//! from any specific rendering backend (e.g., `indicatif` progress bars in
//! the CLI, or silence in tests).

use std::sync::Arc;

/// Trait for reporting progress while a data file is read.
///
/// Implementations must be `Send + Sync` so they can be shared behind an
/// [`Arc`].
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work (enables percentage/ETA).
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// A no-op implementation of [`ProgressCallback`].
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`] instance for convenient use.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
