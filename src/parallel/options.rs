//! Dispatch policy deciding between parallel and sequential processing.

use crate::image::ImageSize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Area above which the default trigger selects parallel processing.
pub const DEFAULT_PARALLEL_AREA: usize = 100 * 100;

static FORCE_SEQUENTIAL: AtomicBool = AtomicBool::new(cfg!(debug_assertions));

/// Returns the process-wide default for [`ParallelOptions::force_sequential`].
pub fn force_sequential_default() -> bool {
    FORCE_SEQUENTIAL.load(Ordering::Relaxed)
}

/// Changes the process-wide default for [`ParallelOptions::force_sequential`].
///
/// Only options created after the call observe the new value.
pub fn set_force_sequential_default(value: bool) {
    FORCE_SEQUENTIAL.store(value, Ordering::Relaxed);
}

/// Predicate deciding whether a region is large enough for parallel work.
pub type ParallelTrigger = Arc<dyn Fn(ImageSize) -> bool + Send + Sync>;

/// Per-call dispatch policy for [`ParallelProcessor`](crate::ParallelProcessor).
#[derive(Clone)]
pub struct ParallelOptions {
    /// Disables parallel dispatch regardless of the trigger.
    pub force_sequential: bool,
    /// Returns true when a region should be split into patches.
    pub parallel_trigger: ParallelTrigger,
}

impl ParallelOptions {
    /// Options that always process sequentially.
    pub fn sequential() -> Self {
        Self {
            force_sequential: true,
            ..Self::default()
        }
    }

    /// Options that always split into patches.
    pub fn parallel() -> Self {
        Self {
            force_sequential: false,
            parallel_trigger: Arc::new(|_| true),
        }
    }

    /// Replaces the trigger predicate.
    pub fn with_trigger<F>(mut self, trigger: F) -> Self
    where
        F: Fn(ImageSize) -> bool + Send + Sync + 'static,
    {
        self.parallel_trigger = Arc::new(trigger);
        self
    }

    pub fn with_force_sequential(mut self, force_sequential: bool) -> Self {
        self.force_sequential = force_sequential;
        self
    }

    /// Returns true if a region of the given size is processed in patches.
    pub fn should_process_parallel(&self, size: ImageSize) -> bool {
        !self.force_sequential && (self.parallel_trigger)(size)
    }
}

impl Default for ParallelOptions {
    fn default() -> Self {
        Self {
            force_sequential: force_sequential_default(),
            parallel_trigger: Arc::new(|size: ImageSize| size.area() > DEFAULT_PARALLEL_AREA),
        }
    }
}

impl fmt::Debug for ParallelOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelOptions")
            .field("force_sequential", &self.force_sequential)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::ParallelOptions;
    use crate::image::ImageSize;

    #[test]
    fn default_trigger_uses_area() {
        let options = ParallelOptions::default().with_force_sequential(false);
        assert!(!options.should_process_parallel(ImageSize::new(100, 100)));
        assert!(options.should_process_parallel(ImageSize::new(101, 100)));
    }

    #[test]
    fn force_sequential_overrides_trigger() {
        let options = ParallelOptions::parallel().with_force_sequential(true);
        assert!(!options.should_process_parallel(ImageSize::new(4000, 4000)));
        assert!(ParallelOptions::parallel().should_process_parallel(ImageSize::new(1, 1)));
    }

    #[test]
    fn custom_trigger_is_used() {
        let options = ParallelOptions::parallel().with_trigger(|size| size.width > 10);
        assert!(!options.should_process_parallel(ImageSize::new(10, 1000)));
        assert!(options.should_process_parallel(ImageSize::new(11, 1)));
    }
}
