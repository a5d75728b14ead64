// ─── Progress ───
// Callback surface for long-running install work.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

/// Receives status and progress updates. Every method defaults to a no-op so
/// callers only implement what they display.
pub trait ProgressReporter: Send + Sync {
    fn set_status(&self, _status: &str) {}
    fn set_progress(&self, _value: u64) {}
    fn set_max(&self, _value: u64) {}
}

/// Discards all updates.
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// Passes status lines through and drops byte counts. Single-file downloads
/// inside a larger install use it so their sizes do not overwrite the
/// install's own counters.
pub struct StatusOnly<'a>(pub &'a dyn ProgressReporter);

impl ProgressReporter for StatusOnly<'_> {
    fn set_status(&self, status: &str) {
        self.0.set_status(status);
    }
}

/// Forwards status lines to `tracing` and logs progress at debug level.
#[derive(Default)]
pub struct TracingProgress {
    max: AtomicU64,
}

impl ProgressReporter for TracingProgress {
    fn set_status(&self, status: &str) {
        info!("{}", status);
    }

    fn set_progress(&self, value: u64) {
        let max = self.max.load(Ordering::Relaxed);
        if max > 0 {
            debug!("Progress {}/{}", value, max);
        }
    }

    fn set_max(&self, value: u64) {
        self.max.store(value, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        statuses: Mutex<Vec<String>>,
        values: Mutex<Vec<u64>>,
    }

    impl ProgressReporter for Recorder {
        fn set_status(&self, status: &str) {
            self.statuses.lock().unwrap().push(status.to_string());
        }

        fn set_progress(&self, value: u64) {
            self.values.lock().unwrap().push(value);
        }

        fn set_max(&self, value: u64) {
            self.values.lock().unwrap().push(value);
        }
    }

    #[test]
    fn status_only_drops_counts() {
        let recorder = Recorder::default();
        let wrapped = StatusOnly(&recorder);
        wrapped.set_status("Downloading client.jar");
        wrapped.set_max(25_000_000);
        wrapped.set_progress(4096);

        assert_eq!(*recorder.statuses.lock().unwrap(), vec!["Downloading client.jar"]);
        assert!(recorder.values.lock().unwrap().is_empty());
    }
}
