//! Progress reporting for long renders.  The scheduler owns the
//! atomic completed-count and calls into an injected reporter, so
//! there is no process-wide counter or stream singleton; tests and
//! `--silent` runs swap in the no-op implementation.

use std::io;
use std::io::Write;
use std::sync::Mutex;

/// Receives one callback per completed band.
pub trait Progress: Send + Sync {
    /// `completed` bands out of `total` have been computed and
    /// persisted.
    fn report(&self, completed: usize, total: usize);
}

/// Writes a progress line per band to standard error.  The mutex
/// only serializes the write itself; band computation never waits on
/// it.
pub struct ConsoleProgress {
    out: Mutex<io::Stderr>,
}

impl ConsoleProgress {
    /// A reporter writing to this process's standard error.
    pub fn new() -> ConsoleProgress {
        ConsoleProgress {
            out: Mutex::new(io::stderr()),
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> ConsoleProgress {
        ConsoleProgress::new()
    }
}

impl Progress for ConsoleProgress {
    fn report(&self, completed: usize, total: usize) {
        let mut out = self.out.lock().unwrap();
        // a failed progress write is not worth failing a band over
        let _ = writeln!(out, "chunk {}/{} done", completed, total);
    }
}

/// Discards every report.
pub struct SilentProgress;

impl Progress for SilentProgress {
    fn report(&self, _completed: usize, _total: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Recording(AtomicUsize);

    impl Progress for Recording {
        fn report(&self, _completed: usize, _total: usize) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn reporters_are_shareable_across_threads() {
        let recorder = Arc::new(Recording(AtomicUsize::new(0)));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let recorder = Arc::clone(&recorder);
                ::std::thread::spawn(move || recorder.report(i, 4))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(recorder.0.load(Ordering::SeqCst), 4);
    }
}
