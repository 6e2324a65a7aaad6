//! Stdout suppression for chatty LP solver libraries.
//!
//! The `gag` crate allows only one redirection per output stream per process,
//! so concurrent solves share a single Gag through a process-wide manager.

use gag::Gag;
use std::sync::{Arc, Mutex, Weak};

/// A shared handle to the process-wide stdout gag. The redirection stays in
/// effect until every handle is dropped.
pub struct GagHandle {
    _gag: Arc<Gag>,
}

impl GagHandle {
    /// Acquire a handle that silences stdout. Handles taken from multiple
    /// threads share the same underlying Gag instance.
    pub fn stdout() -> Result<Self, std::io::Error> {
        STDOUT_GAG_MANAGER.get_gag()
    }
}

struct GagManager {
    weak_gag: Mutex<Weak<Gag>>,
}

impl GagManager {
    const fn new() -> Self {
        Self {
            weak_gag: Mutex::new(Weak::new()),
        }
    }

    fn get_gag(&self) -> Result<GagHandle, std::io::Error> {
        let mut weak_gag_guard = self.weak_gag.lock().unwrap();

        if let Some(gag) = weak_gag_guard.upgrade() {
            return Ok(GagHandle { _gag: gag });
        }

        let gag = match Gag::stdout() {
            Ok(gag) => gag,
            Err(e) => {
                // Another thread may have won the race to create the gag
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    if let Some(existing_gag) = weak_gag_guard.upgrade() {
                        return Ok(GagHandle { _gag: existing_gag });
                    }
                }
                return Err(e);
            }
        };

        let gag_arc = Arc::new(gag);
        *weak_gag_guard = Arc::downgrade(&gag_arc);

        Ok(GagHandle { _gag: gag_arc })
    }
}

static STDOUT_GAG_MANAGER: GagManager = GagManager::new();

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_handles_share_one_gag() {
        let handle1 = match GagHandle::stdout() {
            Ok(handle) => handle,
            Err(_) => {
                // Gag already consumed by an earlier test in this process
                return;
            }
        };
        let handle2 = GagHandle::stdout().expect("should reuse stdout gag");

        assert_eq!(StdArc::as_ptr(&handle1._gag), StdArc::as_ptr(&handle2._gag));

        let initial_count = StdArc::strong_count(&handle1._gag);
        assert!(initial_count >= 2);

        drop(handle1);
        assert_eq!(StdArc::strong_count(&handle2._gag), initial_count - 1);
    }

    #[test]
    fn test_concurrent_acquisition_does_not_panic() {
        const NUM_THREADS: usize = 3;
        let barrier = StdArc::new(Barrier::new(NUM_THREADS));
        let mut handles = Vec::new();

        for _ in 0..NUM_THREADS {
            let barrier_clone = StdArc::clone(&barrier);
            let handle = thread::spawn(move || {
                barrier_clone.wait();
                let _ = GagHandle::stdout();
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().expect("thread should not panic");
        }
    }
}
