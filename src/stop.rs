use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation. The first request lets the current file finish
/// and stops before the next one; a second request aborts the running
/// encode.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    stop: Arc<AtomicBool>,
    abort: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        StopSignal::default()
    }

    /// Hooks SIGINT and SIGTERM up to this signal.
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;
        use tracing::warn;

        let signal = StopSignal::new();
        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let handle = signal.clone();
        std::thread::spawn(move || {
            for sig in signals.forever() {
                if handle.request_stop() {
                    warn!(signal = sig, "stopping after the current file; repeat to abort it");
                } else {
                    handle.request_abort();
                    warn!(signal = sig, "aborting the current file");
                }
            }
        });
        Ok(signal)
    }

    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        let signal = StopSignal::new();
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&signal.stop))?;
        Ok(signal)
    }

    /// Returns true if this is the first request.
    pub fn request_stop(&self) -> bool {
        !self.stop.swap(true, Ordering::SeqCst)
    }

    pub fn request_abort(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.abort.store(true, Ordering::SeqCst);
    }

    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn should_abort(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_only_stops() {
        let signal = StopSignal::new();
        assert!(!signal.should_stop());
        assert!(signal.request_stop());
        assert!(signal.should_stop());
        assert!(!signal.should_abort());
        assert!(!signal.request_stop());
    }

    #[test]
    fn test_clones_share_state() {
        let signal = StopSignal::new();
        let other = signal.clone();
        other.request_abort();
        assert!(signal.should_stop());
        assert!(signal.should_abort());
    }
}
