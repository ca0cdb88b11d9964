//! Single-flight admission for preview and ingest requests.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Admits at most one guarded operation at a time.
///
/// [`try_acquire`](Self::try_acquire) hands out a [`FlightPermit`]; the guard
/// stays busy until that permit is dropped, on whichever path the operation
/// ends. A second acquisition while busy is refused, not queued.
#[derive(Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the guard busy, or return `None` if it already is.
    pub fn try_acquire(&self) -> Option<FlightPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl fmt::Debug for SingleFlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleFlight")
            .field("busy", &self.is_busy())
            .finish()
    }
}

/// Proof of admission. Releases the guard when dropped.
#[must_use = "dropping the permit releases the guard immediately"]
pub struct FlightPermit {
    busy: Arc<AtomicBool>,
}

impl FlightPermit {
    /// Release the guard now.
    pub fn release(self) {}
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl fmt::Debug for FlightPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FlightPermit")
    }
}
