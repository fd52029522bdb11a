//! Single-slot in-flight guards
//!
//! While a guard is held, further attempts to acquire the same slot fail
//! instead of queueing.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// One slot for an outstanding external call of a given kind
#[derive(Debug)]
pub struct InFlight {
    name: &'static str,
    busy: AtomicBool,
}

impl InFlight {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            busy: AtomicBool::new(false),
        }
    }

    /// Claim the slot; `None` when a call is already outstanding
    pub fn try_acquire(&self) -> Option<InFlightGuard<'_>> {
        match self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Some(InFlightGuard { slot: self }),
            Err(_) => {
                debug!(name = self.name, "InFlight::try_acquire: already in flight, dropping trigger");
                None
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases its slot on drop
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    slot: &'a InFlight,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.slot.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let slot = InFlight::new("translate");
        let guard = slot.try_acquire().unwrap();
        assert!(slot.is_busy());
        assert!(slot.try_acquire().is_none());

        drop(guard);
        assert!(!slot.is_busy());
        assert!(slot.try_acquire().is_some());
    }

    #[test]
    fn test_slots_are_independent() {
        let translate = InFlight::new("translate");
        let upload = InFlight::new("upload");
        let _t = translate.try_acquire().unwrap();
        assert!(upload.try_acquire().is_some());
    }
}
