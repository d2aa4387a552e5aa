//! Admission control: the live connection count and its ceiling.
//!
//! The count and the ceiling sit behind one lock so that "check and
//! increment" is atomic and the count can never pass the ceiling, even while
//! the ceiling is being lowered.

use parking_lot::Mutex;

#[derive(Debug)]
struct Slots {
    live: usize,
    ceiling: usize,
}

/// Counts admitted connections against a configurable ceiling.
#[derive(Debug)]
pub struct AdmissionController {
    slots: Mutex<Slots>,
}

impl AdmissionController {
    pub fn new(ceiling: usize) -> Self {
        Self {
            slots: Mutex::new(Slots { live: 0, ceiling }),
        }
    }

    /// Take a slot if one is free.
    pub fn try_admit(&self) -> bool {
        let mut slots = self.slots.lock();
        if slots.live >= slots.ceiling {
            return false;
        }
        slots.live += 1;
        true
    }

    /// Give a slot back. Returns the new count.
    pub fn release(&self) -> usize {
        let mut slots = self.slots.lock();
        match slots.live.checked_sub(1) {
            Some(live) => slots.live = live,
            None => tracing::warn!("Admission released with no live connections"),
        }
        slots.live
    }

    /// Number of currently admitted connections.
    pub fn count(&self) -> usize {
        self.slots.lock().live
    }

    pub fn ceiling(&self) -> usize {
        self.slots.lock().ceiling
    }

    /// Change the ceiling. Existing connections are kept even if the count is
    /// now above it; new ones are refused until enough have left.
    pub fn set_ceiling(&self, ceiling: usize) {
        let mut slots = self.slots.lock();
        if slots.ceiling != ceiling {
            tracing::info!(from = slots.ceiling, to = ceiling, "Admission ceiling changed");
            slots.ceiling = ceiling;
        }
    }
}
