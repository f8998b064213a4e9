//! Test helper utilities for springsim tests

use crate::protocol::{RunEvent, RunId, Sample};
use crate::sink::Sink;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Check if two floating point values are approximately equal within tolerance
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/// Sink that records every event in delivery order
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples belonging to `run`, in delivery order
    pub fn samples_of(&self, run: RunId) -> Vec<Sample> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RunEvent::Sample(sample) if sample.run == run => Some(sample),
                _ => None,
            })
            .collect()
    }
}

impl Sink for RecordingSink {
    fn deliver(&self, event: &RunEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*event);
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
