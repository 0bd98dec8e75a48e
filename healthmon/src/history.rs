//! Bounded history of cpu/mem samples for charts.

use std::collections::VecDeque;

use crate::types::Sample;

/// Number of samples kept per session.
pub const HISTORY_CAP: usize = 180;

pub fn push_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    if dq.len() == cap {
        dq.pop_front();
    }
    dq.push_back(v);
}

// Fresh per transport session; samples from another host never carry over.
#[derive(Debug)]
pub struct HistoryBuffer {
    samples: VecDeque<Sample>,
    cap: usize,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAP)
    }

    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            samples: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn append(&mut self, sample: Sample) {
        push_capped(&mut self.samples, sample, self.cap);
    }

    /// Oldest first. The copy is the caller's; the buffer itself is untouched.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}
