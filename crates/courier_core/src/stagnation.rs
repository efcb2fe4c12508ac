/// What the disclosure loop should do after observing a new entry count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Trigger another disclosure.
    Continue,
    /// The count stayed flat for the whole stagnation window.
    Settled,
    /// The iteration cap was hit before the listing settled.
    CapReached,
}

/// Pure bookkeeping for progressive disclosure.
///
/// `observe` is called once per disclosure with the entry count seen after it.
/// The stagnation counter resets whenever the count grows and the loop stops
/// once it reaches `threshold`, or after `max_iterations` disclosures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagnationTracker {
    threshold: u32,
    max_iterations: u32,
    last_count: usize,
    stagnant: u32,
    iterations: u32,
}

impl StagnationTracker {
    pub fn new(threshold: u32, max_iterations: u32, initial_count: usize) -> Self {
        Self {
            threshold: threshold.max(1),
            max_iterations,
            last_count: initial_count,
            stagnant: 0,
            iterations: 0,
        }
    }

    /// Whether another disclosure may be triggered at all.
    pub fn can_disclose(&self) -> bool {
        self.iterations < self.max_iterations
    }

    pub fn observe(&mut self, count: usize) -> Step {
        self.iterations += 1;
        if count > self.last_count {
            self.last_count = count;
            self.stagnant = 0;
        } else {
            self.stagnant += 1;
        }

        if self.stagnant >= self.threshold {
            Step::Settled
        } else if !self.can_disclose() {
            Step::CapReached
        } else {
            Step::Continue
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn last_count(&self) -> usize {
        self.last_count
    }
}
