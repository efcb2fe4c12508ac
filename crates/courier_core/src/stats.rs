use std::fmt;

/// Terminal state of one processed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Uploaded,
    Failed,
}

/// Counters for one run. At the end of a run `processed == uploaded + failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    pub processed: u64,
    pub uploaded: u64,
    pub failed: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes a finished item in one step.
    pub fn record(&mut self, outcome: ItemOutcome) {
        self.processed += 1;
        match outcome {
            ItemOutcome::Uploaded => self.uploaded += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.processed == self.uploaded + self.failed
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} uploaded={} failed={}",
            self.processed, self.uploaded, self.failed
        )
    }
}
