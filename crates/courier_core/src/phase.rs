/// Lifecycle of a run: `Init -> Revealing -> Iterating -> Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Init,
    Revealing,
    Iterating,
    Done,
}

impl RunPhase {
    /// Next phase, or `None` once the run is done. There is no way back.
    pub fn advance(self) -> Option<RunPhase> {
        match self {
            RunPhase::Init => Some(RunPhase::Revealing),
            RunPhase::Revealing => Some(RunPhase::Iterating),
            RunPhase::Iterating => Some(RunPhase::Done),
            RunPhase::Done => None,
        }
    }
}
