/// Aggregated view of run progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationProgress {
    pub total: u64,
    pub recorded: u64,
    pub remaining: u64,
    pub is_complete: bool,
}
