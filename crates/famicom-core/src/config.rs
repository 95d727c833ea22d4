//! Machine configuration

/// CPU instructions run per rendered frame. Stands in for the time until vertical blank.
pub const DEFAULT_STEPS_PER_FRAME: u32 = 10_000;

/// Runtime options for [`crate::system::NesSystem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemConfig {
    /// Instructions executed before vertical blank is raised
    pub steps_per_frame: u32,
    /// Log every executed instruction at trace level
    pub trace: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            steps_per_frame: DEFAULT_STEPS_PER_FRAME,
            trace: false,
        }
    }
}
