use crate::error::{Result, StimulusError};

/// Simulated time in seconds. Starts at zero and never decreases.
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeCursor {
    t: f64,
}

impl TimeCursor {
    #[inline]
    pub fn new() -> Self {
        Self { t: 0f64 }
    }

    #[inline]
    pub fn now(&self) -> f64 {
        self.t
    }

    pub fn advance(&mut self, dt: f64) -> Result<()> {
        if !dt.is_finite() || dt < 0f64 {
            return Err(StimulusError::NegativeDelay(dt));
        }
        self.t += dt;
        Ok(())
    }
}
