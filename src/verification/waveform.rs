use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StimulusError};

/// A named piecewise-linear voltage source driving a single node.
///
/// Every level change is preceded by a ramp of length `transition`,
/// so the rendered waveform never contains an instantaneous step.
#[derive(Debug, Clone, PartialEq)]
pub struct PwlSource {
    name: ArcStr,
    node: ArcStr,
    transition: f64,
    /// List of `(t, x)` pairs.
    values: Vec<(f64, f64)>,
}

/// Simulator-independent description of a rendered source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: ArcStr,
    pub node: ArcStr,
    /// DC level, equal to the value at `t = 0`.
    pub dc: f64,
    pub samples: Vec<(f64, f64)>,
}

impl PwlSource {
    pub fn with_initial_value(
        name: impl Into<ArcStr>,
        node: impl Into<ArcStr>,
        x: f64,
        transition: f64,
    ) -> Self {
        Self {
            name: name.into(),
            node: node.into(),
            transition,
            values: vec![(0f64, x)],
        }
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn node(&self) -> &ArcStr {
        &self.node
    }

    /// Control points recorded so far, excluding the terminal point added by [`render`].
    ///
    /// [`render`]: PwlSource::render
    #[inline]
    pub fn points(&self) -> &[(f64, f64)] {
        &self.values
    }

    pub fn last(&self) -> (f64, f64) {
        // Constructors always seed the initial point.
        self.values[self.values.len() - 1]
    }

    #[inline]
    pub fn last_t(&self) -> f64 {
        self.last().0
    }

    #[inline]
    pub fn last_x(&self) -> f64 {
        self.last().1
    }

    /// Drives the source to `x`, reaching it exactly at time `t`.
    ///
    /// The ramp starts at `t - transition`, which must not precede the last point.
    pub fn set(&mut self, x: f64, t: f64) -> Result<()> {
        let (last_t, last_x) = self.last();
        let t_start = t - self.transition;
        if !t.is_finite() || t_start < last_t {
            return Err(StimulusError::TimingViolation {
                source_name: self.name.to_string(),
                at: t,
                last: last_t,
                transition: self.transition,
            });
        }
        self.values.push((t_start, last_x));
        self.values.push((t, x));
        Ok(())
    }

    /// Returns all control points plus a terminal point at `end` holding the last value.
    pub fn render(&self, end: f64) -> Result<Vec<(f64, f64)>> {
        let (last_t, last_x) = self.last();
        if !end.is_finite() || end < last_t {
            return Err(StimulusError::RenderBeforeLastPoint {
                source_name: self.name.to_string(),
                end,
                last: last_t,
            });
        }
        let mut samples = Vec::with_capacity(self.values.len() + 1);
        samples.extend_from_slice(&self.values);
        samples.push((end, last_x));
        Ok(samples)
    }

    pub fn to_source_spec(&self, end: f64) -> Result<SourceSpec> {
        Ok(SourceSpec {
            name: self.name.clone(),
            node: self.node.clone(),
            dc: self.values[0].1,
            samples: self.render(end)?,
        })
    }
}
