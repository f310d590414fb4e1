use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::Context;
use approx::abs_diff_eq;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{anyhow, bail};

use super::dut::SramPorts;
use super::ledger::ExpectationLedger;

/// Default absolute tolerance, in volts, when comparing outputs.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// Transient samples captured from a simulation run.
///
/// All signals share the `time` axis, which must be sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapturedData {
    pub time: Vec<f64>,
    pub signals: HashMap<String, Vec<f64>>,
}

impl CapturedData {
    pub fn from_reader<R: Read>(r: R) -> crate::Result<Self> {
        let data: Self = serde_json::from_reader(r)?;
        data.validate()?;
        Ok(data)
    }

    /// Checks that the time axis is finite and sorted and that every signal covers it.
    pub fn validate(&self) -> crate::Result<()> {
        if let Some(t) = self.time.iter().find(|t| !t.is_finite()) {
            bail!("captured time axis contains a non-finite value ({t})");
        }
        if self.time.windows(2).any(|w| w[1] < w[0]) {
            bail!("captured time axis is not sorted");
        }
        for (name, samples) in self.signals.iter() {
            if samples.len() != self.time.len() {
                bail!(
                    "signal {} has {} samples, but the time axis has {}",
                    name,
                    samples.len(),
                    self.time.len()
                );
            }
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open captured data {path:?}"))?;
        Self::from_reader(BufReader::new(file))
    }
}

/// Linearly interpolates `(time, x)` at `t`.
///
/// Returns `None` if `t` lies outside the sampled range.
pub fn interpolate(time: &[f64], x: &[f64], t: f64) -> Option<f64> {
    let n = time.len().min(x.len());
    if n == 0 || t < time[0] || t > time[n - 1] {
        return None;
    }
    // Index of the first sample at or after `t`.
    let hi = time[..n].partition_point(|&s| s < t);
    if time[hi] == t || hi == 0 {
        return Some(x[hi]);
    }
    let lo = hi - 1;
    let (t0, t1) = (time[lo], time[hi]);
    let frac = (t - t0) / (t1 - t0);
    Some(x[lo] + frac * (x[hi] - x[lo]))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub time: f64,
    pub signal: String,
    pub expected: f64,
    /// `None` if the signal was not sampled at `time`.
    pub measured: Option<f64>,
}

impl Display for Mismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.measured {
            Some(x) => write!(
                f,
                "{} at t = {}: expected {}, got {}",
                self.signal, self.time, self.expected, x
            ),
            None => write!(
                f,
                "{} at t = {}: expected {}, but time is out of simulation range",
                self.signal, self.time, self.expected
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckReport {
    /// Number of (entry, bit) pairs compared.
    pub checked: usize,
    pub mismatches: Vec<Mismatch>,
}

impl CheckReport {
    #[inline]
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Compares every ledger entry against the captured outputs.
///
/// Mismatches do not stop the check; all of them are collected into the report.
pub fn verify_outputs(
    ledger: &ExpectationLedger,
    data: &CapturedData,
    ports: &SramPorts,
    tolerance: f64,
) -> crate::Result<CheckReport> {
    data.validate()?;
    let mut report = CheckReport::default();
    let width = ledger.iter().map(|e| e.values.len()).max().unwrap_or(0);

    let mut outputs = Vec::with_capacity(width);
    for i in 0..width {
        let name = ports.dout_bit(i);
        let samples = data
            .signals
            .get(&name)
            .ok_or_else(|| anyhow!("Unable to find signal {}", &name))?;
        outputs.push((name, samples));
    }

    for entry in ledger.iter() {
        for (expected, (name, samples)) in entry.values.iter().zip(outputs.iter()) {
            report.checked += 1;
            let measured = interpolate(&data.time, samples, entry.time);
            let ok = measured
                .map(|x| abs_diff_eq!(x, *expected, epsilon = tolerance))
                .unwrap_or(false);
            if !ok {
                let mismatch = Mismatch {
                    time: entry.time,
                    signal: name.clone(),
                    expected: *expected,
                    measured,
                };
                warn!("{mismatch}");
                report.mismatches.push(mismatch);
            }
        }
    }

    info!(
        "checked {} output samples, {} mismatches",
        report.checked,
        report.mismatches.len()
    );
    Ok(report)
}
