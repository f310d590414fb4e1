use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StimulusError};

/// Expected output rail voltages, one per data bit, at a sample time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    pub time: f64,
    pub values: Vec<f64>,
}

/// Time-ordered list of expected outputs recorded while building a program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpectationLedger {
    entries: Vec<Expectation>,
}

impl ExpectationLedger {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. Timestamps must be non-decreasing.
    pub fn push(&mut self, time: f64, values: Vec<f64>) -> Result<()> {
        if let Some(last) = self.entries.last() {
            if time < last.time {
                return Err(StimulusError::NonMonotonicExpectation {
                    at: time,
                    last: last.time,
                });
            }
        }
        self.entries.push(Expectation { time, values });
        Ok(())
    }

    #[inline]
    pub fn entries(&self) -> &[Expectation] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expectation> {
        self.entries.iter()
    }

    pub fn to_writer<W: Write>(&self, w: W) -> crate::Result<()> {
        serde_json::to_writer_pretty(w, self)?;
        Ok(())
    }

    pub fn from_reader<R: Read>(r: R) -> crate::Result<Self> {
        let ledger: Self = serde_json::from_reader(r)?;
        if let Some(pair) = ledger.entries.windows(2).find(|w| w[1].time < w[0].time) {
            return Err(StimulusError::NonMonotonicExpectation {
                at: pair[1].time,
                last: pair[0].time,
            }
            .into());
        }
        Ok(ledger)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create expectation file {path:?}"))?;
        let mut w = BufWriter::new(file);
        self.to_writer(&mut w)?;
        w.flush()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open expectation file {path:?}"))?;
        Self::from_reader(BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExpectationLedger {
        let mut ledger = ExpectationLedger::new();
        ledger.push(1.06e-7, vec![3.3, 0.0]).unwrap();
        ledger.push(1.16e-7, vec![0.0, 0.0]).unwrap();
        ledger.push(0.1 + 0.2, vec![3.3 / 3.0, 3.3]).unwrap();
        ledger
    }

    #[test]
    fn rejects_out_of_order_entries() {
        let mut ledger = sample();
        let err = ledger.push(1e-9, vec![0.0, 0.0]).unwrap_err();
        assert!(matches!(err, StimulusError::NonMonotonicExpectation { .. }));
        assert_eq!(ledger.len(), 3);
        // Equal timestamps are allowed.
        ledger.push(0.1 + 0.2, vec![0.0, 0.0]).unwrap();
    }

    #[test]
    fn round_trips_through_file() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("expect.json");
        let ledger = sample();
        ledger.save(&path)?;
        let loaded = ExpectationLedger::load(&path)?;
        assert_eq!(loaded, ledger);
        assert_eq!(
            loaded.entries()[2].time.to_bits(),
            ledger.entries()[2].time.to_bits()
        );
        Ok(())
    }

    #[test]
    fn rejects_unsorted_file() {
        let json = r#"[{"time": 2.0, "values": [0.0]}, {"time": 1.0, "values": [0.0]}]"#;
        assert!(ExpectationLedger::from_reader(json.as_bytes()).is_err());
    }
}
