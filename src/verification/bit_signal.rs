use std::fmt::{Display, Formatter};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A fixed-width bit vector, least significant bit first.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BitSignal {
    bits: Vec<bool>,
}

impl BitSignal {
    /// Takes the `width` low-order bits of `value`.
    ///
    /// Bits above position 63 are zero.
    pub fn from_u64(value: u64, width: usize) -> Self {
        let bits = (0..width)
            .map(|i| i < 64 && (value >> i) & 1 == 1)
            .collect();
        Self { bits }
    }

    #[inline]
    pub fn zeros(width: usize) -> Self {
        Self {
            bits: vec![false; width],
        }
    }

    #[inline]
    pub fn ones(width: usize) -> Self {
        Self {
            bits: vec![true; width],
        }
    }

    /// Draws every bit independently, which is uniform over `[0, 2^width)`.
    pub fn random<R: Rng + ?Sized>(width: usize, rng: &mut R) -> Self {
        Self {
            bits: (0..width).map(|_| rng.gen::<bool>()).collect(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    pub fn bit(&self, i: usize) -> bool {
        self.bits[i]
    }

    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        self.bits.iter().copied()
    }

    /// Maps each bit to its rail voltage: `vdd` for 1, ground for 0.
    pub fn rail_voltages(&self, vdd: f64) -> Vec<f64> {
        self.bits().map(|bit| rail(bit, vdd)).collect()
    }
}

#[inline]
pub fn rail(bit: bool, vdd: f64) -> f64 {
    if bit {
        vdd
    } else {
        0f64
    }
}

impl Display for BitSignal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.bits.is_empty() {
            return write!(f, "<empty>");
        }
        for bit in self.bits.iter().rev() {
            write!(f, "{}", if *bit { '1' } else { '0' })?;
        }
        Ok(())
    }
}
