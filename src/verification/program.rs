use std::fmt::{Display, Formatter};

use arcstr::ArcStr;
use derive_builder::Builder;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clog2;
use crate::error::{Result, StimulusError};

use super::bit_signal::BitSignal;
use super::dut::{PortBinding, PortKind, SramPorts};
use super::ledger::ExpectationLedger;
use super::ops::{OpSequencer, TbSources, SETUP_FRACTION};
use super::waveform::SourceSpec;

/// Default ramp time applied before every level change, in seconds.
pub const DEFAULT_TRANSITION_TIME: f64 = 1e-12;
/// Default length of each power-up settle window, in clock periods.
pub const DEFAULT_SETTLE_CYCLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(derive(Debug))]
pub struct TbParams {
    /// Name of the SRAM subcircuit.
    #[builder(setter(into))]
    pub dut_name: ArcStr,
    pub num_words: usize,
    /// Data width in bits.
    pub word_size: usize,
    /// Supply voltage.
    pub vdd: f64,
    /// Clock period in seconds.
    pub clk_period: f64,
    /// Rise and fall time of every driven input.
    #[builder(default = "DEFAULT_TRANSITION_TIME")]
    pub transition_time: f64,
    /// Length of each power-up settle window, in clock periods.
    #[builder(default = "DEFAULT_SETTLE_CYCLES")]
    pub settle_cycles: usize,
    #[builder(default)]
    pub sequence: TestSequence,
    #[builder(default)]
    pub ports: SramPorts,
}

impl TbParams {
    #[inline]
    pub fn builder() -> TbParamsBuilder {
        TbParamsBuilder::default()
    }

    #[inline]
    pub fn addr_width(&self) -> usize {
        clog2(self.num_words)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(StimulusError::InvalidConfig(msg)) };
        let positive = |x: f64| x.is_finite() && x > 0f64;

        if self.num_words == 0 {
            return invalid("number of words must be positive".to_string());
        }
        if self.word_size == 0 {
            return invalid("word size must be positive".to_string());
        }
        if self.addr_width() > 64 {
            return invalid(format!("too many words ({})", self.num_words));
        }
        if !positive(self.vdd) {
            return invalid(format!("supply voltage must be positive, got {}", self.vdd));
        }
        if !positive(self.clk_period) {
            return invalid(format!(
                "clock period must be positive, got {}",
                self.clk_period
            ));
        }
        if !positive(self.transition_time) {
            return invalid(format!(
                "transition time must be positive, got {}",
                self.transition_time
            ));
        }
        if self.transition_time >= SETUP_FRACTION * self.clk_period {
            return invalid(format!(
                "transition time {} must be shorter than the setup window ({} of the clock period)",
                self.transition_time, SETUP_FRACTION
            ));
        }
        if self.settle_cycles == 0 {
            return invalid("settle window must be at least one clock period".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Op {
    Write { addr: u64, data: BitSignal },
    Read { addr: u64, expected: BitSignal },
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestSequence {
    /// Random data, written and read back in independently shuffled address orders.
    #[default]
    Random,
    /// March C- over the whole address space.
    MarchCm,
}

impl TestSequence {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestSequence::Random => "random",
            TestSequence::MarchCm => "march_cm",
        }
    }

    pub fn ops<R: Rng + ?Sized>(&self, params: &TbParams, rng: &mut R) -> Vec<Op> {
        match self {
            TestSequence::Random => random_test(params.num_words, params.word_size, rng),
            TestSequence::MarchCm => march_cm_test(params.num_words, params.word_size),
        }
    }
}

impl Display for TestSequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns a new random permutation of `items`.
pub fn shuffled<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    out.shuffle(rng);
    out
}

pub fn random_test<R: Rng + ?Sized>(num_words: usize, word_size: usize, rng: &mut R) -> Vec<Op> {
    let stim = (0..num_words as u64)
        .map(|addr| (addr, BitSignal::random(word_size, rng)))
        .collect::<Vec<_>>();

    let writes = shuffled(&stim, rng)
        .into_iter()
        .map(|(addr, data)| Op::Write { addr, data });
    let reads = shuffled(&stim, rng)
        .into_iter()
        .map(|(addr, expected)| Op::Read { addr, expected });

    writes.chain(reads).collect()
}

pub fn march_cm_test(num_words: usize, word_size: usize) -> Vec<Op> {
    let n = num_words as u64;
    let zeros = BitSignal::zeros(word_size);
    let ones = BitSignal::ones(word_size);
    let read_write = |addr: u64, read: &BitSignal, write: &BitSignal| {
        [
            Op::Read {
                addr,
                expected: read.clone(),
            },
            Op::Write {
                addr,
                data: write.clone(),
            },
        ]
    };

    (0..n)
        .map(|addr| Op::Write {
            addr,
            data: zeros.clone(),
        })
        .chain((0..n).flat_map(|addr| read_write(addr, &zeros, &ones)))
        .chain((0..n).flat_map(|addr| read_write(addr, &ones, &zeros)))
        .chain((0..n).rev().flat_map(|addr| read_write(addr, &zeros, &ones)))
        .chain((0..n).rev().flat_map(|addr| read_write(addr, &ones, &zeros)))
        .chain((0..n).rev().map(|addr| Op::Read {
            addr,
            expected: zeros.clone(),
        }))
        .collect()
}

/// Checks that every read expects the last value written to its address.
#[cfg(test)]
pub(crate) fn expectations_consistent(ops: &[Op]) -> bool {
    let mut state = std::collections::HashMap::new();
    for op in ops {
        match op {
            Op::Write { addr, data } => {
                state.insert(*addr, data);
            }
            Op::Read { addr, expected } => {
                if state.get(addr) != Some(&expected) {
                    return false;
                }
            }
        }
    }
    true
}

/// A complete testbench: sources, connections, and stop time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusProgram {
    pub dut_name: ArcStr,
    pub ports: Vec<PortBinding>,
    pub sources: Vec<SourceSpec>,
    pub end_time: f64,
    /// Supply voltage, the rail for logical 1.
    pub vdd: f64,
}

impl StimulusProgram {
    /// Ports observed by the simulator, in port order.
    pub fn outputs(&self) -> impl Iterator<Item = &PortBinding> {
        self.ports
            .iter()
            .filter(|port| matches!(port.kind, PortKind::Output))
    }

    /// Nets driven with logic levels, excluding the supply and ground.
    pub fn signal_nets(&self) -> impl Iterator<Item = &str> {
        self.ports
            .iter()
            .filter(|port| !matches!(port.kind, PortKind::Supply { .. } | PortKind::Ground))
            .map(PortBinding::net)
    }
}

fn check_addr(params: &TbParams, addr: u64) -> Result<()> {
    if addr >= params.num_words as u64 {
        return Err(StimulusError::AddressOutOfRange {
            addr,
            num_words: params.num_words,
        });
    }
    Ok(())
}

/// Applies `ops` after the power-up prologue.
pub fn apply_ops(params: &TbParams, ops: &[Op]) -> Result<(StimulusProgram, ExpectationLedger)> {
    params.validate()?;
    for op in ops {
        let (Op::Write { addr, .. } | Op::Read { addr, .. }) = op;
        check_addr(params, *addr)?;
    }
    let addr_width = params.addr_width();

    let sources = TbSources::new(
        &params.ports,
        params.word_size,
        addr_width,
        params.transition_time,
    );
    let mut seq = OpSequencer::new(sources, params.clk_period, params.vdd);

    // Hold all inputs at zero, then bring up the supply
    seq.idle(params.settle_cycles)?;
    seq.power_up()?;
    seq.idle(params.settle_cycles)?;
    debug!("power-up complete at t = {}", seq.now());

    for op in ops {
        match op {
            Op::Write { addr, data } => {
                seq.write(&BitSignal::from_u64(*addr, addr_width), data)?;
            }
            Op::Read { addr, expected } => {
                seq.read(&BitSignal::from_u64(*addr, addr_width), expected)?;
            }
        }
    }

    let (sources, ledger, end_time) = seq.finish()?;
    let program = StimulusProgram {
        dut_name: params.dut_name.clone(),
        ports: params.ports.bindings(params.word_size, addr_width),
        sources,
        end_time,
        vdd: params.vdd,
    };
    Ok((program, ledger))
}

pub fn generate_program<R: Rng + ?Sized>(
    params: &TbParams,
    rng: &mut R,
) -> Result<(StimulusProgram, ExpectationLedger)> {
    params.validate()?;
    let ops = params.sequence.ops(params, rng);
    info!(
        "generating {} test for {} x {} bits ({} address bits, {} operations)",
        params.sequence,
        params.num_words,
        params.word_size,
        params.addr_width(),
        ops.len()
    );
    let (program, ledger) = apply_ops(params, &ops)?;
    info!(
        "generated {} sources and {} expectations, end time {}",
        program.sources.len(),
        ledger.len(),
        program.end_time
    );
    Ok((program, ledger))
}
