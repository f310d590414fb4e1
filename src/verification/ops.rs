use crate::error::{Result, StimulusError};

use super::bit_signal::{rail, BitSignal};
use super::dut::{source_name, SramPorts};
use super::ledger::ExpectationLedger;
use super::time::TimeCursor;
use super::waveform::{PwlSource, SourceSpec};

/// Fraction of the clock period between driving inputs and the rising clock edge.
pub const SETUP_FRACTION: f64 = 0.1;
/// Fraction of the clock period the clock is held high.
pub const ACTIVE_FRACTION: f64 = 0.5;
/// Fraction of the clock period between the falling edge and the next operation.
pub const RELEASE_FRACTION: f64 = 0.4;

/// One [`PwlSource`] per driven DUT input.
#[derive(Debug, Clone)]
pub struct TbSources {
    /// One source per data bit.
    din: Vec<PwlSource>,
    /// One source per address bit. Empty for a single-word memory.
    addr: Vec<PwlSource>,
    /// Chip select, held low.
    csb: PwlSource,
    /// Write enable, active low.
    web: PwlSource,
    clk: PwlSource,
    vdd: PwlSource,
}

impl TbSources {
    pub fn new(ports: &SramPorts, word_size: usize, addr_width: usize, transition: f64) -> Self {
        let source = |port: &str, index: Option<usize>| {
            let node = match index {
                Some(i) => crate::bus_bit(port, i),
                None => port.to_string(),
            };
            PwlSource::with_initial_value(source_name(port, index), node, 0f64, transition)
        };
        Self {
            din: (0..word_size)
                .map(|i| source(ports.din.as_str(), Some(i)))
                .collect(),
            addr: (0..addr_width)
                .map(|i| source(ports.addr.as_str(), Some(i)))
                .collect(),
            csb: source(ports.csb.as_str(), None),
            web: source(ports.web.as_str(), None),
            clk: source(ports.clk.as_str(), None),
            vdd: source(ports.vdd.as_str(), None),
        }
    }

    /// All sources in netlist order.
    pub fn iter(&self) -> impl Iterator<Item = &PwlSource> {
        [&self.vdd, &self.csb, &self.web, &self.clk]
            .into_iter()
            .chain(self.din.iter())
            .chain(self.addr.iter())
    }

    #[inline]
    pub fn addr_width(&self) -> usize {
        self.addr.len()
    }

    #[inline]
    pub fn word_size(&self) -> usize {
        self.din.len()
    }
}

pub fn push_bus(sources: &mut [PwlSource], signal: &BitSignal, t: f64, vdd: f64) -> Result<()> {
    check_width("bus", sources.len(), signal)?;
    for (source, bit) in sources.iter_mut().zip(signal.bits()) {
        source.set(rail(bit, vdd), t)?;
    }
    Ok(())
}

fn check_width(what: &'static str, expected: usize, signal: &BitSignal) -> Result<()> {
    if signal.width() != expected {
        return Err(StimulusError::WidthMismatch {
            what,
            expected,
            got: signal.width(),
        });
    }
    Ok(())
}

pub fn release_bus(sources: &mut [PwlSource], t: f64) -> Result<()> {
    for source in sources.iter_mut() {
        source.set(0f64, t)?;
    }
    Ok(())
}

/// Composes reads and writes into source updates on a shared time cursor.
///
/// Every operation lasts exactly one clock period.
#[derive(Debug, Clone)]
pub struct OpSequencer {
    clk_period: f64,
    vdd: f64,
    cursor: TimeCursor,
    sources: TbSources,
    ledger: ExpectationLedger,
}

impl OpSequencer {
    pub fn new(sources: TbSources, clk_period: f64, vdd: f64) -> Self {
        Self {
            clk_period,
            vdd,
            cursor: TimeCursor::new(),
            sources,
            ledger: ExpectationLedger::new(),
        }
    }

    #[inline]
    pub fn now(&self) -> f64 {
        self.cursor.now()
    }

    #[inline]
    pub fn sources(&self) -> &TbSources {
        &self.sources
    }

    #[inline]
    pub fn ledger(&self) -> &ExpectationLedger {
        &self.ledger
    }

    pub fn delay(&mut self, dt: f64) -> Result<()> {
        self.cursor.advance(dt)
    }

    /// Holds everything for `cycles` clock periods.
    pub fn idle(&mut self, cycles: usize) -> Result<()> {
        self.delay(cycles as f64 * self.clk_period)
    }

    /// Raises the supply and de-asserts write enable.
    pub fn power_up(&mut self) -> Result<()> {
        let t = self.now();
        self.sources.vdd.set(self.vdd, t)?;
        self.sources.web.set(self.vdd, t)?;
        Ok(())
    }

    pub fn write(&mut self, addr: &BitSignal, data: &BitSignal) -> Result<()> {
        check_width("address", self.sources.addr_width(), addr)?;
        check_width("data", self.sources.word_size(), data)?;
        let (period, vdd) = (self.clk_period, self.vdd);

        // Setup data, address, and write enable
        let t = self.now();
        push_bus(&mut self.sources.din, data, t, vdd)?;
        push_bus(&mut self.sources.addr, addr, t, vdd)?;
        self.sources.web.set(0f64, t)?;
        self.delay(SETUP_FRACTION * period)?;

        // Rising edge; the cell latches while the clock is high
        let t = self.now();
        self.sources.clk.set(vdd, t)?;
        self.delay(ACTIVE_FRACTION * period)?;

        // Release inputs and produce the falling edge
        let t = self.now();
        release_bus(&mut self.sources.din, t)?;
        release_bus(&mut self.sources.addr, t)?;
        self.sources.web.set(vdd, t)?;
        self.sources.clk.set(0f64, t)?;
        self.delay(RELEASE_FRACTION * period)?;

        Ok(())
    }

    /// Reads `addr` and records `expected` at the end of the clock-high window.
    pub fn read(&mut self, addr: &BitSignal, expected: &BitSignal) -> Result<()> {
        check_width("address", self.sources.addr_width(), addr)?;
        check_width("expected data", self.sources.word_size(), expected)?;
        let (period, vdd) = (self.clk_period, self.vdd);

        let t = self.now();
        push_bus(&mut self.sources.addr, addr, t, vdd)?;
        self.sources.web.set(vdd, t)?;
        self.delay(SETUP_FRACTION * period)?;

        let t = self.now();
        self.sources.clk.set(vdd, t)?;
        self.delay(ACTIVE_FRACTION * period)?;

        let t = self.now();
        self.ledger.push(t, expected.rail_voltages(vdd))?;

        // Address stays driven; write enable stays de-asserted
        self.sources.web.set(vdd, t)?;
        self.sources.clk.set(0f64, t)?;
        self.delay(RELEASE_FRACTION * period)?;

        Ok(())
    }

    /// Renders every source up to the current time.
    pub fn finish(self) -> Result<(Vec<SourceSpec>, ExpectationLedger, f64)> {
        let end = self.now();
        let specs = self
            .sources
            .iter()
            .map(|source| source.to_source_spec(end))
            .collect::<Result<Vec<_>>>()?;
        Ok((specs, self.ledger, end))
    }
}
