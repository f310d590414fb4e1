use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::Serialize;
use tera::Context;

use crate::verification::dut::PortKind;
use crate::verification::{ExpectationLedger, StimulusProgram};
use crate::{Result, TEMPLATES};

use super::NetlistBackend;

/// Testbench delays are integer multiples of this, in seconds.
pub const TIME_UNIT: f64 = 1e-15;

/// Renders self-checking SystemVerilog testbenches for a digital model of the SRAM.
///
/// Inputs switch at the end of each ramp. Outputs are compared bit by bit at each
/// expectation time, before any input changes scheduled for that instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemVerilogBackend {
    /// Verilog sources the DUT model depends on.
    pub ext_libs: Vec<PathBuf>,
    pub dut_netlist: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SvPort {
    name: String,
    kind: &'static str,
    range: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SvCheck {
    signal: String,
    value: u8,
}

#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct SvStep {
    delay: u64,
    checks: Vec<SvCheck>,
    assigns: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SvParams {
    dut_name: String,
    includes: Vec<String>,
    ports: Vec<SvPort>,
    init: Vec<String>,
    steps: Vec<SvStep>,
    tail: u64,
}

#[inline]
fn to_ticks(t: f64) -> u64 {
    (t / TIME_UNIT).round() as u64
}

/// Splits `din0[3]` into `("din0", Some(3))`.
fn split_bus(net: &str) -> (&str, Option<usize>) {
    net.strip_suffix(']')
        .and_then(|s| s.rsplit_once('['))
        .and_then(|(name, index)| Some((name, Some(index.parse().ok()?))))
        .unwrap_or((net, None))
}

fn assign(net: &str, bit: u8) -> String {
    format!("{net} = 1'b{bit}")
}

impl SystemVerilogBackend {
    pub(crate) fn tb_params(
        &self,
        program: &StimulusProgram,
        ledger: &ExpectationLedger,
    ) -> SvParams {
        let threshold = program.vdd / 2.0;
        let bit = |x: f64| u8::from(x > threshold);

        // Bus widths, in port order.
        let mut buses: Vec<(&str, &'static str, Option<usize>)> = Vec::new();
        for binding in program.ports.iter() {
            let kind = match binding.kind {
                PortKind::Driven { .. } => "reg",
                PortKind::Output => "wire",
                PortKind::Supply { .. } | PortKind::Ground => continue,
            };
            let (name, index) = split_bus(binding.net());
            match buses.iter_mut().find(|(n, _, _)| *n == name) {
                Some((_, _, width)) => {
                    *width = (*width).max(index.map(|i| i + 1));
                }
                None => buses.push((name, kind, index.map(|i| i + 1))),
            }
        }
        let ports = buses
            .into_iter()
            .map(|(name, kind, width)| SvPort {
                name: name.to_string(),
                kind,
                range: width
                    .map(|w| format!("[{}:0] ", w - 1))
                    .unwrap_or_default(),
            })
            .collect();

        let driven = program
            .ports
            .iter()
            .filter_map(|binding| match &binding.kind {
                PortKind::Driven { source } => Some((source.as_str(), binding.net())),
                _ => None,
            })
            .collect::<HashMap<_, _>>();

        let mut init = Vec::with_capacity(driven.len());
        let mut events: BTreeMap<u64, SvStep> = BTreeMap::new();
        for source in program.sources.iter() {
            let Some(net) = driven.get(source.name.as_str()) else {
                continue;
            };
            let mut last = bit(source.dc);
            init.push(assign(net, last));
            for &(t, x) in source.samples.iter() {
                let b = bit(x);
                if b != last {
                    events
                        .entry(to_ticks(t))
                        .or_default()
                        .assigns
                        .push(assign(net, b));
                    last = b;
                }
            }
        }

        for entry in ledger.iter() {
            let step = events.entry(to_ticks(entry.time)).or_default();
            for (port, x) in program.outputs().zip(entry.values.iter()) {
                step.checks.push(SvCheck {
                    signal: port.net().to_string(),
                    value: bit(*x),
                });
            }
        }

        let mut now = 0;
        let steps = events
            .into_iter()
            .map(|(t, mut step)| {
                step.delay = t - now;
                now = t;
                step
            })
            .collect();

        SvParams {
            dut_name: program.dut_name.to_string(),
            includes: self
                .ext_libs
                .iter()
                .chain(std::iter::once(&self.dut_netlist))
                .map(|path| path.display().to_string())
                .collect(),
            ports,
            init,
            steps,
            tail: to_ticks(program.end_time).saturating_sub(now),
        }
    }
}

impl NetlistBackend for SystemVerilogBackend {
    fn extension(&self) -> &'static str {
        "sv"
    }

    fn render(&self, program: &StimulusProgram, ledger: &ExpectationLedger) -> Result<String> {
        let params = self.tb_params(program, ledger);
        Ok(TEMPLATES.render("tb.sv", &Context::from_serialize(params)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::program;

    fn backend() -> SystemVerilogBackend {
        SystemVerilogBackend {
            ext_libs: vec![PathBuf::from("/models/dff.v")],
            dut_netlist: PathBuf::from("/build/sram_2_4_scn4m_subm.v"),
        }
    }

    #[test]
    fn splits_bus_names() {
        assert_eq!(split_bus("din0[3]"), ("din0", Some(3)));
        assert_eq!(split_bus("csb0"), ("csb0", None));
        assert_eq!(split_bus("x[a]"), ("x[a]", None));
    }

    #[test]
    fn renders_testbench() {
        let (program, ledger) = program();
        let tb = backend().render(&program, &ledger).unwrap();
        let lines = tb.lines().map(str::trim).collect::<Vec<_>>();

        assert_eq!(lines.first(), Some(&"`timescale 1fs/1fs"));
        assert!(lines.contains(&"`include \"/models/dff.v\""));
        assert!(lines.contains(&"`include \"/build/sram_2_4_scn4m_subm.v\""));
        assert!(lines.contains(&"module sram_2_4_scn4m_subm_tb;"));
        for decl in [
            "reg [1:0] din0;",
            "reg [1:0] addr0;",
            "reg csb0;",
            "reg web0;",
            "reg clk0;",
            "wire [1:0] dout0;",
        ] {
            assert!(lines.contains(&decl), "missing {decl}");
        }
        assert!(lines.contains(&"sram_2_4_scn4m_subm dut ("));
        assert!(lines.contains(&".dout0(dout0)"));
        assert!(!tb.contains("vdd"));
        assert!(!tb.contains("csb0 = 1'b1"));
        assert_eq!(lines.last(), Some(&"endmodule"));

        let checks = lines.iter().filter(|l| l.contains(" !== 1'b")).count();
        assert_eq!(checks, 2 * ledger.len());

        // The delays add up to the end of the run.
        let total = lines
            .iter()
            .filter_map(|l| l.strip_prefix('#')?.strip_suffix(';')?.parse::<u64>().ok())
            .sum::<u64>();
        assert_eq!(total, to_ticks(program.end_time));
    }

    #[test]
    fn checks_follow_expectations() {
        let (program, ledger) = program();
        let params = backend().tb_params(&program, &ledger);

        let checks = params
            .steps
            .iter()
            .flat_map(|step| step.checks.iter())
            .collect::<Vec<_>>();
        let expected = ledger
            .iter()
            .flat_map(|e| {
                e.values.iter().enumerate().map(|(i, x)| SvCheck {
                    signal: format!("dout0[{i}]"),
                    value: u8::from(*x > 1.65),
                })
            })
            .collect::<Vec<_>>();
        assert_eq!(checks, expected.iter().collect::<Vec<_>>());

        // Each check lands at its expectation time.
        let check_times = params
            .steps
            .iter()
            .scan(0, |t, step| {
                *t += step.delay;
                Some((*t, step))
            })
            .filter(|(_, step)| !step.checks.is_empty())
            .map(|(t, _)| t)
            .collect::<Vec<_>>();
        let entry_times = ledger.iter().map(|e| to_ticks(e.time)).collect::<Vec<_>>();
        assert_eq!(check_times, entry_times);
    }

    #[test]
    fn inputs_start_low() {
        let (program, ledger) = program();
        let params = backend().tb_params(&program, &ledger);
        // Every driven bit has an initial value.
        assert_eq!(params.init.len(), program.sources.len() - 1);
        assert!(params.init.contains(&"clk0 = 1'b0".to_string()));
        assert!(params.init.contains(&"addr0[1] = 1'b0".to_string()));
    }
}
