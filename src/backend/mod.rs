use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::Serialize;
use tera::Context;

use crate::config::SimTarget;
use crate::verification::{ExpectationLedger, StimulusProgram};
use crate::{Result, TEMPLATES};

pub mod spectre;
pub mod spice;
pub mod verilog;

pub use spectre::SpectreBackend;
pub use spice::NgspiceBackend;
pub use verilog::SystemVerilogBackend;

/// Ratio of the stop time to the transient step.
pub const TRAN_STEPS: f64 = 1e3;

/// Writes a [`StimulusProgram`] as a simulator deck.
///
/// Analog decks leave checking to [`crate::verification::verify_outputs`], so only
/// self-checking backends read the ledger.
pub trait NetlistBackend {
    /// File extension of rendered decks, without the leading dot.
    fn extension(&self) -> &'static str;

    fn render(&self, program: &StimulusProgram, ledger: &ExpectationLedger) -> Result<String>;
}

/// Returns the backend for `target`, instantiating the DUT defined in `dut_netlist`.
pub fn for_target(target: &SimTarget, dut_netlist: impl Into<PathBuf>) -> Box<dyn NetlistBackend> {
    let dut_netlist = dut_netlist.into();
    match target {
        SimTarget::Ngspice { model_paths, uic } => Box::new(NgspiceBackend {
            model_paths: model_paths.clone(),
            dut_netlist,
            uic: *uic,
        }),
        SimTarget::Spectre { model_paths } => Box::new(SpectreBackend {
            model_paths: model_paths.clone(),
            dut_netlist,
        }),
        SimTarget::SystemVerilog { ext_libs } => Box::new(SystemVerilogBackend {
            ext_libs: ext_libs.clone(),
            dut_netlist,
        }),
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct DeckSource {
    name: String,
    node: String,
    dc: String,
    pwl: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct DeckParams {
    dut_name: String,
    includes: Vec<String>,
    nets: Vec<String>,
    sources: Vec<DeckSource>,
    outputs: Vec<String>,
    tstep: String,
    tstop: String,
    uic: bool,
}

#[inline]
pub(crate) fn fmt_num(x: f64) -> String {
    format!("{x:e}")
}

/// Collects everything a deck template needs, naming nodes with `node_name`.
pub(crate) fn deck_params(
    program: &StimulusProgram,
    model_paths: &[PathBuf],
    dut_netlist: &Path,
    node_name: impl Fn(&str) -> String,
) -> DeckParams {
    let includes = model_paths
        .iter()
        .map(PathBuf::as_path)
        .chain(std::iter::once(dut_netlist))
        .map(|path| path.display().to_string())
        .collect();

    let sources = program
        .sources
        .iter()
        .map(|source| DeckSource {
            name: source.name.to_string(),
            node: node_name(source.node.as_str()),
            dc: fmt_num(source.dc),
            pwl: source
                .samples
                .iter()
                .map(|&(t, x)| format!("{} {}", fmt_num(t), fmt_num(x)))
                .join(" "),
        })
        .collect();

    DeckParams {
        dut_name: program.dut_name.to_string(),
        includes,
        nets: program.ports.iter().map(|p| node_name(p.net())).collect(),
        sources,
        outputs: program.outputs().map(|p| node_name(p.net())).collect(),
        tstep: fmt_num(program.end_time / TRAN_STEPS),
        tstop: fmt_num(program.end_time),
        uic: false,
    }
}

pub(crate) fn render_template(template: &str, params: &DeckParams) -> Result<String> {
    Ok(TEMPLATES.render(template, &Context::from_serialize(params)?)?)
}

impl DeckParams {
    pub(crate) fn with_uic(mut self, uic: bool) -> Self {
        self.uic = uic;
        self
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::verification::{generate_program, TbParams};

    use super::*;

    pub(crate) fn program() -> (StimulusProgram, ExpectationLedger) {
        let params = TbParams::builder()
            .dut_name("sram_2_4_scn4m_subm")
            .num_words(4)
            .word_size(2)
            .vdd(3.3)
            .clk_period(10e-9)
            .build()
            .unwrap();
        generate_program(&params, &mut StdRng::seed_from_u64(1)).unwrap()
    }

    #[test]
    fn target_selects_backend() {
        let ngspice = for_target(&SimTarget::default(), "sram.sp");
        assert_eq!(ngspice.extension(), "sp");
        let spectre = for_target(
            &SimTarget::Spectre {
                model_paths: Vec::new(),
            },
            "sram.scs",
        );
        assert_eq!(spectre.extension(), "scs");
        let verilog = for_target(
            &SimTarget::SystemVerilog {
                ext_libs: Vec::new(),
            },
            "sram.v",
        );
        assert_eq!(verilog.extension(), "sv");
    }

    #[test]
    fn deck_params_cover_every_source() {
        let (program, _) = program();
        let params = deck_params(&program, &[PathBuf::from("nmos.sp")], Path::new("dut.sp"), |n| {
            n.to_string()
        });
        assert_eq!(params.includes, vec!["nmos.sp", "dut.sp"]);
        assert_eq!(params.sources.len(), program.sources.len());
        assert_eq!(params.outputs, vec!["dout0[0]", "dout0[1]"]);
        assert_eq!(params.nets.last().map(String::as_str), Some("0"));

        let vdd = params.sources.iter().find(|s| s.name == "vdd").unwrap();
        assert_eq!(vdd.dc, "0e0");
        assert_eq!(vdd.pwl.split(' ').count(), 8);
    }
}
