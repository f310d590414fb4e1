use std::path::PathBuf;

use crate::verification::{ExpectationLedger, StimulusProgram};
use crate::Result;

use super::{deck_params, render_template, NetlistBackend};

/// Renders Spectre decks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectreBackend {
    pub model_paths: Vec<PathBuf>,
    pub dut_netlist: PathBuf,
}

/// Escapes bus brackets, which Spectre treats as special characters in node names.
pub fn escape_node(name: &str) -> String {
    name.replace('[', "\\[").replace(']', "\\]")
}

impl NetlistBackend for SpectreBackend {
    fn extension(&self) -> &'static str {
        "scs"
    }

    fn render(&self, program: &StimulusProgram, _ledger: &ExpectationLedger) -> Result<String> {
        let params = deck_params(program, &self.model_paths, &self.dut_netlist, escape_node);
        render_template("spectre.scs", &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::program;

    #[test]
    fn escapes_bus_brackets() {
        assert_eq!(escape_node("dout0[12]"), "dout0\\[12\\]");
        assert_eq!(escape_node("clk0"), "clk0");
    }

    #[test]
    fn renders_spectre_deck() {
        let (program, ledger) = program();
        let backend = SpectreBackend {
            model_paths: vec![PathBuf::from("/models/corners.scs")],
            dut_netlist: PathBuf::from("/build/sram.scs"),
        };
        let deck = backend.render(&program, &ledger).unwrap();
        let lines = deck.lines().collect::<Vec<_>>();

        assert_eq!(lines[1], "simulator lang=spectre");
        assert!(lines.contains(&"include \"/models/corners.scs\""));
        assert!(lines.contains(&"include \"/build/sram.scs\""));
        assert!(lines.contains(&"save dout0\\[0\\] dout0\\[1\\]"));
        assert!(lines.iter().any(|l| l.starts_with("X0 (din0\\[0\\] ")
            && l.ends_with(" vdd 0) sram_2_4_scn4m_subm")));
        assert!(lines
            .iter()
            .any(|l| l.starts_with("Vclk0 (clk0 0) vsource type=pwl dc=0e0 wave=[0e0 0e0 ")));
        assert_eq!(
            lines.iter().filter(|l| l.contains("vsource")).count(),
            program.sources.len()
        );
        assert!(lines.iter().any(|l| l.starts_with("tran tran ")));
    }
}
