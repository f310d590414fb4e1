use std::path::PathBuf;

use crate::verification::{ExpectationLedger, StimulusProgram};
use crate::Result;

use super::{deck_params, render_template, NetlistBackend};

/// Renders ngspice decks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NgspiceBackend {
    pub model_paths: Vec<PathBuf>,
    pub dut_netlist: PathBuf,
    pub uic: bool,
}

impl NetlistBackend for NgspiceBackend {
    fn extension(&self) -> &'static str {
        "sp"
    }

    fn render(&self, program: &StimulusProgram, _ledger: &ExpectationLedger) -> Result<String> {
        let params = deck_params(program, &self.model_paths, &self.dut_netlist, str::to_string)
            .with_uic(self.uic);
        render_template("ngspice.sp", &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::program;

    fn backend(uic: bool) -> NgspiceBackend {
        NgspiceBackend {
            model_paths: vec![PathBuf::from("/models/nmos.sp"), PathBuf::from("/models/pmos.sp")],
            dut_netlist: PathBuf::from("/build/sram_2_4_scn4m_subm.sp"),
            uic,
        }
    }

    #[test]
    fn renders_ngspice_deck() {
        let (program, ledger) = program();
        let deck = backend(true).render(&program, &ledger).unwrap();
        let lines = deck.lines().collect::<Vec<_>>();

        assert!(lines.contains(&".include /models/nmos.sp"));
        assert!(lines.contains(&".include /build/sram_2_4_scn4m_subm.sp"));
        assert!(lines.contains(
            &"X0 din0[0] din0[1] addr0[0] addr0[1] csb0 web0 clk0 dout0[0] dout0[1] vdd 0 sram_2_4_scn4m_subm"
        ));
        assert!(lines.contains(&".probe V(dout0[0]) V(dout0[1])"));
        assert_eq!(lines.last(), Some(&".end"));

        let sources = lines.iter().filter(|l| l.starts_with('V')).count();
        assert_eq!(sources, program.sources.len());
        assert!(lines
            .iter()
            .any(|l| l.starts_with("Vaddr0_1 addr0[1] 0 DC 0e0 PWL(0e0 0e0 ")));

        let tran = lines.iter().find(|l| l.starts_with(".tran")).unwrap();
        assert!(tran.ends_with(" uic"));
        let fields = tran.split(' ').collect::<Vec<_>>();
        assert_eq!(fields.len(), 4);
        let step = fields[1].parse::<f64>().unwrap();
        let stop = fields[2].parse::<f64>().unwrap();
        assert_eq!(stop, program.end_time);
        approx::assert_relative_eq!(step * 1e3, stop, max_relative = 1e-12);
    }

    #[test]
    fn uic_is_optional() {
        let (program, ledger) = program();
        let deck = backend(false).render(&program, &ledger).unwrap();
        let tran = deck.lines().find(|l| l.starts_with(".tran")).unwrap();
        assert!(!tran.contains("uic"));
    }
}
