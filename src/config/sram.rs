use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::error::{Result as StimulusResult, StimulusError};
use crate::verification::dut::SramPorts;
use crate::verification::program::{DEFAULT_SETTLE_CYCLES, DEFAULT_TRANSITION_TIME};
use crate::verification::verify::DEFAULT_TOLERANCE;
use crate::verification::{TbParams, TestSequence};
use crate::Result;

pub const DEFAULT_TECH_NAME: &str = "scn4m_subm";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SramConfig {
    pub num_words: usize,
    pub word_size: usize,
    pub vdd: f64,
    pub clk_period: f64,
    #[serde(default = "default_transition_time")]
    pub transition_time: f64,
    #[serde(default = "default_settle_cycles")]
    pub settle_cycles: usize,
    /// Seed for the random test sequence. Drawn from entropy if absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub sequence: TestSequence,
    #[serde(default = "default_tech_name")]
    pub tech_name: String,
    /// Subcircuit name. Derived from the geometry and technology if absent.
    #[serde(default)]
    pub dut_name: Option<String>,
    /// Netlist defining the SRAM subcircuit.
    pub dut_netlist: PathBuf,
    /// Absolute tolerance, in volts, used when checking outputs.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default)]
    pub ports: SramPorts,
    #[serde(default)]
    pub target: SimTarget,
}

/// Simulator the testbench is written for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimTarget {
    Ngspice {
        #[serde(default)]
        model_paths: Vec<PathBuf>,
        /// Skip the operating point and start from initial conditions.
        #[serde(default = "default_uic")]
        uic: bool,
    },
    Spectre {
        #[serde(default)]
        model_paths: Vec<PathBuf>,
    },
    /// Self-checking testbench for a digital model. `dut_netlist` is the Verilog model.
    SystemVerilog {
        /// Verilog sources included ahead of the model.
        #[serde(default)]
        ext_libs: Vec<PathBuf>,
    },
}

impl Default for SimTarget {
    fn default() -> Self {
        Self::Ngspice {
            model_paths: Vec::new(),
            uic: true,
        }
    }
}

impl SimTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ngspice { .. } => "ngspice",
            Self::Spectre { .. } => "spectre",
            Self::SystemVerilog { .. } => "system_verilog",
        }
    }

    /// Files included ahead of the DUT.
    fn library_paths_mut(&mut self) -> &mut Vec<PathBuf> {
        match self {
            Self::Ngspice { model_paths, .. } | Self::Spectre { model_paths } => model_paths,
            Self::SystemVerilog { ext_libs } => ext_libs,
        }
    }
}

fn default_transition_time() -> f64 {
    DEFAULT_TRANSITION_TIME
}

fn default_settle_cycles() -> usize {
    DEFAULT_SETTLE_CYCLES
}

fn default_tech_name() -> String {
    DEFAULT_TECH_NAME.to_string()
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_uic() -> bool {
    true
}

impl SramConfig {
    pub fn dut_name(&self) -> ArcStr {
        match &self.dut_name {
            Some(name) => ArcStr::from(name.as_str()),
            None => arcstr::format!(
                "sram_{}_{}_{}",
                self.word_size,
                self.num_words,
                self.tech_name
            ),
        }
    }

    pub fn to_tb_params(&self) -> StimulusResult<TbParams> {
        if !(self.tolerance.is_finite() && self.tolerance > 0f64) {
            return Err(StimulusError::InvalidConfig(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        let params = TbParams::builder()
            .dut_name(self.dut_name())
            .num_words(self.num_words)
            .word_size(self.word_size)
            .vdd(self.vdd)
            .clk_period(self.clk_period)
            .transition_time(self.transition_time)
            .settle_cycles(self.settle_cycles)
            .sequence(self.sequence)
            .ports(self.ports.clone())
            .build()
            .map_err(|e| StimulusError::InvalidConfig(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Makes relative file paths relative to `base`.
    pub fn resolve_paths(&mut self, base: impl AsRef<Path>) {
        let base = base.as_ref();
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.dut_netlist);
        self.target.library_paths_mut().iter_mut().for_each(resolve);
    }
}

pub fn parse_sram_config(path: impl AsRef<Path>) -> Result<SramConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration file {path:?}"))?;
    let mut data: SramConfig = toml::from_str(&contents)?;
    if let Some(parent) = path.parent() {
        data.resolve_paths(parent);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
num_words = 16
word_size = 4
vdd = 3.3
clk_period = 10e-9
dut_netlist = "sram.sp"
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: SramConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.transition_time, 1e-12);
        assert_eq!(config.settle_cycles, 5);
        assert_eq!(config.seed, None);
        assert_eq!(config.sequence, TestSequence::Random);
        assert_eq!(config.tolerance, 0.1);
        assert_eq!(config.ports, SramPorts::default());
        assert_eq!(config.target, SimTarget::default());
        assert_eq!(config.dut_name().as_str(), "sram_4_16_scn4m_subm");

        let params = config.to_tb_params().unwrap();
        assert_eq!(params.addr_width(), 4);
        assert_eq!(params.dut_name, config.dut_name());
    }

    #[test]
    fn parses_spectre_target() {
        let src = format!(
            r#"{MINIMAL}
seed = 42
sequence = "march_cm"
dut_name = "my_sram"

[ports]
din = "d"
dout = "q"

[target]
kind = "spectre"
model_paths = ["/pdk/models.scs"]
"#
        );
        let config: SramConfig = toml::from_str(&src).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.sequence, TestSequence::MarchCm);
        assert_eq!(config.dut_name().as_str(), "my_sram");
        assert_eq!(config.ports.din.as_str(), "d");
        assert_eq!(config.ports.clk.as_str(), "clk0");
        assert_eq!(
            config.target,
            SimTarget::Spectre {
                model_paths: vec![PathBuf::from("/pdk/models.scs")]
            }
        );
    }

    #[test]
    fn parses_system_verilog_target() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sramtb.toml");
        fs::write(
            &path,
            format!(
                "{}\n[target]\nkind = \"system_verilog\"\next_libs = [\"lib/dff.v\"]\n",
                MINIMAL.replace("sram.sp", "sram.v")
            ),
        )?;
        let config = parse_sram_config(&path)?;
        assert_eq!(config.target.as_str(), "system_verilog");
        assert_eq!(config.dut_netlist, dir.path().join("sram.v"));
        assert_eq!(
            config.target,
            SimTarget::SystemVerilog {
                ext_libs: vec![dir.path().join("lib/dff.v")]
            }
        );
        Ok(())
    }

    #[test]
    fn rejects_unknown_target() {
        let src = format!("{MINIMAL}\n[target]\nkind = \"hspice\"\n");
        assert!(toml::from_str::<SramConfig>(&src).is_err());
    }

    #[test]
    fn invalid_values_fail_validation() {
        let mut config: SramConfig = toml::from_str(MINIMAL).unwrap();
        config.tolerance = 0.0;
        assert!(config.to_tb_params().is_err());

        let mut config: SramConfig = toml::from_str(MINIMAL).unwrap();
        config.word_size = 0;
        assert!(matches!(
            config.to_tb_params(),
            Err(StimulusError::InvalidConfig(_))
        ));
    }

    #[test]
    fn resolves_relative_paths() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sramtb.toml");
        fs::write(
            &path,
            format!("{MINIMAL}\n[target]\nkind = \"ngspice\"\nmodel_paths = [\"nmos.sp\", \"/abs/pmos.sp\"]\n"),
        )?;
        let config = parse_sram_config(&path)?;
        assert_eq!(config.dut_netlist, dir.path().join("sram.sp"));
        assert_eq!(
            config.target,
            SimTarget::Ngspice {
                model_paths: vec![dir.path().join("nmos.sp"), PathBuf::from("/abs/pmos.sp")],
                uic: true,
            }
        );
        Ok(())
    }
}
