use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::bus_bit;

/// Node name of the simulator ground.
pub const GROUND_NODE: &str = "0";

/// Pin names of a single-port SRAM macro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SramPorts {
    pub din: ArcStr,
    pub dout: ArcStr,
    pub addr: ArcStr,
    /// Chip select, active low.
    pub csb: ArcStr,
    /// Write enable, active low.
    pub web: ArcStr,
    pub clk: ArcStr,
    pub vdd: ArcStr,
    pub gnd: ArcStr,
}

impl Default for SramPorts {
    fn default() -> Self {
        Self {
            din: arcstr::literal!("din0"),
            dout: arcstr::literal!("dout0"),
            addr: arcstr::literal!("addr0"),
            csb: arcstr::literal!("csb0"),
            web: arcstr::literal!("web0"),
            clk: arcstr::literal!("clk0"),
            vdd: arcstr::literal!("vdd"),
            gnd: arcstr::literal!("gnd"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortKind {
    /// Driven by the named source.
    Driven { source: ArcStr },
    /// Supply rail, driven by the named source.
    Supply { source: ArcStr },
    /// Observed output, saved by the simulator.
    Output,
    /// Tied to the simulator ground.
    Ground,
}

/// A DUT port and the net connected to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    pub port: ArcStr,
    pub kind: PortKind,
}

impl PortBinding {
    /// The net this port connects to in the testbench.
    pub fn net(&self) -> &str {
        match self.kind {
            PortKind::Ground => GROUND_NODE,
            PortKind::Driven { .. } | PortKind::Supply { .. } | PortKind::Output => {
                self.port.as_str()
            }
        }
    }
}

impl SramPorts {
    #[inline]
    pub fn din_bit(&self, i: usize) -> String {
        bus_bit(&self.din, i)
    }

    #[inline]
    pub fn dout_bit(&self, i: usize) -> String {
        bus_bit(&self.dout, i)
    }

    #[inline]
    pub fn addr_bit(&self, i: usize) -> String {
        bus_bit(&self.addr, i)
    }

    /// Connection list in DUT port order.
    pub fn bindings(&self, word_size: usize, addr_width: usize) -> Vec<PortBinding> {
        let driven = |port: ArcStr, source: ArcStr| PortBinding {
            port,
            kind: PortKind::Driven { source },
        };

        let mut ports = Vec::with_capacity(2 * word_size + addr_width + 5);
        for i in 0..word_size {
            ports.push(driven(
                self.din_bit(i).into(),
                source_name(&self.din, Some(i)),
            ));
        }
        for i in 0..addr_width {
            ports.push(driven(
                self.addr_bit(i).into(),
                source_name(&self.addr, Some(i)),
            ));
        }
        for port in [&self.csb, &self.web, &self.clk] {
            ports.push(driven(port.clone(), source_name(port, None)));
        }
        for i in 0..word_size {
            ports.push(PortBinding {
                port: self.dout_bit(i).into(),
                kind: PortKind::Output,
            });
        }
        ports.push(PortBinding {
            port: self.vdd.clone(),
            kind: PortKind::Supply {
                source: source_name(&self.vdd, None),
            },
        });
        ports.push(PortBinding {
            port: self.gnd.clone(),
            kind: PortKind::Ground,
        });
        ports
    }
}

/// Name of the source driving `port`, or bit `index` of bus `port`.
pub fn source_name(port: &str, index: Option<usize>) -> ArcStr {
    match index {
        Some(i) => arcstr::format!("{port}_{i}"),
        None => ArcStr::from(port),
    }
}
