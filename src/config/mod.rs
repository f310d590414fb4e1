pub mod sram;

pub use sram::{parse_sram_config, SimTarget, SramConfig};
