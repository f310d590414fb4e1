pub use anyhow::{anyhow, bail, Result};
use lazy_static::lazy_static;
use tera::Tera;

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod paths;
pub mod plan;
pub mod verification;

lazy_static! {
    pub static ref TEMPLATES: Tera =
        match Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/*")) {
            Ok(t) => t,
            Err(e) => panic!("Error parsing templates: {e}"),
        };
}

pub fn bus_bit(name: &str, index: usize) -> String {
    format!("{name}[{index}]")
}

/// Number of bits needed to index `x` items. Zero for `x <= 1`.
#[inline]
pub(crate) fn clog2(x: usize) -> usize {
    if x <= 1 {
        0
    } else {
        (usize::BITS - (x - 1).leading_zeros()) as usize
    }
}
