use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StimulusError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cannot advance time by a negative or non-finite delay ({0})")]
    NegativeDelay(f64),

    #[error(
        "source {source_name}: cannot set value at t = {at} (last point at t = {last}, transition time {transition})"
    )]
    TimingViolation {
        source_name: String,
        at: f64,
        last: f64,
        transition: f64,
    },

    #[error("expectation at t = {at} precedes the previous expectation at t = {last}")]
    NonMonotonicExpectation { at: f64, last: f64 },

    #[error("source {source_name}: cannot render until t = {end} (last point at t = {last})")]
    RenderBeforeLastPoint {
        source_name: String,
        end: f64,
        last: f64,
    },

    #[error("address {addr} is out of range for a memory of {num_words} words")]
    AddressOutOfRange { addr: u64, num_words: usize },

    #[error("{what}: expected width {expected}, got {got}")]
    WidthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}

pub type Result<T> = std::result::Result<T, StimulusError>;
