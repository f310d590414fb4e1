pub mod bit_signal;
pub mod dut;
pub mod ledger;
pub mod ops;
pub mod program;
pub mod time;
pub mod verify;
pub mod waveform;


pub use bit_signal::BitSignal;
pub use ledger::{Expectation, ExpectationLedger};
pub use program::{generate_program, Op, StimulusProgram, TbParams, TestSequence};
pub use verify::{verify_outputs, CapturedData, CheckReport};
