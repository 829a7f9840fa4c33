//! Invoice arithmetic.

mod calculator;

pub use calculator::round_vnd;
