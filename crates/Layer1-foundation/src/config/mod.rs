//! Config module for BuckyBall

mod bucky;

pub use bucky::{BuckyConfig, DebugConfig, BUCKY_CONFIG_FILE};
