//! The two string abstractions (spec §4.3, §4.4), each bounded so the
//! lattice has finite height.

pub mod bricks;
pub mod prefix_suffix;

pub use bricks::BricksValue;
pub use prefix_suffix::PrefixSuffixValue;
