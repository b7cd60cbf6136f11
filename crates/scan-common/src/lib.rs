//! Common types shared by the scanfill crates.

pub mod error;
pub mod fixed;
pub mod grid;

pub use error::{ScanError, ScanResult};
pub use fixed::{floored_divrem, floored_muldivrem, QuoRem};
pub use grid::{GRID_X, GRID_XY, GRID_Y, INPUT_BITS, INPUT_SCALE};
