//! Module for additional computational capabilities
pub mod fft;
pub mod griddata;
pub mod math_utils;
pub mod test_helper;
pub mod uom_macros;
pub use math_utils::{f64_to_usize, usize_to_f64};
