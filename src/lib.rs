//! Small daemon/cli pair that keeps track of which window has focus. The daemon splits the
//! stream of focus samples into sessions, stores them in a per-day log and sums them into a daily
//! per-application rollup. The cli reads both back.
//!

pub mod cli;
pub mod daemon;
pub mod fs;
pub mod utils;
pub mod window_api;
