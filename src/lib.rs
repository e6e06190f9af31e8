pub mod config;
pub mod core;
pub mod printer;
pub mod test_util;
pub mod trace;
