pub mod config;
pub mod logging;

pub mod db;
pub mod harness;
pub mod probe;
pub mod retry;
pub mod round_loop;
pub mod work_unit;
