//! CLI command handlers. Each command is in its own file.

mod init_config;
mod init_table;
mod run;
mod show_config;

pub use init_config::run_init_config;
pub use init_table::run_init_table;
pub use run::run_probe;
pub use show_config::run_show_config;
