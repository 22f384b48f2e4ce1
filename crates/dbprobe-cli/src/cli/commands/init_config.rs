//! `dbprobe init-config` – write the default configuration file.

use anyhow::Result;
use dbprobe_core::config;
use std::path::Path;

pub fn run_init_config(explicit: Option<&Path>) -> Result<()> {
    let (path, created) = config::init_default(explicit)?;
    if created {
        println!("Wrote default config to {}", path.display());
    } else {
        println!("Config already exists at {}", path.display());
    }
    Ok(())
}
