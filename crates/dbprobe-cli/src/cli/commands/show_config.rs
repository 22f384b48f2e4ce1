//! `dbprobe show-config` – print the effective configuration.

use anyhow::Result;
use dbprobe_core::config::HarnessConfig;

pub fn run_show_config(cfg: &HarnessConfig) -> Result<()> {
    print!("{}", cfg.to_redacted_toml()?);
    Ok(())
}
