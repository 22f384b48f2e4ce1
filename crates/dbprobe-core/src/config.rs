use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which pooled client the harness drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Mysql,
    Sqlite,
}

/// Target database and table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Database (schema) name.
    pub name: String,
    /// Table the probes write to. Interpolated into SQL, so it must be a plain identifier.
    pub table: String,
    /// Database file for the sqlite backend.
    pub sqlite_path: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Mysql,
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: "testuser".to_string(),
            password: String::new(),
            name: "testdb".to_string(),
            table: "test1".to_string(),
            sqlite_path: None,
        }
    }
}

/// Connection pool parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub name: String,
    /// Maximum number of physical connections.
    pub size: u32,
    /// How long an acquisition may wait before the pool counts as exhausted.
    pub acquire_timeout_secs: u64,
    /// Check connections before handing them out and replace dead ones.
    pub auto_reconnect: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "testapp".to_string(),
            size: 5,
            acquire_timeout_secs: 30,
            auto_reconnect: true,
        }
    }
}

/// Loop bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Outer rounds; each borrows one connection.
    pub rounds: u32,
    /// Probe attempts per round.
    pub attempts: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            rounds: 200,
            attempts: 10,
        }
    }
}

/// Backoff delays, in multiples of `unit_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub unit_ms: u64,
    pub insert_to_read: u32,
    pub read_to_next: u32,
    pub operational: u32,
    pub acquire_recovery: u32,
    pub acquire_escalation: u32,
    pub release_recovery: u32,
    pub max_failure_streak: u32,
    pub max_delay_secs: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            unit_ms: 1000,
            insert_to_read: 1,
            read_to_next: 2,
            operational: 5,
            acquire_recovery: 1,
            acquire_escalation: 4,
            release_recovery: 5,
            max_failure_streak: 1,
            max_delay_secs: 60,
        }
    }
}

/// Global configuration loaded from `~/.config/dbprobe/config.toml`,
/// then overridden from the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub database: DatabaseConfig,
    pub pool: PoolConfig,
    pub probe: ProbeConfig,
    pub backoff: BackoffConfig,
}

impl HarnessConfig {
    /// Apply `MYSQL_*` overrides. `lookup` is `std::env::var` in real runs.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut self.database;
        if let Some(v) = lookup("MYSQL_HOST") {
            db.host = v;
        }
        if let Some(v) = lookup("MYSQL_PORT") {
            db.port = v
                .trim()
                .parse()
                .with_context(|| format!("MYSQL_PORT is not a port number: {:?}", v))?;
        }
        if let Some(v) = lookup("MYSQL_USER") {
            db.user = v;
        }
        if let Some(v) = lookup("MYSQL_PASSWORD") {
            db.password = v;
        }
        if let Some(v) = lookup("MYSQL_DBNAME") {
            db.name = v;
        }
        if let Some(v) = lookup("MYSQL_TEST_TBL") {
            db.table = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.probe.rounds == 0 {
            bail!("probe.rounds must be at least 1");
        }
        if self.probe.attempts == 0 {
            bail!("probe.attempts must be at least 1");
        }
        if self.pool.size == 0 {
            bail!("pool.size must be at least 1");
        }
        if self.backoff.max_failure_streak == 0 {
            bail!("backoff.max_failure_streak must be at least 1");
        }
        if !is_identifier(&self.database.table) {
            bail!(
                "table name {:?} must be 1-64 ASCII letters, digits or underscores",
                self.database.table
            );
        }
        if self.database.backend == Backend::Sqlite && self.database.sqlite_path.is_none() {
            bail!("sqlite backend needs database.sqlite_path");
        }
        Ok(())
    }

    /// Pretty TOML with the password masked.
    pub fn to_redacted_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(&self.redacted())?)
    }

    /// Copy suitable for printing: the password is masked.
    pub fn redacted(&self) -> HarnessConfig {
        let mut cfg = self.clone();
        if !cfg.database.password.is_empty() {
            cfg.database.password = "********".to_string();
        }
        cfg
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 64
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dbprobe")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Parse a config file.
pub fn load_from_path(path: &Path) -> Result<HarnessConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: HarnessConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

/// Resolve the effective configuration: file (explicit path, else the XDG
/// default when present, else built-in defaults), then environment.
pub fn load(explicit: Option<&Path>) -> Result<HarnessConfig> {
    let mut cfg = match explicit {
        Some(path) => load_from_path(path)?,
        None => {
            let path = config_path()?;
            if path.exists() {
                load_from_path(&path)?
            } else {
                HarnessConfig::default()
            }
        }
    };
    cfg.apply_env(|k| std::env::var(k).ok())?;
    Ok(cfg)
}

/// Write the default configuration, unless a file is already there.
/// Returns the path and whether it was created.
pub fn init_default(explicit: Option<&Path>) -> Result<(PathBuf, bool)> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };
    if path.exists() {
        return Ok((path, false));
    }
    let toml = toml::to_string_pretty(&HarnessConfig::default())?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, toml)?;
    tracing::info!("created default config at {}", path.display());
    Ok((path, true))
}
