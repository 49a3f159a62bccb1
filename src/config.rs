use anyhow::anyhow;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_DATABASE_PATH: &str = "bulls.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Runtime configuration loaded from environment variables.
///
/// Command-line flags in the binaries override these values. The bind
/// address is only parsed when the server asks for it, so a bad
/// `BULLS_BIND_ADDR` does not stop the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    bind_addr: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_path: PathBuf = lookup("BULLS_DATABASE_PATH")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_PATH.into())
            .into();
        let bind_addr = lookup("BULLS_BIND_ADDR")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.into());

        Self {
            database_path,
            bind_addr,
        }
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        self.bind_addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| anyhow!("BULLS_BIND_ADDR {:?} is invalid: {}", self.bind_addr, e))
    }

    pub fn with_database_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.database_path = path;
        }
        self
    }

    pub fn with_bind_addr(mut self, addr: Option<SocketAddr>) -> Self {
        if let Some(addr) = addr {
            self.bind_addr = addr.to_string();
        }
        self
    }
}
