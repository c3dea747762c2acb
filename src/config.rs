use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{
    env,
    path::{Component, Path},
};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Simple Storage Service")]
pub struct Args {
    /// Host to bind to (overrides TRIPLE_S_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides TRIPLE_S_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding buckets and catalogs (overrides TRIPLE_S_DIR)
    #[arg(long = "dir")]
    pub storage_dir: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::merge(Args::parse())
    }

    fn merge(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("TRIPLE_S_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("TRIPLE_S_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing TRIPLE_S_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 8080,
            Err(err) => return Err(err).context("reading TRIPLE_S_PORT"),
        };
        let env_storage = env::var("TRIPLE_S_DIR").unwrap_or_else(|_| "data".into());

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
        };
        cfg.validate_storage_dir()?;
        Ok(cfg)
    }

    /// Refuse storage roots that are the filesystem root, climb out through
    /// `..`, or already exist as something other than a directory.
    pub fn validate_storage_dir(&self) -> Result<()> {
        let path = Path::new(&self.storage_dir);
        if self.storage_dir.trim().is_empty() {
            bail!("storage directory must not be empty");
        }
        if path.components().any(|c| c == Component::ParentDir) {
            bail!("storage directory `{}` must not contain `..`", self.storage_dir);
        }
        if path.parent().is_none() {
            bail!("storage directory `{}` cannot be the filesystem root", self.storage_dir);
        }
        if path.exists() && !path.is_dir() {
            bail!(
                "storage directory `{}` exists and is not a directory",
                self.storage_dir
            );
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
