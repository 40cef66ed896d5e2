//! Service configuration loaded from the environment.
//!
//! Every setting is read from a `PDFPRESS_`-prefixed variable; the listening port
//! additionally honours the conventional bare `PORT`.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::compress::{LadderError, ProfileLadder, SizeBands};

pub const ENV_PREFIX: &str = "PDFPRESS_";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Compression engine binary.
    #[serde(default = "default_engine_program")]
    pub engine_program: PathBuf,

    #[serde(default = "default_engine_timeout_secs")]
    pub engine_timeout_secs: u64,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Targets at or below this many KB start on the most aggressive profile.
    #[serde(default = "default_aggressive_max_kb")]
    pub aggressive_max_kb: u64,

    /// Targets at or below this many KB start on the mid profile.
    #[serde(default = "default_mid_max_kb")]
    pub mid_max_kb: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Allowed CORS origins; empty allows any.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    3000
}

fn default_engine_program() -> PathBuf {
    PathBuf::from("gs")
}

fn default_engine_timeout_secs() -> u64 {
    60
}

fn default_max_upload_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("compressed")
}

fn default_aggressive_max_kb() -> u64 {
    200
}

fn default_mid_max_kb() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            engine_program: default_engine_program(),
            engine_timeout_secs: default_engine_timeout_secs(),
            max_upload_bytes: default_max_upload_bytes(),
            upload_dir: default_upload_dir(),
            output_dir: default_output_dir(),
            aggressive_max_kb: default_aggressive_max_kb(),
            mid_max_kb: default_mid_max_kb(),
            log_level: default_log_level(),
            cors_origins: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Builds the configuration from explicit `(name, value)` pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();
        let bare_port = vars.iter().find(|(k, _)| k == "PORT").map(|(_, v)| v.clone());

        let mut config: Config = envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .context("invalid PDFPRESS_* environment")?;

        if let Some(port) = bare_port {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid PORT `{port}`"))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine_timeout_secs == 0 {
            bail!("engine timeout must be positive");
        }
        if self.max_upload_bytes == 0 {
            bail!("maximum upload size must be positive");
        }
        self.ladder()?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    pub fn bands(&self) -> SizeBands {
        SizeBands {
            aggressive_max_kb: self.aggressive_max_kb,
            mid_max_kb: self.mid_max_kb,
        }
    }

    pub fn ladder(&self) -> Result<ProfileLadder, LadderError> {
        ProfileLadder::with_bands(self.bands())
    }
}
