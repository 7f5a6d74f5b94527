//! [`IgfsConfig`]: static configuration, loaded from TOML the way the
//! teacher would load an NFS export table — deserialized with `serde`,
//! parsed with `toml` (both already part of the teacher's dependency
//! stack, unused there).

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{IgfsError, Result};
use crate::model::Mode;
use crate::path::Path;

fn default_mode() -> String {
    "PRIMARY".to_string()
}

fn default_block_size() -> u32 {
    64 * 1024
}

fn default_prefetch_blocks() -> u32 {
    0
}

fn default_sequential_reads_before_prefetch() -> u32 {
    2
}

fn default_max_space_size() -> u64 {
    0
}

fn default_busy_ready_wait_millis() -> u64 {
    30_000
}

/// A `(prefix, mode)` row from the `[[prefixes]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct PrefixRow {
    pub path: String,
    pub mode: String,
}

/// Top-level configuration deserialized from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct IgfsConfig {
    pub name: String,
    #[serde(default)]
    pub has_secondary: bool,
    #[serde(default = "default_mode")]
    pub default_mode: String,
    #[serde(default)]
    pub prefixes: Vec<PrefixRow>,
    #[serde(default = "default_block_size")]
    pub block_size: u32,
    #[serde(default = "default_prefetch_blocks")]
    pub prefetch_blocks: u32,
    #[serde(default = "default_sequential_reads_before_prefetch")]
    pub sequential_reads_before_prefetch: u32,
    #[serde(default = "default_max_space_size")]
    pub max_space_size: u64,
    #[serde(default = "default_busy_ready_wait_millis")]
    pub busy_ready_wait_millis: u64,
}

fn parse_mode(raw: &str) -> Result<Mode> {
    match raw {
        "PRIMARY" => Ok(Mode::Primary),
        "PROXY" => Ok(Mode::Proxy),
        "DUAL_SYNC" => Ok(Mode::DualSync),
        "DUAL_ASYNC" => Ok(Mode::DualAsync),
        other => Err(IgfsError::InvalidArgument(format!("unknown mode `{other}`"))),
    }
}

impl IgfsConfig {
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| IgfsError::InvalidArgument(format!("invalid config: {err}")))
    }

    pub fn resolved_default_mode(&self) -> Result<Mode> {
        parse_mode(&self.default_mode)
    }

    pub fn resolved_prefixes(&self) -> Result<Vec<(Path, Mode)>> {
        self.prefixes
            .iter()
            .map(|row| {
                let path = Path::parse(&row.path)
                    .ok_or_else(|| IgfsError::InvalidArgument(format!("prefix `{}` is not an absolute path", row.path)))?;
                Ok((path, parse_mode(&row.mode)?))
            })
            .collect()
    }

    /// Default directory properties applied when `mkdirs` gets none.
    pub fn default_dir_properties(&self) -> HashMap<String, String> {
        crate::model::default_dir_properties()
    }
}
