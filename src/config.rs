//! Device configuration
//!
//! The host hands options over as strings (`config_get_string`). The
//! harness reads the same options from a YAML file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::sync::{DEFAULT_HOST, DEFAULT_PORT};
use crate::timeline::DEFAULT_TICKS_PER_ROW;

/// Host-side option lookup
pub trait ConfigSource {
    /// Value of option `name`, or `default` when unset
    fn get_string(&self, name: &str, default: &str) -> String;
}

impl ConfigSource for HashMap<String, String> {
    fn get_string(&self, name: &str, default: &str) -> String {
        self.get(name).cloned().unwrap_or_else(|| default.to_string())
    }
}

/// Speed option (vsyncs per row), written either as text or as a number
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Speed {
    Number(i64),
    Text(String),
}

/// Device options
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Namespace for saved track files
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_speed")]
    pub speed: Speed,
    /// Track-list file, one `name type` pair per line
    #[serde(default)]
    pub track_list: PathBuf,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl DeviceConfig {
    /// Read options through the host's lookup
    pub fn from_source(source: &dyn ConfigSource) -> Self {
        let port = source.get_string("port", "");
        Self {
            prefix: source.get_string("prefix", ""),
            speed: Speed::Text(source.get_string("speed", "4")),
            track_list: PathBuf::from(source.get_string("track_list", "")),
            host: source.get_string("host", DEFAULT_HOST),
            port: port.trim().parse().unwrap_or(DEFAULT_PORT),
        }
    }

    /// Load options from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: DeviceConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        Ok(config)
    }

    /// Vsyncs per row, coerced to the default when not positive
    pub fn ticks_per_row(&self) -> u32 {
        let speed = match &self.speed {
            Speed::Number(n) => *n,
            Speed::Text(s) => atoi(s),
        };

        match u32::try_from(speed) {
            Ok(speed) if speed > 0 => speed,
            _ => DEFAULT_TICKS_PER_ROW,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            speed: default_speed(),
            track_list: PathBuf::new(),
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Leading whitespace, optional sign, then as many digits as follow.
/// Anything unparsable is 0.
fn atoi(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add(i64::from(byte - b'0'));
    }

    if negative {
        -value
    } else {
        value
    }
}

// Default value functions
fn default_speed() -> Speed { Speed::Text("4".to_string()) }
fn default_host() -> String { DEFAULT_HOST.to_string() }
fn default_port() -> u16 { DEFAULT_PORT }
