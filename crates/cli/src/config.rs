//! CLI configuration management

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub filter: FilterSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub transfer: TransferSettings,
}

/// Which devices `list` reports by default
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSettings {
    /// `VID:PID` pattern, e.g. `"0x1209:*"`; absent means every device
    #[serde(default)]
    pub device: Option<String>,
    /// Hide HID class devices
    #[serde(default)]
    pub skip_hid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "LoggingSettings::default_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

impl LoggingSettings {
    fn default_level() -> String {
        "warn".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSettings {
    /// Buffer size used by `read`
    #[serde(default = "TransferSettings::default_read_size")]
    pub read_size: usize,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            read_size: Self::default_read_size(),
        }
    }
}

impl TransferSettings {
    fn default_read_size() -> usize {
        64
    }
}

impl CliConfig {
    /// Load configuration from `path`, or from the default location
    ///
    /// An explicit path must exist. Without one, a missing default file
    /// yields the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref()),
            None => {
                let default = Self::default_path();
                if !default.exists() {
                    tracing::debug!("No configuration file found, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: CliConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::debug!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("rawusb").join("config.toml")
        } else {
            PathBuf::from(".config/rawusb/config.toml")
        }
    }

    fn validate(&self) -> Result<()> {
        validate_log_level(&self.logging.level)?;

        if let Some(device) = &self.filter.device {
            parse_filter(device)?;
        }

        if self.transfer.read_size == 0 {
            return Err(anyhow!("transfer.read_size must be greater than zero"));
        }

        Ok(())
    }
}

pub fn validate_log_level(level: &str) -> Result<()> {
    if !VALID_LOG_LEVELS.contains(&level) {
        return Err(anyhow!(
            "Invalid log level '{}', must be one of: {}",
            level,
            VALID_LOG_LEVELS.join(", ")
        ));
    }
    Ok(())
}

/// Parse a `VID:PID` filter into enumeration IDs, `*` becoming 0
///
/// A bare `VID` is accepted as `VID:*`.
pub fn parse_filter(filter: &str) -> Result<(u16, u16)> {
    let mut parts = filter.split(':');
    let (vid, pid) = match (parts.next(), parts.next(), parts.next()) {
        (Some(vid), None, None) => (vid, "*"),
        (Some(vid), Some(pid), None) => (vid, pid),
        _ => {
            return Err(anyhow!(
                "Invalid filter format '{}', expected VID:PID (e.g., '0x1234:0x5678' or '0x1234:*')",
                filter
            ));
        }
    };

    Ok((parse_id(vid, "VID")?, parse_id(pid, "PID")?))
}

fn parse_id(id: &str, name: &str) -> Result<u16> {
    if id == "*" {
        return Ok(0);
    }

    let hex_part = id
        .strip_prefix("0x")
        .or_else(|| id.strip_prefix("0X"))
        .unwrap_or(id);
    if hex_part.is_empty() || hex_part.len() > 4 {
        return Err(anyhow!(
            "Invalid {} '{}', hex part must be 1-4 digits",
            name,
            id
        ));
    }

    u16::from_str_radix(hex_part, 16)
        .map_err(|_| anyhow!("Invalid {} '{}', not a valid hex number", name, id))
}

/// Decode a hex payload such as `"0a0b0c"` or `"0a 0b 0c"`
pub fn parse_hex(data: &str) -> Result<Vec<u8>> {
    let digits: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.is_empty() {
        return Err(anyhow!("Payload is empty"));
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow!("Payload '{}' is not valid hex", data));
    }
    if digits.len() % 2 != 0 {
        return Err(anyhow!("Payload '{}' has an odd number of hex digits", data));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("Payload '{}' is not valid hex", data))
        })
        .collect()
}
