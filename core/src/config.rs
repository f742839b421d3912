//! Configuration management

use crate::sender::LINE_CAPACITY;
use crate::utils::string::{is_valid_channel_name, is_valid_nickname};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Longest nickname the bridge will register with
pub const MAX_NICKNAME_LENGTH: usize = 30;

/// Smallest line buffer that still fits a registration line
pub const MIN_LINE_CAPACITY: usize = 64;

/// Bridge settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Bot identity
    pub bot: BotConfig,
    /// IRC server connection
    pub irc: IrcConfig,
}

/// Bot identity settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Nickname, username and realname on IRC
    pub name: String,
    /// Status message shown on the Tox side
    pub status: String,
    /// Tox ID of the bot's master
    pub master: String,
    /// Channel joined on startup
    pub default_channel: String,
    /// Verbose logging
    pub verbose: bool,
}

/// IRC connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrcConfig {
    /// Server hostname
    pub server: String,
    /// Port or service name
    pub port: String,
    /// Server password sent with PASS
    pub password: Option<String>,
    /// Capacity of the outbound line buffer in bytes
    pub line_capacity: usize,
    /// Maximum number of registered channels
    pub max_channels: Option<usize>,
    /// First reconnect delay in seconds
    pub reconnect_base_delay: u64,
    /// Longest reconnect delay in seconds
    pub reconnect_max_delay: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "toxirc".to_string(),
            status: "Send me help for more info.".to_string(),
            master: String::new(),
            default_channel: "#toxirc".to_string(),
            verbose: true,
        }
    }
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            server: "chat.freenode.net".to_string(),
            port: "6667".to_string(),
            password: None,
            line_capacity: LINE_CAPACITY,
            max_channels: None,
            reconnect_base_delay: 5,
            reconnect_max_delay: 300,
        }
    }
}

impl IrcConfig {
    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_base_delay)
    }

    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_max_delay)
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Save settings to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if !is_valid_nickname(&self.bot.name, MAX_NICKNAME_LENGTH) {
            return Err(Error::Config(format!(
                "Bot name '{}' is not a valid IRC nickname",
                self.bot.name
            )));
        }

        if !self.bot.default_channel.is_empty() && !is_valid_channel_name(&self.bot.default_channel) {
            return Err(Error::Config(format!(
                "Default channel '{}' is not a valid channel name",
                self.bot.default_channel
            )));
        }

        if self.irc.server.trim().is_empty() {
            return Err(Error::Config("IRC server cannot be empty".to_string()));
        }

        if self.irc.port.trim().is_empty() {
            return Err(Error::Config("IRC port cannot be empty".to_string()));
        }

        if let Some(password) = &self.irc.password {
            if password.is_empty() || password.contains(char::is_whitespace) {
                return Err(Error::Config(
                    "IRC password cannot be empty or contain whitespace".to_string(),
                ));
            }
        }

        if self.irc.line_capacity < MIN_LINE_CAPACITY {
            return Err(Error::Config(format!(
                "Line capacity must be at least {} bytes",
                MIN_LINE_CAPACITY
            )));
        }

        if self.irc.max_channels == Some(0) {
            return Err(Error::Config("max_channels cannot be 0".to_string()));
        }

        if self.irc.reconnect_base_delay > self.irc.reconnect_max_delay {
            return Err(Error::Config(
                "reconnect_base_delay cannot exceed reconnect_max_delay".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.bot.name, "toxirc");
        assert_eq!(settings.bot.default_channel, "#toxirc");
        assert_eq!(settings.irc.server, "chat.freenode.net");
        assert_eq!(settings.irc.port, "6667");
        assert_eq!(settings.irc.line_capacity, 512);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [bot]
            name = "bridge"

            [irc]
            server = "irc.libera.chat"
            port = "ircd"
            "#,
        )
        .unwrap();

        assert_eq!(settings.bot.name, "bridge");
        assert_eq!(settings.bot.default_channel, "#toxirc");
        assert_eq!(settings.irc.server, "irc.libera.chat");
        assert_eq!(settings.irc.port, "ircd");
        assert_eq!(settings.irc.reconnect_max_delay(), Duration::from_secs(300));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toxirc.toml");

        let mut settings = Settings::default();
        settings.irc.password = Some("secret".to_string());
        settings.irc.max_channels = Some(16);
        settings.to_file(&path).unwrap();

        let loaded = Settings::from_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = Settings::from_file("/nonexistent/toxirc.toml");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.bot.name = "tox irc".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.bot.default_channel = "toxirc".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.irc.port = String::new();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.irc.line_capacity = 16;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.irc.reconnect_base_delay = 600;
        assert!(settings.validate().is_err());
    }
}
