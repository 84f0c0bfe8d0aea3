//! Configuration management for weft.
//!
//! Loads configuration from `${WEFT_HOME}/config.toml` with sensible
//! defaults. A missing file is not an error; a malformed one is.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One server the client should connect to at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server address, e.g. `irc.libera.chat`.
    pub host: String,
    /// Nick override for this server; falls back to the global nick.
    #[serde(default)]
    pub nick: Option<String>,
    /// Channels to join once registration completes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub autojoin: Vec<String>,
}

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default nick used when a server entry does not override it.
    pub nick: String,
    /// Servers connected on startup.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<ServerConfig>,
    /// Default tracing filter directive (overridden by `WEFT_LOG`).
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nick: "guest".to_string(),
            servers: Vec::new(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads the configuration from the default location.
    ///
    /// Returns defaults when no config file exists yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads the configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }

    /// Resolves the nick to use for a server entry.
    pub fn nick_for<'a>(&'a self, server: &'a ServerConfig) -> &'a str {
        server.nick.as_deref().unwrap_or(&self.nick)
    }
}

/// Template written by `weft config init`.
pub fn default_config_toml() -> &'static str {
    r##"# weft configuration

# Default nick, used unless a server entry overrides it.
nick = "guest"

# Tracing filter for the log file (overridden by WEFT_LOG).
# log_filter = "info"

# Servers connected on startup.
# [[servers]]
# host = "irc.example.org"
# nick = "someone-else"
# autojoin = ["#weft"]
"##
}

/// Filesystem locations, honoring the `WEFT_HOME` override.
pub mod paths {
    use std::path::PathBuf;

    /// Base directory for config and logs: `$WEFT_HOME` or `~/.weft`.
    pub fn weft_home() -> PathBuf {
        if let Some(home) = std::env::var_os("WEFT_HOME") {
            return PathBuf::from(home);
        }
        home_dir().map_or_else(|| PathBuf::from(".weft"), |home| home.join(".weft"))
    }

    /// Path to `config.toml` under the weft home.
    pub fn config_path() -> PathBuf {
        weft_home().join("config.toml")
    }

    /// The user's home directory, if known.
    pub fn home_dir() -> Option<PathBuf> {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.nick, "guest");
        assert!(config.servers.is_empty());
    }

    #[test]
    fn test_load_parses_servers_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r##"
nick = "nickly"

[[servers]]
host = "irc.example.org"
autojoin = ["#general"]

[[servers]]
host = "irc.other.net"
nick = "other"
"##,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.nick, "nickly");
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.nick_for(&config.servers[0]), "nickly");
        assert_eq!(config.nick_for(&config.servers[1]), "other");
        assert_eq!(config.servers[0].autojoin, vec!["#general".to_string()]);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "nick = [not toml").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_default_template_parses() {
        let config: Config = toml::from_str(default_config_toml()).unwrap();
        assert_eq!(config.nick, "guest");
    }
}
