use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Loaded once at startup from `config/server.toml`; also the shape written
/// back out on shutdown to persist §6's "hostname, port, ARCHIVE cvars,
/// banned IPs" across restarts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_tickrate")]
    pub tickrate: u16,
    #[serde(default = "default_map")]
    pub map: String,
    #[serde(default = "default_max_players")]
    pub max_players: u16,
    #[serde(default = "default_motd")]
    pub motd: String,
    /// Empty means no password required; a non-empty server salt is still
    /// generated so `ServerInfo`'s `password_hash_type` field is meaningful.
    #[serde(default)]
    pub password_hash: Vec<u8>,
    #[serde(default)]
    pub password_salt: Vec<u8>,
    /// ARCHIVE-flagged cvar values, persisted here since no scripting
    /// language ships with this core to own a config format of its own.
    #[serde(default)]
    pub cvars: HashMap<String, String>,
    #[serde(default)]
    pub banned_ips: Vec<IpAddr>,
    /// `None` disables rcon entirely, matching §4.8's description of rcon as
    /// optional.
    #[serde(default)]
    pub rcon_password: Option<String>,
}

fn default_hostname() -> String {
    "A Brigade Server".into()
}

fn default_port() -> u16 {
    27015
}

fn default_tickrate() -> u16 {
    64
}

fn default_map() -> String {
    "ctf_well".into()
}

fn default_max_players() -> u16 {
    24
}

fn default_motd() -> String {
    "welcome".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            port: default_port(),
            tickrate: default_tickrate(),
            map: default_map(),
            max_players: default_max_players(),
            motd: default_motd(),
            password_hash: Vec::new(),
            password_salt: Vec::new(),
            cvars: HashMap::new(),
            banned_ips: Vec::new(),
            rcon_password: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: ServerConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::info!("No config file found at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = ServerConfig::load(Path::new("/nonexistent/server.toml")).unwrap();
        assert_eq!(config.port, default_port());
        assert_eq!(config.tickrate, default_tickrate());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = std::env::temp_dir().join("brigade-server-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("server.toml");

        let mut config = ServerConfig::default();
        config.hostname = "My Server".into();
        config.cvars.insert("sv_motd".into(), "hi".into());
        config.save(&path).unwrap();

        let loaded = ServerConfig::load(&path).unwrap();
        assert_eq!(loaded.hostname, "My Server");
        assert_eq!(loaded.cvars.get("sv_motd"), Some(&"hi".to_string()));

        std::fs::remove_file(&path).ok();
    }
}
