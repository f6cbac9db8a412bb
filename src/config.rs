use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::endpoint::{AuthPlacement, Endpoint};
use crate::reconnect::ReconnectPolicy;
use crate::session::SessionConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Chat server address (`ws://` or `wss://`)
    pub url: String,
    /// Bearer credential, sent as configured by `auth`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub auth: AuthPlacement,
    pub connect_timeout_secs: u64,
    pub session: SessionSettings,
}

/// `[session]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub heartbeat_interval_secs: u64,
    pub reconnect_base_delay_ms: u64,
    pub max_reconnect_attempts: u32,
    /// 0.0 keeps reconnect delays exact
    pub reconnect_jitter: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000/ws/chat".to_string(),
            token: None,
            auth: AuthPlacement::Query,
            connect_timeout_secs: 10,
            session: SessionSettings::default(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 30,
            reconnect_base_delay_ms: 1_000,
            max_reconnect_attempts: 5,
            reconnect_jitter: 0.0,
        }
    }
}

impl ClientConfig {
    /// `~/.chatlink/config.toml`
    pub fn default_path() -> PathBuf {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home_dir.join(".chatlink").join("config.toml")
    }

    /// Load from `path` (or the default location). A missing file yields defaults.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = path.unwrap_or_else(Self::default_path);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            let config: ClientConfig = toml::from_str(&content)
                .with_context(|| format!("parsing {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(ClientConfig::default())
        }
    }

    pub fn save(&self, path: Option<PathBuf>) -> Result<()> {
        let config_path = path.unwrap_or_else(Self::default_path);

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("writing {}", config_path.display()))?;
        Ok(())
    }

    /// Apply `CHATLINK_URL` / `CHATLINK_TOKEN` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("CHATLINK_URL").filter(|v| !v.is_empty()) {
            self.url = url;
        }
        if let Some(token) = lookup("CHATLINK_TOKEN").filter(|v| !v.is_empty()) {
            self.token = Some(token);
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        let s = &self.session;
        SessionConfig {
            heartbeat_interval: Duration::from_secs(s.heartbeat_interval_secs.max(1)),
            reconnect: ReconnectPolicy {
                max_attempts: s.max_reconnect_attempts,
                base_delay: Duration::from_millis(s.reconnect_base_delay_ms),
                jitter_ratio: s.reconnect_jitter.clamp(0.0, 1.0),
            },
        }
    }

    pub fn endpoint(&self) -> Result<Endpoint> {
        let mut endpoint = Endpoint::new(&self.url)
            .with_context(|| format!("invalid server url `{}`", self.url))?
            .with_auth(self.auth)
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs));
        if let Some(token) = &self.token {
            endpoint = endpoint.with_token(token.clone());
        }
        endpoint
            .validate()
            .context("token cannot be sent with the selected auth placement")?;
        Ok(endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load(Some(dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "url = \"wss://chat.example.com\"\nauth = \"header\"\n\n[session]\nmax_reconnect_attempts = 3\n",
        )
        .unwrap();

        let config = ClientConfig::load(Some(path)).unwrap();
        assert_eq!(config.url, "wss://chat.example.com");
        assert_eq!(config.auth, AuthPlacement::Header);
        assert_eq!(config.session.max_reconnect_attempts, 3);
        assert_eq!(config.session.heartbeat_interval_secs, 30);
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = ClientConfig::default();
        config.token = Some("abc".into());
        config.session.reconnect_base_delay_ms = 250;

        config.save(Some(path.clone())).unwrap();
        assert_eq!(ClientConfig::load(Some(path)).unwrap(), config);
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "url = [not toml").unwrap();
        let err = ClientConfig::load(Some(path)).unwrap_err();
        assert!(err.to_string().starts_with("parsing"));
    }

    #[test]
    fn env_overrides_url_and_token() {
        let mut config = ClientConfig::default();
        config.apply_overrides(|key| match key {
            "CHATLINK_URL" => Some("ws://10.0.0.1:9000".into()),
            "CHATLINK_TOKEN" => Some("tkn".into()),
            _ => None,
        });
        assert_eq!(config.url, "ws://10.0.0.1:9000");
        assert_eq!(config.token.as_deref(), Some("tkn"));

        config.apply_overrides(|_| Some(String::new()));
        assert_eq!(config.token.as_deref(), Some("tkn"));
    }

    #[test]
    fn session_config_conversion() {
        let config = ClientConfig::default();
        let session = config.session_config();
        assert_eq!(session.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(session.reconnect.base_delay, Duration::from_secs(1));
        assert_eq!(session.reconnect.max_attempts, 5);
        assert_eq!(session.reconnect.jitter_ratio, 0.0);
    }

    #[test]
    fn endpoint_carries_token_and_timeout() {
        let mut config = ClientConfig::default();
        config.token = Some("abc".into());
        config.connect_timeout_secs = 3;
        let endpoint = config.endpoint().unwrap();
        assert_eq!(endpoint.connect_timeout(), Duration::from_secs(3));
        assert_eq!(
            endpoint.request_url().as_str(),
            "ws://127.0.0.1:8000/ws/chat?token=abc"
        );

        config.url = "http://nope".into();
        assert!(config.endpoint().is_err());
    }

    #[test]
    fn header_token_with_newline_is_rejected() {
        let mut config = ClientConfig::default();
        config.token = Some("a\nb".into());
        config.auth = AuthPlacement::Header;
        let err = config.endpoint().unwrap_err();
        assert!(format!("{err:#}").contains("token is not a valid header"));
    }
}
