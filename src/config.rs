//! Configuration for quadrant.
//!
//! Read from `quadrant.toml`, then overridden by environment variables, then
//! by CLI flags. The file is looked up at `--config`, `$QUADRANT_CONFIG`, or
//! `<config dir>/quadrant/quadrant.toml`; a missing file means defaults.
//!
//! ```toml
//! [storage]
//! data_dir = "/home/ada/.local/share/quadrant"
//!
//! [auth]
//! provider = "device"          # or "local"
//! client_id = "1234.apps.googleusercontent.com"
//! client_secret = "GOCSPX-..."
//! scope = "openid profile"
//!
//! [server]
//! port = 7878
//! dev = false
//!
//! [log]
//! level = "info"
//! json = false
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::auth::device::{
    DEFAULT_SCOPE, DeviceFlowConfig, GOOGLE_DEVICE_CODE_URL, GOOGLE_TOKEN_URL, GOOGLE_USERINFO_URL,
};

pub const CONFIG_FILE_NAME: &str = "quadrant.toml";

/// Which identity provider signs the user in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// OAuth device authorization grant against the configured endpoints.
    #[default]
    Device,
    /// Fixed identity from `auth.local_user`; no network.
    Local,
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthProvider::Device => write!(f, "device"),
            AuthProvider::Local => write!(f, "local"),
        }
    }
}

impl std::str::FromStr for AuthProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "device" | "google" => Ok(AuthProvider::Device),
            "local" => Ok(AuthProvider::Local),
            _ => anyhow::bail!("Invalid auth provider '{}'. Valid values: device, local", s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSection {
    /// Directory holding `tasks.db` and `session.json`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSection {
    #[serde(default)]
    pub provider: AuthProvider,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_device_code_url")]
    pub device_code_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_userinfo_url")]
    pub userinfo_url: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Identity used by the local provider.
    #[serde(default)]
    pub local_user: Option<String>,
    #[serde(default)]
    pub local_display_name: Option<String>,
}

fn default_device_code_url() -> String {
    GOOGLE_DEVICE_CODE_URL.to_string()
}

fn default_token_url() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

fn default_userinfo_url() -> String {
    GOOGLE_USERINFO_URL.to_string()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            provider: AuthProvider::default(),
            client_id: None,
            client_secret: None,
            device_code_url: default_device_code_url(),
            token_url: default_token_url(),
            userinfo_url: default_userinfo_url(),
            scope: default_scope(),
            local_user: None,
            local_display_name: None,
        }
    }
}

impl AuthSection {
    pub fn device_flow(&self) -> DeviceFlowConfig {
        let provider_name = if self.device_code_url == GOOGLE_DEVICE_CODE_URL {
            "google"
        } else {
            "oauth"
        };
        DeviceFlowConfig {
            client_id: self.client_id.clone().unwrap_or_default(),
            client_secret: self.client_secret.clone(),
            device_code_url: self.device_code_url.clone(),
            token_url: self.token_url.clone(),
            userinfo_url: self.userinfo_url.clone(),
            scope: self.scope.clone(),
            provider_name: provider_name.to_string(),
        }
    }

    /// User id for the local provider; `local` when unset.
    pub fn local_user(&self) -> String {
        self.local_user
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| "local".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Permissive CORS for a separately served front end.
    #[serde(default)]
    pub dev: bool,
}

fn default_port() -> u16 {
    7878
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            dev: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSection {
    /// Default filter directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Where the interactive board writes its log files.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuadrantConfig {
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub log: LogSection,
}

impl QuadrantConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse quadrant.toml")
    }

    /// Load from `path`, or defaults if the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize quadrant.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Resolve the config path, load it, and apply environment overrides.
    pub fn resolve(cli_path: Option<&Path>) -> Result<(Self, PathBuf)> {
        let path = config_path(cli_path, |k| std::env::var(k).ok());
        let mut config = Self::load_or_default(&path)?;
        config.apply_env(|k| std::env::var(k).ok())?;
        Ok((config, path))
    }

    /// Apply `QUADRANT_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup("QUADRANT_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(provider) = lookup("QUADRANT_AUTH_PROVIDER") {
            self.auth.provider = provider.parse()?;
        }
        if let Some(id) = lookup("QUADRANT_CLIENT_ID") {
            self.auth.client_id = Some(id);
        }
        if let Some(secret) = lookup("QUADRANT_CLIENT_SECRET") {
            self.auth.client_secret = Some(secret);
        }
        if let Some(user) = lookup("QUADRANT_USER") {
            self.auth.local_user = Some(user);
        }
        if let Some(port) = lookup("QUADRANT_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid QUADRANT_PORT '{}'", port))?;
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("quadrant")))
            .unwrap_or_else(|| PathBuf::from(".quadrant"))
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("tasks.db")
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir().join("session.json")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log
            .dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("logs"))
    }

    /// Validate configuration and return warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.auth.provider == AuthProvider::Device
            && self.auth.client_id.as_deref().is_none_or(|id| id.trim().is_empty())
        {
            warnings.push(
                "auth.provider is 'device' but no auth.client_id is set; sign-in will fail"
                    .to_string(),
            );
        }
        for (name, url) in [
            ("auth.device_code_url", &self.auth.device_code_url),
            ("auth.token_url", &self.auth.token_url),
            ("auth.userinfo_url", &self.auth.userinfo_url),
        ] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                warnings.push(format!("{} '{}' is not an http(s) URL", name, url));
            }
        }
        if self.server.port == 0 {
            warnings.push("server.port is 0; the OS will pick a port".to_string());
        }
        warnings
    }
}

/// `--config` → `$QUADRANT_CONFIG` → platform config dir.
pub fn config_path(cli_path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    if let Some(path) = lookup("QUADRANT_CONFIG") {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .map(|d| d.join("quadrant"))
        .unwrap_or_else(|| PathBuf::from(".quadrant"))
        .join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_parse_empty_gives_defaults() {
        let config = QuadrantConfig::parse("").unwrap();
        assert_eq!(config, QuadrantConfig::default());
        assert_eq!(config.auth.provider, AuthProvider::Device);
        assert_eq!(config.auth.token_url, GOOGLE_TOKEN_URL);
        assert_eq!(config.server.port, 7878);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_parse_sections() {
        let content = r#"
[storage]
data_dir = "/tmp/q"

[auth]
provider = "local"
local_user = "ada"
local_display_name = "Ada Lovelace"

[server]
port = 9000
dev = true

[log]
level = "debug"
json = true
"#;
        let config = QuadrantConfig::parse(content).unwrap();
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/q"));
        assert_eq!(config.db_path(), PathBuf::from("/tmp/q/tasks.db"));
        assert_eq!(config.session_path(), PathBuf::from("/tmp/q/session.json"));
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/q/logs"));
        assert_eq!(config.auth.provider, AuthProvider::Local);
        assert_eq!(config.auth.local_user(), "ada");
        assert_eq!(config.server.port, 9000);
        assert!(config.server.dev);
        assert!(config.log.json);
    }

    #[test]
    fn test_parse_rejects_unknown_provider() {
        assert!(QuadrantConfig::parse("[auth]\nprovider = \"ldap\"").is_err());
    }

    #[test]
    fn test_auth_provider_from_str() {
        assert_eq!("local".parse::<AuthProvider>().unwrap(), AuthProvider::Local);
        assert_eq!("Google".parse::<AuthProvider>().unwrap(), AuthProvider::Device);
        let err = "ldap".parse::<AuthProvider>().unwrap_err();
        assert!(err.to_string().contains("Valid values"));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = QuadrantConfig::parse("[server]\nport = 9000").unwrap();
        config
            .apply_env(env(&[
                ("QUADRANT_DATA_DIR", "/data"),
                ("QUADRANT_AUTH_PROVIDER", "local"),
                ("QUADRANT_USER", "grace"),
                ("QUADRANT_CLIENT_ID", "cid"),
                ("QUADRANT_PORT", "8123"),
            ]))
            .unwrap();
        assert_eq!(config.data_dir(), PathBuf::from("/data"));
        assert_eq!(config.auth.provider, AuthProvider::Local);
        assert_eq!(config.auth.local_user(), "grace");
        assert_eq!(config.auth.client_id.as_deref(), Some("cid"));
        assert_eq!(config.server.port, 8123);
    }

    #[test]
    fn test_env_rejects_bad_port() {
        let mut config = QuadrantConfig::default();
        assert!(config.apply_env(env(&[("QUADRANT_PORT", "http")])).is_err());
    }

    #[test]
    fn test_config_path_priority() {
        let cli = PathBuf::from("/cli/quadrant.toml");
        let from_env = env(&[("QUADRANT_CONFIG", "/env/quadrant.toml")]);
        assert_eq!(config_path(Some(&cli), &from_env), cli);
        assert_eq!(config_path(None, &from_env), PathBuf::from("/env/quadrant.toml"));
        assert!(config_path(None, env(&[])).ends_with(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let config = QuadrantConfig::load_or_default(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, QuadrantConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let mut config = QuadrantConfig::default();
        config.auth.provider = AuthProvider::Local;
        config.storage.data_dir = Some(dir.path().join("data"));
        config.save(&path).unwrap();
        assert_eq!(QuadrantConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_validate_flags_missing_client_id() {
        let warnings = QuadrantConfig::default().validate();
        assert!(warnings.iter().any(|w| w.contains("client_id")));

        let mut local = QuadrantConfig::default();
        local.auth.provider = AuthProvider::Local;
        assert!(local.validate().is_empty());
    }

    #[test]
    fn test_device_flow_from_section() {
        let mut auth = AuthSection::default();
        auth.client_id = Some("cid".into());
        let flow = auth.device_flow();
        assert_eq!(flow.client_id, "cid");
        assert_eq!(flow.provider_name, "google");

        auth.device_code_url = "https://idp.example.com/device".into();
        assert_eq!(auth.device_flow().provider_name, "oauth");
    }

    #[test]
    fn test_local_user_defaults() {
        let mut auth = AuthSection::default();
        assert_eq!(auth.local_user(), "local");
        auth.local_user = Some("  ".into());
        assert_eq!(auth.local_user(), "local");
    }
}
