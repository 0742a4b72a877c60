use crate::{Error, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// number of threads config
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Thread {
    /// number of http server threads
    pub http: usize,
}

/// network config
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Network {
    /// server bind host
    pub host: String,
    /// server bind port
    pub port: u16,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// auth config
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Auth {
    /// secret shared with the auth backend that signs access tokens
    pub secret: Option<String>,

    /// roles admitted to the donation routes
    pub roles: Vec<String>,
}

impl Auth {
    pub fn allows(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            secret: None,
            roles: vec!["admin".to_owned(), "user".to_owned()],
        }
    }
}

/// where signed-in sessions are kept
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStorage {
    Memory,
    File,
}

impl Default for SessionStorage {
    fn default() -> Self {
        Self::File
    }
}

/// session config
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Session {
    pub storage: SessionStorage,
    /// json file used by the `file` storage
    pub path: PathBuf,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            storage: Default::default(),
            path: PathBuf::from("sessions.json"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Setting {
    /// database url of the hosted donation store
    /// https://www.sea-ql.org/SeaORM/docs/install-and-config/connection/
    pub db_url: Option<String>,

    pub thread: Thread,
    pub network: Network,

    pub auth: Auth,
    pub session: Session,
}

impl Setting {
    /// read config from file and env
    pub fn read<P: AsRef<Path>>(file: P, env_prefix: Option<String>) -> Result<Self> {
        let name = file
            .as_ref()
            .to_str()
            .ok_or_else(|| Error::Message("invalid config path".to_owned()))?;
        let mut config = Config::builder().add_source(File::with_name(name));
        if let Some(prefix) = env_prefix {
            config = config.add_source(Self::env_source(&prefix));
        }

        let config = config.build()?;
        let mut setting: Setting = config.try_deserialize()?;
        setting.validate()?;
        Ok(setting)
    }

    fn env_source(prefix: &str) -> Environment {
        Environment::with_prefix(prefix)
            .try_parsing(true)
            .prefix_separator("_")
            .separator("__")
            .list_separator(" ")
            .with_list_parse_key("auth.roles")
    }

    /// read config from env
    pub fn from_env(env_prefix: String) -> Result<Self> {
        let mut config = Config::builder();
        config = config.add_source(Self::env_source(&env_prefix));

        let config = config.build()?;
        let mut setting: Setting = config.try_deserialize()?;
        setting.validate()?;
        Ok(setting)
    }

    /// config from str
    pub fn from_str(s: &str, format: FileFormat) -> Result<Self> {
        let builder = Config::builder();
        let config = builder.add_source(File::from_str(s, format)).build()?;
        let mut setting: Setting = config.try_deserialize()?;
        setting.validate()?;
        Ok(setting)
    }

    /// Names of the required values that are absent.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = vec![];
        if self.db_url.is_none() {
            missing.push("db_url");
        }
        if self.auth.secret.is_none() {
            missing.push("auth.secret");
        }
        missing
    }

    fn validate(&mut self) -> Result<()> {
        // blank env values count as unset
        if self.db_url.as_deref().map_or(false, |s| s.trim().is_empty()) {
            self.db_url = None;
        }
        if self
            .auth
            .secret
            .as_deref()
            .map_or(false, |s| s.trim().is_empty())
        {
            self.auth.secret = None;
        }
        Ok(())
    }
}
