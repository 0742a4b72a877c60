use super::{AuthError, JwtToken};
use crate::setting::{self, SessionStorage};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, io::ErrorKind, path::PathBuf};

/// The signed-in user record kept by the session store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub access_token: String,
    pub role: String,
    pub id: i64,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
}

impl SessionUser {
    pub fn new(access_token: String, claims: JwtToken) -> Self {
        Self {
            access_token,
            role: claims.role,
            id: claims.id,
            email: claims.email,
            name: claims.name,
            surname: claims.surname,
        }
    }
}

/// Key-value port the sessions are persisted through.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError>;
    fn set(&self, key: &str, value: String) -> Result<(), AuthError>;
    fn remove(&self, key: &str) -> Result<(), AuthError>;
}

/// Process memory, lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RwLock<HashMap<String, String>>,
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        Ok(self.inner.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), AuthError> {
        self.inner.write().insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        self.inner.write().remove(key);
        Ok(())
    }
}

/// A json object file, survives restarts.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<HashMap<String, String>, AuthError> {
        match fs::read(&self.path) {
            Ok(buf) if buf.is_empty() => Ok(HashMap::new()),
            Ok(buf) => Ok(serde_json::from_slice(&buf)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        tmp.into()
    }

    /// Write a sibling file then rename it over the store, readers never see a partial file.
    fn save(&self, map: &HashMap<String, String>) -> Result<(), AuthError> {
        let tmp = self.tmp_path();
        fs::write(&tmp, serde_json::to_vec(map)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, AuthError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: String) -> Result<(), AuthError> {
        let _guard = self.lock.lock();
        let mut map = self.load()?;
        map.insert(key.to_owned(), value);
        self.save(&map)
    }

    fn remove(&self, key: &str) -> Result<(), AuthError> {
        let _guard = self.lock.lock();
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.save(&map)?;
        }
        Ok(())
    }
}

/// Session provider, one per application.
pub struct Sessions {
    storage: Box<dyn Storage>,
}

impl Sessions {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn from_setting(setting: &setting::Session) -> Self {
        match setting.storage {
            SessionStorage::Memory => Self::new(Box::<MemoryStorage>::default()),
            SessionStorage::File => Self::new(Box::new(FileStorage::new(setting.path.clone()))),
        }
    }

    fn key(id: i64) -> String {
        format!("auth:{}", id)
    }

    pub fn login(&self, user: &SessionUser) -> Result<(), AuthError> {
        self.storage
            .set(&Self::key(user.id), serde_json::to_string(user)?)
    }

    pub fn logout(&self, id: i64) -> Result<(), AuthError> {
        self.storage.remove(&Self::key(id))
    }

    pub fn current(&self, id: i64) -> Result<Option<SessionUser>, AuthError> {
        match self.storage.get(&Self::key(id))? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
