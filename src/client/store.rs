//! Session persistence.
//!
//! A session is two keys, `userEmail` and `sessionToken`. They are always
//! written and removed together through one [`Mutation`] batch, and a record
//! with only one of them present loads as no session at all.

use secrecy::{ExposeSecret, SecretString};
use std::{
    collections::BTreeMap,
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use thiserror::Error;
use tracing::{debug, warn};

pub const EMAIL_KEY: &str = "userEmail";
pub const TOKEN_KEY: &str = "sessionToken";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("session storage lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Set { key: String, value: String },
    Remove { key: String },
}

impl Mutation {
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn remove(key: impl Into<String>) -> Self {
        Self::Remove { key: key.into() }
    }

    fn apply_to(&self, map: &mut BTreeMap<String, String>) {
        match self {
            Self::Set { key, value } => {
                map.insert(key.clone(), value.clone());
            }
            Self::Remove { key } => {
                map.remove(key);
            }
        }
    }
}

/// Durable string map. `apply` must commit the whole batch or none of it.
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Values for `keys`, in order, taken from one view of the store.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    /// # Errors
    /// Returns an error if the batch could not be committed.
    fn apply(&self, batch: &[Mutation]) -> Result<(), StoreError>;

    /// # Errors
    /// Returns an error if the value could not be committed.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.apply(&[Mutation::set(key, value)])
    }

    /// # Errors
    /// Returns an error if the removal could not be committed.
    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.apply(&[Mutation::remove(key)])
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(keys.iter().map(|key| entries.get(*key).cloned()).collect())
    }

    fn apply(&self, batch: &[Mutation]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        for mutation in batch {
            mutation.apply_to(&mut entries);
        }
        Ok(())
    }
}

/// JSON object on disk. Each batch rewrites a sibling temp file and renames it
/// over the original, so readers see either the old or the new map. On unix
/// the file is readable by its owner only.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = create_private(&tmp)?;
            file.write_all(&serde_json::to_vec_pretty(entries)?)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation; a leftover temp file keeps its own
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read()?.remove(key))
    }

    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut entries = self.read()?;
        Ok(keys.iter().map(|key| entries.remove(*key)).collect())
    }

    fn apply(&self, batch: &[Mutation]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut entries = self.read()?;
        for mutation in batch {
            mutation.apply_to(&mut entries);
        }
        self.write(&entries)
    }
}

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub email: String,
    pub token: SecretString,
}

impl SessionRecord {
    pub fn new(email: impl Into<String>, token: SecretString) -> Self {
        Self {
            email: email.into(),
            token,
        }
    }
}

/// Typed view of the two session keys.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    pub fn load(&self) -> Result<Option<SessionRecord>, StoreError> {
        let mut values = self.backend.get_many(&[EMAIL_KEY, TOKEN_KEY])?.into_iter();
        let email = values.next().flatten();
        let token = values.next().flatten();

        match (email, token) {
            (Some(email), Some(token)) if !email.is_empty() && !token.is_empty() => {
                debug!(email = %email, "session restored");
                Ok(Some(SessionRecord::new(email, SecretString::from(token))))
            }
            (None, None) => Ok(None),
            _ => {
                warn!("incomplete session record ignored");
                Ok(None)
            }
        }
    }

    /// # Errors
    /// Returns an error if the record could not be committed.
    pub fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        self.backend.apply(&[
            Mutation::set(EMAIL_KEY, record.email.as_str()),
            Mutation::set(TOKEN_KEY, record.token.expose_secret()),
        ])
    }

    /// # Errors
    /// Returns an error if the removal could not be committed.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend
            .apply(&[Mutation::remove(EMAIL_KEY), Mutation::remove(TOKEN_KEY)])
    }
}
