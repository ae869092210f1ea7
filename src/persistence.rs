//! Durable storage of the user's chosen locale.
//!
//! Two redundant stores hold the same value: a cookie-class store shared
//! across tabs and a single-tab local store that backs it up. Both sit on a
//! [`KeyValueBackend`], in memory or in a JSON file.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{ Path, PathBuf };
use std::sync::{ Arc, PoisonError, RwLock };
use std::time::{ Duration, SystemTime, UNIX_EPOCH };

use serde::{ Deserialize, Serialize };

use crate::error::PersistenceError;
use crate::locales::Locale;
use crate::normalize::normalize;

/// Cookie holding the cross-tab preference.
pub const COOKIE_NAME: &str = "i18next";
/// Local storage key holding the single-tab backup.
pub const STORAGE_KEY: &str = "i18nextLng";
/// One year.
pub const COOKIE_MAX_AGE: Duration = Duration::from_secs(31_536_000);

/// String key-value storage.
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A JSON object file, re-read on every access so separate processes
/// sharing the file observe each other's writes.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<HashMap<String, String>, PersistenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HashMap::new());
            }
            Err(source) => {
                return Err(PersistenceError::Io { path: self.path.clone(), source });
            }
        };
        serde_json::from_str(&content).map_err(|source| PersistenceError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        // A corrupt file is replaced rather than blocking every future write
        let mut map = self.read_map().unwrap_or_default();
        map.insert(key.to_string(), value.to_string());

        let io_err = |source| PersistenceError::Io { path: self.path.clone(), source };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&map).map_err(|source| PersistenceError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(io_err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        })
    }
}

/// A stored cookie with its attributes and absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age_secs: u64,
    pub same_site: SameSite,
    /// Seconds since the Unix epoch.
    pub expires_at: u64,
}

impl CookieRecord {
    /// Application-wide, `SameSite=Strict` cookie expiring `max_age` from now.
    pub fn new(name: &str, value: &str, max_age: Duration) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            path: "/".to_string(),
            max_age_secs: max_age.as_secs(),
            same_site: SameSite::Strict,
            expires_at: unix_now().saturating_add(max_age.as_secs()),
        }
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

/// Renders the `Set-Cookie` form, e.g.
/// `i18next=ja; Path=/; Max-Age=31536000; SameSite=Strict`.
impl fmt::Display for CookieRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}; Path={}; Max-Age={}; SameSite={}",
            self.name,
            self.value,
            self.path,
            self.max_age_secs,
            self.same_site
        )
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Cookie-class store: survives across tabs and expires after its max age.
pub struct CookieStore {
    backend: Arc<dyn KeyValueBackend>,
    name: String,
    max_age: Duration,
}

impl CookieStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>, name: impl Into<String>, max_age: Duration) -> Self {
        Self { backend, name: name.into(), max_age }
    }

    /// The cookie value, if present and not expired.
    pub fn read(&self) -> Result<Option<String>, PersistenceError> {
        let Some(raw) = self.backend.get(&self.name)? else {
            return Ok(None);
        };
        let record: CookieRecord = serde_json
            ::from_str(&raw)
            .map_err(|e| PersistenceError::Cookie(e.to_string()))?;
        if record.is_expired_at(unix_now()) {
            return Ok(None);
        }
        Ok(Some(record.value))
    }

    /// Stores `value` and returns the record written.
    pub fn write(&self, value: &str) -> Result<CookieRecord, PersistenceError> {
        let record = CookieRecord::new(&self.name, value, self.max_age);
        let raw = serde_json::to_string(&record).map_err(|e| PersistenceError::Cookie(e.to_string()))?;
        self.backend.set(&self.name, &raw)?;
        Ok(record)
    }
}

/// Single-tab persistent store holding the raw value under one key.
pub struct LocalStorage {
    backend: Arc<dyn KeyValueBackend>,
    key: String,
}

impl LocalStorage {
    pub fn new(backend: Arc<dyn KeyValueBackend>, key: impl Into<String>) -> Self {
        Self { backend, key: key.into() }
    }

    pub fn read(&self) -> Result<Option<String>, PersistenceError> {
        self.backend.get(&self.key)
    }

    pub fn write(&self, value: &str) -> Result<(), PersistenceError> {
        self.backend.set(&self.key, value)
    }
}

/// Writes the locale preference to both stores and reads it back.
///
/// Reads never fail: unreadable storage and unsupported values are absent.
pub struct PersistenceAdapter {
    cookie: CookieStore,
    local: LocalStorage,
}

impl PersistenceAdapter {
    pub fn new(cookie: CookieStore, local: LocalStorage) -> Self {
        Self { cookie, local }
    }

    /// Both stores in memory, with the default names.
    pub fn in_memory() -> Self {
        Self::with_backends(Arc::new(MemoryBackend::new()), Arc::new(MemoryBackend::new()))
    }

    /// `cookies.json` and `local_storage.json` under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::with_backends(
            Arc::new(FileBackend::new(dir.join("cookies.json"))),
            Arc::new(FileBackend::new(dir.join("local_storage.json")))
        )
    }

    pub fn with_backends(cookie: Arc<dyn KeyValueBackend>, local: Arc<dyn KeyValueBackend>) -> Self {
        Self::new(
            CookieStore::new(cookie, COOKIE_NAME, COOKIE_MAX_AGE),
            LocalStorage::new(local, STORAGE_KEY)
        )
    }

    /// Writes `locale` to both stores. Both writes are attempted; the first
    /// failure is returned.
    pub fn write(&self, locale: Locale) -> Result<(), PersistenceError> {
        let cookie = self.cookie.write(locale.code());
        let local = self.local.write(locale.code());
        if let Ok(record) = &cookie {
            dev_info!("[i18n] Set-Cookie: {}", record);
        }
        cookie.map(|_| ()).and(local)
    }

    /// Cookie first, then local storage.
    pub fn read(&self) -> Option<Locale> {
        self.read_cookie().or_else(|| self.read_local())
    }

    pub fn read_cookie(&self) -> Option<Locale> {
        degrade(self.cookie.read(), "cookie")
    }

    pub fn read_local(&self) -> Option<Locale> {
        degrade(self.local.read(), "local storage")
    }

    pub fn cookie(&self) -> &CookieStore {
        &self.cookie
    }

    pub fn local(&self) -> &LocalStorage {
        &self.local
    }
}

impl Default for PersistenceAdapter {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn degrade(value: Result<Option<String>, PersistenceError>, source: &str) -> Option<Locale> {
    match value {
        Ok(raw) => normalize(raw.as_deref()),
        Err(e) => {
            dev_warn!("[i18n] Could not read locale from {}: {}", source, e);
            None
        }
    }
}
