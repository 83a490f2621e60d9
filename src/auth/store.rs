use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::token::AccessCredential;
use crate::error::{DecanterError, Result};

/// Storage capability for the persisted credential.
///
/// `load` and `save` must each be atomic with respect to concurrent callers.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<AccessCredential>>;
    fn save(&self, credential: &AccessCredential) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Configuration for file-backed credential storage.
#[derive(Debug, Clone)]
pub struct CredentialStoreConfig {
    pub base_dir: PathBuf,
    pub profile: String,
}

impl CredentialStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            profile: "default".to_string(),
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn default_dir() -> PathBuf {
        default_decanter_dir()
    }
}

/// File-backed credential store using one TOML file per profile.
///
/// # Example
/// ```no_run
/// use decanter::auth::{AccessCredential, CredentialStore, FileCredentialStore};
///
/// let store = FileCredentialStore::new_default();
/// let credential = AccessCredential {
///     access_token: "access".to_string(),
///     refresh_token: "refresh".to_string(),
///     token_type: "Bearer".to_string(),
///     expiry: None,
/// };
/// store.save(&credential)?;
/// # Ok::<(), decanter::error::DecanterError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    base_dir: PathBuf,
    profile: String,
}

impl FileCredentialStore {
    pub fn new(config: CredentialStoreConfig) -> Self {
        Self {
            base_dir: config.base_dir,
            profile: normalize_label(&config.profile),
        }
    }

    pub fn new_default() -> Self {
        Self::new(CredentialStoreConfig::new(default_decanter_dir()))
    }

    pub fn path(&self) -> PathBuf {
        self.base_dir.join(format!("{}.toml", self.profile))
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<AccessCredential>> {
        let path = self.path();
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(DecanterError::Io(err)),
        };
        let file: CredentialFile = toml::from_str(&raw)?;
        Ok(Some(file.credential))
    }

    fn save(&self, credential: &AccessCredential) -> Result<()> {
        let path = self.path();
        Self::ensure_parent(&path)?;
        let file = CredentialFile {
            version: 1,
            profile: self.profile.clone(),
            credential: credential.clone(),
            saved_at: Utc::now(),
        };
        let serialized = toml::to_string(&file)?;

        // Each writer stages into its own file; readers only ever observe a
        // complete credential.
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut staging = tempfile::Builder::new()
            .prefix(&format!(".{}.", self.profile))
            .suffix(".tmp")
            .tempfile_in(dir)?;
        staging.write_all(serialized.as_bytes())?;
        staging.as_file().sync_all()?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(staging.path(), fs::Permissions::from_mode(0o600))?;
        }
        staging.persist(&path).map_err(|e| DecanterError::Io(e.error))?;
        tracing::debug!(path = %path.display(), "saved credential");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(self.path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(DecanterError::Io(err)),
        }
    }
}

/// Process-local credential store.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credential: Mutex<Option<AccessCredential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: AccessCredential) -> Self {
        Self {
            credential: Mutex::new(Some(credential)),
        }
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, Option<AccessCredential>>> {
        self.credential
            .lock()
            .map_err(|_| DecanterError::TokenUnavailable("credential store lock poisoned".into()))
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn load(&self) -> Result<Option<AccessCredential>> {
        Ok(self.guard()?.clone())
    }

    fn save(&self, credential: &AccessCredential) -> Result<()> {
        *self.guard()? = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.guard()? = None;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialFile {
    version: u32,
    profile: String,
    credential: AccessCredential,
    saved_at: DateTime<Utc>,
}

fn default_decanter_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".decanter"))
        .unwrap_or_else(|| PathBuf::from(".decanter"))
}

fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let out: String = trimmed
        .chars()
        .map(|ch| {
            let lower = ch.to_ascii_lowercase();
            if lower.is_ascii_alphanumeric() || lower == '-' {
                lower
            } else {
                '-'
            }
        })
        .collect();
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileCredentialStore) {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(CredentialStoreConfig::new(dir.path().to_path_buf()));
        (dir, store)
    }

    fn credential(access: &str) -> AccessCredential {
        AccessCredential {
            access_token: access.to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "Bearer".to_string(),
            expiry: None,
        }
    }

    #[test]
    fn missing_file_loads_as_none() {
        let (_dir, store) = temp_store();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_overwrites_previous_credential() {
        let (_dir, store) = temp_store();
        store.save(&credential("first")).unwrap();
        store.save(&credential("second")).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.access_token, "second");
        let leftovers: Vec<_> = fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, store) = temp_store();
        store.save(&credential("a")).unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn concurrent_writers_never_publish_a_partial_file() {
        let (_dir, store) = temp_store();
        let store = std::sync::Arc::new(store);
        let writers: Vec<_> = (0..8)
            .map(|i| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    for round in 0..20 {
                        let token = format!("writer-{i}-{round}-{}", "x".repeat(512));
                        store.save(&credential(&token)).unwrap();
                        let loaded = store.load().unwrap().unwrap();
                        assert!(loaded.access_token.starts_with("writer-"));
                        assert!(loaded.access_token.ends_with(&"x".repeat(512)));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        assert!(store.load().unwrap().is_some());
    }

    #[test]
    fn clear_removes_credential_and_tolerates_missing_file() {
        let (_dir, store) = temp_store();
        store.save(&credential("a")).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn profile_names_are_normalized_into_file_names() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(
            CredentialStoreConfig::new(dir.path().to_path_buf()).with_profile("CSE 220"),
        );
        assert!(store.path().ends_with("cse-220.toml"));
        let blank = FileCredentialStore::new(
            CredentialStoreConfig::new(dir.path().to_path_buf()).with_profile("  "),
        );
        assert!(blank.path().ends_with("default.toml"));
    }

    #[test]
    fn corrupt_file_is_a_serialization_error() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "not = [valid").unwrap();
        assert!(matches!(
            store.load(),
            Err(DecanterError::Serialization(_))
        ));
    }

    #[test]
    fn in_memory_store_round_trips_and_clears() {
        let store = InMemoryCredentialStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&credential("mem")).unwrap();
        assert_eq!(store.load().unwrap().unwrap().access_token, "mem");
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
