//! Token file I/O.
//!
//! Reads and writes `~/.mea/auth.json` with secure file permissions (0o600).
//! The file is re-read on every lookup so a login from another process is
//! picked up immediately.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::AuthError;
use crate::provider::{TokenProvider, TokenStore};
use crate::token::AuthToken;

const STORAGE_VERSION: u32 = 1;

/// On-disk layout of the token file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAuth {
    /// Schema version.
    pub version: u32,
    /// Bearer token.
    pub access_token: AuthToken,
    /// Token scheme.
    pub token_type: String,
    /// RFC 3339 timestamp of the last write.
    pub last_updated: String,
}

/// Token persisted to a JSON file.
#[derive(Clone, Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store backed by `path`. Nothing is read until the first lookup.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file. Missing, unreadable, or unsupported files yield `None`.
    pub fn load(&self) -> Option<StoredAuth> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "failed to read token file: {e}");
                return None;
            }
        };

        match serde_json::from_str::<StoredAuth>(&data) {
            Ok(stored) if stored.version == STORAGE_VERSION => Some(stored),
            Ok(stored) => {
                tracing::warn!(version = stored.version, "unsupported token file version");
                None
            }
            Err(e) => {
                tracing::warn!("failed to parse token file: {e}");
                None
            }
        }
    }

    /// Write `token`, creating parent directories. Permissions are set to 0o600.
    pub fn save(&self, token: &AuthToken, token_type: &str) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let stored = StoredAuth {
            version: STORAGE_VERSION,
            access_token: token.clone(),
            token_type: token_type.to_string(),
            last_updated: chrono::Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }

    /// Delete the file. A missing file is not an error.
    pub fn remove(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Io(e)),
        }
    }
}

impl TokenProvider for FileTokenStore {
    fn current_token(&self) -> Option<AuthToken> {
        self.load()
            .map(|s| s.access_token)
            .filter(|t| !t.is_blank())
    }
}

impl TokenStore for FileTokenStore {
    fn store(&self, token: &AuthToken) -> Result<(), AuthError> {
        self.save(token, "bearer")
    }

    fn clear(&self) -> Result<(), AuthError> {
        self.remove()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileTokenStore {
        FileTokenStore::new(dir.path().join("nested").join("auth.json"))
    }

    #[test]
    fn missing_file_has_no_token() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).current_token().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.store(&AuthToken::new("persisted")).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.token_type, "bearer");
        assert_eq!(store.current_token().unwrap().expose(), "persisted");

        // a second handle on the same file sees the token
        let other = FileTokenStore::new(store.path());
        assert_eq!(other.current_token().unwrap().expose(), "persisted");
    }

    #[cfg(unix)]
    #[test]
    fn file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.store(&AuthToken::new("x")).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn clear_removes_file_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.store(&AuthToken::new("x")).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(store.current_token().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_or_foreign_version_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.json");
        let store = FileTokenStore::new(&path);

        std::fs::write(&path, "{not json").unwrap();
        assert!(store.current_token().is_none());

        std::fs::write(
            &path,
            r#"{"version":2,"accessToken":"t","tokenType":"bearer","lastUpdated":""}"#,
        )
        .unwrap();
        assert!(store.current_token().is_none());
    }
}
