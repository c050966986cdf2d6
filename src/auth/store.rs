use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::auth::models::{AuthEvent, Credential, Platform};
use crate::error::Result;

const EVENT_CAPACITY: usize = 16;

/// Shared per-platform credential cache.
///
/// Cloning the store hands out another handle to the same credentials.
/// Credentials are replaced as a whole; readers never see a half-written one.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<Inner>,
}

struct Inner {
    credentials: RwLock<HashMap<Platform, Credential>>,
    cache_path: Option<PathBuf>,
    events: broadcast::Sender<AuthEvent>,
}

impl CredentialStore {
    pub fn in_memory() -> Self {
        Self::from_parts(HashMap::new(), None)
    }

    /// Open a store backed by a JSON cache file. A missing file yields an
    /// empty store; the file is rewritten on every `set` and `clear`.
    pub fn with_cache_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let credentials = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let credentials: HashMap<Platform, Credential> = serde_json::from_str(&raw)?;
            debug!(
                "Loaded {} cached credentials from {}",
                credentials.len(),
                path.display()
            );
            credentials
        } else {
            HashMap::new()
        };

        Ok(Self::from_parts(credentials, Some(path)))
    }

    fn from_parts(credentials: HashMap<Platform, Credential>, cache_path: Option<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                credentials: RwLock::new(credentials),
                cache_path,
                events,
            }),
        }
    }

    /// True when a non-empty access token is stored. Does not check expiry.
    pub fn is_authenticated(&self, platform: Platform) -> bool {
        self.get(platform)
            .is_some_and(|credential| !credential.access_token.is_empty())
    }

    pub fn get(&self, platform: Platform) -> Option<Credential> {
        let credentials = self
            .inner
            .credentials
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        credentials.get(&platform).cloned()
    }

    pub fn set(&self, platform: Platform, credential: Credential) {
        let authenticated = !credential.access_token.is_empty();
        self.update(|credentials| {
            credentials.insert(platform, credential);
        });
        info!("Stored {} credential", platform);
        self.notify(platform, authenticated);
    }

    pub fn clear(&self, platform: Platform) {
        self.update(|credentials| {
            credentials.remove(&platform);
        });
        info!("Cleared {} credential", platform);
        self.notify(platform, false);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }

    fn update(&self, mutate: impl FnOnce(&mut HashMap<Platform, Credential>)) {
        let snapshot = {
            let mut credentials = self
                .inner
                .credentials
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            mutate(&mut credentials);
            credentials.clone()
        };

        if let Some(path) = &self.inner.cache_path {
            if let Err(e) = write_cache(path, &snapshot) {
                warn!("Failed to write credential cache {}: {}", path.display(), e);
            }
        }
    }

    fn notify(&self, platform: Platform, authenticated: bool) {
        // No subscribers is fine.
        let _ = self.inner.events.send(AuthEvent {
            platform,
            authenticated,
        });
    }
}

fn write_cache(path: &Path, credentials: &HashMap<Platform, Credential>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(credentials)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_clear() {
        let store = CredentialStore::in_memory();
        assert!(!store.is_authenticated(Platform::YouTube));
        assert_eq!(store.get(Platform::YouTube), None);

        store.set(Platform::YouTube, Credential::new("abc").with_refresh_token("r1"));
        assert!(store.is_authenticated(Platform::YouTube));
        assert!(!store.is_authenticated(Platform::Spotify));

        store.set(Platform::YouTube, Credential::new("def"));
        let credential = store.get(Platform::YouTube).unwrap();
        assert_eq!(credential.access_token, "def");
        assert_eq!(credential.refresh_token, None);

        store.clear(Platform::YouTube);
        assert!(!store.is_authenticated(Platform::YouTube));
    }

    #[test]
    fn test_empty_token_is_not_authenticated() {
        let store = CredentialStore::in_memory();
        store.set(Platform::Spotify, Credential::new(""));
        assert!(!store.is_authenticated(Platform::Spotify));
    }

    #[test]
    fn test_clones_share_state() {
        let store = CredentialStore::in_memory();
        let handle = store.clone();

        handle.set(Platform::Spotify, Credential::new("spotify-token"));
        assert!(store.is_authenticated(Platform::Spotify));
    }

    #[tokio::test]
    async fn test_observers_are_notified() {
        let store = CredentialStore::in_memory();
        let mut events = store.subscribe();

        store.set(Platform::YouTube, Credential::new("abc"));
        store.clear(Platform::YouTube);

        assert_eq!(
            events.recv().await.unwrap(),
            AuthEvent {
                platform: Platform::YouTube,
                authenticated: true
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            AuthEvent {
                platform: Platform::YouTube,
                authenticated: false
            }
        );
    }

    #[test]
    fn test_cache_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let store = CredentialStore::with_cache_file(&path).unwrap();
        store.set(
            Platform::YouTube,
            Credential::from_grant("yt", Some("refresh".into()), Some(3600)),
        );
        store.set(Platform::Spotify, Credential::new("sp"));
        store.clear(Platform::Spotify);

        let reopened = CredentialStore::with_cache_file(&path).unwrap();
        assert_eq!(reopened.get(Platform::YouTube), store.get(Platform::YouTube));
        assert!(!reopened.is_authenticated(Platform::Spotify));
    }

    #[test]
    fn test_corrupt_cache_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "not json").unwrap();

        assert!(CredentialStore::with_cache_file(&path).is_err());
    }
}
