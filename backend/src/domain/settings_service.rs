//! Admin settings fetched from a remote configuration source.
//!
//! The service is built explicitly and owns its polling task: `start()`
//! spawns it, `stop()` aborts it. Until a fetch succeeds the last cached blob
//! is used, and without a cache the built-in defaults.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use shared::AdminSettings;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Source of the raw settings blob
#[async_trait]
pub trait RemoteConfigSource: Send + Sync {
    /// `Ok(None)` when the source has nothing published
    async fn fetch(&self) -> Result<Option<String>>;
}

/// Reads the blob from a JSON file, typically managed by an operator
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl RemoteConfigSource for FileConfigSource {
    async fn fetch(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }
}

struct SettingsState {
    source: Arc<dyn RemoteConfigSource>,
    cache_path: Option<PathBuf>,
    poll_interval: Duration,
    current: RwLock<AdminSettings>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

/// Cached admin settings with an optional background refresh
#[derive(Clone)]
pub struct SettingsService {
    state: Arc<SettingsState>,
}

impl SettingsService {
    pub fn new(
        source: Arc<dyn RemoteConfigSource>,
        cache_path: Option<PathBuf>,
        poll_interval: Duration,
    ) -> Self {
        let initial = cache_path
            .as_deref()
            .and_then(Self::load_cache)
            .unwrap_or_default();
        Self {
            state: Arc::new(SettingsState {
                source,
                cache_path,
                poll_interval,
                current: RwLock::new(initial),
                poller: Mutex::new(None),
            }),
        }
    }

    pub fn current(&self) -> AdminSettings {
        match self.state.current.read() {
            Ok(settings) => settings.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Fetch once. Returns whether new settings were applied.
    pub async fn refresh(&self) -> Result<bool> {
        let Some(blob) = self.state.source.fetch().await? else {
            debug!("No remote settings published");
            return Ok(false);
        };
        let settings = match AdminSettings::from_json(&blob) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring malformed remote settings: {}", e);
                return Ok(false);
            }
        };

        if let Some(cache_path) = &self.state.cache_path {
            if let Err(e) = Self::write_cache(cache_path, &blob) {
                warn!("Failed to cache remote settings: {:#}", e);
            }
        }
        match self.state.current.write() {
            Ok(mut current) => *current = settings,
            Err(poisoned) => *poisoned.into_inner() = settings,
        }
        Ok(true)
    }

    /// Spawn the polling task; calling it again while running does nothing
    pub fn start(&self) {
        let mut poller = self.lock_poller();
        if poller.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let service = self.clone();
        let period = self.state.poll_interval;
        info!("Polling remote settings every {:?}", period);
        *poller = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = service.refresh().await {
                    warn!("Remote settings refresh failed: {:#}", e);
                }
            }
        }));
    }

    pub fn stop(&self) {
        if let Some(task) = self.lock_poller().take() {
            task.abort();
            info!("Stopped remote settings polling");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_poller()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn lock_poller(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.state.poller.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn load_cache(path: &Path) -> Option<AdminSettings> {
        let blob = fs::read_to_string(path).ok()?;
        match AdminSettings::from_json(&blob) {
            Ok(settings) => {
                info!("Loaded cached admin settings from {}", path.display());
                Some(settings)
            }
            Err(e) => {
                warn!("Ignoring unreadable settings cache {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write_cache(path: &Path, blob: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, blob)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to move settings cache into {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::TestEnvironment;
    use shared::{AdLevel, EventKind};

    /// Serves whatever blob the test last published
    struct FakeSource {
        blob: Mutex<Option<String>>,
    }

    impl FakeSource {
        fn new(blob: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                blob: Mutex::new(blob.map(str::to_string)),
            })
        }

        fn publish(&self, blob: &str) {
            *self.blob.lock().unwrap() = Some(blob.to_string());
        }
    }

    #[async_trait]
    impl RemoteConfigSource for FakeSource {
        async fn fetch(&self) -> Result<Option<String>> {
            Ok(self.blob.lock().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn test_defaults_until_first_fetch() {
        let service = SettingsService::new(FakeSource::new(None), None, Duration::from_secs(60));
        assert_eq!(service.current(), AdminSettings::default());
        assert!(!service.refresh().await.unwrap());
        assert_eq!(service.current(), AdminSettings::default());
    }

    #[tokio::test]
    async fn test_refresh_applies_and_caches() {
        let env = TestEnvironment::new().unwrap();
        let cache = env.base_directory().join("settings.json");
        let source = FakeSource::new(Some(r#"{"adLevel":"FULL","readPermissions":["DIAPER"]}"#));

        let service = SettingsService::new(source.clone(), Some(cache.clone()), Duration::from_secs(60));
        assert!(service.refresh().await.unwrap());
        assert_eq!(service.current().ad_level, AdLevel::Full);
        assert_eq!(service.current().read_permissions, vec![EventKind::Diaper]);

        // A malformed blob keeps the previous settings
        source.publish("{not json");
        assert!(!service.refresh().await.unwrap());
        assert_eq!(service.current().ad_level, AdLevel::Full);

        // A new service starts from the cache
        let restarted = SettingsService::new(FakeSource::new(None), Some(cache), Duration::from_secs(60));
        assert_eq!(restarted.current().ad_level, AdLevel::Full);
    }

    #[tokio::test]
    async fn test_file_source_missing_file_is_empty() {
        let env = TestEnvironment::new().unwrap();
        let source = FileConfigSource::new(env.base_directory().join("absent.json"));
        assert_eq!(source.fetch().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_start_and_stop_polling() {
        let source = FakeSource::new(Some(r#"{"photoAuthorization":false}"#));
        let service = SettingsService::new(source, None, Duration::from_millis(10));

        service.start();
        assert!(service.is_running());
        for _ in 0..50 {
            if !service.current().photo_authorization {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!service.current().photo_authorization);

        service.stop();
        assert!(!service.is_running());
    }
}
