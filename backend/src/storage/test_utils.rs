/// Test utilities module for automatic cleanup and consistent test infrastructure
///
/// This module provides RAII-based cleanup that guarantees test data is removed
/// even if tests panic or fail.
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use super::blob::FsBlobStore;
use super::memory::MemoryDocumentStore;
use super::repositories::{BabyRepository, EventRepository, FamilyRepository, UserRepository};
use super::traits::{BlobStore, DocumentStore};

/// RAII Test Environment that automatically cleans up on drop
pub struct TestEnvironment {
    /// The temporary directory - kept alive to prevent auto-cleanup until drop
    _temp_dir: TempDir,
    pub base_path: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let base_path = temp_dir.path().to_path_buf();
        Ok(Self {
            _temp_dir: temp_dir,
            base_path,
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_path
    }
}

/// Repository Test Helper over an in-memory document store and a temp blob directory
pub struct RepositoryTestHelper {
    pub env: TestEnvironment,
    pub store: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub event_repo: EventRepository,
    pub baby_repo: BabyRepository,
    pub family_repo: FamilyRepository,
    pub user_repo: UserRepository,
}

impl RepositoryTestHelper {
    pub fn new() -> Result<Self> {
        let env = TestEnvironment::new()?;
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(env.base_directory().join("photos"))?);

        Ok(Self {
            event_repo: EventRepository::new(store.clone()),
            baby_repo: BabyRepository::new(store.clone()),
            family_repo: FamilyRepository::new(store.clone()),
            user_repo: UserRepository::new(store.clone()),
            env,
            store,
            blobs,
        })
    }
}
