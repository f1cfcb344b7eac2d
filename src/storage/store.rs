//! The resource store: dedup gate and on-disk mirror
//!
//! One store is shared by every worker of a crawl. Its mutex guards the
//! resource map and is held across the synchronous disk write in `save`, so
//! registration and persistence look atomic to other workers. Network I/O
//! never happens while the lock is held.

use crate::storage::resource::Resource;
use crate::storage::{StorageError, StorageResult};
use crate::url::canonical_key;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

/// Result of a save attempt
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    /// The resource was new; it is now registered and on disk
    Stored(Arc<Resource>),

    /// Another save already won for this key; nothing was written
    AlreadyStored(Arc<Resource>),
}

impl SaveOutcome {
    /// Returns the resource now registered under the key
    pub fn resource(&self) -> &Arc<Resource> {
        match self {
            Self::Stored(r) | Self::AlreadyStored(r) => r,
        }
    }

    /// Returns true if this call registered the resource
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Stored(_))
    }
}

#[derive(Debug, Default)]
struct StoreState {
    resources: HashMap<String, Arc<Resource>>,
    links: HashMap<String, Vec<String>>,
}

impl StoreState {
    /// Looks a key up, also trying it without a trailing slash
    fn lookup(&self, key: &str) -> Option<&Arc<Resource>> {
        self.resources.get(key).or_else(|| {
            key.strip_suffix('/')
                .and_then(|trimmed| self.resources.get(trimmed))
        })
    }
}

/// Thread-safe store of downloaded resources backed by a mirror directory
#[derive(Debug)]
pub struct ResourceStore {
    root: PathBuf,
    state: Mutex<StoreState>,
    disk_writes: AtomicUsize,
    bytes_written: AtomicUsize,
}

impl ResourceStore {
    /// Opens a store rooted at `root`, creating the directory if needed
    ///
    /// # Arguments
    ///
    /// * `root` - The mirror directory
    ///
    /// # Returns
    ///
    /// * `Ok(ResourceStore)` - Empty store ready for use
    /// * `Err(StorageError)` - The directory could not be created
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StorageError::CreateRoot {
            path: root.clone(),
            source,
        })?;

        Ok(Self {
            root,
            state: Mutex::new(StoreState::default()),
            disk_writes: AtomicUsize::new(0),
            bytes_written: AtomicUsize::new(0),
        })
    }

    /// The mirror directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Gets a resource by its canonical key
    pub fn get(&self, key: &str) -> Option<Arc<Resource>> {
        self.lock().resources.get(key).cloned()
    }

    /// Gets a resource by URL, canonicalizing it first
    pub fn get_url(&self, url: &Url) -> Option<Arc<Resource>> {
        self.get(&canonical_key(url))
    }

    /// Returns true if a resource is registered under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.lock().lookup(key).is_some()
    }

    /// Registers and persists a resource unless its key is already taken
    ///
    /// The check-and-insert is the crawl's dedup gate: whichever worker
    /// registers a key first owns it, later calls return
    /// [`SaveOutcome::AlreadyStored`] without touching the disk. If the disk
    /// write fails the registration is rolled back so the URL is not
    /// considered done.
    ///
    /// # Arguments
    ///
    /// * `resource` - The freshly downloaded resource
    ///
    /// # Returns
    ///
    /// * `Ok(SaveOutcome)` - Stored, or already present
    /// * `Err(StorageError)` - The file could not be written
    pub fn save(&self, resource: Resource) -> StorageResult<SaveOutcome> {
        let key = resource.key();
        let mut state = self.lock();

        if let Some(existing) = state.lookup(&key) {
            tracing::trace!("Resource already stored: {}", key);
            return Ok(SaveOutcome::AlreadyStored(existing.clone()));
        }

        let resource = Arc::new(resource);
        state.resources.insert(key.clone(), resource.clone());

        if let Err(e) = self.save_to_disk(&resource) {
            state.resources.remove(&key);
            return Err(e);
        }

        Ok(SaveOutcome::Stored(resource))
    }

    /// Writes a resource below the mirror root
    ///
    /// Does nothing if the target file already exists. The content is
    /// written to a hidden sibling file first and renamed into place, so a
    /// failed write never leaves a truncated file under the final name.
    fn save_to_disk(&self, resource: &Resource) -> StorageResult<()> {
        let full_path = self.root.join(&resource.local_path);
        if full_path.exists() {
            tracing::debug!("{} already exists, not overwriting", full_path.display());
            return Ok(());
        }

        let write_error = |source: io::Error| StorageError::Write {
            path: full_path.clone(),
            source,
        };

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        let file_name = full_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = full_path.with_file_name(format!(".{}.part", file_name));

        if let Err(e) = fs::write(&temp_path, &resource.content) {
            let _ = fs::remove_file(&temp_path);
            return Err(write_error(e));
        }
        if let Err(e) = fs::rename(&temp_path, &full_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(write_error(e));
        }

        self.disk_writes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written
            .fetch_add(resource.content.len(), Ordering::Relaxed);
        tracing::debug!(
            "Saved {} ({} bytes) to {}",
            resource.url,
            resource.content.len(),
            full_path.display()
        );

        Ok(())
    }

    /// Records the outgoing links of a stored page, in document order
    pub fn record_links(&self, parent_key: &str, children: Vec<String>) {
        self.lock().links.insert(parent_key.to_string(), children);
    }

    /// Returns the outgoing links recorded for a page
    pub fn links_of(&self, key: &str) -> Vec<String> {
        self.lock().links.get(key).cloned().unwrap_or_default()
    }

    /// Number of registered resources
    pub fn len(&self) -> usize {
        self.lock().resources.len()
    }

    /// Returns true if nothing has been stored yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of files actually written to disk
    pub fn disk_writes(&self) -> usize {
        self.disk_writes.load(Ordering::Relaxed)
    }

    /// Total bytes written to disk
    pub fn bytes_written(&self) -> usize {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Snapshot of all stored resources, ordered by URL
    pub fn resources(&self) -> Vec<Arc<Resource>> {
        let mut resources: Vec<_> = self.lock().resources.values().cloned().collect();
        resources.sort_by(|a, b| a.url.as_str().cmp(b.url.as_str()));
        resources
    }

    /// Deletes the mirror directory and everything in it
    pub fn clean(&self) -> StorageResult<()> {
        clean_dir(&self.root)
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // A panicking holder cannot leave the maps half-updated
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Removes a mirror directory; a missing directory is not an error
pub fn clean_dir(root: &Path) -> StorageResult<()> {
    match fs::remove_dir_all(root) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StorageError::Remove {
            path: root.to_path_buf(),
            source,
        }),
    }
}
