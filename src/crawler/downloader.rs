//! Download-or-reuse of a single resource
//!
//! The downloader is the only component that combines the fetch capability
//! with the resource store. A URL already in the store is served from it
//! without touching the network; otherwise it is fetched once, mapped to its
//! mirror path and saved.

use crate::crawler::fetcher::Fetcher;
use crate::storage::{Resource, ResourceStore, SaveOutcome};
use crate::MirrorError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Result of a download
#[derive(Debug, Clone)]
pub struct Download {
    /// The stored resource
    pub resource: Arc<Resource>,
    /// True if the resource was already stored, by an earlier task or by a
    /// worker that won a race for the same URL
    pub from_cache: bool,
}

/// Fetches resources and records them in the store
pub struct Downloader {
    store: Arc<ResourceStore>,
    fetcher: Arc<dyn Fetcher>,
}

impl Downloader {
    pub fn new(store: Arc<ResourceStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { store, fetcher }
    }

    pub fn store(&self) -> &Arc<ResourceStore> {
        &self.store
    }

    /// Returns the stored resource for `url`, downloading it if needed
    ///
    /// # Arguments
    ///
    /// * `url` - Canonical URL to download
    /// * `cancel` - Crawl cancellation token; an in-progress fetch is abandoned
    ///   when it fires
    ///
    /// # Returns
    ///
    /// * `Ok(Download)` - The resource, with `from_cache` set if no new copy
    ///   was stored by this call
    /// * `Err(MirrorError::Cancelled)` - The crawl was cancelled mid-fetch
    /// * `Err(MirrorError)` - The fetch or the disk write failed
    pub async fn download(
        &self,
        url: &Url,
        cancel: &CancellationToken,
    ) -> Result<Download, MirrorError> {
        if let Some(resource) = self.store.get_url(url) {
            tracing::debug!("Cache hit: {}", url);
            return Ok(Download {
                resource,
                from_cache: true,
            });
        }

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MirrorError::Cancelled),
            result = self.fetcher.fetch(url) => result?,
        };

        if fetched.final_url != *url {
            tracing::debug!("{} redirected to {}", url, fetched.final_url);
        }
        tracing::debug!("Fetched {} ({}, {} bytes)", url, fetched.status, fetched.body.len());

        let resource = Resource::new(url, fetched.body, fetched.content_type);

        match self.store.save(resource)? {
            SaveOutcome::Stored(resource) => Ok(Download {
                resource,
                from_cache: false,
            }),
            SaveOutcome::AlreadyStored(resource) => {
                tracing::debug!("Lost download race for {}, discarding copy", url);
                Ok(Download {
                    resource,
                    from_cache: true,
                })
            }
        }
    }
}
