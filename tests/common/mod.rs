//! In-memory catalog and transport fakes shared by the integration tests

use async_trait::async_trait;
use bytes::Bytes;
use catalog_harvester::downloader::{ArtifactTransport, ByteStream, DownloadError};
use catalog_harvester::fetcher::{CatalogSource, FetcherError, FetcherResult};
use catalog_harvester::{CatalogEntry, CatalogPage};
use futures_util::stream;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::time::Instant;

/// Download link used for an entry with the given slug
pub fn link_for(slug: &str) -> String {
    format!("https://downloads.example/{slug}.zip")
}

/// Body served for an entry with the given slug
pub fn body_for(slug: &str) -> Vec<u8> {
    format!("PK-archive-of-{slug}").into_bytes()
}

/// Catalog held in memory
///
/// Page `n` is `pages[n - 1]`; indices past the end are empty. A page listed in
/// `failing` always fails with `Exhausted`.
#[derive(Default)]
pub struct MemoryCatalog {
    pages: Vec<Vec<CatalogEntry>>,
    failing: HashSet<u32>,
    requests: AtomicU32,
}

impl MemoryCatalog {
    /// Build from per-page `(slug, popularity)` pairs
    pub fn new(pages: &[&[(&str, u64)]]) -> Self {
        let pages = pages
            .iter()
            .map(|page| {
                page.iter()
                    .map(|(slug, popularity)| CatalogEntry::new(*slug, "1.0", link_for(slug), *popularity))
                    .collect()
            })
            .collect();
        Self {
            pages,
            ..Default::default()
        }
    }

    /// Make `page` fail every time
    pub fn failing(mut self, page: u32) -> Self {
        self.failing.insert(page);
        self
    }

    /// Blank the download link of `slug` wherever it appears
    pub fn without_link(mut self, slug: &str) -> Self {
        for entry in self.pages.iter_mut().flatten() {
            if entry.slug == slug {
                entry.download_link.clear();
            }
        }
        self
    }

    /// Number of `fetch_page` calls so far
    pub fn requests(&self) -> u32 {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for MemoryCatalog {
    async fn fetch_page(&self, page: u32) -> FetcherResult<CatalogPage> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&page) {
            return Err(FetcherError::Exhausted {
                page,
                attempts: 3,
                last_error: "connection refused".to_string(),
            });
        }
        let entries = self
            .pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default();
        Ok(CatalogPage::new(page, entries))
    }

    fn endpoint(&self) -> &str {
        "memory://catalog"
    }
}

/// Serves `body_for(slug)` for every link except the refused ones
#[derive(Default)]
pub struct MemoryTransport {
    refused: HashSet<String>,
    opened: Mutex<Vec<(String, Instant)>>,
}

impl MemoryTransport {
    /// Refuse the link of `slug` with a transport error
    pub fn refusing(mut self, slug: &str) -> Self {
        self.refused.insert(link_for(slug));
        self
    }

    /// Locations opened so far with the time of the request
    pub fn opened(&self) -> Vec<(String, Instant)> {
        self.opened.lock().unwrap().clone()
    }

    /// Open counts per location
    pub fn open_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for (location, _) in self.opened() {
            *counts.entry(location).or_default() += 1;
        }
        counts
    }
}

#[async_trait]
impl ArtifactTransport for MemoryTransport {
    async fn open(&self, location: &str) -> Result<ByteStream, DownloadError> {
        self.opened
            .lock()
            .unwrap()
            .push((location.to_string(), Instant::now()));

        if self.refused.contains(location) {
            return Err(DownloadError::Transport {
                location: location.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let slug = location
            .rsplit('/')
            .next()
            .and_then(|name| name.strip_suffix(".zip"))
            .unwrap_or_default();
        let chunks: Vec<Result<Bytes, DownloadError>> = body_for(slug)
            .chunks(4)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}
