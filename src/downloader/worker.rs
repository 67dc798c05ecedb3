//! Artifact download: one attempt per work item.
//!
//! The body is streamed chunk by chunk into `<output>/<slug>-<version>.<ext>`,
//! then flushed and synced before the attempt counts as a success. A failed
//! attempt removes whatever partial file it created.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::downloader::job::{DownloadOutcome, DownloadReport, WorkItem};
use crate::downloader::pool::WorkHandler;
use crate::downloader::DownloadError;
use crate::metrics::DownloadTimer;
use crate::output::OutputPathBuilder;

/// Artifact body as a stream of chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, DownloadError>> + Send>>;

/// Callback invoked with every report, before its item is completed
pub type ReportObserver = Arc<dyn Fn(&DownloadReport) + Send + Sync>;

/// Opens artifact bodies
#[async_trait]
pub trait ArtifactTransport: Send + Sync {
    /// Start retrieving `location`
    ///
    /// Errors that occur before the body starts are returned here; later ones
    /// surface as stream items.
    async fn open(&self, location: &str) -> Result<ByteStream, DownloadError>;
}

/// [`ArtifactTransport`] over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Arc<Client>,
}

impl HttpTransport {
    /// Use the given shared client
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtifactTransport for HttpTransport {
    async fn open(&self, location: &str) -> Result<ByteStream, DownloadError> {
        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(|e| DownloadError::Transport {
                location: location.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                location: location.to_string(),
                status: status.as_u16(),
            });
        }

        let location = location.to_string();
        let stream = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| DownloadError::Stream {
                location: location.clone(),
                reason: e.to_string(),
            })
        });
        Ok(Box::pin(stream))
    }
}

/// Downloads admitted entries into the output directory
pub struct ArtifactDownloader {
    transport: Arc<dyn ArtifactTransport>,
    paths: OutputPathBuilder,
    observer: Option<ReportObserver>,
}

impl ArtifactDownloader {
    /// Create a downloader writing under `paths`
    pub fn new(transport: Arc<dyn ArtifactTransport>, paths: OutputPathBuilder) -> Self {
        Self {
            transport,
            paths,
            observer: None,
        }
    }

    /// Observe every report
    pub fn with_observer(mut self, observer: ReportObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Output naming in use
    pub fn paths(&self) -> &OutputPathBuilder {
        &self.paths
    }

    /// Perform one download attempt for `item`
    pub async fn download(&self, item: &WorkItem) -> DownloadReport {
        let entry = &item.entry;
        let timer = DownloadTimer::start();
        let path = self.paths.artifact_path(entry);

        debug!(
            seq = item.seq,
            slug = %entry.slug,
            version = %entry.version,
            location = %entry.download_link,
            path = %path.display(),
            "Starting download"
        );

        let outcome = match self.fetch_to(&entry.download_link, &path).await {
            Ok(bytes) => {
                let elapsed = timer.record_success(bytes);
                info!(
                    slug = %entry.slug,
                    version = %entry.version,
                    path = %path.display(),
                    bytes,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Downloaded artifact"
                );
                DownloadOutcome::Downloaded { path, bytes }
            }
            Err(e) => {
                timer.record_failure(e.kind());
                warn!(
                    slug = %entry.slug,
                    version = %entry.version,
                    location = %entry.download_link,
                    error = %e,
                    "Download failed"
                );
                DownloadOutcome::Failed(e)
            }
        };

        DownloadReport {
            seq: item.seq,
            slug: entry.slug.clone(),
            version: entry.version.clone(),
            location: entry.download_link.clone(),
            outcome,
            elapsed: timer.elapsed(),
        }
    }

    async fn fetch_to(&self, location: &str, path: &Path) -> Result<u64, DownloadError> {
        if location.trim().is_empty() {
            return Err(DownloadError::Transport {
                location: location.to_string(),
                reason: "entry has no download link".to_string(),
            });
        }

        let body = self.transport.open(location).await?;

        let file = tokio::fs::File::create(path)
            .await
            .map_err(|source| DownloadError::Create {
                path: path.to_path_buf(),
                source,
            })?;

        match write_body(file, body, path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                remove_partial(path).await;
                Err(e)
            }
        }
    }
}

async fn write_body(
    mut file: tokio::fs::File,
    mut body: ByteStream,
    path: &Path,
) -> Result<u64, DownloadError> {
    let write_err = |source: std::io::Error| DownloadError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await.map_err(write_err)?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(write_err)?;
    file.sync_all().await.map_err(write_err)?;
    Ok(written)
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial artifact"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial artifact"),
    }
}

#[async_trait]
impl WorkHandler for ArtifactDownloader {
    async fn handle(&self, item: &WorkItem) -> DownloadReport {
        self.download(item).await
    }

    fn on_report(&self, report: &DownloadReport) {
        if let Some(observer) = &self.observer {
            observer(report);
        }
    }
}
