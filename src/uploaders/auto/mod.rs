use std::path::Path;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use crate::core::progress::ProgressCallback;
use crate::core::{should_use_chunked, ContentRecord, Result, Uploader, MAX_DIRECT_UPLOAD_SIZE};
use crate::uploaders::{ChunkedUploader, DirectUploader};

/// 按文件大小自动选择直传或分片的门面。
///
/// 严格大于阈值走分片，等于阈值直传。
pub struct AutoUploader {
    direct: DirectUploader,
    chunked: ChunkedUploader,
    threshold: u64,
}

impl AutoUploader {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            direct: DirectUploader::new(base_url)?,
            chunked: ChunkedUploader::new(base_url)?,
            threshold: MAX_DIRECT_UPLOAD_SIZE,
        })
    }

    pub fn with_uploaders(direct: DirectUploader, chunked: ChunkedUploader) -> Self {
        Self {
            direct,
            chunked,
            threshold: MAX_DIRECT_UPLOAD_SIZE,
        }
    }

    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }
}

#[async_trait]
impl Uploader for AutoUploader {
    async fn upload(
        &self,
        entity_id: &str,
        path: &Path,
        on_progress: Option<ProgressCallback>,
        cancel: CancellationToken,
    ) -> Result<ContentRecord> {
        let size = tokio::fs::metadata(path).await?.len();

        if should_use_chunked(size, self.threshold) {
            debug!(size, threshold = self.threshold, "using chunked upload");
            self.chunked.upload(entity_id, path, on_progress, cancel).await
        } else {
            debug!(size, threshold = self.threshold, "using direct upload");
            self.direct.upload(entity_id, path, on_progress, cancel).await
        }
    }
}
