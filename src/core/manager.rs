use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use crate::utils::format_bytes;
use super::errors::{Result, UploadError};
use super::list::UploadList;
use super::progress::ProgressCallback;
use super::traits::Uploader;
use super::types::{FileId, ManagerConfig, UploadEvent, UploadPatch, UploadingFile};

/// 上传管理器。
///
/// 每个文件在加入后获得一条独立的上传流水线（tokio 任务），
/// 文件之间并发执行；单个文件内部的分片顺序由上传器保证串行。
/// 所有进度都按文件 ID 合并回列表，并通过 broadcast 通道对外广播。
pub struct UploadManager {
    uploader: Arc<dyn Uploader>,
    list: Arc<UploadList>,
    config: ManagerConfig,
    event_tx: broadcast::Sender<UploadEvent>,
}

impl UploadManager {
    pub fn new(uploader: Arc<dyn Uploader>, config: ManagerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(256);

        Self {
            uploader,
            list: Arc::new(UploadList::new()),
            config,
            event_tx,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<UploadEvent> {
        self.event_tx.subscribe()
    }

    /// 加入一个文件并立即开始上传。
    ///
    /// 校验在任何网络调用之前完成，不通过则返回
    /// [`UploadError::UnsupportedFile`]，列表不变。
    pub async fn add_file(&self, entity_id: &str, path: impl Into<PathBuf>) -> Result<FileId> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await?;
        let size = metadata.len();

        self.validate(&path, size)?;

        let file = UploadingFile::pending(path.clone(), size);
        let file_name = file.file_name.clone();
        let id = self.list.insert(file);
        let _ = self.event_tx.send(UploadEvent::FileAdded { id });
        debug!(%id, %file_name, size, "file queued for upload");

        let uploader = self.uploader.clone();
        let list = self.list.clone();
        let event_tx = self.event_tx.clone();
        let entity_id = entity_id.to_string();
        let cancel = CancellationToken::new();

        tokio::spawn(async move {
            let on_progress: ProgressCallback = {
                let list = list.clone();
                let event_tx = event_tx.clone();
                Arc::new(move |event| {
                    list.patch(id, UploadPatch::from_event(&event));
                    let _ = event_tx.send(UploadEvent::Progress { id, event });
                })
            };

            match uploader.upload(&entity_id, &path, Some(on_progress), cancel).await {
                Ok(content) => {
                    debug!(%id, url = %content.url, "upload finished");
                    list.patch(id, UploadPatch::success(content.clone()));
                    let _ = event_tx.send(UploadEvent::Completed { id, content });
                }
                Err(err) => {
                    warn!(%id, error = %err, "upload failed");
                    list.patch(id, UploadPatch::failure(err.to_string()));
                    let _ = event_tx.send(UploadEvent::Failed {
                        id,
                        error: err.to_string(),
                    });
                }
            }
        });

        Ok(id)
    }

    fn validate(&self, path: &std::path::Path, size: u64) -> Result<()> {
        if self.list.len() >= self.config.max_files {
            return Err(UploadError::UnsupportedFile(format!(
                "at most {} files can be uploaded at a time",
                self.config.max_files
            )));
        }

        if size > self.config.max_file_size {
            return Err(UploadError::UnsupportedFile(format!(
                "file exceeds the maximum size limit of {}",
                format_bytes(self.config.max_file_size)
            )));
        }

        if !self.config.accepted_extensions.is_empty() {
            let extension = path
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .unwrap_or_default();

            if !self.config.accepted_extensions.contains(&extension) {
                return Err(UploadError::UnsupportedFile(format!(
                    "unsupported file format: {:?}",
                    extension
                )));
            }
        }

        Ok(())
    }

    pub fn get(&self, id: FileId) -> Option<UploadingFile> {
        self.list.get(id)
    }

    /// 按插入顺序返回当前列表
    pub fn files(&self) -> Vec<UploadingFile> {
        self.list.snapshot()
    }

    /// 从列表移除一个条目；传输中的文件会被拒绝
    pub fn remove(&self, id: FileId) -> Result<UploadingFile> {
        self.list.remove(id)
    }

    /// 清掉所有已结束（成功/失败）的条目
    pub fn clear_finished(&self) -> usize {
        self.list.clear_finished()
    }
}
