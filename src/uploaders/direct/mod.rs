use std::path::Path;
use std::sync::Arc;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use url::Url;
use crate::core::progress::{ChunkProgressCallback, CountingStream, ProgressCallback};
use crate::core::{
    percent, ContentRecord, Result, UploadError, UploadProgressEvent, UploadStatus, Uploader,
};

/// 直传上传器 - 阈值以内的文件一次 multipart 请求发完。
///
/// 只有两个状态：`uploading → completed`（或 `error`），
/// 不涉及任何分片会话。
pub struct DirectUploader {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl DirectUploader {
    pub fn new(base_url: &str) -> Result<Self> {
        Url::parse(base_url)
            .map_err(|_| UploadError::Internal(format!("Invalid url: {:?}", base_url)))?;

        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl Uploader for DirectUploader {
    async fn upload(
        &self,
        entity_id: &str,
        path: &Path,
        on_progress: Option<ProgressCallback>,
        cancel: CancellationToken,
    ) -> Result<ContentRecord> {
        let metadata = tokio::fs::metadata(path).await?;
        let total_size = metadata.len();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        if cancel.is_cancelled() {
            emit_error(&on_progress, &file_name, total_size, "Upload was cancelled");
            return Err(UploadError::Cancelled);
        }

        // 请求体边流出边上报进度
        let counting: Option<ChunkProgressCallback> = on_progress.as_ref().map(|cb| {
            let cb = cb.clone();
            let file_name = file_name.clone();
            Arc::new(move |sent: u64| {
                cb(UploadProgressEvent {
                    session_id: None,
                    file_name: file_name.clone(),
                    loaded: sent,
                    total: total_size,
                    percent_complete: percent(sent, total_size).min(99),
                    current_chunk: 0,
                    total_chunks: 1,
                    status: UploadStatus::Uploading,
                    error: None,
                });
            }) as ChunkProgressCallback
        });

        let result = self
            .send(entity_id, path, &file_name, total_size, counting)
            .await;

        match result {
            Ok(content) => {
                if let Some(callback) = &on_progress {
                    callback(UploadProgressEvent {
                        session_id: None,
                        file_name,
                        loaded: total_size,
                        total: total_size,
                        percent_complete: 100,
                        current_chunk: 1,
                        total_chunks: 1,
                        status: UploadStatus::Completed,
                        error: None,
                    });
                }
                Ok(content)
            }
            Err(err) => {
                emit_error(&on_progress, &file_name, total_size, &err.to_string());
                Err(err)
            }
        }
    }
}

impl DirectUploader {
    async fn send(
        &self,
        entity_id: &str,
        path: &Path,
        file_name: &str,
        total_size: u64,
        counting: Option<ChunkProgressCallback>,
    ) -> Result<ContentRecord> {
        let file = File::open(path).await?;
        let stream = CountingStream::new(ReaderStream::new(file), counting);
        let part = Part::stream_with_length(Body::wrap_stream(stream), total_size)
            .file_name(file_name.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .apply_auth(
                self.client
                    .post(format!("{}/upload", self.base_url))
                    .query(&[("entityId", entity_id)]),
            )
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::server_error(
                status.as_u16(),
                "Failed to upload file",
            ));
        }

        response.json::<ContentRecord>().await.map_err(|err| {
            UploadError::InvalidResponse(format!("malformed content record: {}", err))
        })
    }
}

fn emit_error(on_progress: &Option<ProgressCallback>, file_name: &str, total: u64, message: &str) {
    if let Some(callback) = on_progress {
        callback(UploadProgressEvent {
            session_id: None,
            file_name: file_name.to_string(),
            loaded: 0,
            total,
            percent_complete: 0,
            current_chunk: 0,
            total_chunks: 1,
            status: UploadStatus::Error,
            error: Some(message.to_string()),
        });
    }
}
