use std::path::Path;
use std::sync::Arc;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;
use crate::core::progress::{bytes_stream, ChunkProgressCallback, CountingStream, ProgressCallback};
use crate::core::{
    calculate_chunks, percent, total_chunks, ChunkSession, ChunkSessionRequest, ChunkTransport,
    ChunkedConfig, ContentRecord, Result, UploadError, UploadProgressEvent, UploadStatus, Uploader,
};
use crate::utils::{retry_with_config, RetryConfig};

/// 分片接口的 HTTP 实现
pub struct HttpChunkTransport {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpChunkTransport {
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
impl ChunkTransport for HttpChunkTransport {
    async fn init_session(&self, request: &ChunkSessionRequest) -> Result<ChunkSession> {
        let response = self
            .apply_auth(self.client.post(format!("{}/chunked/init", self.base_url)))
            .json(request)
            .send()
            .await
            .map_err(|err| UploadError::session_creation(None, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::session_creation(
                Some(status.as_u16()),
                "Failed to create chunk session",
            ));
        }

        // 在边界处校验响应形状，残缺的会话体直接报会话创建失败
        response.json::<ChunkSession>().await.map_err(|err| {
            UploadError::session_creation(
                Some(status.as_u16()),
                format!("malformed session body: {}", err),
            )
        })
    }

    async fn send_chunk(
        &self,
        session_id: &str,
        chunk_index: u32,
        data: Bytes,
        on_progress: Option<ChunkProgressCallback>,
    ) -> Result<()> {
        let length = data.len() as u64;
        let body = Body::wrap_stream(CountingStream::new(bytes_stream(data), on_progress));
        let part = Part::stream_with_length(body, length).file_name("chunkFile");
        let form = Form::new().part("chunkFile", part);

        let response = self
            .apply_auth(
                self.client
                    .post(format!("{}/chunked/{}/{}", self.base_url, session_id, chunk_index)),
            )
            .multipart(form)
            .send()
            .await
            .map_err(|err| UploadError::chunk_upload(chunk_index, None, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::chunk_upload(
                chunk_index,
                Some(status.as_u16()),
                "Failed to upload chunk",
            ));
        }

        // 确认响应体对调用方不透明，只关心成功与否
        Ok(())
    }

    async fn complete_session(&self, session_id: &str) -> Result<ContentRecord> {
        let response = self
            .apply_auth(
                self.client
                    .post(format!("{}/chunked/complete/{}", self.base_url, session_id)),
            )
            .send()
            .await
            .map_err(|err| UploadError::finalization(None, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::finalization(
                Some(status.as_u16()),
                "Failed to complete chunk session",
            ));
        }

        response.json::<ContentRecord>().await.map_err(|err| {
            UploadError::finalization(
                Some(status.as_u16()),
                format!("malformed content record: {}", err),
            )
        })
    }

    async fn session_status(&self, session_id: &str) -> Result<serde_json::Value> {
        let response = self
            .apply_auth(
                self.client
                    .get(format!("{}/chunked/session/{}", self.base_url, session_id)),
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::server_error(
                status.as_u16(),
                "Failed to get chunk session status",
            ));
        }

        Ok(response.json().await?)
    }
}

/// 分片上传器。
///
/// 驱动「协商会话 → 顺序发片 → 收尾」的状态机：
/// `initializing → uploading → processing → completed`，任何阶段
/// 出错都会先发出 error 事件再把错误抛给调用方。分片严格按
/// 序号串行，片 i 未确认前不会开始片 i+1。
pub struct ChunkedUploader {
    transport: Arc<dyn ChunkTransport>,
    config: ChunkedConfig,
    chunk_retry: Option<RetryConfig>,
}

impl ChunkedUploader {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self::with_transport(Arc::new(HttpChunkTransport::new(base_url)?)))
    }

    pub fn with_transport(transport: Arc<dyn ChunkTransport>) -> Self {
        Self {
            transport,
            config: ChunkedConfig::default(),
            chunk_retry: None,
        }
    }

    pub fn with_config(mut self, config: ChunkedConfig) -> Self {
        self.config = config;
        self
    }

    /// 给分片发送包一层重试装饰器；默认不重试，首个失败分片
    /// 即中止整个上传
    pub fn with_chunk_retry(mut self, retry: RetryConfig) -> Self {
        self.chunk_retry = Some(retry);
        self
    }

    pub async fn upload_file(
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

        match self
            .run(entity_id, path, &file_name, total_size, &on_progress, &cancel)
            .await
        {
            Ok(content) => Ok(content),
            Err(err) => {
                emit(
                    &on_progress,
                    UploadProgressEvent {
                        session_id: None,
                        file_name,
                        loaded: 0,
                        total: total_size,
                        percent_complete: 0,
                        current_chunk: 0,
                        total_chunks: total_chunks(total_size, self.config.chunk_size),
                        status: UploadStatus::Error,
                        error: Some(err.to_string()),
                    },
                );
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        entity_id: &str,
        path: &Path,
        file_name: &str,
        total_size: u64,
        on_progress: &Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<ContentRecord> {
        let chunk_count = total_chunks(total_size, self.config.chunk_size);

        emit(
            on_progress,
            UploadProgressEvent {
                session_id: None,
                file_name: file_name.to_string(),
                loaded: 0,
                total: total_size,
                percent_complete: 0,
                current_chunk: 0,
                total_chunks: chunk_count,
                status: UploadStatus::Initializing,
                error: None,
            },
        );

        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        let session = self
            .transport
            .init_session(&ChunkSessionRequest {
                entity_id: entity_id.to_string(),
                file_name: file_name.to_string(),
                total_size,
                total_chunks: chunk_count,
                content_type: None,
            })
            .await?;
        debug!(session_id = %session.session_id, chunk_count, "chunk session created");

        let mut file = tokio::fs::File::open(path).await?;

        for span in calculate_chunks(total_size, self.config.chunk_size) {
            if cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }

            emit(
                on_progress,
                UploadProgressEvent {
                    session_id: Some(session.session_id.clone()),
                    file_name: file_name.to_string(),
                    loaded: span.offset,
                    total: total_size,
                    percent_complete: percent(span.offset, total_size).min(99),
                    current_chunk: span.index,
                    total_chunks: chunk_count,
                    status: UploadStatus::Uploading,
                    error: None,
                },
            );

            // 读取该分片的字节范围
            file.seek(std::io::SeekFrom::Start(span.offset)).await?;
            let mut buffer = vec![0u8; span.size as usize];
            file.read_exact(&mut buffer).await?;
            let data = Bytes::from(buffer);

            // 分片内的原始字节 tick 换算成全局 loaded 后上报
            let chunk_progress: Option<ChunkProgressCallback> = on_progress.as_ref().map(|cb| {
                let cb = cb.clone();
                let session_id = session.session_id.clone();
                let file_name = file_name.to_string();
                Arc::new(move |sent: u64| {
                    let loaded = span.offset + sent;
                    cb(UploadProgressEvent {
                        session_id: Some(session_id.clone()),
                        file_name: file_name.clone(),
                        loaded,
                        total: total_size,
                        percent_complete: percent(loaded, total_size).min(99),
                        current_chunk: span.index,
                        total_chunks: chunk_count,
                        status: UploadStatus::Uploading,
                        error: None,
                    });
                }) as ChunkProgressCallback
            });

            let attempt = || {
                let data = data.clone();
                let chunk_progress = chunk_progress.clone();
                let session_id = session.session_id.clone();
                async move {
                    self.transport
                        .send_chunk(&session_id, span.index, data, chunk_progress)
                        .await
                }
            };

            match &self.chunk_retry {
                Some(retry) => retry_with_config(retry, attempt).await?,
                None => attempt().await?,
            }
        }

        // 最后 1% 留给服务端收尾
        emit(
            on_progress,
            UploadProgressEvent {
                session_id: Some(session.session_id.clone()),
                file_name: file_name.to_string(),
                loaded: total_size,
                total: total_size,
                percent_complete: 99,
                current_chunk: chunk_count,
                total_chunks: chunk_count,
                status: UploadStatus::Processing,
                error: None,
            },
        );

        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        let content = self.transport.complete_session(&session.session_id).await?;

        emit(
            on_progress,
            UploadProgressEvent {
                session_id: Some(session.session_id),
                file_name: file_name.to_string(),
                loaded: total_size,
                total: total_size,
                percent_complete: 100,
                current_chunk: chunk_count,
                total_chunks: chunk_count,
                status: UploadStatus::Completed,
                error: None,
            },
        );

        Ok(content)
    }
}

fn emit(on_progress: &Option<ProgressCallback>, event: UploadProgressEvent) {
    if let Some(callback) = on_progress {
        callback(event);
    }
}

#[async_trait]
impl Uploader for ChunkedUploader {
    async fn upload(
        &self,
        entity_id: &str,
        path: &Path,
        on_progress: Option<ProgressCallback>,
        cancel: CancellationToken,
    ) -> Result<ContentRecord> {
        self.upload_file(entity_id, path, on_progress, cancel).await
    }
}
