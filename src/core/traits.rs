use std::path::Path;
use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use super::errors::Result;
use super::progress::{ChunkProgressCallback, ProgressCallback};
use super::types::{ChunkSession, ChunkSessionRequest, ContentRecord};

/// 分片传输层 - 会话协商、单片发送与收尾都走这里，便于在测试中替换
#[async_trait]
pub trait ChunkTransport: Send + Sync {
    /// 创建分片上传会话
    async fn init_session(&self, request: &ChunkSessionRequest) -> Result<ChunkSession>;

    /// 发送一个分片，`on_progress` 收到该分片累计已发送字节数
    async fn send_chunk(
        &self,
        session_id: &str,
        chunk_index: u32,
        data: Bytes,
        on_progress: Option<ChunkProgressCallback>,
    ) -> Result<()>;

    /// 收尾：服务端合并分片并返回内容记录
    async fn complete_session(&self, session_id: &str) -> Result<ContentRecord>;

    /// 会话状态查询，仅用于诊断，不在主流程中
    async fn session_status(&self, session_id: &str) -> Result<serde_json::Value>;
}

/// 上传器 trait - 管理器按文件大小选定实现后只依赖此接口
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        entity_id: &str,
        path: &Path,
        on_progress: Option<ProgressCallback>,
        cancel: CancellationToken,
    ) -> Result<ContentRecord>;
}
