use std::path::PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 固定分片大小：5 MiB
pub const CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// 直传大小上限：50 MiB，超过则走分片路径
pub const MAX_DIRECT_UPLOAD_SIZE: u64 = 50 * 1024 * 1024;

/// 客户端生成的文件标识，UI 列表按它做合并更新
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct FileId(pub Uuid);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 进度事件状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// 初始化中（创建上传会话）
    Initializing,
    /// 上传中
    Uploading,
    /// 服务端合并处理中
    Processing,
    /// 已完成
    Completed,
    /// 失败
    Error,
}

/// UI 列表项状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// 等待中（未开始传输）
    Pending,
    /// 上传中
    Uploading,
    /// 服务端处理中
    Processing,
    /// 失败
    Error,
    /// 成功
    Success,
}

impl FileStatus {
    /// 终态：成功或失败
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Success | FileStatus::Error)
    }
}

/// 创建分片会话的请求体
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkSessionRequest {
    pub entity_id: String,
    pub file_name: String,
    pub total_size: u64,
    pub total_chunks: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// 服务端返回的分片会话
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkSession {
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
    pub total_chunks: u32,
}

/// 上传完成后持久化的内容记录
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: String,
    pub entity_id: String,
    pub entity_type: String,
    pub url: String,
    pub content_type: String,
    pub file_size: u64,
}

/// 单次进度事件，每个 tick 产生一个实例，不持久化
#[derive(Debug, Clone)]
pub struct UploadProgressEvent {
    /// 分片会话 ID，直传路径为 None
    pub session_id: Option<String>,
    pub file_name: String,
    /// 已确认发送的字节数
    pub loaded: u64,
    /// 文件总字节数
    pub total: u64,
    /// 0..=100，finalize 成功前不会超过 99
    pub percent_complete: u8,
    pub current_chunk: u32,
    pub total_chunks: u32,
    pub status: UploadStatus,
    pub error: Option<String>,
}

/// UI 列表项
#[derive(Debug, Clone)]
pub struct UploadingFile {
    pub id: FileId,
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
    /// 0..=100
    pub progress: u8,
    pub status: FileStatus,
    pub content: Option<ContentRecord>,
    pub error: Option<String>,
}

impl UploadingFile {
    pub fn pending(path: PathBuf, size: u64) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            id: FileId::new(),
            file_name,
            path,
            size,
            progress: 0,
            status: FileStatus::Pending,
            content: None,
            error: None,
        }
    }
}

/// 对单个列表项的局部更新，未设置的字段保持原值
#[derive(Debug, Clone, Default)]
pub struct UploadPatch {
    pub progress: Option<u8>,
    pub status: Option<FileStatus>,
    pub content: Option<ContentRecord>,
    pub error: Option<String>,
}

impl UploadPatch {
    /// 把进度事件映射为列表项更新
    pub fn from_event(event: &UploadProgressEvent) -> Self {
        let status = match event.status {
            UploadStatus::Initializing | UploadStatus::Uploading => FileStatus::Uploading,
            UploadStatus::Processing => FileStatus::Processing,
            UploadStatus::Completed => FileStatus::Success,
            UploadStatus::Error => FileStatus::Error,
        };

        Self {
            progress: Some(event.percent_complete),
            status: Some(status),
            content: None,
            error: event.error.clone(),
        }
    }

    pub fn success(content: ContentRecord) -> Self {
        Self {
            progress: Some(100),
            status: Some(FileStatus::Success),
            content: Some(content),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            progress: None,
            status: Some(FileStatus::Error),
            content: None,
            error: Some(error.into()),
        }
    }
}

/// 分片上传配置
#[derive(Debug, Clone)]
pub struct ChunkedConfig {
    pub chunk_size: u64,
}

impl Default for ChunkedConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
        }
    }
}

/// 上传管理器的文件校验配置
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// 同时跟踪的最大文件数
    pub max_files: usize,
    /// 单文件大小上限
    pub max_file_size: u64,
    /// 允许的扩展名（小写，不带点）；为空表示不限制
    pub accepted_extensions: Vec<String>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_files: 5,
            max_file_size: 1024 * 1024 * 1024, // 1GB
            accepted_extensions: Vec::new(),
        }
    }
}

/// 管理器对外广播的事件
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// 文件已加入列表
    FileAdded {
        id: FileId,
    },
    /// 进度更新
    Progress {
        id: FileId,
        event: UploadProgressEvent,
    },
    /// 上传完成
    Completed {
        id: FileId,
        content: ContentRecord,
    },
    /// 上传失败
    Failed {
        id: FileId,
        error: String,
    },
}

// 静态断言确保类型是 Send 的
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn assert_types() {
        assert_send::<UploadingFile>();
        assert_send::<UploadEvent>();
        assert_send::<UploadProgressEvent>();
    }
};
