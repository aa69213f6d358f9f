pub mod config;
pub mod core;
pub mod uploaders;
pub mod utils;

// 重新导出核心类型
pub use core::{
    ChunkSession,
    ChunkSessionRequest,
    ChunkTransport,
    ChunkedConfig,
    ContentRecord,
    FileId,
    FileStatus,
    ManagerConfig,
    Result,
    UploadError,
    UploadEvent,
    UploadList,
    UploadManager,
    UploadProgressEvent,
    UploadStatus,
    Uploader,
    UploadingFile,
    CHUNK_SIZE,
    MAX_DIRECT_UPLOAD_SIZE,
};

// 重新导出上传器
pub use uploaders::{
    AutoUploader,
    ChunkedUploader,
    DirectUploader,
    HttpChunkTransport,
};
