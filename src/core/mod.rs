pub mod chunks;
pub mod errors;
pub mod list;
pub mod manager;
pub mod progress;
pub mod traits;
pub mod types;

pub use chunks::{calculate_chunks, percent, should_use_chunked, total_chunks, ChunkSpan};
pub use errors::{Result, UploadError};
pub use list::UploadList;
pub use manager::UploadManager;
pub use progress::{ChunkProgressCallback, CountingStream, ProgressCallback};
pub use traits::{ChunkTransport, Uploader};
pub use types::{
    ChunkSession,
    ChunkSessionRequest,
    ChunkedConfig,
    ContentRecord,
    FileId,
    FileStatus,
    ManagerConfig,
    UploadEvent,
    UploadPatch,
    UploadProgressEvent,
    UploadStatus,
    UploadingFile,
    CHUNK_SIZE,
    MAX_DIRECT_UPLOAD_SIZE,
};
