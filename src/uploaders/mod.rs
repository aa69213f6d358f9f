pub mod auto;
pub mod chunked;
pub mod direct;

pub use auto::AutoUploader;
pub use chunked::{ChunkedUploader, HttpChunkTransport};
pub use direct::DirectUploader;
