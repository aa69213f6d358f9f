use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("HTTP Request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session creation failed{}: {message}", fmt_status(.status_code))]
    SessionCreation {
        status_code: Option<u16>,
        message: String,
    },

    #[error("Chunk {chunk_index} upload failed{}: {message}", fmt_status(.status_code))]
    ChunkUpload {
        chunk_index: u32,
        status_code: Option<u16>,
        message: String,
    },

    #[error("Finalization failed{}: {message}", fmt_status(.status_code))]
    Finalization {
        status_code: Option<u16>,
        message: String,
    },

    #[error("Server error: status code {status_code}, message: {message}")]
    ServerError {
        status_code: u16,
        message: String,
    },

    #[error("Unsupported file: {0}")]
    UnsupportedFile(String),

    #[error("Invalid response body: {0}")]
    InvalidResponse(String),

    #[error("Upload was cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

fn fmt_status(status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!(" with status {}", code),
        None => String::new(),
    }
}

impl UploadError {
    pub fn session_creation(status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self::SessionCreation {
            status_code,
            message: message.into(),
        }
    }

    pub fn chunk_upload(chunk_index: u32, status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self::ChunkUpload {
            chunk_index,
            status_code,
            message: message.into(),
        }
    }

    pub fn finalization(status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self::Finalization {
            status_code,
            message: message.into(),
        }
    }

    pub fn server_error(status_code: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status_code,
            message: message.into(),
        }
    }
}

/// Error alias
pub type Result<T, E = UploadError> = std::result::Result<T, E>;
