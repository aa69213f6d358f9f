pub mod format;
pub mod retry;

pub use format::format_bytes;
pub use retry::{retry, retry_with_config, RetryBuilder, RetryConfig, RetryStrategy};
