use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use crate::core::{Result, UploadError};

/// 重试策略
#[derive(Debug, Clone)]
pub enum RetryStrategy {
    /// 固定延迟
    Fixed(Duration),
    /// 指数退避
    Exponential {
        initial: Duration,
        multiplier: f64,
        max_delay: Duration,
    },
    /// 线性退避
    Linear {
        initial: Duration,
        increment: Duration,
        max_delay: Duration,
    },
}

impl RetryStrategy {
    /// 计算第 n 次重试的延迟
    pub fn get_delay(&self, attempt: u32) -> Duration {
        match self {
            RetryStrategy::Fixed(delay) => *delay,
            RetryStrategy::Exponential { initial, multiplier, max_delay } => {
                let delay = initial.as_secs_f64() * multiplier.powf(attempt as f64);
                let delay = Duration::from_secs_f64(delay);
                std::cmp::min(delay, *max_delay)
            }
            RetryStrategy::Linear { initial, increment, max_delay } => {
                let delay = *initial + (*increment * attempt);
                std::cmp::min(delay, *max_delay)
            }
        }
    }
}

/// 重试配置
pub struct RetryConfig {
    /// 最大尝试次数（含首次）
    pub max_attempts: u32,
    /// 重试策略
    pub strategy: RetryStrategy,
    /// 是否重试的判断函数
    pub should_retry: Box<dyn Fn(&UploadError) -> bool + Send + Sync>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            strategy: RetryStrategy::Exponential {
                initial: Duration::from_secs(1),
                multiplier: 2.0,
                max_delay: Duration::from_secs(60),
            },
            should_retry: Box::new(|error| {
                matches!(
                    error,
                    UploadError::Http(_)
                        | UploadError::ServerError { .. }
                        | UploadError::ChunkUpload { .. }
                )
            }),
        }
    }
}

/// 执行带重试的操作
pub async fn retry_with_config<F, Fut, T>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..config.max_attempts {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                // 检查是否应该重试
                if !(config.should_retry)(&error) {
                    return Err(error);
                }

                last_error = Some(error);

                // 如果不是最后一次尝试，等待后重试
                if attempt < config.max_attempts - 1 {
                    let delay = config.strategy.get_delay(attempt);
                    sleep(delay).await;
                }
            }
        }
    }

    // 所有重试都失败了
    Err(last_error.unwrap_or_else(|| UploadError::Internal("retry limit exceeded".to_string())))
}

/// 使用默认配置执行重试
pub async fn retry<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_config(&RetryConfig::default(), operation).await
}

/// 重试构建器
pub struct RetryBuilder {
    config: RetryConfig,
}

impl RetryBuilder {
    pub fn new() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn strategy(mut self, strategy: RetryStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn should_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(&UploadError) -> bool + Send + Sync + 'static,
    {
        self.config.should_retry = Box::new(f);
        self
    }

    pub fn build(self) -> RetryConfig {
        self.config
    }

    pub async fn run<F, Fut, T>(self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        retry_with_config(&self.config, operation).await
    }
}

impl Default for RetryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_success() {
        let config = RetryBuilder::new()
            .strategy(RetryStrategy::Fixed(Duration::from_millis(1)))
            .build();

        let count = AtomicU32::new(0);
        let result = retry_with_config(&config, || async {
            if count.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(UploadError::server_error(503, "unavailable"))
            } else {
                Ok(42)
            }
        }).await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_failure() {
        let config = RetryBuilder::new()
            .max_attempts(3)
            .strategy(RetryStrategy::Fixed(Duration::from_millis(1)))
            .build();

        let count = AtomicU32::new(0);
        let result = retry_with_config(&config, || async {
            count.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(UploadError::server_error(500, "boom"))
        }).await;

        assert!(result.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 3); // 最大尝试次数
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let count = AtomicU32::new(0);
        let result = retry(|| async {
            count.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(UploadError::UnsupportedFile("bad".to_string()))
        }).await;

        assert!(result.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exponential_delay_capped() {
        let strategy = RetryStrategy::Exponential {
            initial: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5),
        };

        assert_eq!(strategy.get_delay(0), Duration::from_secs(1));
        assert_eq!(strategy.get_delay(1), Duration::from_secs(2));
        assert_eq!(strategy.get_delay(10), Duration::from_secs(5));
    }
}
