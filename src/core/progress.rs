use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use super::types::UploadProgressEvent;

/// 调用方（通常是 UI 文件列表）注入的进度回调
pub type ProgressCallback = Arc<dyn Fn(UploadProgressEvent) + Sync + Send>;

/// 单个分片内部的进度回调，收到的是该分片累计已发送字节数
pub type ChunkProgressCallback = Arc<dyn Fn(u64) + Sync + Send>;

/// 请求体内部切片大小，决定进度 tick 的粒度
const BODY_PIECE_SIZE: usize = 64 * 1024;

/// 把内存中的一个分片切成小块流，让请求体被轮询时产生进度 tick
pub fn bytes_stream(data: Bytes) -> impl Stream<Item = std::io::Result<Bytes>> {
    let mut pieces = Vec::with_capacity(data.len().div_ceil(BODY_PIECE_SIZE).max(1));
    let mut offset = 0;

    while offset < data.len() {
        let end = std::cmp::min(offset + BODY_PIECE_SIZE, data.len());
        pieces.push(Ok(data.slice(offset..end)));
        offset = end;
    }

    futures::stream::iter(pieces)
}

pin_project! {
    /// 包装请求体流，统计已流出的字节并回调
    pub struct CountingStream<S> {
        #[pin]
        inner: S,
        sent: u64,
        callback: Option<ChunkProgressCallback>,
    }
}

impl<S> CountingStream<S> {
    pub fn new(inner: S, callback: Option<ChunkProgressCallback>) -> Self {
        Self {
            inner,
            sent: 0,
            callback,
        }
    }
}

impl<S> Stream for CountingStream<S>
where
    S: Stream<Item = std::io::Result<Bytes>>,
{
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                let bytes_len = chunk.len();
                if bytes_len > 0 {
                    *this.sent += bytes_len as u64;
                    if let Some(callback) = this.callback {
                        callback(*this.sent);
                    }
                }

                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }
}
