//! 分片计算与路径选择，纯函数。

/// 单个分片的字节范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub index: u32,
    pub offset: u64,
    pub size: u64,
}

/// 是否走分片路径：严格大于阈值才分片，等于阈值直传
pub fn should_use_chunked(file_size: u64, threshold: u64) -> bool {
    file_size > threshold
}

/// ceil(total_size / chunk_size)
pub fn total_chunks(total_size: u64, chunk_size: u64) -> u32 {
    total_size.div_ceil(chunk_size) as u32
}

/// 计算全部分片范围，最后一片可能不足 chunk_size
pub fn calculate_chunks(total_size: u64, chunk_size: u64) -> Vec<ChunkSpan> {
    let mut chunks = Vec::new();
    let mut offset = 0;
    let mut index = 0;

    while offset < total_size {
        let size = std::cmp::min(chunk_size, total_size - offset);
        chunks.push(ChunkSpan {
            index,
            offset,
            size,
        });
        offset += size;
        index += 1;
    }

    chunks
}

/// floor(loaded / total * 100)，空文件视为 100
pub fn percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }

    let pct = (loaded as f64 / total as f64 * 100.0).floor() as u64;
    std::cmp::min(pct, 100) as u8
}
