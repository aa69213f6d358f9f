use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use hoist::config::Config;
use hoist::core::{ProgressCallback, Uploader};
use hoist::{AutoUploader, ChunkedUploader, DirectUploader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::load()?;

    let mut direct = DirectUploader::new(&config.base_url)?;
    let mut chunked = ChunkedUploader::new(&config.base_url)?;
    if let Some(token) = &config.token {
        direct = direct.with_token(token);
        chunked = ChunkedUploader::with_transport(Arc::new(
            hoist::HttpChunkTransport::new(&config.base_url)?.with_token(token),
        ));
    }
    let uploader = AutoUploader::with_uploaders(direct, chunked);

    let on_progress: ProgressCallback = Arc::new(|event| {
        println!(
            "{}: {}% ({}/{} bytes, chunk {}/{}, {:?})",
            event.file_name,
            event.percent_complete,
            event.loaded,
            event.total,
            event.current_chunk,
            event.total_chunks,
            event.status,
        );
    });

    let content = uploader
        .upload(
            &config.entity_id,
            Path::new(&config.file_path),
            Some(on_progress),
            CancellationToken::new(),
        )
        .await?;

    println!("Uploaded: {}", content.url);
    Ok(())
}
