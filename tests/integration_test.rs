use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use hoist::core::progress::ProgressCallback;
use hoist::{
    ContentRecord, FileId, FileStatus, ManagerConfig, UploadError, UploadEvent, UploadManager,
    UploadProgressEvent, UploadStatus, Uploader,
};

/// 模拟上传器 - 用于测试管理器
struct MockUploader {
    delay: Duration,
    fail: bool,
}

impl MockUploader {
    fn new(delay: Duration) -> Self {
        Self { delay, fail: false }
    }

    fn failing(delay: Duration) -> Self {
        Self { delay, fail: true }
    }
}

#[async_trait]
impl Uploader for MockUploader {
    async fn upload(
        &self,
        entity_id: &str,
        path: &Path,
        on_progress: Option<ProgressCallback>,
        _cancel: CancellationToken,
    ) -> hoist::Result<ContentRecord> {
        let size = tokio::fs::metadata(path).await?.len();
        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();

        let emit = |loaded: u64, percent: u8, status: UploadStatus| {
            if let Some(callback) = &on_progress {
                callback(UploadProgressEvent {
                    session_id: None,
                    file_name: file_name.clone(),
                    loaded,
                    total: size,
                    percent_complete: percent,
                    current_chunk: 0,
                    total_chunks: 1,
                    status,
                    error: None,
                });
            }
        };

        emit(0, 0, UploadStatus::Uploading);
        tokio::time::sleep(self.delay).await;
        emit(size / 2, 50, UploadStatus::Uploading);
        tokio::time::sleep(self.delay).await;

        if self.fail {
            return Err(UploadError::server_error(500, "Simulated failure"));
        }

        emit(size, 100, UploadStatus::Completed);

        Ok(ContentRecord {
            id: format!("content-{}", file_name),
            entity_id: entity_id.to_string(),
            entity_type: "Product".into(),
            url: format!("https://cdn.example.com/{}", file_name),
            content_type: "application/octet-stream".into(),
            file_size: size,
        })
    }
}

async fn create_test_file(name: &str, size: usize) -> PathBuf {
    let path = std::env::temp_dir().join(format!("hoist_it_{}_{}", Uuid::new_v4(), name));
    tokio::fs::write(&path, vec![0u8; size]).await.unwrap();
    path
}

async fn cleanup(paths: &[PathBuf]) {
    for path in paths {
        let _ = tokio::fs::remove_file(path).await;
    }
}

/// 等待指定文件到达终态
async fn wait_terminal(
    events: &mut tokio::sync::broadcast::Receiver<UploadEvent>,
    id: FileId,
) -> UploadEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for terminal event")
            .expect("event channel closed");

        match &event {
            UploadEvent::Completed { id: event_id, .. } if *event_id == id => return event,
            UploadEvent::Failed { id: event_id, .. } if *event_id == id => return event,
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_single_file_reaches_success() {
    let manager = UploadManager::new(
        Arc::new(MockUploader::new(Duration::from_millis(10))),
        ManagerConfig::default(),
    );
    let mut events = manager.subscribe_events();

    let path = create_test_file("single.bin", 1024).await;
    let id = manager.add_file("entity-1", &path).await.unwrap();

    match wait_terminal(&mut events, id).await {
        UploadEvent::Completed { content, .. } => {
            assert_eq!(content.entity_id, "entity-1");
            assert_eq!(content.file_size, 1024);
        }
        other => panic!("expected Completed, got {:?}", other),
    }

    let file = manager.get(id).unwrap();
    assert_eq!(file.status, FileStatus::Success);
    assert_eq!(file.progress, 100);
    assert!(file.content.is_some());

    cleanup(&[path]).await;
}

#[tokio::test]
async fn test_concurrent_files_do_not_clobber_each_other() {
    let manager = UploadManager::new(
        Arc::new(MockUploader::new(Duration::from_millis(20))),
        ManagerConfig::default(),
    );
    // 两个独立订阅，互相等待时不会吃掉对方的终态事件
    let mut events_a = manager.subscribe_events();
    let mut events_b = manager.subscribe_events();

    let path_a = create_test_file("a.bin", 1000).await;
    let path_b = create_test_file("b.bin", 2000).await;

    let id_a = manager.add_file("entity-1", &path_a).await.unwrap();
    let id_b = manager.add_file("entity-1", &path_b).await.unwrap();

    wait_terminal(&mut events_a, id_a).await;
    wait_terminal(&mut events_b, id_b).await;

    // 两个文件各自到达终态，互不覆盖
    let file_a = manager.get(id_a).unwrap();
    let file_b = manager.get(id_b).unwrap();
    assert_eq!(file_a.status, FileStatus::Success);
    assert_eq!(file_b.status, FileStatus::Success);
    assert_eq!(file_a.content.as_ref().unwrap().file_size, 1000);
    assert_eq!(file_b.content.as_ref().unwrap().file_size, 2000);

    // 列表保持插入顺序
    let ids: Vec<FileId> = manager.files().iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![id_a, id_b]);

    cleanup(&[path_a, path_b]).await;
}

#[tokio::test]
async fn test_failed_upload_keeps_error_entry() {
    let manager = UploadManager::new(
        Arc::new(MockUploader::failing(Duration::from_millis(5))),
        ManagerConfig::default(),
    );
    let mut events = manager.subscribe_events();

    let path = create_test_file("bad.bin", 256).await;
    let id = manager.add_file("entity-1", &path).await.unwrap();

    match wait_terminal(&mut events, id).await {
        UploadEvent::Failed { error, .. } => assert!(error.contains("500")),
        other => panic!("expected Failed, got {:?}", other),
    }

    let file = manager.get(id).unwrap();
    assert_eq!(file.status, FileStatus::Error);
    assert!(file.error.is_some());

    // 失败条目可以被用户移除
    assert!(manager.remove(id).is_ok());
    assert!(manager.get(id).is_none());

    cleanup(&[path]).await;
}

#[tokio::test]
async fn test_in_flight_file_cannot_be_removed() {
    let manager = UploadManager::new(
        Arc::new(MockUploader::new(Duration::from_millis(200))),
        ManagerConfig::default(),
    );
    let mut events = manager.subscribe_events();

    let path = create_test_file("slow.bin", 256).await;
    let id = manager.add_file("entity-1", &path).await.unwrap();

    // 等到第一个进度事件，此时文件必然在传输中
    loop {
        match tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap()
        {
            UploadEvent::Progress { id: event_id, .. } if event_id == id => break,
            _ => {}
        }
    }

    assert!(manager.remove(id).is_err());

    wait_terminal(&mut events, id).await;
    assert!(manager.remove(id).is_ok());

    cleanup(&[path]).await;
}

#[tokio::test]
async fn test_oversize_file_rejected_before_upload() {
    let manager = UploadManager::new(
        Arc::new(MockUploader::new(Duration::from_millis(5))),
        ManagerConfig {
            max_file_size: 100,
            ..Default::default()
        },
    );

    let path = create_test_file("huge.bin", 1024).await;
    let err = manager.add_file("entity-1", &path).await.unwrap_err();

    assert!(matches!(err, UploadError::UnsupportedFile(_)));
    assert!(manager.files().is_empty());

    cleanup(&[path]).await;
}

#[tokio::test]
async fn test_extension_filter() {
    let manager = UploadManager::new(
        Arc::new(MockUploader::new(Duration::from_millis(5))),
        ManagerConfig {
            accepted_extensions: vec!["png".into(), "jpg".into()],
            ..Default::default()
        },
    );
    let mut events = manager.subscribe_events();

    let rejected = create_test_file("doc.pdf", 64).await;
    assert!(matches!(
        manager.add_file("entity-1", &rejected).await,
        Err(UploadError::UnsupportedFile(_))
    ));

    let accepted = create_test_file("pic.png", 64).await;
    let id = manager.add_file("entity-1", &accepted).await.unwrap();
    wait_terminal(&mut events, id).await;

    cleanup(&[rejected, accepted]).await;
}

#[tokio::test]
async fn test_max_files_limit() {
    let manager = UploadManager::new(
        Arc::new(MockUploader::new(Duration::from_millis(50))),
        ManagerConfig {
            max_files: 2,
            ..Default::default()
        },
    );

    let path_a = create_test_file("a.bin", 64).await;
    let path_b = create_test_file("b.bin", 64).await;
    let path_c = create_test_file("c.bin", 64).await;

    manager.add_file("entity-1", &path_a).await.unwrap();
    manager.add_file("entity-1", &path_b).await.unwrap();
    let err = manager.add_file("entity-1", &path_c).await.unwrap_err();
    assert!(matches!(err, UploadError::UnsupportedFile(_)));

    cleanup(&[path_a, path_b, path_c]).await;
}

#[tokio::test]
async fn test_clear_finished() {
    let manager = UploadManager::new(
        Arc::new(MockUploader::new(Duration::from_millis(5))),
        ManagerConfig::default(),
    );
    let mut events = manager.subscribe_events();

    let path = create_test_file("done.bin", 64).await;
    let id = manager.add_file("entity-1", &path).await.unwrap();
    wait_terminal(&mut events, id).await;

    assert_eq!(manager.clear_finished(), 1);
    assert!(manager.files().is_empty());

    cleanup(&[path]).await;
}
