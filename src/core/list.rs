use std::collections::HashMap;
use parking_lot::RwLock;
use super::errors::{Result, UploadError};
use super::types::{FileId, FileStatus, UploadPatch, UploadingFile};

/// UI 可见的上传文件列表。
///
/// 按插入顺序对外呈现，内部以文件 ID 索引，所有修改都通过
/// [`UploadList::patch`] 按 ID 合并到单个条目，避免某个文件的
/// 进度 tick 覆盖其它文件的条目。
#[derive(Default)]
pub struct UploadList {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    order: Vec<FileId>,
    files: HashMap<FileId, UploadingFile>,
}

impl UploadList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, file: UploadingFile) -> FileId {
        let id = file.id;
        let mut inner = self.inner.write();
        inner.order.push(id);
        inner.files.insert(id, file);
        id
    }

    /// 把局部更新合并到指定条目，其它条目不受影响。
    /// 条目不存在时返回 false。
    pub fn patch(&self, id: FileId, patch: UploadPatch) -> bool {
        let mut inner = self.inner.write();
        let Some(file) = inner.files.get_mut(&id) else {
            return false;
        };

        if let Some(progress) = patch.progress {
            file.progress = progress;
        }
        if let Some(status) = patch.status {
            file.status = status;
        }
        if let Some(content) = patch.content {
            file.content = Some(content);
        }
        if let Some(error) = patch.error {
            file.error = Some(error);
        }

        true
    }

    pub fn get(&self, id: FileId) -> Option<UploadingFile> {
        self.inner.read().files.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按插入顺序快照整个列表
    pub fn snapshot(&self) -> Vec<UploadingFile> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.files.get(id).cloned())
            .collect()
    }

    /// 移除一个条目。传输中的文件不可移除，只有等待中
    /// 或已到终态（成功/失败）的条目允许从列表消失。
    pub fn remove(&self, id: FileId) -> Result<UploadingFile> {
        let mut inner = self.inner.write();
        let Some(file) = inner.files.remove(&id) else {
            return Err(UploadError::Internal(format!("unknown file: {}", id)));
        };

        if !(file.status == FileStatus::Pending || file.status.is_terminal()) {
            inner.files.insert(id, file);
            return Err(UploadError::Internal(format!(
                "file {} is still in flight",
                id
            )));
        }

        inner.order.retain(|entry| *entry != id);
        Ok(file)
    }

    /// 清掉所有终态条目，返回清除数量
    pub fn clear_finished(&self) -> usize {
        let mut inner = self.inner.write();
        let finished: Vec<FileId> = inner
            .files
            .iter()
            .filter(|(_, file)| file.status.is_terminal())
            .map(|(id, _)| *id)
            .collect();

        for id in &finished {
            inner.files.remove(id);
        }
        inner.order.retain(|id| !finished.contains(id));

        finished.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use crate::core::types::ContentRecord;

    fn test_file(name: &str) -> UploadingFile {
        UploadingFile::pending(PathBuf::from(name), 1024)
    }

    #[test]
    fn test_patch_touches_single_entry() {
        let list = UploadList::new();
        let a = list.insert(test_file("a.bin"));
        let b = list.insert(test_file("b.bin"));

        list.patch(
            a,
            UploadPatch {
                progress: Some(42),
                status: Some(FileStatus::Uploading),
                ..Default::default()
            },
        );

        assert_eq!(list.get(a).unwrap().progress, 42);
        // b 不受 a 的更新影响
        let b_entry = list.get(b).unwrap();
        assert_eq!(b_entry.progress, 0);
        assert_eq!(b_entry.status, FileStatus::Pending);
    }

    #[test]
    fn test_patch_merges_partial_fields() {
        let list = UploadList::new();
        let id = list.insert(test_file("a.bin"));

        list.patch(
            id,
            UploadPatch {
                progress: Some(50),
                status: Some(FileStatus::Uploading),
                ..Default::default()
            },
        );
        // 只更新 status，progress 保持
        list.patch(
            id,
            UploadPatch {
                status: Some(FileStatus::Processing),
                ..Default::default()
            },
        );

        let file = list.get(id).unwrap();
        assert_eq!(file.progress, 50);
        assert_eq!(file.status, FileStatus::Processing);
    }

    #[test]
    fn test_snapshot_preserves_insertion_order() {
        let list = UploadList::new();
        let a = list.insert(test_file("a.bin"));
        let b = list.insert(test_file("b.bin"));
        let c = list.insert(test_file("c.bin"));

        let ids: Vec<FileId> = list.snapshot().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn test_remove_rejects_in_flight() {
        let list = UploadList::new();
        let id = list.insert(test_file("a.bin"));

        list.patch(
            id,
            UploadPatch {
                status: Some(FileStatus::Uploading),
                ..Default::default()
            },
        );
        assert!(list.remove(id).is_err());

        list.patch(
            id,
            UploadPatch {
                status: Some(FileStatus::Error),
                error: Some("boom".into()),
                ..Default::default()
            },
        );
        assert!(list.remove(id).is_ok());
        assert!(list.get(id).is_none());
    }

    #[test]
    fn test_clear_finished() {
        let list = UploadList::new();
        let a = list.insert(test_file("a.bin"));
        let b = list.insert(test_file("b.bin"));

        list.patch(
            a,
            UploadPatch::success(ContentRecord {
                id: "c1".into(),
                entity_id: "e1".into(),
                entity_type: "Product".into(),
                url: "https://cdn.example.com/c1".into(),
                content_type: "application/octet-stream".into(),
                file_size: 1024,
            }),
        );

        assert_eq!(list.clear_finished(), 1);
        assert!(list.get(a).is_none());
        assert!(list.get(b).is_some());
    }
}
