use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::storage::Metadata;

/// Permission bits reported for every entry; the remote API has no permission model.
pub const SIMULATED_FILE_MODE: u32 = 0o777;

/// Immutable snapshot of remote metadata / 文件信息快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    meta: Metadata,
}

impl FileInfo {
    pub fn new(meta: Metadata) -> Self {
        Self { meta }
    }

    /// Base name of the entry / 文件名
    pub fn name(&self) -> &str {
        self.meta.name()
    }

    /// Size in bytes, 0 for folders / 文件大小
    pub fn size(&self) -> u64 {
        match &self.meta {
            Metadata::File(file) => file.size,
            Metadata::Folder(_) => 0,
        }
    }

    pub fn mode(&self) -> u32 {
        SIMULATED_FILE_MODE
    }

    /// Client modification time; folders carry none / 修改时间
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        match &self.meta {
            Metadata::File(file) => Some(file.client_modified),
            Metadata::Folder(_) => None,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.meta, Metadata::Folder(_))
    }

    /// Underlying remote metadata / 原始元数据
    pub fn metadata(&self) -> &Metadata {
        &self.meta
    }
}

impl From<Metadata> for FileInfo {
    fn from(meta: Metadata) -> Self {
        Self::new(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileMetadata, FolderMetadata};

    #[test]
    fn test_file_info_variants() {
        let modified = "2024-03-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let file = FileInfo::from(Metadata::File(FileMetadata {
            name: "report.pdf".to_string(),
            path_display: "/docs/report.pdf".to_string(),
            size: 4096,
            client_modified: modified,
            server_modified: modified,
            rev: None,
        }));
        assert_eq!(file.name(), "report.pdf");
        assert_eq!(file.size(), 4096);
        assert_eq!(file.modified(), Some(modified));
        assert!(!file.is_dir());
        assert_eq!(file.mode(), 0o777);

        let folder = FileInfo::from(Metadata::Folder(FolderMetadata {
            name: "docs".to_string(),
            path_display: "/docs".to_string(),
        }));
        assert_eq!(folder.size(), 0);
        assert_eq!(folder.modified(), None);
        assert!(folder.is_dir());
        assert_eq!(folder.mode(), SIMULATED_FILE_MODE);
    }
}
