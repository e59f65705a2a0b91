//! Cursor paginated directory listing / 目录分页读取
//!
//! The remote API decides how many entries a page holds, so pages are queued in
//! a bounded buffer and handed out in whatever count the caller asks for.

use std::collections::VecDeque;

use super::info::FileInfo;
use crate::error::{Error, Result};
use crate::storage::{ListPage, RemoteStorage};

/// Largest page the remote API returns in one call / 单页最大条目数
pub const DIR_LISTING_MAX_LIMIT: usize = 2000;

pub struct DirectoryPager {
    path: String,
    limit: Option<u32>,
    /// Server continuation token, empty before the first fetch / 游标
    cursor: String,
    done: bool,
    buffer: VecDeque<FileInfo>,
}

impl DirectoryPager {
    /// `limit` is the page size requested from the server; 0 leaves it to the server.
    pub fn new(path: impl Into<String>, limit: u32) -> Self {
        let limit = (limit > 0).then(|| limit.min(DIR_LISTING_MAX_LIMIT as u32));
        Self {
            path: path.into(),
            limit,
            cursor: String::new(),
            done: false,
            buffer: VecDeque::with_capacity(DIR_LISTING_MAX_LIMIT),
        }
    }

    /// No more pages on the server and nothing left in the buffer / 是否已读完
    pub fn is_exhausted(&self) -> bool {
        self.done && self.buffer.is_empty()
    }

    /// Every entry of the folder from a fresh cursor; pager state is untouched / 读取全部条目
    pub async fn read_all(&self, storage: &dyn RemoteStorage) -> Result<Vec<FileInfo>> {
        let mut entries = Vec::new();
        let mut cursor = String::new();

        loop {
            let page = if cursor.is_empty() {
                storage.list_folder(&self.path, None).await
            } else {
                storage.list_folder_continue(&cursor).await
            }
            .map_err(|e| Error::transport("couldn't fetch files list", e))?;

            entries.extend(page.entries.into_iter().map(FileInfo::from));
            cursor = page.cursor;
            if !page.has_more {
                break;
            }
        }

        Ok(entries)
    }

    /// Up to `count` entries; fewer only once the listing is exhausted / 分页读取
    ///
    /// A failed fetch discards the entries already drained into this call's
    /// result. The cursor is left on the last good page, so a retry resumes
    /// after them.
    pub async fn read_page(&mut self, storage: &dyn RemoteStorage, count: usize) -> Result<Vec<FileInfo>> {
        let mut list = Vec::with_capacity(count.min(DIR_LISTING_MAX_LIMIT));

        while list.len() < count && !self.is_exhausted() {
            if self.buffer.is_empty() {
                self.fetch(storage).await?;
            }

            while list.len() < count {
                match self.buffer.pop_front() {
                    Some(info) => list.push(info),
                    None => break,
                }
            }
        }

        Ok(list)
    }

    /// `read_page` projected to base names / 仅返回名称
    pub async fn read_names(&mut self, storage: &dyn RemoteStorage, count: usize) -> Result<Vec<String>> {
        let infos = self.read_page(storage, count).await?;
        Ok(infos.iter().map(|info| base_name(info.name()).to_string()).collect())
    }

    async fn fetch(&mut self, storage: &dyn RemoteStorage) -> Result<()> {
        let page: ListPage = if self.cursor.is_empty() {
            storage.list_folder(&self.path, self.limit).await
        } else {
            storage.list_folder_continue(&self.cursor).await
        }
        .map_err(|e| Error::transport("couldn't fetch files list", e))?;

        tracing::debug!(
            "listing page: path={}, entries={}, has_more={}",
            self.path, page.entries.len(), page.has_more
        );

        if self.buffer.len() + page.entries.len() > DIR_LISTING_MAX_LIMIT {
            return Err(Error::transport(
                "couldn't fetch files list",
                format!("page of {} entries exceeds buffer capacity", page.entries.len()),
            ));
        }

        self.cursor = page.cursor;
        self.done = !page.has_more;
        self.buffer.extend(page.entries.into_iter().map(FileInfo::from));
        Ok(())
    }
}

pub(crate) fn base_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::memory::MemoryStorage;

    fn storage_with(count: usize, page_size: usize) -> MemoryStorage {
        let storage = MemoryStorage::with_page_size(page_size);
        for i in 0..count {
            storage.insert_file(&format!("/dir/f{:03}", i), "x");
        }
        storage
    }

    fn names(infos: &[FileInfo]) -> Vec<String> {
        infos.iter().map(|i| i.name().to_string()).collect()
    }

    #[tokio::test]
    async fn test_read_all_drains_every_page() {
        let storage = storage_with(7, 3);
        let pager = DirectoryPager::new("/dir", 0);

        let all = pager.read_all(&storage).await.unwrap();
        assert_eq!(all.len(), 7);
        assert_eq!(storage.calls("list_folder"), 1);
        assert_eq!(storage.calls("list_folder_continue"), 2);
    }

    #[tokio::test]
    async fn test_read_page_is_prefix_consistent() {
        let storage = storage_with(10, 4);
        let full = names(&DirectoryPager::new("/dir", 0).read_all(&storage).await.unwrap());

        let mut pager = DirectoryPager::new("/dir", 0);
        let mut collected = Vec::new();
        for count in [1, 3, 5] {
            let page = pager.read_page(&storage, count).await.unwrap();
            assert_eq!(page.len(), count);
            collected.extend(names(&page));
        }

        // 9 consumed, one left; asking for more returns the remainder only
        let rest = pager.read_page(&storage, 5).await.unwrap();
        collected.extend(names(&rest));
        assert_eq!(rest.len(), 1);
        assert_eq!(collected, full);

        assert!(pager.is_exhausted());
        assert!(pager.read_page(&storage, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_buffered_entries_survive_last_page() {
        let storage = storage_with(5, 2000);
        let mut pager = DirectoryPager::new("/dir", 0);

        // Single page: done after the first fetch, yet the buffer still holds 3
        assert_eq!(pager.read_page(&storage, 2).await.unwrap().len(), 2);
        assert_eq!(pager.read_page(&storage, 2).await.unwrap().len(), 2);
        assert_eq!(pager.read_page(&storage, 2).await.unwrap().len(), 1);
        assert_eq!(storage.calls("list_folder"), 1);
        assert_eq!(storage.calls("list_folder_continue"), 0);
    }

    #[tokio::test]
    async fn test_page_limit_is_sent_to_server() {
        let storage = storage_with(6, 2000);
        let mut pager = DirectoryPager::new("/dir", 2);

        let page = pager.read_page(&storage, 5).await.unwrap();
        assert_eq!(page.len(), 5);
        assert_eq!(storage.calls("list_folder"), 1);
        assert_eq!(storage.calls("list_folder_continue"), 2);
    }

    #[tokio::test]
    async fn test_read_names() {
        let storage = storage_with(2, 10);
        let mut pager = DirectoryPager::new("/dir", 0);
        let names = pager.read_names(&storage, 10).await.unwrap();
        assert_eq!(names, vec!["f000", "f001"]);
    }

    #[tokio::test]
    async fn test_fetch_error_is_wrapped() {
        let storage = MemoryStorage::new();
        let mut pager = DirectoryPager::new("/missing", 0);
        let err = pager.read_page(&storage, 1).await.unwrap_err();
        assert!(err.to_string().starts_with("couldn't fetch files list"));
    }

    #[tokio::test]
    async fn test_failed_fetch_drops_drained_entries() {
        let storage = storage_with(10, 4);
        let mut pager = DirectoryPager::new("/dir", 0);

        storage.fail_next_list_continue("too_many_requests");
        let err = pager.read_page(&storage, 6).await.unwrap_err();
        assert!(err.to_string().contains("too_many_requests"));

        // First page was consumed by the failed call; the retry picks up at the next one
        let rest = names(&pager.read_page(&storage, 6).await.unwrap());
        assert_eq!(rest.first().map(String::as_str), Some("f004"));
        assert_eq!(rest.len(), 6);
        assert!(pager.is_exhausted());
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("/a/b/c.txt"), "c.txt");
        assert_eq!(base_name("c.txt"), "c.txt");
    }
}
