use super::*;
use crate::drivers::memory::{MemoryStorage, UploadFailure};
use tokio::io::AsyncReadExt;

const CONTENT: &[u8] = b"The quick brown fox jumps over the lazy dog";

fn setup() -> (Arc<MemoryStorage>, Arc<dyn RemoteStorage>) {
    let memory = Arc::new(MemoryStorage::new());
    memory.insert_file("/fox.txt", CONTENT);
    let storage: Arc<dyn RemoteStorage> = memory.clone();
    (memory, storage)
}

async fn read_to_end(file: &mut File) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 8];
    loop {
        let n = file.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    out
}

async fn reader_for(storage: &Arc<dyn RemoteStorage>) -> File {
    let mut file = File::new(storage.clone(), "/fox.txt", 0);
    file.open_read_stream(0).await.unwrap();
    file
}

#[tokio::test]
async fn test_seek_from_start_matches_download() {
    let (memory, storage) = setup();

    for start in [0u64, 1, 10, 42, CONTENT.len() as u64] {
        let mut file = reader_for(&storage).await;
        assert_eq!(file.seek(SeekFrom::Start(start)).await.unwrap(), start);

        let mut expected = Vec::new();
        memory.download("/fox.txt", Some(start)).await.unwrap()
            .read_to_end(&mut expected).await.unwrap();
        assert_eq!(read_to_end(&mut file).await, expected);
    }
}

#[tokio::test]
async fn test_seek_backwards_reopens_download() {
    let (memory, storage) = setup();
    let mut file = reader_for(&storage).await;

    let mut buf = [0u8; 9];
    file.read(&mut buf).await.unwrap();
    assert_eq!(&buf, b"The quick");

    assert_eq!(file.seek(SeekFrom::Current(-5)).await.unwrap(), 4);
    let mut buf = [0u8; 5];
    file.read(&mut buf).await.unwrap();
    assert_eq!(&buf, b"quick");

    assert_eq!(memory.calls("download"), 2);
}

#[tokio::test]
async fn test_negative_seek_closes_stream() {
    let (_, storage) = setup();
    let mut file = reader_for(&storage).await;

    let err = file.seek(SeekFrom::Current(-1)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidSeek(-1)));

    let mut buf = [0u8; 4];
    assert!(matches!(file.read(&mut buf).await, Err(Error::ClosedHandle)));
    assert!(matches!(file.seek(SeekFrom::Start(0)).await, Err(Error::ClosedHandle)));
}

#[tokio::test]
async fn test_seek_from_end_uses_size_minus_offset() {
    let (memory, storage) = setup();
    let mut file = reader_for(&storage).await;

    // 43 bytes: End(3) lands on "dog"
    assert_eq!(file.seek(SeekFrom::End(3)).await.unwrap(), 40);
    assert_eq!(read_to_end(&mut file).await, b"dog");
    assert_eq!(memory.calls("get_metadata"), 1);

    // The size is cached after the first end-relative seek
    file.seek(SeekFrom::End(8)).await.unwrap();
    assert_eq!(read_to_end(&mut file).await, b"lazy dog");
    assert_eq!(memory.calls("get_metadata"), 1);
}

#[tokio::test]
async fn test_read_at_skips_from_current_position() {
    let (memory, storage) = setup();
    let mut file = reader_for(&storage).await;

    let mut buf = [0u8; 4];
    file.read(&mut buf).await.unwrap();
    assert_eq!(&buf, b"The ");

    // 4 bytes consumed, skipping 4 more lands on byte 8
    let mut buf = [0u8; 3];
    assert_eq!(file.read_at(&mut buf, 4).await.unwrap(), 3);
    assert_eq!(&buf, b"k b");

    // Position is shared: byte 11 now, then another skip of 5
    let mut buf = [0u8; 5];
    assert_eq!(file.read_at(&mut buf, 5).await.unwrap(), 5);
    assert_eq!(&buf, b"fox j");

    let mut buf = [0u8; 4];
    file.read(&mut buf).await.unwrap();
    assert_eq!(&buf, b"umps");
    assert_eq!(memory.calls("download"), 3);
}

#[tokio::test]
async fn test_read_at_rejects_offset_beyond_i64() {
    let (_, storage) = setup();
    let mut file = reader_for(&storage).await;

    let mut buf = [0u8; 4];
    let err = file.read_at(&mut buf, u64::MAX).await.unwrap_err();
    assert!(matches!(err, Error::InvalidSeek(i64::MIN)));
}

#[tokio::test]
async fn test_read_without_stream() {
    let (_, storage) = setup();
    let mut file = File::new(storage, "/fox.txt", 0);
    let mut buf = [0u8; 4];
    assert!(matches!(file.read(&mut buf).await, Err(Error::ClosedHandle)));
    assert!(matches!(file.write(b"x").await, Err(Error::ClosedHandle)));
}

#[tokio::test]
async fn test_double_write_open() {
    let (_, storage) = setup();
    let mut file = File::new(storage.clone(), "/new.txt", 0);
    file.open_write_stream().unwrap();
    assert!(matches!(file.open_write_stream(), Err(Error::AlreadyOpened)));

    let mut reading = reader_for(&storage).await;
    assert!(matches!(reading.open_write_stream(), Err(Error::AlreadyOpened)));
    assert!(matches!(file.open_read_stream(0).await, Err(Error::AlreadyOpened)));
}

#[tokio::test]
async fn test_close_without_stream() {
    let (_, storage) = setup();
    let mut file = File::new(storage, "/fox.txt", 0);
    file.close().await.unwrap();
    file.close().await.unwrap();
}

#[tokio::test]
async fn test_write_close_updates_stat_without_fetch() {
    let (memory, storage) = setup();
    let mut file = File::new(storage, "/notes.txt", 0);

    file.open_write_stream().unwrap();
    file.write_str("first line\n").await.unwrap();
    file.write(b"second line\n").await.unwrap();
    file.close().await.unwrap();

    let info = file.stat().await.unwrap();
    assert_eq!(info.size(), 23);
    assert!(info.modified().is_some());
    assert_eq!(memory.calls("get_metadata"), 0);
    assert_eq!(memory.contents("/notes.txt").unwrap().as_ref(), b"first line\nsecond line\n");
}

#[tokio::test]
async fn test_abandoned_write_leaves_object_unchanged() {
    let (memory, storage) = setup();
    let mut file = File::new(storage, "/fox.txt", 0);

    file.open_write_stream().unwrap();
    file.write(b"partial").await.unwrap();
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    drop(file);
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }

    assert_eq!(memory.contents("/fox.txt").unwrap().as_ref(), CONTENT);
    assert_eq!(memory.calls("upload"), 1);
}

#[tokio::test]
async fn test_failed_write_close_keeps_cache_empty() {
    let (memory, storage) = setup();
    let mut file = File::new(storage, "/fox.txt", 0);

    let before = file.stat().await.unwrap();
    assert_eq!(before.size(), CONTENT.len() as u64);

    memory.fail_next_upload(UploadFailure::AfterRead("too_many_write_operations".to_string()));
    file.open_write_stream().unwrap();
    file.write(b"replacement").await.unwrap();

    let err = file.close().await.unwrap_err();
    assert!(err.to_string().contains("too_many_write_operations"));

    // Invalidated at write-open and not refreshed, so stat goes back to the server
    let after = file.stat().await.unwrap();
    assert_eq!(after.size(), CONTENT.len() as u64);
    assert_eq!(memory.calls("get_metadata"), 2);
}

#[tokio::test]
async fn test_unsupported_operations() {
    let (_, storage) = setup();
    let mut file = File::new(storage.clone(), "/out.txt", 0);

    for size in [0u64, 1, 1 << 40] {
        assert!(file.truncate(size).await.unwrap_err().is_not_supported());
    }

    file.open_write_stream().unwrap();
    for pos in [SeekFrom::Start(0), SeekFrom::Current(5), SeekFrom::End(-1)] {
        assert!(file.seek(pos).await.unwrap_err().is_not_supported());
    }
    for offset in [0u64, 3, 1000] {
        assert!(file.write_at(b"abc", offset).await.unwrap_err().is_not_supported());
    }
    file.close().await.unwrap();
}

#[tokio::test]
async fn test_write_at_on_read_handle() {
    let (_, storage) = setup();
    let mut file = reader_for(&storage).await;
    assert!(matches!(file.write_at(b"x", 2).await, Err(Error::ClosedHandle)));
    file.sync().await.unwrap();
}

#[tokio::test]
async fn test_readdir_counts() {
    let memory = Arc::new(MemoryStorage::with_page_size(3));
    for i in 0..8 {
        memory.insert_file(&format!("/photos/img{}.jpg", i), "x");
    }
    let storage: Arc<dyn RemoteStorage> = memory.clone();

    let mut all_zero = File::new(storage.clone(), "/photos", 0);
    let full = all_zero.readdir(0).await.unwrap();
    assert_eq!(full.len(), 8);

    let mut all_negative = File::new(storage.clone(), "/photos", 0);
    assert_eq!(all_negative.readdir(-1).await.unwrap(), full);

    let mut paged = File::new(storage.clone(), "/photos", 0);
    let mut seen = Vec::new();
    for count in [2, 4, 5] {
        seen.extend(paged.readdir(count).await.unwrap());
    }
    assert_eq!(seen, full);
    assert!(paged.readdir(1).await.unwrap().is_empty());

    let mut names = File::new(storage, "/photos", 0);
    assert_eq!(names.readdir_names(2).await.unwrap(), vec!["img0.jpg", "img1.jpg"]);
}
