use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use tokio::fs;
use tracing::{debug, warn};

use super::{content_address, BlobStore, BlobStoreError};

/// One file per blob, named by its CID, under a directory
///
/// Content is re-hashed on read, so a file modified on disk is reported as
/// corrupted instead of being returned.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, BlobStoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, cid: &Cid) -> PathBuf {
        self.dir.join(cid.to_string())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, data: Bytes) -> Result<Cid, BlobStoreError> {
        let cid = content_address(&data);
        let path = self.path_for(&cid);
        let dir = self.dir.clone();
        let len = data.len();

        // a uniquely named temp file per write, persisted under the CID once complete
        tokio::task::spawn_blocking(move || -> Result<(), BlobStoreError> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&data)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| anyhow::anyhow!("blob write task failed: {}", e))??;

        debug!("stored blob {} ({} bytes)", cid, len);
        Ok(cid)
    }

    async fn get(&self, cid: &Cid) -> Result<Option<Bytes>, BlobStoreError> {
        let data = match fs::read(self.path_for(cid)).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if &content_address(&data) != cid {
            warn!("blob {} failed content address check", cid);
            return Err(BlobStoreError::Corrupted(*cid));
        }
        Ok(Some(Bytes::from(data)))
    }

    async fn has(&self, cid: &Cid) -> Result<bool, BlobStoreError> {
        Ok(fs::try_exists(self.path_for(cid)).await?)
    }

    async fn delete(&self, cid: &Cid) -> Result<bool, BlobStoreError> {
        match fs::remove_file(self.path_for(cid)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path().join("blobs")).await.unwrap();

        let cid = store.put(Bytes::from_static(b"sealed bytes")).await.unwrap();
        assert!(store.has(&cid).await.unwrap());
        assert!(dir.path().join("blobs").join(cid.to_string()).exists());

        // reopening sees the same blob
        let reopened = FsBlobStore::open(dir.path().join("blobs")).await.unwrap();
        assert_eq!(
            reopened.get(&cid).await.unwrap(),
            Some(Bytes::from_static(b"sealed bytes"))
        );
    }

    #[tokio::test]
    async fn test_concurrent_puts_of_same_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.put(Bytes::from_static(b"same bytes")).await
            }));
        }
        for handle in handles {
            assert_eq!(
                handle.await.unwrap().unwrap(),
                content_address(b"same bytes")
            );
        }

        // only the blob itself is left behind
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec![content_address(b"same bytes").to_string()]);
    }

    #[tokio::test]
    async fn test_missing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();
        let cid = content_address(b"never stored");
        assert_eq!(store.get(&cid).await.unwrap(), None);
        assert!(!store.has(&cid).await.unwrap());
        assert!(!store.delete(&cid).await.unwrap());
    }

    #[tokio::test]
    async fn test_modified_blob_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();
        let cid = store.put(Bytes::from_static(b"original")).await.unwrap();

        std::fs::write(dir.path().join(cid.to_string()), b"modified").unwrap();
        assert!(matches!(
            store.get(&cid).await,
            Err(BlobStoreError::Corrupted(_))
        ));
    }
}
