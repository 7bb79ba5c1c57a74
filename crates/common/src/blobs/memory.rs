use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use tokio::sync::RwLock;

use super::{content_address, BlobStore, BlobStoreError};

/// Process-local blob store
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    data: Arc<RwLock<HashMap<Cid, Bytes>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: Bytes) -> Result<Cid, BlobStoreError> {
        let cid = content_address(&data);
        self.data.write().await.insert(cid, data);
        Ok(cid)
    }

    async fn get(&self, cid: &Cid) -> Result<Option<Bytes>, BlobStoreError> {
        Ok(self.data.read().await.get(cid).cloned())
    }

    async fn has(&self, cid: &Cid) -> Result<bool, BlobStoreError> {
        Ok(self.data.read().await.contains_key(cid))
    }

    async fn delete(&self, cid: &Cid) -> Result<bool, BlobStoreError> {
        Ok(self.data.write().await.remove(cid).is_some())
    }
}
