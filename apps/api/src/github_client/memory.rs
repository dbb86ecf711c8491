//! In-memory `ContentStore` with the same compare-and-swap rules as the contents API.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{classify_failure, ContentStore, FileLocation, RemoteFile, StoreError, WriteRequest};

#[derive(Default)]
pub struct MemoryContentStore {
    files: RwLock<HashMap<String, RemoteFile>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a file directly, bypassing version checks. Returns its sha.
    pub async fn seed(&self, location: &FileLocation, content: &str) -> String {
        let sha = new_sha();
        self.files.write().await.insert(
            key(location),
            RemoteFile {
                content: content.to_string(),
                sha: sha.clone(),
            },
        );
        sha
    }
}

fn key(location: &FileLocation) -> String {
    format!(
        "{}/{}@{}:{}",
        location.owner, location.repo, location.branch, location.path
    )
}

fn new_sha() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn fetch(&self, location: &FileLocation) -> Result<Option<RemoteFile>, StoreError> {
        Ok(self.files.read().await.get(&key(location)).cloned())
    }

    async fn write(
        &self,
        location: &FileLocation,
        request: WriteRequest<'_>,
    ) -> Result<String, StoreError> {
        let mut files = self.files.write().await;
        let current = files.get(&key(location)).map(|f| f.sha.as_str());

        match (current, request.expected_sha) {
            (None, None) => {}
            (Some(current), Some(expected)) if current == expected => {}
            (Some(_), None) => {
                return Err(classify_failure(
                    422,
                    "Invalid request.\n\n\"sha\" wasn't supplied.".to_string(),
                ))
            }
            (_, Some(expected)) => {
                return Err(classify_failure(
                    409,
                    format!("{} does not match {expected}", location.path),
                ))
            }
        }

        let sha = new_sha();
        files.insert(
            key(location),
            RemoteFile {
                content: request.content.to_string(),
                sha: sha.clone(),
            },
        );
        Ok(sha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> FileLocation {
        FileLocation {
            owner: "acme".into(),
            repo: "banco".into(),
            path: "data/problems.json".into(),
            branch: "main".into(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_none() {
        let store = MemoryContentStore::new();
        assert_eq!(store.fetch(&location()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_then_update_with_current_sha() {
        let store = MemoryContentStore::new();
        let first = store
            .write(
                &location(),
                WriteRequest {
                    message: "create",
                    content: "[]",
                    expected_sha: None,
                },
            )
            .await
            .unwrap();

        let second = store
            .write(
                &location(),
                WriteRequest {
                    message: "update",
                    content: "[1]",
                    expected_sha: Some(&first),
                },
            )
            .await
            .unwrap();

        assert_ne!(first, second);
        let file = store.fetch(&location()).await.unwrap().unwrap();
        assert_eq!(file.content, "[1]");
        assert_eq!(file.sha, second);
    }

    #[tokio::test]
    async fn test_stale_sha_conflicts() {
        let store = MemoryContentStore::new();
        let stale = store.seed(&location(), "[]").await;
        store
            .write(
                &location(),
                WriteRequest {
                    message: "someone else",
                    content: "[2]",
                    expected_sha: Some(&stale),
                },
            )
            .await
            .unwrap();

        let err = store
            .write(
                &location(),
                WriteRequest {
                    message: "late",
                    content: "[3]",
                    expected_sha: Some(&stale),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { status: 409, .. }));
        assert_eq!(store.fetch(&location()).await.unwrap().unwrap().content, "[2]");
    }

    #[tokio::test]
    async fn test_create_over_existing_file_conflicts() {
        let store = MemoryContentStore::new();
        store.seed(&location(), "[]").await;
        let err = store
            .write(
                &location(),
                WriteRequest {
                    message: "blind create",
                    content: "[9]",
                    expected_sha: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { status: 422, .. }));
    }
}
