//! In-memory [`SecondaryFs`] reference implementation.
//!
//! The trait itself is read-only (spec.md §6); the mutating operations a
//! real secondary driver would need for DUAL/PROXY writes are exposed as
//! inherent methods below and consumed directly by
//! [`crate::collab::memory::InMemoryMetadataManager`]'s `dual_*` methods,
//! the same way the teacher's `vfs::Vfs` implementors reach past their own
//! trait object for backend-specific setup.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::collab::secondary::{SecondaryFs, SecondaryStatus};
use crate::error::{IgfsError, Result};

#[derive(Debug, Clone)]
struct Node {
    is_directory: bool,
    bytes: Vec<u8>,
    properties: HashMap<String, String>,
}

/// An in-memory tree keyed by normalized path string, standing in for a
/// durable secondary file system. Guarded by a plain `std::sync::RwLock`:
/// every critical section here is pure in-memory bookkeeping, never held
/// across an `.await`.
#[derive(Default)]
pub struct InMemorySecondaryFs {
    nodes: Arc<RwLock<BTreeMap<String, Node>>>,
}

impl InMemorySecondaryFs {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node { is_directory: true, bytes: Vec::new(), properties: HashMap::new() });
        Self { nodes: Arc::new(RwLock::new(nodes)) }
    }

    pub async fn mkdirs(&self, path: &str) {
        let mut nodes = self.nodes.write().unwrap();
        let mut built = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            built.push('/');
            built.push_str(segment);
            nodes.entry(built.clone()).or_insert_with(|| Node {
                is_directory: true,
                bytes: Vec::new(),
                properties: HashMap::new(),
            });
        }
    }

    pub async fn remove(&self, path: &str, recursive: bool) -> bool {
        let mut nodes = self.nodes.write().unwrap();
        if !nodes.contains_key(path) {
            return false;
        }
        let prefix = format!("{path}/");
        if recursive {
            nodes.retain(|key, _| key != path && !key.starts_with(&prefix));
        } else {
            nodes.remove(path);
        }
        true
    }

    pub async fn rename(&self, src: &str, dest: &str) {
        let mut nodes = self.nodes.write().unwrap();
        let moved: Vec<(String, Node)> = nodes
            .iter()
            .filter(|(key, _)| key.as_str() == src || key.starts_with(&format!("{src}/")))
            .map(|(key, node)| (key.clone(), node.clone()))
            .collect();
        for (key, node) in moved {
            nodes.remove(&key);
            let rest = &key[src.len()..];
            nodes.insert(format!("{dest}{rest}"), node);
        }
    }

    pub async fn set_properties(&self, path: &str, properties: HashMap<String, String>) {
        if let Some(node) = self.nodes.write().unwrap().get_mut(path) {
            node.properties = properties;
        }
    }

    /// Opens a write handle that appends to (or truncates, if
    /// `!append`) the secondary file at `path`, creating it if absent.
    pub async fn open_write(&self, path: &str, append: bool) -> Box<dyn AsyncWrite + Send + Unpin> {
        {
            let mut nodes = self.nodes.write().unwrap();
            let node = nodes.entry(path.to_string()).or_insert_with(|| Node {
                is_directory: false,
                bytes: Vec::new(),
                properties: HashMap::new(),
            });
            if !append {
                node.bytes.clear();
            }
        }
        Box::new(SecondaryWriteHandle { nodes: self.nodes.clone(), path: path.to_string() })
    }
}

struct SecondaryWriteHandle {
    nodes: Arc<RwLock<BTreeMap<String, Node>>>,
    path: String,
}

impl AsyncWrite for SecondaryWriteHandle {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::result::Result<usize, std::io::Error>> {
        if let Some(node) = self.nodes.write().unwrap().get_mut(&self.path) {
            node.bytes.extend_from_slice(buf);
        }
        std::task::Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl SecondaryFs for InMemorySecondaryFs {
    async fn exists(&self, path: &str) -> bool {
        self.nodes.read().unwrap().contains_key(path)
    }

    async fn info(&self, path: &str) -> Result<Option<SecondaryStatus>> {
        Ok(self
            .nodes
            .read()
            .unwrap()
            .get(path)
            .map(|n| SecondaryStatus { is_directory: n.is_directory, length: n.bytes.len() as u64 }))
    }

    async fn list_paths(&self, path: &str) -> Result<Vec<String>> {
        let prefix = if path == "/" { "/".to_string() } else { format!("{path}/") };
        let nodes = self.nodes.read().unwrap();
        Ok(nodes
            .keys()
            .filter(|key| key.starts_with(&prefix) && key[prefix.len()..].find('/').is_none() && key.as_str() != path)
            .cloned()
            .collect())
    }

    async fn list_files(&self, path: &str) -> Result<Vec<(String, SecondaryStatus)>> {
        let paths = self.list_paths(path).await?;
        let nodes = self.nodes.read().unwrap();
        Ok(paths
            .into_iter()
            .filter_map(|p| {
                nodes.get(&p).map(|n| (p, SecondaryStatus { is_directory: n.is_directory, length: n.bytes.len() as u64 }))
            })
            .collect())
    }

    async fn used_space_size(&self) -> Result<u64> {
        Ok(self.nodes.read().unwrap().values().map(|n| n.bytes.len() as u64).sum())
    }

    async fn properties(&self, path: &str) -> Result<HashMap<String, String>> {
        self.nodes
            .read()
            .unwrap()
            .get(path)
            .map(|n| n.properties.clone())
            .ok_or_else(|| IgfsError::FileNotFound(path.to_string()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn write_then_read_back_length() {
        let fs = InMemorySecondaryFs::new();
        let mut out = fs.open_write("/a", false).await;
        out.write_all(b"hello").await.unwrap();
        out.shutdown().await.unwrap();
        let info = fs.info("/a").await.unwrap().unwrap();
        assert_eq!(info.length, 5);
    }

    #[tokio::test]
    async fn rename_moves_subtree() {
        let fs = InMemorySecondaryFs::new();
        fs.mkdirs("/a/b").await;
        fs.rename("/a", "/z").await;
        assert!(fs.exists("/z/b").await);
        assert!(!fs.exists("/a").await);
    }
}
