use crate::index::KeywordIndex;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use swarmer_core::{KnowledgeStore, SwarmError, SwarmResult};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Notes kept before the oldest are evicted.
pub const DEFAULT_CAPACITY: usize = 1000;
/// Notes returned per retrieval.
pub const DEFAULT_TOP_K: usize = 4;

/// A note stored in the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    entries: VecDeque<KnowledgeEntry>,
    index: KeywordIndex,
}

/// Bounded in-memory `KnowledgeStore`.
///
/// Retrieval returns the `top_k` best-matching notes joined by newlines,
/// or an empty string when no note shares a keyword with the query.
pub struct InMemoryKnowledgeStore {
    inner: RwLock<Inner>,
    capacity: usize,
    top_k: usize,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CAPACITY, DEFAULT_TOP_K)
    }

    pub fn with_limits(capacity: usize, top_k: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            capacity: capacity.max(1),
            top_k: top_k.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    /// All notes, oldest first.
    pub async fn entries(&self) -> Vec<KnowledgeEntry> {
        self.inner.read().await.entries.iter().cloned().collect()
    }
}

impl Default for InMemoryKnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn store(&self, text: &str) -> SwarmResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SwarmError::Knowledge("refusing to store empty text".into()));
        }
        let entry = KnowledgeEntry {
            id: Uuid::new_v4(),
            text: text.to_string(),
            created_at: Utc::now(),
        };

        let mut inner = self.inner.write().await;
        inner.index.insert(entry.id, &entry.text);
        inner.entries.push_back(entry);
        while inner.entries.len() > self.capacity {
            if let Some(evicted) = inner.entries.pop_front() {
                inner.index.remove(evicted.id);
                tracing::debug!(id = %evicted.id, "Evicted oldest knowledge entry");
            }
        }
        Ok(())
    }

    async fn retrieve(&self, query: &str) -> SwarmResult<String> {
        let inner = self.inner.read().await;
        let hits = inner.index.search(query, self.top_k);
        let texts: Vec<&str> = hits
            .iter()
            .filter_map(|(id, _)| inner.entries.iter().find(|e| e.id == *id))
            .map(|e| e.text.as_str())
            .collect();
        tracing::debug!(query = %query, hits = texts.len(), "Knowledge retrieved");
        Ok(texts.join("\n"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let store = InMemoryKnowledgeStore::new();
        store.store("New task: Write the lexer").await.unwrap();
        store.store("New task: Design the logo").await.unwrap();

        let found = store.retrieve("lexer tokens").await.unwrap();
        assert!(found.contains("Write the lexer"));
        assert!(!found.contains("logo"));
    }

    #[tokio::test]
    async fn test_unrelated_query_is_empty() {
        let store = InMemoryKnowledgeStore::new();
        store.store("database migrations").await.unwrap();
        assert_eq!(store.retrieve("frontend colors").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let store = InMemoryKnowledgeStore::with_limits(2, 5);
        store.store("alpha note").await.unwrap();
        store.store("beta note").await.unwrap();
        store.store("gamma note").await.unwrap();

        assert_eq!(store.len().await, 2);
        assert_eq!(store.retrieve("alpha").await.unwrap(), "");
        let texts: Vec<String> = store.entries().await.into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["beta note", "gamma note"]);
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let store = InMemoryKnowledgeStore::new();
        assert!(matches!(
            store.store("   ").await,
            Err(SwarmError::Knowledge(_))
        ));
        assert!(store.is_empty().await);
    }
}
