// Domain lookup cache. Domain names change rarely, so they are loaded once
// through a `DomainDirectory` and held until someone calls `invalidate()`.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::traits::{DomainClassifier, DomainDirectory};

/// Lowercased domain name → id, loaded lazily.
pub struct DomainCache {
    directory: Arc<dyn DomainDirectory>,
    entries: RwLock<Option<HashMap<String, Uuid>>>,
}

impl DomainCache {
    pub fn new(directory: Arc<dyn DomainDirectory>) -> Self {
        Self {
            directory,
            entries: RwLock::new(None),
        }
    }

    pub async fn lookup(&self, name: &str) -> Result<Option<Uuid>> {
        let key = normalize(name);
        {
            let guard = self.entries.read().await;
            if let Some(entries) = guard.as_ref() {
                return Ok(entries.get(&key).copied());
            }
        }

        let mut guard = self.entries.write().await;
        // Another caller may have loaded while we waited for the write lock.
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        Ok(guard.as_ref().and_then(|entries| entries.get(&key).copied()))
    }

    /// Drop the cached names; the next lookup reloads them.
    pub async fn invalidate(&self) {
        *self.entries.write().await = None;
        debug!("Domain cache invalidated");
    }

    pub async fn is_loaded(&self) -> bool {
        self.entries.read().await.is_some()
    }

    async fn load(&self) -> Result<HashMap<String, Uuid>> {
        let domains = self.directory.load_domains().await?;
        info!(count = domains.len(), "Domain cache loaded");
        Ok(domains
            .into_iter()
            .map(|d| (normalize(&d.name), d.id))
            .collect())
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Category first, then tags in order; the first cached name that matches wins.
pub struct CachedDomainClassifier {
    cache: Arc<DomainCache>,
}

impl CachedDomainClassifier {
    pub fn new(cache: Arc<DomainCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl DomainClassifier for CachedDomainClassifier {
    async fn classify(&self, category: &str, tags: &[String]) -> Result<Option<Uuid>> {
        for candidate in std::iter::once(category).chain(tags.iter().map(String::as_str)) {
            if candidate.trim().is_empty() {
                continue;
            }
            if let Some(id) = self.cache.lookup(candidate).await? {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::traits::DomainEntry;

    struct CountingDirectory {
        entries: Vec<DomainEntry>,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl DomainDirectory for CountingDirectory {
        async fn load_domains(&self) -> Result<Vec<DomainEntry>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.clone())
        }
    }

    fn directory(names: &[(&str, Uuid)]) -> Arc<CountingDirectory> {
        Arc::new(CountingDirectory {
            entries: names
                .iter()
                .map(|(name, id)| DomainEntry {
                    id: *id,
                    name: name.to_string(),
                })
                .collect(),
            loads: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn loads_once_until_invalidated() {
        let tech = Uuid::new_v4();
        let dir = directory(&[("Technology", tech)]);
        let cache = DomainCache::new(dir.clone());

        assert!(!cache.is_loaded().await);
        assert_eq!(cache.lookup("technology").await.unwrap(), Some(tech));
        assert_eq!(cache.lookup(" TECHNOLOGY ").await.unwrap(), Some(tech));
        assert_eq!(cache.lookup("cooking").await.unwrap(), None);
        assert_eq!(dir.loads.load(Ordering::SeqCst), 1);

        cache.invalidate().await;
        assert!(!cache.is_loaded().await);
        cache.lookup("technology").await.unwrap();
        assert_eq!(dir.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn category_beats_tags() {
        let tech = Uuid::new_v4();
        let rust = Uuid::new_v4();
        let cache = Arc::new(DomainCache::new(directory(&[("technology", tech), ("rust", rust)])));
        let classifier = CachedDomainClassifier::new(cache);

        let tags = vec!["rust".to_string()];
        assert_eq!(classifier.classify("Technology", &tags).await.unwrap(), Some(tech));
        assert_eq!(classifier.classify("misc", &tags).await.unwrap(), Some(rust));
        assert_eq!(classifier.classify("misc", &[]).await.unwrap(), None);
    }
}
