use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::clients::EmbeddingProvider;
use crate::models::Result;

/// Run-scoped image embedding cache: image URL -> vector.
///
/// Created empty at the start of one sync pass and dropped at its end, never
/// persisted. Concurrent lookups for the same URL collapse into a single
/// in-flight computation; a failed computation leaves the slot empty so the
/// next caller recomputes instead of observing a poisoned entry.
pub struct EmbeddingCache {
    entries: Mutex<HashMap<String, Arc<Mutex<Option<Vec<f32>>>>>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    pub async fn get_or_compute(
        &self,
        image_url: &str,
        provider: &dyn EmbeddingProvider,
    ) -> Result<Vec<f32>> {
        // Hold the map lock only long enough to clone the per-URL slot; the
        // compute itself runs under the slot's own lock.
        let slot = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(image_url.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .clone()
        };

        let mut guard = slot.lock().await;
        if let Some(vector) = guard.as_ref() {
            tracing::debug!(image_url, "image embedding served from run cache");
            return Ok(vector.clone());
        }

        let vector = provider.embed_image(image_url).await?;
        *guard = Some(vector.clone());
        Ok(vector)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::models::ServiceError;

    struct CountingProvider {
        calls: AtomicUsize,
        fail_first: AtomicUsize,
    }

    impl CountingProvider {
        fn new(fail_first: usize) -> Self {
            Self { calls: AtomicUsize::new(0), fail_first: AtomicUsize::new(fail_first) }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
            unreachable!("cache never embeds text")
        }

        async fn embed_image(&self, _image_url: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            if self.fail_first.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1)).is_ok() {
                return Err(ServiceError::Transient("model unavailable".to_string()));
            }
            Ok(vec![0.5, 0.5])
        }
    }

    #[tokio::test]
    async fn concurrent_lookups_compute_once() {
        let cache = Arc::new(EmbeddingCache::new());
        let provider = Arc::new(CountingProvider::new(0));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let cache = cache.clone();
            let provider = provider.clone();
            handles.push(tokio::spawn(async move {
                cache.get_or_compute("https://img.example/u1", provider.as_ref()).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), vec![0.5, 0.5]);
        }

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn failed_compute_does_not_poison_the_entry() {
        let cache = EmbeddingCache::new();
        let provider = CountingProvider::new(1);

        let first = cache.get_or_compute("https://img.example/u1", &provider).await;
        assert!(first.is_err());

        let second = cache.get_or_compute("https://img.example/u1", &provider).await;
        assert_eq!(second.unwrap(), vec![0.5, 0.5]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn distinct_urls_compute_separately() {
        let cache = EmbeddingCache::new();
        let provider = CountingProvider::new(0);

        cache.get_or_compute("https://img.example/a", &provider).await.unwrap();
        cache.get_or_compute("https://img.example/b", &provider).await.unwrap();
        cache.get_or_compute("https://img.example/a", &provider).await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }
}
