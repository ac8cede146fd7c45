use crate::cache_store::CacheStore;
use crate::models::{CacheSnapshot, Mention};
use crate::webmention::MentionSource;
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{error, info, instrument, warn};

/// Combines cached and freshly fetched mentions keyed by `wm-id`.
///
/// Cached entries go in first, so a fresh entry with a known id replaces the
/// cached one in place and new ids are appended in fetch order. Mentions
/// without an id, or with id 0, cannot be deduplicated and are dropped.
pub fn merge_mentions(cached: Vec<Mention>, fresh: Vec<Mention>) -> Vec<Mention> {
    let mut merged: Vec<Mention> = Vec::with_capacity(cached.len() + fresh.len());
    let mut positions: HashMap<u64, usize> = HashMap::new();

    for mention in cached.into_iter().chain(fresh) {
        let Some(id) = mention.wm_id.filter(|id| *id != 0) else {
            continue;
        };
        match positions.get(&id) {
            Some(&index) => merged[index] = mention,
            None => {
                positions.insert(id, merged.len());
                merged.push(mention);
            }
        }
    }

    merged
}

/// Build-scoped webmention memo.
///
/// The first query of a build reads the cache file, fetches newer mentions,
/// merges and writes them back; every other query of the same build (including
/// ones racing the first) awaits that single run and reads its result.
#[derive(Clone)]
pub struct MentionCache {
    source: Arc<dyn MentionSource>,
    store: CacheStore,
    per_page: u32,
    build: Arc<Mutex<Arc<OnceCell<Arc<CacheSnapshot>>>>>,
}

impl MentionCache {
    pub fn new(source: Arc<dyn MentionSource>, store: CacheStore, per_page: u32) -> Self {
        MentionCache {
            source,
            store,
            per_page,
            build: Arc::new(Mutex::new(Arc::new(OnceCell::new()))),
        }
    }

    /// The merged snapshot for this build, running the fetch cycle on first use.
    pub async fn snapshot(&self) -> Arc<CacheSnapshot> {
        // Hold the lock only long enough to grab the current build's cell
        let cell = self.build.lock().await.clone();
        let snapshot = cell
            .get_or_init(|| async { Arc::new(self.refresh().await) })
            .await
            .clone();
        snapshot
    }

    /// Mentions whose `wm-target` is exactly `url`, in snapshot order.
    pub async fn mentions_for_url(&self, url: &str) -> Vec<Mention> {
        self.snapshot()
            .await
            .children
            .iter()
            .filter(move |mention| mention.wm_target == url)
            .cloned()
            .collect()
    }

    /// Forgets this build's snapshot; the next query runs the full cycle again.
    #[allow(dead_code)] // Used in tests
    pub async fn reset(&self) {
        let mut build = self.build.lock().await;
        *build = Arc::new(OnceCell::new());
    }

    #[allow(dead_code)] // Used in tests
    pub async fn is_ready(&self) -> bool {
        self.build.lock().await.initialized()
    }

    #[instrument(skip(self), fields(cache = %self.store.path().display()))]
    async fn refresh(&self) -> CacheSnapshot {
        let cached = self.store.load_or_default().await;

        let result = self
            .source
            .fetch_mentions(cached.last_fetched.as_deref(), self.per_page)
            .await;
        let fresh = match result {
            Ok(fresh) => fresh,
            Err(e) if e.is_missing_config() => {
                warn!("Skipping webmention fetch: {}", e);
                return cached;
            }
            Err(e) => {
                error!("Error fetching webmentions, serving cached data: {}", e);
                return cached;
            }
        };

        let fetched = fresh.len();
        let updated = CacheSnapshot {
            last_fetched: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            children: merge_mentions(cached.children, fresh),
        };
        info!(
            "Fetched {} webmentions, {} cached in total",
            fetched,
            updated.children.len()
        );

        match self.store.write(&updated).await {
            Ok(()) => updated,
            Err(e) => {
                // Serve the merged data, but keep the timestamp the disk still has
                error!("Error writing webmention cache: {}", e);
                CacheSnapshot {
                    last_fetched: cached.last_fetched,
                    children: updated.children,
                }
            }
        }
    }
}
