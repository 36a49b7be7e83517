use nlgeo_core::config::SearchConfig;
use nlgeo_core::error::{NlgeoError, Result};
use nlgeo_core::models::{PlaceCandidate, PlaceId, PlaceRecord, PlaceType};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::ports::{CandidateQuery, GazetteerStore};
use crate::ranking::{rank_candidates, SearchQuery};

/// Ranked gazetteer search over a store
pub struct GazetteerSearch<S: GazetteerStore> {
    store: S,
    config: SearchConfig,
}

impl<S: GazetteerStore> GazetteerSearch<S> {
    pub fn new(store: S, config: SearchConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search for places by name.
    ///
    /// Returns at most `result_limit` candidates in rank order. Blank text
    /// and names nothing matches both give an empty list; only backend
    /// failures are errors.
    pub async fn search(
        &self,
        text: &str,
        type_hint: Option<PlaceType>,
        containment_hint: Option<&str>,
    ) -> Result<Vec<PlaceCandidate>> {
        let query = SearchQuery {
            text: text.trim().to_string(),
            type_hint,
            containment_hint: containment_hint.map(str::to_string),
        };
        self.search_query(&query).await
    }

    pub async fn search_query(&self, query: &SearchQuery) -> Result<Vec<PlaceCandidate>> {
        if query.text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let coarse = CandidateQuery {
            text: query.text.clone(),
            trigram_threshold: self.config.trigram_threshold,
            limit: self.config.fetch_limit,
        };
        let records =
            self.with_timeout("fetch_candidates", self.store.fetch_candidates(&coarse)).await?;
        let candidates = rank_candidates(query, &records, &self.config);

        debug!(
            text = %query.text,
            type_hint = ?query.type_hint,
            containment_hint = ?query.containment_hint,
            fetched = records.len(),
            returned = candidates.len(),
            "Gazetteer search"
        );
        Ok(candidates)
    }

    /// Fetch one place by key
    pub async fn get_place(&self, id: &PlaceId) -> Result<Option<PlaceRecord>> {
        self.with_timeout("get_place", self.store.get_place(id)).await
    }

    async fn with_timeout<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let timeout_ms = millis(self.config.query_timeout);
        match tokio::time::timeout(self.config.query_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err @ NlgeoError::BackendUnavailable { .. })) => {
                warn!(operation, error = %err, "Gazetteer store failed");
                Err(err)
            }
            Ok(Err(err)) => {
                warn!(operation, error = %err, "Gazetteer store failed");
                Err(NlgeoError::backend(format!("{} failed: {}", operation, err)))
            }
            Err(_) => {
                warn!(operation, timeout_ms, "Gazetteer store timed out");
                Err(NlgeoError::backend(format!("{} timed out after {} ms", operation, timeout_ms)))
            }
        }
    }
}

/// Whole milliseconds, saturating for durations past `u64::MAX` ms
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGazetteer;
    use async_trait::async_trait;
    use nlgeo_core::models::{Geometry, MatchKind};

    fn place(id: &str, name: &str, place_type: PlaceType) -> PlaceRecord {
        PlaceRecord::new(PlaceId::new("wof", id), name, place_type, Geometry::point(0.0, 0.0))
    }

    struct SlowStore;

    #[async_trait]
    impl GazetteerStore for SlowStore {
        async fn fetch_candidates(&self, _query: &CandidateQuery) -> Result<Vec<PlaceRecord>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        async fn get_place(&self, _id: &PlaceId) -> Result<Option<PlaceRecord>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }

        async fn upsert_places(&self, places: &[PlaceRecord]) -> Result<usize> {
            Ok(places.len())
        }

        async fn count(&self) -> Result<usize> {
            Ok(0)
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl GazetteerStore for BrokenStore {
        async fn fetch_candidates(&self, _query: &CandidateQuery) -> Result<Vec<PlaceRecord>> {
            Err(NlgeoError::Serialization("corrupt row".to_string()))
        }

        async fn get_place(&self, _id: &PlaceId) -> Result<Option<PlaceRecord>> {
            Err(NlgeoError::backend("connection refused"))
        }

        async fn upsert_places(&self, _places: &[PlaceRecord]) -> Result<usize> {
            Ok(0)
        }

        async fn count(&self) -> Result<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_search_ranks_exact_first() {
        let store = MemoryGazetteer::with_places(vec![
            place("1", "Annapolis Junction", PlaceType::Locality),
            place("2", "Annapolis", PlaceType::Locality),
        ]);
        let search = GazetteerSearch::new(store, SearchConfig::default());

        let results = search.search("annapolis", None, None).await.unwrap();
        assert_eq!(results[0].id.source_id, "2");
        assert_eq!(results[0].match_kind, MatchKind::Exact);
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_and_unmatched_queries_are_empty() {
        let store = MemoryGazetteer::with_places(vec![place("1", "Boston", PlaceType::Locality)]);
        let search = GazetteerSearch::new(store, SearchConfig::default());

        assert!(search.search("   ", None, None).await.unwrap().is_empty());
        assert!(search.search("Qxwvz", None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slow_store_times_out_as_backend_unavailable() {
        let config =
            SearchConfig { query_timeout: Duration::from_millis(50), ..SearchConfig::default() };
        let search = GazetteerSearch::new(SlowStore, config);

        let err = search.search("Boston", None, None).await.unwrap_err();
        assert!(matches!(err, NlgeoError::BackendUnavailable { .. }));
        assert!(err.is_retryable());

        let err = search.get_place(&PlaceId::new("wof", "1")).await.unwrap_err();
        assert!(matches!(err, NlgeoError::BackendUnavailable { .. }));
    }

    #[test]
    fn test_timeout_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(2500)), 2500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_store_errors_become_backend_unavailable() {
        let search = GazetteerSearch::new(BrokenStore, SearchConfig::default());

        let err = search.search("Boston", None, None).await.unwrap_err();
        assert!(
            matches!(err, NlgeoError::BackendUnavailable { ref reason } if reason.contains("corrupt row"))
        );

        let err = search.get_place(&PlaceId::new("wof", "1")).await.unwrap_err();
        assert!(
            matches!(err, NlgeoError::BackendUnavailable { ref reason } if reason == "connection refused")
        );
    }
}
